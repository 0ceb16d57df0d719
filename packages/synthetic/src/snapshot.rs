//! JSON snapshot file helpers.

use std::path::Path;

use dengue_map_config::ensure_parent_dir;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::SyntheticError;

/// Writes `value` as pretty-printed UTF-8 JSON, replacing any existing
/// file and creating parent directories.
///
/// # Errors
///
/// Returns [`SyntheticError`] if serialization or the write fails.
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<(), SyntheticError> {
    let contents = serde_json::to_string_pretty(value)?;
    ensure_parent_dir(path).map_err(|e| SyntheticError::io(path, e))?;
    std::fs::write(path, contents).map_err(|e| SyntheticError::io(path, e))?;
    log::info!("Saved {}", path.display());
    Ok(())
}

/// Reads a JSON snapshot file.
///
/// # Errors
///
/// Returns [`SyntheticError`] if the file cannot be read or parsed.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SyntheticError> {
    let contents = std::fs::read_to_string(path).map_err(|e| SyntheticError::io(path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
    use dengue_map_dengue_models::DistrictRecord;

    use super::*;

    #[test]
    fn keeps_non_ascii_text() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/district_data.json");
        let records = vec![DistrictRecord::new(2, "安平區", 65_000, 13, "2025-07-01 09:30")];

        write_json(&records, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"name\": \"安平區\""));
        assert!(text.contains("\"risk_level\": \"中風險\""));

        let back: Vec<DistrictRecord> = read_json(&path).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn write_replaces_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("weather_data.json");
        std::fs::write(&path, "x".repeat(4096)).unwrap();

        write_json(&serde_json::json!({"temperature": 30.1}), &path).unwrap();

        let value: serde_json::Value = read_json(&path).unwrap();
        assert_eq!(value["temperature"], 30.1);
    }
}
