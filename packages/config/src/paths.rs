#![allow(clippy::module_name_repetitions)]
//! Canonical file locations for snapshots, templates and web assets.
//!
//! All relative paths are resolved against [`PathsConfig::root`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const BUCKET_JSON: &str = "bucket.json";
pub const DENGUE_DATA_JSON: &str = "dengue_data.json";
pub const DISTRICT_DATA_JSON: &str = "district_data.json";
pub const WEATHER_DATA_JSON: &str = "weather_data.json";
pub const OVITRAP_DATA_JSON: &str = "ovitrap_data.json";
pub const DISTRICT_BOUNDARIES_GEOJSON: &str = "district_boundaries.geojson";
pub const MAP_TEMP_HTML: &str = "map_temp.html";
pub const MAP_HTML: &str = "map.html";
pub const SCRIPT_JS: &str = "script.js";
pub const STYLE_CSS: &str = "style.css";

/// Directory layout of a dashboard installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Project root. A relative root in a config file is taken relative to
    /// that file's directory.
    pub root: PathBuf,
    /// JSON snapshots and boundary files.
    pub data_dir: PathBuf,
    /// Generated map page and behavior script.
    pub template_dir: PathBuf,
    /// Static web assets (stylesheets, images).
    pub web_dir: PathBuf,
    /// District boundary shapefile, relative to `data_dir`.
    pub shapefile: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            data_dir: PathBuf::from("data"),
            template_dir: PathBuf::from("template"),
            web_dir: PathBuf::from("web"),
            shapefile: PathBuf::from("tainan_town.shp"),
        }
    }
}

impl PathsConfig {
    /// Resolves `path` against the project root unless it is absolute.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.resolve(&self.data_dir)
    }

    #[must_use]
    pub fn template_dir(&self) -> PathBuf {
        self.resolve(&self.template_dir)
    }

    #[must_use]
    pub fn web_dir(&self) -> PathBuf {
        self.resolve(&self.web_dir)
    }

    /// Resolves a file name inside the data directory.
    #[must_use]
    pub fn data_file(&self, name: impl AsRef<Path>) -> PathBuf {
        self.data_dir().join(name)
    }

    #[must_use]
    pub fn bucket_json(&self) -> PathBuf {
        self.data_file(BUCKET_JSON)
    }

    #[must_use]
    pub fn dengue_data_json(&self) -> PathBuf {
        self.data_file(DENGUE_DATA_JSON)
    }

    #[must_use]
    pub fn district_data_json(&self) -> PathBuf {
        self.data_file(DISTRICT_DATA_JSON)
    }

    #[must_use]
    pub fn weather_data_json(&self) -> PathBuf {
        self.data_file(WEATHER_DATA_JSON)
    }

    #[must_use]
    pub fn ovitrap_data_json(&self) -> PathBuf {
        self.data_file(OVITRAP_DATA_JSON)
    }

    #[must_use]
    pub fn district_boundaries_geojson(&self) -> PathBuf {
        self.data_file(DISTRICT_BOUNDARIES_GEOJSON)
    }

    #[must_use]
    pub fn town_shapefile(&self) -> PathBuf {
        self.data_file(&self.shapefile)
    }

    #[must_use]
    pub fn map_temp_html(&self) -> PathBuf {
        self.template_dir().join(MAP_TEMP_HTML)
    }

    #[must_use]
    pub fn map_html(&self) -> PathBuf {
        self.template_dir().join(MAP_HTML)
    }

    #[must_use]
    pub fn script_js(&self) -> PathBuf {
        self.template_dir().join(SCRIPT_JS)
    }

    #[must_use]
    pub fn style_css(&self) -> PathBuf {
        self.web_dir().join(STYLE_CSS)
    }
}

/// Creates the parent directory of `path` if it does not exist yet.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_resolve_against_root() {
        let paths = PathsConfig {
            root: PathBuf::from("/srv/dengue"),
            ..PathsConfig::default()
        };
        assert_eq!(
            paths.bucket_json(),
            PathBuf::from("/srv/dengue/data/bucket.json")
        );
        assert_eq!(
            paths.script_js(),
            PathBuf::from("/srv/dengue/template/script.js")
        );
        assert_eq!(
            paths.town_shapefile(),
            PathBuf::from("/srv/dengue/data/tainan_town.shp")
        );
    }

    #[test]
    fn absolute_paths_are_kept() {
        let paths = PathsConfig {
            root: PathBuf::from("/srv/dengue"),
            data_dir: PathBuf::from("/var/lib/dengue"),
            ..PathsConfig::default()
        };
        assert_eq!(
            paths.dengue_data_json(),
            PathBuf::from("/var/lib/dengue/dengue_data.json")
        );
    }

    #[test]
    fn ensure_parent_dir_creates_missing_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("a/b/c.json");
        ensure_parent_dir(&target).unwrap();
        assert!(tmp.path().join("a/b").is_dir());
    }
}
