#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Map page generation for the dengue dashboard.
//!
//! Turns the district boundary layer into three files under the template
//! directory:
//!
//! * `map_temp.html`: a standalone Leaflet page with the behavior script
//!   inline
//! * `script.js`: the behavior script, extracted from the page above. It is
//!   only created when missing unless [`ScriptPolicy::Overwrite`] is chosen,
//!   so hand edits survive regeneration.
//! * `map.html`: the dashboard shell served at `/`, rewritten every run

pub mod page;
pub mod script;

use std::path::{Path, PathBuf};

use dengue_map_config::{Config, ensure_parent_dir};
use dengue_map_geography::{ConvertOptions, FeatureLayer, GeoError, convert, load_layer};
use dengue_map_geography_models::{Crs, LatLng};
use thiserror::Error;

/// Errors that can occur while composing the map.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The layer is not in geographic WGS84 coordinates.
    #[error("Map layers must be in EPSG:4326, got {}", crs.map_or_else(|| "no CRS".to_string(), |c| c.to_string()))]
    NotGeographic { crs: Option<Crs> },

    /// Loading or converting the boundaries failed.
    #[error(transparent)]
    Geo(#[from] GeoError),

    /// A generated file could not be written.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The rendered page has no inline script to extract.
    #[error("No inline script found in {}", path.display())]
    MissingScript { path: PathBuf },
}

/// What to do with an existing `script.js`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScriptPolicy {
    /// Create the script only when it does not exist yet.
    #[default]
    PreserveExisting,
    /// Always regenerate the script.
    Overwrite,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComposeOptions {
    pub script_policy: ScriptPolicy,
}

/// What happened to `script.js` during a compose run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptOutcome {
    Created,
    Preserved,
    Overwritten,
}

/// Summary of a compose run.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeReport {
    /// Initial map center.
    pub center: LatLng,
    pub feature_count: usize,
    pub script: ScriptOutcome,
}

/// Writes `contents` through a temporary sibling file and a rename.
fn write_file(path: &Path, contents: &str) -> Result<(), GenerateError> {
    let io_err = |source| GenerateError::Io {
        path: path.to_path_buf(),
        source,
    };

    ensure_parent_dir(path).map_err(io_err)?;
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    std::fs::write(&tmp_path, contents).map_err(io_err)?;
    std::fs::rename(&tmp_path, path).map_err(io_err)?;
    Ok(())
}

fn map_center(layer: &FeatureLayer, config: &Config) -> Result<LatLng, GenerateError> {
    let fixed = config.map.fixed_center();
    if !config.map.use_dynamic_center {
        log::info!("Using configured map center {fixed}");
        return Ok(fixed);
    }

    if let Some(center) = layer.display_center()? {
        log::info!("Using computed map center {center}");
        Ok(center)
    } else {
        log::warn!("No features to center on, using configured center {fixed}");
        Ok(fixed)
    }
}

/// Generates the map page, behavior script and dashboard shell for a
/// WGS84 district layer.
///
/// # Errors
///
/// * [`GenerateError::NotGeographic`] if the layer is not EPSG:4326
/// * [`GenerateError::Io`] if an output cannot be written
pub fn compose_map(
    layer: &FeatureLayer,
    config: &Config,
    options: &ComposeOptions,
) -> Result<ComposeReport, GenerateError> {
    if layer.crs != Some(Crs::WGS84) {
        return Err(GenerateError::NotGeographic { crs: layer.crs });
    }

    let center = map_center(layer, config)?;
    let fields = layer.schema.names();
    log::debug!("Tooltip fields: {}", fields.join(", "));
    if layer.schema.get(&config.map.name_field).is_none() {
        log::warn!(
            "Boundaries have no '{}' field; sidebar entries will not match map features",
            config.map.name_field
        );
    }

    let collection = dengue_map_geography::convert::to_feature_collection(layer)?;
    let districts = serde_json::to_value(&collection)?;
    let behavior = script::render(config, center, &districts, &fields);

    let temp_path = config.paths.map_temp_html();
    let temp_page = page::render_map_page(config, &behavior);
    write_file(&temp_path, &temp_page)?;
    log::info!("Wrote {}", temp_path.display());

    let script_path = config.paths.script_js();
    let existed = script_path.exists();
    let script = if existed && options.script_policy == ScriptPolicy::PreserveExisting {
        log::info!(
            "{} already exists, keeping the customized version",
            script_path.display()
        );
        ScriptOutcome::Preserved
    } else {
        let inline = page::extract_inline_script(&temp_page).ok_or_else(|| {
            GenerateError::MissingScript {
                path: temp_path.clone(),
            }
        })?;
        let contents = if config.cache.enable_cache_busting {
            script::apply_cache_busting(inline)
        } else {
            inline.to_string()
        };
        write_file(&script_path, &contents)?;
        log::info!("Wrote {}", script_path.display());

        if existed {
            ScriptOutcome::Overwritten
        } else {
            ScriptOutcome::Created
        }
    };

    let shell_path = config.paths.map_html();
    let shell = page::render_shell(config, config.paths.style_css().exists());
    write_file(&shell_path, &shell)?;
    log::info!("Wrote {}", shell_path.display());

    Ok(ComposeReport {
        center,
        feature_count: layer.len(),
        script,
    })
}

/// Runs the full map update: converts the town shapefile when no boundary
/// `GeoJSON` exists yet, loads the boundaries in WGS84 and composes the map.
///
/// # Errors
///
/// Returns [`GenerateError::Geo`] if the boundaries cannot be produced or
/// loaded, or any [`compose_map`] error.
pub fn regenerate(config: &Config, options: &ComposeOptions) -> Result<ComposeReport, GenerateError> {
    let boundaries = config.paths.district_boundaries_geojson();

    if !boundaries.exists() {
        let shapefile = config.paths.town_shapefile();
        if shapefile.exists() {
            log::info!(
                "{} missing, converting {}",
                boundaries.display(),
                shapefile.display()
            );
            convert(
                &shapefile,
                &boundaries,
                &ConvertOptions {
                    input_crs: config.crs.input_crs,
                    output_crs: Crs::WGS84,
                },
            )?;
        }
    }

    let mut layer = load_layer(&boundaries)?;
    layer.normalize_crs(config.crs.input_crs, Crs::WGS84)?;
    compose_map(&layer, config, options)
}

#[cfg(test)]
mod tests {
    use dengue_map_config::PathsConfig;
    use dengue_map_geography_models::{FieldDef, FieldKind, FieldSchema};
    use geo::{Geometry, LineString, Polygon};

    use super::*;

    fn square(lng: f64, lat: f64) -> Geometry<f64> {
        Geometry::Polygon(Polygon::new(
            LineString::from(vec![
                (lng, lat),
                (lng + 0.1, lat),
                (lng + 0.1, lat + 0.1),
                (lng, lat + 0.1),
                (lng, lat),
            ]),
            vec![],
        ))
    }

    fn district(name: &str, lng: f64, lat: f64) -> dengue_map_geography::LayerFeature {
        let mut properties = serde_json::Map::new();
        properties.insert("TOWNNAME".to_string(), name.into());
        dengue_map_geography::LayerFeature {
            geometry: square(lng, lat),
            properties,
        }
    }

    fn layer() -> FeatureLayer {
        FeatureLayer {
            crs: Some(Crs::WGS84),
            schema: FieldSchema::new(vec![FieldDef {
                name: "TOWNNAME".to_string(),
                kind: FieldKind::Text,
            }]),
            features: vec![district("安平區", 120.15, 22.98), district("東區", 120.21, 22.98)],
        }
    }

    fn config(root: &Path) -> Config {
        Config {
            paths: PathsConfig {
                root: root.to_path_buf(),
                ..PathsConfig::default()
            },
            ..Config::default()
        }
    }

    #[test]
    fn compose_writes_all_outputs() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());

        let report = compose_map(&layer(), &config, &ComposeOptions::default()).unwrap();

        assert_eq!(report.feature_count, 2);
        assert_eq!(report.script, ScriptOutcome::Created);
        assert!((report.center.lat - 23.03).abs() < 1e-9);
        assert!((report.center.lng - 120.23).abs() < 1e-9);

        let temp = std::fs::read_to_string(config.paths.map_temp_html()).unwrap();
        assert_eq!(temp.matches("<script>").count(), 1);
        assert!(temp.contains("安平區"));

        let script = std::fs::read_to_string(config.paths.script_js()).unwrap();
        assert!(script.contains(script::CACHE_BUSTING_FETCH));
        assert!(!script.contains(script::DATA_FETCH));

        let shell = std::fs::read_to_string(config.paths.map_html()).unwrap();
        assert!(shell.contains("/template/script.js"));
    }

    #[test]
    fn existing_script_is_preserved() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        compose_map(&layer(), &config, &ComposeOptions::default()).unwrap();

        let custom = "// hand-tuned dashboard\nconsole.log('custom');\n";
        std::fs::write(config.paths.script_js(), custom).unwrap();

        let report = compose_map(&layer(), &config, &ComposeOptions::default()).unwrap();
        assert_eq!(report.script, ScriptOutcome::Preserved);
        assert_eq!(std::fs::read_to_string(config.paths.script_js()).unwrap(), custom);
    }

    #[test]
    fn overwrite_policy_replaces_script() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        std::fs::create_dir_all(config.paths.template_dir()).unwrap();
        std::fs::write(config.paths.script_js(), "old").unwrap();

        let report = compose_map(
            &layer(),
            &config,
            &ComposeOptions {
                script_policy: ScriptPolicy::Overwrite,
            },
        )
        .unwrap();

        assert_eq!(report.script, ScriptOutcome::Overwritten);
        assert_ne!(std::fs::read_to_string(config.paths.script_js()).unwrap(), "old");
    }

    #[test]
    fn cache_busting_can_be_disabled() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path())
            .with_override("cache.enable_cache_busting", false)
            .unwrap();

        compose_map(&layer(), &config, &ComposeOptions::default()).unwrap();

        let script = std::fs::read_to_string(config.paths.script_js()).unwrap();
        assert!(script.contains(script::DATA_FETCH));
    }

    #[test]
    fn shell_is_identical_across_runs() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());

        compose_map(&layer(), &config, &ComposeOptions::default()).unwrap();
        let first = std::fs::read(config.paths.map_html()).unwrap();
        compose_map(&layer(), &config, &ComposeOptions::default()).unwrap();
        let second = std::fs::read(config.paths.map_html()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn fixed_center_when_dynamic_center_is_off() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path())
            .with_override("map.use_dynamic_center", false)
            .unwrap();

        let report = compose_map(&layer(), &config, &ComposeOptions::default()).unwrap();
        assert_eq!(report.center, config.map.fixed_center());
    }

    #[test]
    fn empty_layer_falls_back_to_configured_center() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        let empty = FeatureLayer {
            crs: Some(Crs::WGS84),
            ..FeatureLayer::default()
        };

        let report = compose_map(&empty, &config, &ComposeOptions::default()).unwrap();
        assert_eq!(report.center, config.map.fixed_center());
        assert_eq!(report.feature_count, 0);
    }

    #[test]
    fn projected_layer_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut projected = layer();
        projected.crs = Some(Crs::TWD97_TM2);

        let err = compose_map(&projected, &config(tmp.path()), &ComposeOptions::default())
            .unwrap_err();
        assert!(matches!(err, GenerateError::NotGeographic { .. }));
    }

    #[test]
    fn regenerate_reads_boundary_geojson() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        dengue_map_geography::write_geojson(&layer(), &config.paths.district_boundaries_geojson())
            .unwrap();

        let report = regenerate(&config, &ComposeOptions::default()).unwrap();
        assert_eq!(report.feature_count, 2);
        assert!(config.paths.map_html().exists());
    }

    #[test]
    fn regenerate_without_boundaries_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let err = regenerate(&config(tmp.path()), &ComposeOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Geo(GeoError::FileNotFound { .. })
        ));
    }
}
