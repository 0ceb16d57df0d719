//! Boundary file conversion to `GeoJSON`.

use std::path::Path;

use dengue_map_config::{CrsConfig, ensure_parent_dir};
use dengue_map_geography_models::{BoundingBox, Crs, LatLng};
use geojson::{Feature, FeatureCollection, JsonObject};

use crate::{FeatureLayer, GeoError, load_layer};

/// Number of features whose attributes are logged after loading.
const PREVIEW_FEATURES: usize = 3;

/// Coordinate systems used by [`convert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Assumed source CRS when the input does not declare one.
    pub input_crs: Crs,
    /// CRS of the written `GeoJSON`.
    pub output_crs: Crs,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self::from(&CrsConfig::default())
    }
}

impl From<&CrsConfig> for ConvertOptions {
    fn from(config: &CrsConfig) -> Self {
        Self {
            input_crs: config.input_crs,
            output_crs: config.output_crs,
        }
    }
}

/// Summary of a completed conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionReport {
    pub feature_count: usize,
    /// CRS of the written file.
    pub crs: Crs,
    /// Extent in output coordinates; `None` for an empty layer.
    pub bounding_box: Option<BoundingBox>,
    /// Mean feature centroid; `None` for an empty layer.
    pub center: Option<LatLng>,
    pub bytes_written: u64,
}

/// Converts a boundary file (shapefile or `GeoJSON`) to `GeoJSON` in
/// `options.output_crs`. The destination is overwritten.
///
/// # Errors
///
/// * [`GeoError::FileNotFound`] if `input` does not exist
/// * any loading, reprojection or write error
pub fn convert(
    input: &Path,
    output: &Path,
    options: &ConvertOptions,
) -> Result<ConversionReport, GeoError> {
    if !input.exists() {
        return Err(GeoError::FileNotFound {
            path: input.to_path_buf(),
        });
    }

    log::info!("Reading {}", input.display());
    let mut layer = load_layer(input)?;

    log::info!("Loaded {} features", layer.len());
    log::info!("Fields: {}", layer.schema.names().join(", "));
    for (i, feature) in layer.features.iter().take(PREVIEW_FEATURES).enumerate() {
        log::info!(
            "Feature {}: {}",
            i + 1,
            serde_json::Value::Object(layer.ordered_properties(feature))
        );
    }

    layer.normalize_crs(options.input_crs, options.output_crs)?;

    let bounding_box = layer.bounding_box()?;
    let center = layer.display_center()?;
    if let Some(bbox) = &bounding_box {
        log::info!("Bounds: {bbox}");
    }
    if let Some(center) = &center {
        log::info!("Center: {center}");
    }

    let bytes_written = write_geojson(&layer, output)?;
    log::info!(
        "Wrote {} features ({bytes_written} bytes) to {}",
        layer.len(),
        output.display()
    );

    Ok(ConversionReport {
        feature_count: layer.len(),
        crs: options.output_crs,
        bounding_box,
        center,
        bytes_written,
    })
}

/// Builds the `FeatureCollection` for a layer. Properties follow the
/// layer schema; a legacy `crs` member is added for non-WGS84 layers.
///
/// # Errors
///
/// Returns [`GeoError::UnknownCrs`] if the layer has no coordinate system.
pub fn to_feature_collection(layer: &FeatureLayer) -> Result<FeatureCollection, GeoError> {
    let crs = layer.crs.ok_or(GeoError::UnknownCrs)?;

    let features = layer
        .features
        .iter()
        .map(|feature| Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(
                &feature.geometry,
            ))),
            id: None,
            properties: Some(layer.ordered_properties(feature)),
            foreign_members: None,
        })
        .collect();

    let foreign_members = (!crs.is_wgs84()).then(|| {
        let mut members = JsonObject::new();
        members.insert(
            "crs".to_string(),
            serde_json::json!({
                "type": "name",
                "properties": { "name": crs.urn() }
            }),
        );
        members
    });

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members,
    })
}

/// Writes a layer as `GeoJSON`, creating parent directories. Returns the
/// number of bytes written.
///
/// # Errors
///
/// * [`GeoError::UnknownCrs`] if the layer has no coordinate system
/// * [`GeoError::Json`] or [`GeoError::Io`] if writing fails
pub fn write_geojson(layer: &FeatureLayer, path: &Path) -> Result<u64, GeoError> {
    let collection = to_feature_collection(layer)?;
    let bytes = serde_json::to_vec(&collection)?;

    ensure_parent_dir(path).map_err(|e| GeoError::io(path, e))?;
    std::fs::write(path, &bytes).map_err(|e| GeoError::io(path, e))?;

    Ok(bytes.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two squares around Tainan, written in TM2 zone 121 metres.
    fn tm2_fixture(dir: &Path) -> std::path::PathBuf {
        let to_tm2 = crate::reproject::Transformer::new(Crs::WGS84, Crs::TWD97_TM2).unwrap();
        let ring = |lng: f64, lat: f64| -> Vec<Vec<f64>> {
            [
                (lng, lat),
                (lng + 0.1, lat),
                (lng + 0.1, lat + 0.1),
                (lng, lat + 0.1),
                (lng, lat),
            ]
            .iter()
            .map(|&(x, y)| {
                let (px, py) = to_tm2.transform(x, y).unwrap();
                vec![px, py]
            })
            .collect()
        };

        let doc = serde_json::json!({
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::3826"}},
            "features": [
                {
                    "type": "Feature",
                    "properties": {"TOWNNAME": "安平區", "TOWNID": "D05"},
                    "geometry": {"type": "Polygon", "coordinates": [ring(120.15, 22.98)]}
                },
                {
                    "type": "Feature",
                    "properties": {"TOWNNAME": "中西區", "TOWNID": "D04"},
                    "geometry": {"type": "Polygon", "coordinates": [ring(120.19, 22.99)]}
                }
            ]
        });

        let path = dir.join("towns_tm2.geojson");
        std::fs::write(&path, doc.to_string()).unwrap();
        path
    }

    #[test]
    fn converts_tm2_to_wgs84() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tm2_fixture(tmp.path());
        let output = tmp.path().join("out/district_boundaries.geojson");

        let report = convert(&input, &output, &ConvertOptions::default()).unwrap();

        assert_eq!(report.feature_count, 2);
        assert_eq!(report.crs, Crs::WGS84);
        assert!(report.bytes_written > 0);
        let center = report.center.unwrap();
        assert!((center.lat - 23.035).abs() < 1e-3, "lat = {}", center.lat);
        assert!((center.lng - 120.22).abs() < 1e-3, "lng = {}", center.lng);

        let text = std::fs::read_to_string(&output).unwrap();
        assert!(!text.contains("\"crs\""));
        assert!(text.find("TOWNNAME").unwrap() < text.find("TOWNID").unwrap());
    }

    #[test]
    fn reload_preserves_count_and_center() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tm2_fixture(tmp.path());
        let output = tmp.path().join("district_boundaries.geojson");

        let report = convert(&input, &output, &ConvertOptions::default()).unwrap();
        let reloaded = load_layer(&output).unwrap();

        assert_eq!(reloaded.len(), report.feature_count);
        let center = reloaded.display_center().unwrap().unwrap();
        let expected = report.center.unwrap();
        assert!((center.lat - expected.lat).abs() < 1e-9);
        assert!((center.lng - expected.lng).abs() < 1e-9);
    }

    #[test]
    fn projected_output_carries_crs_member() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tm2_fixture(tmp.path());
        let wgs = tmp.path().join("wgs.geojson");
        let back = tmp.path().join("tm2.geojson");

        convert(&input, &wgs, &ConvertOptions::default()).unwrap();
        let report = convert(
            &wgs,
            &back,
            &ConvertOptions {
                input_crs: Crs::WGS84,
                output_crs: Crs::TWD97_TM2,
            },
        )
        .unwrap();
        assert_eq!(report.crs, Crs::TWD97_TM2);

        let reloaded = load_layer(&back).unwrap();
        assert_eq!(reloaded.crs, Some(Crs::TWD97_TM2));
    }

    #[test]
    fn missing_input_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let err = convert(
            &tmp.path().join("missing.shp"),
            &tmp.path().join("out.geojson"),
            &ConvertOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, GeoError::FileNotFound { .. }));
        assert!(!tmp.path().join("out.geojson").exists());
    }
}
