//! In-memory feature layers and the readers that produce them.

use std::path::{Path, PathBuf};

use dengue_map_geography_models::{BoundingBox, Crs, FieldDef, FieldKind, FieldSchema, LatLng};
use geo::{BoundingRect, Centroid};
use geojson::{GeoJson, JsonObject, JsonValue};
use shapefile::dbase::{self, FieldType, FieldValue};

use crate::{GeoError, prj};

/// A single boundary feature.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerFeature {
    pub geometry: geo::Geometry<f64>,
    /// Attribute values keyed by field name.
    pub properties: JsonObject,
}

/// A set of features sharing one attribute schema and coordinate system.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureLayer {
    /// `None` when the source did not declare a coordinate system.
    pub crs: Option<Crs>,
    pub schema: FieldSchema,
    pub features: Vec<LayerFeature>,
}

impl FeatureLayer {
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    fn require_crs(&self) -> Result<Crs, GeoError> {
        self.crs.ok_or(GeoError::UnknownCrs)
    }

    /// Extent of all features in the layer's coordinates, or `None` for an
    /// empty layer.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::UnknownCrs`] if the layer has no coordinate
    /// system.
    pub fn bounding_box(&self) -> Result<Option<BoundingBox>, GeoError> {
        self.require_crs()?;

        Ok(self
            .features
            .iter()
            .filter_map(|f| f.geometry.bounding_rect())
            .map(|r| BoundingBox::new(r.min().x, r.min().y, r.max().x, r.max().y))
            .reduce(BoundingBox::union))
    }

    /// Mean of the per-feature centroids as a map position (y is read as
    /// latitude, x as longitude), or `None` for an empty layer.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::UnknownCrs`] if the layer has no coordinate
    /// system.
    pub fn display_center(&self) -> Result<Option<LatLng>, GeoError> {
        self.require_crs()?;

        let centroids: Vec<geo::Point<f64>> = self
            .features
            .iter()
            .filter_map(|f| f.geometry.centroid())
            .collect();

        if centroids.is_empty() {
            return Ok(None);
        }

        #[allow(clippy::cast_precision_loss)]
        let n = centroids.len() as f64;
        let (sum_x, sum_y) = centroids
            .iter()
            .fold((0.0, 0.0), |(x, y), p| (x + p.x(), y + p.y()));

        Ok(Some(LatLng::new(sum_y / n, sum_x / n)))
    }

    /// Properties of `feature` ordered by the layer schema. Fields a
    /// feature lacks are omitted.
    #[must_use]
    pub fn ordered_properties(&self, feature: &LayerFeature) -> JsonObject {
        let mut ordered = JsonObject::new();
        for def in self.schema.iter() {
            if let Some(value) = feature.properties.get(&def.name) {
                ordered.insert(def.name.clone(), value.clone());
            }
        }
        ordered
    }
}

/// Loads a boundary layer, choosing the reader by file extension.
///
/// `.shp` and `.shx` are read as ESRI shapefiles (attributes from the
/// sibling `.dbf`, CRS from `.prj`); `.geojson` and `.json` as `GeoJSON`.
///
/// # Errors
///
/// * [`GeoError::FileNotFound`] if `path` does not exist
/// * [`GeoError::Conversion`] for an unsupported extension
/// * reader errors ([`GeoError::Shapefile`], [`GeoError::GeoJson`],
///   [`GeoError::Schema`], [`GeoError::Io`])
pub fn load_layer(path: &Path) -> Result<FeatureLayer, GeoError> {
    if !path.exists() {
        return Err(GeoError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "shp" => load_shapefile(path),
        "shx" => load_shapefile(&path.with_extension("shp")),
        "geojson" | "json" => load_geojson(path),
        other => Err(GeoError::Conversion {
            message: format!(
                "Unsupported boundary format '.{other}' for {}",
                path.display()
            ),
        }),
    }
}

const fn field_kind(field_type: FieldType) -> FieldKind {
    #[allow(unreachable_patterns)]
    match field_type {
        FieldType::Character | FieldType::Memo => FieldKind::Text,
        FieldType::Numeric
        | FieldType::Float
        | FieldType::Integer
        | FieldType::Double
        | FieldType::Currency => FieldKind::Number,
        FieldType::Logical => FieldKind::Boolean,
        FieldType::Date | FieldType::DateTime => FieldKind::Date,
        _ => FieldKind::Unknown,
    }
}

fn field_json(value: &FieldValue) -> JsonValue {
    match value {
        FieldValue::Character(Some(s)) | FieldValue::Memo(s) => {
            JsonValue::String(s.trim_end().to_string())
        }
        FieldValue::Numeric(Some(n)) => number_json(*n),
        FieldValue::Float(Some(n)) => number_json(f64::from(*n)),
        FieldValue::Double(n) | FieldValue::Currency(n) => number_json(*n),
        FieldValue::Integer(n) => JsonValue::from(*n),
        FieldValue::Logical(Some(b)) => JsonValue::Bool(*b),
        FieldValue::Date(Some(d)) => {
            JsonValue::String(format!("{:04}-{:02}-{:02}", d.year(), d.month(), d.day()))
        }
        FieldValue::Character(None)
        | FieldValue::Numeric(None)
        | FieldValue::Float(None)
        | FieldValue::Logical(None)
        | FieldValue::Date(None) => JsonValue::Null,
        other => JsonValue::String(format!("{other:?}")),
    }
}

/// Whole numbers are written as integers so codes like `TOWNCODE` stay
/// readable.
#[allow(clippy::cast_possible_truncation)]
fn number_json(n: f64) -> JsonValue {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        JsonValue::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(JsonValue::Null, JsonValue::Number)
    }
}

fn read_prj(shp_path: &Path) -> Result<Option<Crs>, GeoError> {
    let prj_path = shp_path.with_extension("prj");
    if !prj_path.exists() {
        log::warn!("No .prj next to {}; CRS unknown", shp_path.display());
        return Ok(None);
    }

    let wkt = std::fs::read_to_string(&prj_path).map_err(|e| GeoError::io(&prj_path, e))?;
    let crs = prj::detect_crs(&wkt);
    match crs {
        Some(crs) => log::debug!("{} declares {crs}", prj_path.display()),
        None => log::warn!(
            "Unrecognized projection in {}; treating CRS as unknown",
            prj_path.display()
        ),
    }
    Ok(crs)
}

fn load_shapefile(shp_path: &Path) -> Result<FeatureLayer, GeoError> {
    if !shp_path.exists() {
        return Err(GeoError::FileNotFound {
            path: shp_path.to_path_buf(),
        });
    }

    let dbf_path: PathBuf = shp_path.with_extension("dbf");
    let schema = {
        let table = dbase::Reader::from_path(&dbf_path)
            .map_err(shapefile::Error::from)?;
        FieldSchema::new(
            table
                .fields()
                .iter()
                .filter(|f| f.name() != "DeletionFlag")
                .map(|f| FieldDef {
                    name: f.name().to_string(),
                    kind: field_kind(f.field_type()),
                })
                .collect(),
        )
    };

    let crs = read_prj(shp_path)?;
    let names: Vec<String> = schema.names().into_iter().map(str::to_string).collect();

    let mut reader = shapefile::Reader::from_path(shp_path)?;
    let mut features = Vec::new();
    for (index, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result?;

        let geometry = match geo::Geometry::<f64>::try_from(shape) {
            Ok(geometry) => geometry,
            Err(e) => {
                log::warn!("Skipping shape #{index} in {}: {e:?}", shp_path.display());
                continue;
            }
        };

        let mut properties = JsonObject::new();
        for name in &names {
            let value = record.get(name).map_or(JsonValue::Null, field_json);
            properties.insert(name.clone(), value);
        }

        features.push(LayerFeature {
            geometry,
            properties,
        });
    }

    log::info!(
        "Read {} features from {}",
        features.len(),
        shp_path.display()
    );

    Ok(FeatureLayer {
        crs,
        schema,
        features,
    })
}

fn json_kind(value: &JsonValue) -> FieldKind {
    match value {
        JsonValue::Null => FieldKind::Unknown,
        JsonValue::Bool(_) => FieldKind::Boolean,
        JsonValue::Number(_) => FieldKind::Number,
        JsonValue::String(_) | JsonValue::Array(_) | JsonValue::Object(_) => FieldKind::Text,
    }
}

/// Reads the legacy `crs` member (`{"type":"name","properties":{"name":..}}`).
fn legacy_crs(foreign_members: Option<&JsonObject>) -> Option<Crs> {
    let member = foreign_members?.get("crs")?;
    let name = member.get("properties")?.get("name")?.as_str()?;
    match name.parse() {
        Ok(crs) => Some(crs),
        Err(e) => {
            log::warn!("Ignoring GeoJSON crs member: {e}");
            None
        }
    }
}

fn parse_geojson(text: &str) -> Result<FeatureLayer, GeoError> {
    let (crs, raw_features) = match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(fc) => (
            legacy_crs(fc.foreign_members.as_ref()).unwrap_or(Crs::WGS84),
            fc.features,
        ),
        GeoJson::Feature(feature) => (
            legacy_crs(feature.foreign_members.as_ref()).unwrap_or(Crs::WGS84),
            vec![feature],
        ),
        GeoJson::Geometry(geometry) => (
            legacy_crs(geometry.foreign_members.as_ref()).unwrap_or(Crs::WGS84),
            vec![geojson::Feature {
                bbox: None,
                geometry: Some(geometry),
                id: None,
                properties: None,
                foreign_members: None,
            }],
        ),
    };

    let mut schema = FieldSchema::default();
    let mut features = Vec::with_capacity(raw_features.len());

    for (index, feature) in raw_features.into_iter().enumerate() {
        let Some(geometry) = feature.geometry else {
            log::warn!("Skipping feature #{index}: no geometry");
            continue;
        };
        let geometry = match geo::Geometry::<f64>::try_from(geometry.value) {
            Ok(geometry) => geometry,
            Err(e) => {
                log::warn!("Skipping feature #{index}: {e}");
                continue;
            }
        };

        let properties = feature.properties.unwrap_or_default();
        for (name, value) in &properties {
            schema.observe(name, json_kind(value))?;
        }

        features.push(LayerFeature {
            geometry,
            properties,
        });
    }

    Ok(FeatureLayer {
        crs: Some(crs),
        schema,
        features,
    })
}

fn load_geojson(path: &Path) -> Result<FeatureLayer, GeoError> {
    let text = std::fs::read_to_string(path).map_err(|e| GeoError::io(path, e))?;
    let layer = parse_geojson(&text)?;
    log::info!("Read {} features from {}", layer.len(), path.display());
    Ok(layer)
}
