#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Coordinate reference system, extent and attribute schema types.
//!
//! Shared by the geometry converter, the map composer and the
//! configuration layer. Nothing here touches geometry itself; see
//! `dengue_map_geography` for loading and reprojection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A coordinate reference system identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Crs {
    /// An EPSG registry code, e.g. `EPSG:3826` (TWD97 / TM2 zone 121).
    Epsg(u32),
}

impl Crs {
    /// WGS84 geographic coordinates (longitude/latitude in degrees).
    pub const WGS84: Self = Self::Epsg(4326);
    /// TWD97 / TM2 zone 121, the projection used by Taiwanese shapefiles.
    pub const TWD97_TM2: Self = Self::Epsg(3826);

    /// Returns the EPSG code.
    #[must_use]
    pub const fn epsg_code(self) -> u32 {
        match self {
            Self::Epsg(code) => code,
        }
    }

    /// Whether this is EPSG:4326.
    #[must_use]
    pub const fn is_wgs84(self) -> bool {
        self.epsg_code() == 4326
    }

    /// The OGC URN form used in the legacy `GeoJSON` `crs` member.
    #[must_use]
    pub fn urn(self) -> String {
        format!("urn:ogc:def:crs:EPSG::{}", self.epsg_code())
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg_code())
    }
}

/// Error returned when a CRS identifier cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized CRS identifier '{input}': expected EPSG:<code>")]
pub struct ParseCrsError {
    /// The rejected input.
    pub input: String,
}

impl FromStr for Crs {
    type Err = ParseCrsError;

    /// Accepts `EPSG:3826`, `epsg:3826`, `urn:ogc:def:crs:EPSG::3826`,
    /// `CRS84` URNs and bare codes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let upper = trimmed.to_ascii_uppercase();

        if upper.ends_with("CRS84") {
            return Ok(Self::WGS84);
        }

        let code = if upper.contains("EPSG") {
            upper.rsplit(':').next().unwrap_or_default()
        } else {
            upper.as_str()
        };

        code.trim()
            .parse::<u32>()
            .map(Self::Epsg)
            .map_err(|_| ParseCrsError {
                input: trimmed.to_string(),
            })
    }
}

impl TryFrom<String> for Crs {
    type Error = ParseCrsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.to_string()
    }
}

/// Axis-aligned extent in the coordinates of the layer it was computed
/// from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    #[must_use]
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Smallest box containing both boxes.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Midpoint as `(x, y)`.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.6}, {:.6}, {:.6}, {:.6}]",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

/// A map position in Leaflet's latitude, longitude order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether the latitude and longitude are within their valid ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

impl From<[f64; 2]> for LatLng {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self { lat, lng }
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.6}, {:.6}]", self.lat, self.lng)
    }
}

/// Value type of an attribute field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Number,
    Boolean,
    Date,
    /// Only null values have been seen so far.
    Unknown,
}

/// A named, typed attribute field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
}

/// A field whose values disagree in type across features.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field '{field}' mixes {existing:?} and {found:?} values")]
pub struct SchemaConflict {
    pub field: String,
    pub existing: FieldKind,
    pub found: FieldKind,
}

/// Ordered attribute schema of a feature layer.
///
/// Order is the order in which the source declares (or first uses) the
/// fields; tooltips and serialized properties follow it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    fields: Vec<FieldDef>,
}

impl FieldSchema {
    #[must_use]
    pub const fn new(fields: Vec<FieldDef>) -> Self {
        Self { fields }
    }

    /// Records an observed value kind for `name`.
    ///
    /// Unseen fields are appended. [`FieldKind::Unknown`] (a null value)
    /// never conflicts and is refined by the first concrete kind seen.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaConflict`] if a concrete kind disagrees with an
    /// earlier one.
    pub fn observe(&mut self, name: &str, kind: FieldKind) -> Result<(), SchemaConflict> {
        let Some(def) = self.fields.iter_mut().find(|f| f.name == name) else {
            self.fields.push(FieldDef {
                name: name.to_string(),
                kind,
            });
            return Ok(());
        };

        match (def.kind, kind) {
            (_, FieldKind::Unknown) => Ok(()),
            (FieldKind::Unknown, found) => {
                def.kind = found;
                Ok(())
            }
            (existing, found) if existing == found => Ok(()),
            (existing, found) => Err(SchemaConflict {
                field: name.to_string(),
                existing,
                found,
            }),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field names in schema order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_crs_forms() {
        assert_eq!("EPSG:3826".parse::<Crs>().unwrap(), Crs::TWD97_TM2);
        assert_eq!("epsg:4326".parse::<Crs>().unwrap(), Crs::WGS84);
        assert_eq!(
            "urn:ogc:def:crs:EPSG::3826".parse::<Crs>().unwrap(),
            Crs::Epsg(3826)
        );
        assert_eq!(
            "urn:ogc:def:crs:OGC:1.3:CRS84".parse::<Crs>().unwrap(),
            Crs::WGS84
        );
        assert_eq!(" 3857 ".parse::<Crs>().unwrap(), Crs::Epsg(3857));
        assert!("EPSG:abc".parse::<Crs>().is_err());
        assert!("WGS84".parse::<Crs>().is_err());
    }

    #[test]
    fn crs_display_and_urn() {
        assert_eq!(Crs::TWD97_TM2.to_string(), "EPSG:3826");
        assert_eq!(Crs::TWD97_TM2.urn(), "urn:ogc:def:crs:EPSG::3826");
    }

    #[test]
    fn bounding_box_union() {
        let a = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let b = BoundingBox::new(-1.0, 0.5, 0.5, 3.0);
        assert_eq!(a.union(b), BoundingBox::new(-1.0, 0.0, 1.0, 3.0));
        assert_eq!(a.center(), (0.5, 0.5));
    }

    #[test]
    fn schema_keeps_first_appearance_order() {
        let mut schema = FieldSchema::default();
        schema.observe("TOWNNAME", FieldKind::Text).unwrap();
        schema.observe("TOWNID", FieldKind::Text).unwrap();
        schema.observe("AREA", FieldKind::Unknown).unwrap();
        schema.observe("TOWNNAME", FieldKind::Text).unwrap();
        schema.observe("AREA", FieldKind::Number).unwrap();

        assert_eq!(schema.names(), vec!["TOWNNAME", "TOWNID", "AREA"]);
        assert_eq!(schema.get("AREA").unwrap().kind, FieldKind::Number);
    }

    #[test]
    fn schema_rejects_mixed_kinds() {
        let mut schema = FieldSchema::default();
        schema.observe("CODE", FieldKind::Number).unwrap();
        let err = schema.observe("CODE", FieldKind::Text).unwrap_err();
        assert_eq!(err.field, "CODE");
        assert_eq!(err.existing, FieldKind::Number);
        assert_eq!(err.found, FieldKind::Text);
    }
}
