#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! District boundary handling.
//!
//! Loads administrative boundaries from ESRI shapefiles or `GeoJSON`,
//! reprojects them between the coordinate systems used for Taiwanese data
//! (TWD97 TM2, WGS84, Web Mercator) and writes the WGS84 `GeoJSON` that the
//! map composer consumes.

pub mod convert;
pub mod layer;
pub mod prj;
pub mod reproject;

use std::path::PathBuf;

use dengue_map_geography_models::{Crs, SchemaConflict};
use thiserror::Error;

pub use convert::{ConversionReport, ConvertOptions, convert, write_geojson};
pub use layer::{FeatureLayer, LayerFeature, load_layer};

/// Errors that can occur during geometry operations.
#[derive(Debug, Error)]
pub enum GeoError {
    /// The input file does not exist.
    #[error("Input file not found: {}", path.display())]
    FileNotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// Reading or writing a file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The shapefile or its attribute table could not be read.
    #[error("Shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    /// The `GeoJSON` document is malformed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A coordinate could not be transformed.
    #[error("Projection error: {message}")]
    Projection {
        /// Description of what went wrong.
        message: String,
    },

    /// No projection definition is known for this CRS.
    #[error("Unsupported CRS: {crs}")]
    UnsupportedCrs { crs: Crs },

    /// The layer's coordinate system is not known.
    #[error("Layer has no coordinate reference system")]
    UnknownCrs,

    /// Attribute values disagree in type across features.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaConflict),

    /// Data conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

impl GeoError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
