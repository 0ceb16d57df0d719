//! Coordinate transformation between the supported reference systems.

use dengue_map_geography_models::Crs;
use geo::MapCoords;
use proj4rs::proj::Proj;

use crate::{FeatureLayer, GeoError};

/// Returns the proj definition for a supported EPSG code.
///
/// # Errors
///
/// Returns [`GeoError::UnsupportedCrs`] for codes outside the built-in
/// table.
pub fn proj_definition(crs: Crs) -> Result<&'static str, GeoError> {
    Ok(match crs.epsg_code() {
        4326 => "+proj=longlat +datum=WGS84 +no_defs",
        3857 => {
            "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs"
        }
        3824 => "+proj=longlat +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +no_defs",
        3825 => {
            "+proj=tmerc +lat_0=0 +lon_0=119 +k=0.9999 +x_0=250000 +y_0=0 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs"
        }
        3826 => {
            "+proj=tmerc +lat_0=0 +lon_0=121 +k=0.9999 +x_0=250000 +y_0=0 +ellps=GRS80 +towgs84=0,0,0,0,0,0,0 +units=m +no_defs"
        }
        _ => return Err(GeoError::UnsupportedCrs { crs }),
    })
}

fn build_proj(crs: Crs) -> Result<Proj, GeoError> {
    Proj::from_proj_string(proj_definition(crs)?).map_err(|e| GeoError::Projection {
        message: format!("{crs}: {e}"),
    })
}

/// A reusable transformation from one CRS to another.
pub struct Transformer {
    source: Proj,
    target: Proj,
}

impl Transformer {
    /// # Errors
    ///
    /// Returns [`GeoError::UnsupportedCrs`] or [`GeoError::Projection`] if
    /// either end cannot be set up.
    pub fn new(source: Crs, target: Crs) -> Result<Self, GeoError> {
        Ok(Self {
            source: build_proj(source)?,
            target: build_proj(target)?,
        })
    }

    /// Transforms a single `(x, y)` pair. Geographic systems use degrees.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::Projection`] if the point cannot be transformed.
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64), GeoError> {
        let mut point = if self.source.is_latlong() {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };

        proj4rs::transform::transform(&self.source, &self.target, &mut point).map_err(|e| {
            GeoError::Projection {
                message: format!("({x}, {y}): {e}"),
            }
        })?;

        if self.target.is_latlong() {
            Ok((point.0.to_degrees(), point.1.to_degrees()))
        } else {
            Ok((point.0, point.1))
        }
    }

    /// Transforms every coordinate of a geometry.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::Projection`] on the first coordinate that fails.
    pub fn transform_geometry(
        &self,
        geometry: &geo::Geometry<f64>,
    ) -> Result<geo::Geometry<f64>, GeoError> {
        geometry.try_map_coords(|coord| {
            let (x, y) = self.transform(coord.x, coord.y)?;
            Ok(geo::Coord { x, y })
        })
    }
}

impl FeatureLayer {
    /// Brings the layer into `target`.
    ///
    /// A layer without an embedded CRS is assumed to be in
    /// `default_source`. Coordinates are only touched when the source and
    /// target differ.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::UnsupportedCrs`] or [`GeoError::Projection`] if
    /// reprojection fails.
    pub fn normalize_crs(&mut self, default_source: Crs, target: Crs) -> Result<(), GeoError> {
        let source = if let Some(crs) = self.crs {
            if crs != default_source {
                log::debug!("Using embedded {crs} instead of assumed {default_source}");
            }
            crs
        } else {
            log::info!("No CRS declared, assuming {default_source}");
            default_source
        };

        if source == target {
            self.crs = Some(target);
            return Ok(());
        }

        log::info!("Reprojecting {} features: {source} -> {target}", self.len());
        let transformer = Transformer::new(source, target)?;
        for feature in &mut self.features {
            feature.geometry = transformer.transform_geometry(&feature.geometry)?;
        }
        self.crs = Some(target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use geo::{Geometry, Point};

    use super::*;
    use crate::LayerFeature;

    #[test]
    fn tm2_origin_maps_to_central_meridian() {
        let t = Transformer::new(Crs::TWD97_TM2, Crs::WGS84).unwrap();
        let (lng, lat) = t.transform(250_000.0, 0.0).unwrap();
        assert!((lng - 121.0).abs() < 1e-6, "lng = {lng}");
        assert!(lat.abs() < 1e-6, "lat = {lat}");
    }

    #[test]
    fn tainan_round_trips_through_tm2() {
        let forward = Transformer::new(Crs::WGS84, Crs::TWD97_TM2).unwrap();
        let back = Transformer::new(Crs::TWD97_TM2, Crs::WGS84).unwrap();

        let (x, y) = forward.transform(120.2, 23.0).unwrap();
        assert!(x > 100_000.0 && x < 250_000.0, "x = {x}");
        assert!(y > 2_500_000.0 && y < 2_600_000.0, "y = {y}");

        let (lng, lat) = back.transform(x, y).unwrap();
        assert!((lng - 120.2).abs() < 1e-5);
        assert!((lat - 23.0).abs() < 1e-5);
    }

    #[test]
    fn unsupported_code_is_rejected() {
        assert!(matches!(
            proj_definition(Crs::Epsg(2154)),
            Err(GeoError::UnsupportedCrs { .. })
        ));
    }

    fn point_layer(crs: Option<Crs>, x: f64, y: f64) -> FeatureLayer {
        FeatureLayer {
            crs,
            features: vec![LayerFeature {
                geometry: Geometry::Point(Point::new(x, y)),
                properties: geojson::JsonObject::new(),
            }],
            ..FeatureLayer::default()
        }
    }

    #[test]
    fn missing_crs_uses_default_source() {
        let mut layer = point_layer(None, 250_000.0, 0.0);
        layer.normalize_crs(Crs::TWD97_TM2, Crs::WGS84).unwrap();
        assert_eq!(layer.crs, Some(Crs::WGS84));

        let Geometry::Point(p) = layer.features[0].geometry else {
            panic!("expected point");
        };
        assert!((p.x() - 121.0).abs() < 1e-6);
    }

    #[test]
    fn embedded_crs_overrides_default_source() {
        let mut layer = point_layer(Some(Crs::WGS84), 120.2, 23.0);
        layer.normalize_crs(Crs::TWD97_TM2, Crs::WGS84).unwrap();
        assert_eq!(
            layer.features[0].geometry,
            Geometry::Point(Point::new(120.2, 23.0))
        );
    }
}
