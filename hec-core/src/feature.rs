//! Vector features read from GeoJSON.
//!
//! Network reaches and water-user polygons both arrive as feature
//! collections; only the geometry and the property map are kept.

use crate::Result;
use geo_types::Geometry;
use geojson::GeoJson;
use serde_json::{Map, Value};
use std::path::Path;

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Option<Geometry<f64>>,
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: Map::new(),
        }
    }

    /// A feature with attributes only.
    pub fn empty() -> Self {
        Self {
            geometry: None,
            properties: Map::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Integer value of an attribute.
    ///
    /// Shapefile-derived layers often store ids as doubles, so a float with no
    /// fractional part is accepted too.
    pub fn int_property(&self, key: &str) -> Option<i64> {
        match self.properties.get(key)? {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            }),
            _ => None,
        }
    }
}

/// Read every feature of a GeoJSON document, in document order.
///
/// A bare `Feature` is treated as a collection of one, a bare geometry as a
/// feature without properties.
pub fn read_features_str(geojson: &str) -> Result<Vec<Feature>> {
    let parsed: GeoJson = geojson.parse()?;
    let features = match parsed {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(g) => {
            return Ok(vec![Feature::new(Geometry::<f64>::try_from(g)?)]);
        }
    };

    let converted = features
        .into_iter()
        .map(|f| -> Result<Feature> {
            let geometry = f.geometry.map(Geometry::<f64>::try_from).transpose()?;
            Ok(Feature {
                geometry,
                properties: f.properties.unwrap_or_default(),
            })
        })
        .collect::<Result<Vec<Feature>>>()?;
    log::debug!("read {} features", converted.len());
    Ok(converted)
}

/// Read every feature of a GeoJSON file.
pub fn read_features<P: AsRef<Path>>(path: P) -> Result<Vec<Feature>> {
    let text = std::fs::read_to_string(path.as_ref())?;
    log::info!("reading features from {}", path.as_ref().display());
    read_features_str(&text)
}
