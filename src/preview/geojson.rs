//! GeoJSON output model
//!
//! Only the subset produced by the KML converter: a feature collection of
//! named features with Point, LineString or Polygon geometry.

use serde::Serialize;

/// A `[lon, lat]` position
pub type Position = [f64; 2];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    LineString(Vec<Position>),
    /// Rings in order; the converter only ever emits the exterior ring.
    Polygon(Vec<Vec<Position>>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Properties {
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    pub properties: Properties,
    pub geometry: Geometry,
}

impl Feature {
    pub fn new(name: Option<String>, geometry: Geometry) -> Self {
        Self {
            kind: "Feature",
            properties: Properties { name },
            geometry,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    kind: &'static str,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: "FeatureCollection",
            features,
        }
    }
}
