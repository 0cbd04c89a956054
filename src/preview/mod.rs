//! Preview module
//!
//! Content-type detection and KML to GeoJSON conversion for file previews.

pub mod geojson;
pub mod kml;
mod operations;
mod results;

pub use operations::{DEFAULT_CONTENT_TYPE, GEOJSON_CONTENT_TYPE, content_type_for, preview};
pub use results::PreviewResult;
