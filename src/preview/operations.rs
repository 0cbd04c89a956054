//! Preview operations
//!
//! Picks a content type for a file, converting KML to GeoJSON on the way.

use log::info;
use std::fs;
use std::path::Path;

use crate::error::{PreviewError, StorageError};
use crate::preview::kml::kml_to_geojson;
use crate::preview::results::PreviewResult;
use crate::storage::PathResolver;

pub const GEOJSON_CONTENT_TYPE: &str = "application/geo+json";
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Builds a preview for the file at `path`
pub fn preview(resolver: &PathResolver, path: &str) -> Result<PreviewResult, PreviewError> {
    let target = resolver.resolve(path)?;
    let real_path = target.as_path();
    if !real_path.is_file() {
        return Err(StorageError::NotFound(path.to_string()).into());
    }

    if is_kml(real_path) {
        let kml = fs::read_to_string(real_path)?;
        let body = kml_to_geojson(&kml)?;
        info!("Converted {} to GeoJSON ({} bytes)", target.relative(), body.len());
        return Ok(PreviewResult::Content {
            body,
            content_type: GEOJSON_CONTENT_TYPE.to_string(),
        });
    }

    let content_type = content_type_for(real_path);
    info!("Previewing {} as {}", target.relative(), content_type);
    Ok(PreviewResult::File {
        file_path: target.into_path_buf(),
        content_type,
    })
}

/// MIME type from the file extension, or `application/octet-stream`
pub fn content_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}

fn is_kml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("kml"))
}
