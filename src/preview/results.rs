//! Preview result types

use std::path::PathBuf;

/// What a preview resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewResult {
    /// Stream the file as-is
    File {
        file_path: PathBuf,
        content_type: String,
    },
    /// In-memory content generated from the file
    Content { body: String, content_type: String },
}

impl PreviewResult {
    pub fn content_type(&self) -> &str {
        match self {
            PreviewResult::File { content_type, .. } => content_type,
            PreviewResult::Content { content_type, .. } => content_type,
        }
    }
}
