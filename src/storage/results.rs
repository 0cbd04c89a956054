//! Storage result types
//!
//! Defines result structures returned by storage operations.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A file directly inside a listed directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileItem {
    pub name: String,
    pub size: u64,
}

/// Aggregate counts for a directory listing (immediate children only)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingStats {
    pub directory_count: usize,
    pub file_count: usize,
    pub total_size: u64,
}

/// Result of a directory listing operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryListing {
    pub path: String,
    pub directories: Vec<String>,
    pub files: Vec<FileItem>,
    pub stats: ListingStats,
}

/// Result of preparing a download
#[derive(Debug, Clone)]
pub struct DownloadInfo {
    pub file_path: PathBuf,
    pub file_name: String,
}
