//! Search operations implementation

use log::{debug, info};
use walkdir::WalkDir;

use crate::error::StorageError;
use crate::search::results::{FoundDirectory, FoundFile, SearchResult};
use crate::storage::PathResolver;

/// Recursively searches the whole root for entries whose base name contains
/// `query`, ignoring case. An empty query matches every entry.
///
/// Symlinks are skipped, as in copy and zip. An unreadable entry fails the
/// whole search.
pub fn search(resolver: &PathResolver, query: &str) -> Result<SearchResult, StorageError> {
    let needle = query.to_lowercase();
    let mut result = SearchResult::default();

    for entry in WalkDir::new(resolver.root()).min_depth(1) {
        let entry = entry?;
        let file_type = entry.file_type();
        if file_type.is_symlink() {
            debug!("Search skipped symlink {}", entry.path().display());
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_lowercase();
        if !name.contains(&needle) {
            continue;
        }

        let Some(path) = resolver.relative_path(entry.path()) else {
            continue;
        };

        if file_type.is_dir() {
            result.directories.push(FoundDirectory { path });
        } else {
            let size = entry.metadata()?.len();
            result.files.push(FoundFile { path, size });
        }
    }

    info!(
        "Search for {:?} matched {} files and {} directories",
        query,
        result.files.len(),
        result.directories.len()
    );
    Ok(result)
}
