//! Archive operations
//!
//! Bundles files and directory trees into a zip archive held in memory.

use log::{debug, info, warn};
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Cursor, Seek, Write};
use std::path::Path;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{ArchiveError, StorageError};
use crate::storage::PathResolver;

/// Fastest deflate level; ratio does not matter for ad-hoc downloads.
const COMPRESSION_LEVEL: i64 = 1;

/// Builds a zip archive from the given root-relative paths.
///
/// Files become one entry each; directories contribute every file beneath them.
/// Entries are named by their root-relative path with `/` separators. The whole
/// archive is assembled in memory before it is returned.
pub fn zip_paths(resolver: &PathResolver, paths: &[String]) -> Result<Vec<u8>, ArchiveError> {
    if paths.is_empty() {
        return Err(StorageError::InvalidArgument("no paths selected for the archive".into()).into());
    }

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL));

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut added = HashSet::new();

    for relative in paths {
        let resolved = resolver.resolve(relative)?;
        let real_path = resolved.as_path();

        if real_path.is_file() {
            add_file(&mut writer, options, real_path, resolved.relative(), &mut added)?;
        } else if real_path.is_dir() {
            for entry in WalkDir::new(real_path).min_depth(1) {
                let entry = entry?;
                if !entry.file_type().is_file() {
                    if entry.file_type().is_symlink() {
                        warn!("Skipping symlink in archive: {}", entry.path().display());
                    }
                    continue;
                }
                let name = resolver.relative_path(entry.path()).ok_or_else(|| {
                    StorageError::InvalidPath(entry.path().display().to_string())
                })?;
                add_file(&mut writer, options, entry.path(), &name, &mut added)?;
            }
        } else {
            debug!("Archive selection {:?} does not exist, skipping", relative);
        }
    }

    let buffer = writer.finish()?.into_inner();
    info!(
        "Built archive with {} entries ({} bytes)",
        added.len(),
        buffer.len()
    );
    Ok(buffer)
}

fn add_file<W: Write + Seek>(
    writer: &mut ZipWriter<W>,
    options: SimpleFileOptions,
    path: &Path,
    entry_name: &str,
    added: &mut HashSet<String>,
) -> Result<(), ArchiveError> {
    if !added.insert(entry_name.to_string()) {
        return Ok(());
    }

    writer.start_file(entry_name, options)?;
    let mut source = File::open(path)?;
    io::copy(&mut source, writer)?;
    Ok(())
}
