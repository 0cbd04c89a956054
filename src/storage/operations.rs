//! Storage operations
//!
//! Handles file system operations for explorer commands including list,
//! download, upload, create, delete, move and copy.

use log::{debug, info, warn};
use std::fs::{self, Metadata};
use std::io::{self, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::error::StorageError;
use crate::storage::resolver::{PathResolver, ResolvedPath, sanitize_file_name};
use crate::storage::results::{DirectoryListing, DownloadInfo, FileItem, ListingStats};

/// Lists the immediate children of a directory
pub fn list_directory(resolver: &PathResolver, path: &str) -> Result<DirectoryListing, StorageError> {
    let target = resolver.resolve(path)?;
    if !target.as_path().is_dir() {
        return Err(StorageError::NotFound(path.to_string()));
    }

    let mut directories = Vec::new();
    let mut files = Vec::new();

    for entry in fs::read_dir(target.as_path())? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();

        let Some(metadata) = listed_metadata(resolver, &entry.path())? else {
            continue;
        };

        if metadata.is_dir() {
            directories.push(name);
        } else {
            files.push(FileItem {
                name,
                size: metadata.len(),
            });
        }
    }

    directories.sort();
    files.sort_by(|a, b| a.name.cmp(&b.name));

    let stats = ListingStats {
        directory_count: directories.len(),
        file_count: files.len(),
        total_size: files.iter().map(|f| f.size).sum(),
    };

    info!(
        "Listed directory {:?} (real: {}) - {} directories, {} files",
        path,
        target.as_path().display(),
        stats.directory_count,
        stats.file_count
    );

    Ok(DirectoryListing {
        path: path.to_string(),
        directories,
        files,
        stats,
    })
}

/// Metadata shown for a listing entry.
///
/// Symlinks are described by their target, but only when the target resolves
/// inside the root; links leading elsewhere or nowhere are left out.
fn listed_metadata(resolver: &PathResolver, path: &Path) -> Result<Option<Metadata>, StorageError> {
    let metadata = fs::symlink_metadata(path)?;
    if !metadata.file_type().is_symlink() {
        return Ok(Some(metadata));
    }

    let target = match fs::canonicalize(path) {
        Ok(target) => target,
        Err(e) => {
            debug!("Skipping dangling link {}: {}", path.display(), e);
            return Ok(None);
        }
    };
    if resolver.relative_path(&target).is_none() {
        debug!("Skipping link leading outside the root: {}", path.display());
        return Ok(None);
    }
    Ok(Some(fs::metadata(&target)?))
}

/// Prepares for file retrieval
pub fn prepare_download(resolver: &PathResolver, path: &str) -> Result<DownloadInfo, StorageError> {
    let target = resolver.resolve(path)?;
    if !target.as_path().is_file() {
        return Err(StorageError::NotFound(path.to_string()));
    }

    let file_name = target
        .as_path()
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    info!(
        "Prepared download of {:?} (real: {})",
        path,
        target.as_path().display()
    );

    Ok(DownloadInfo {
        file_path: target.into_path_buf(),
        file_name,
    })
}

/// Prepares for file storage: the folder must exist, the name is reduced to its
/// base name and the destination must not be a directory.
pub fn prepare_upload(
    resolver: &PathResolver,
    folder: &str,
    file_name: &str,
) -> Result<ResolvedPath, StorageError> {
    let folder_path = resolver.resolve(folder)?;
    if !folder_path.as_path().is_dir() {
        return Err(StorageError::NotFound(folder.to_string()));
    }

    let name = sanitize_file_name(file_name)?;
    let target = resolver.resolve(&join_relative(folder_path.relative(), &name))?;
    if target.as_path().is_dir() {
        return Err(StorageError::Conflict(format!(
            "{} is a directory",
            target.relative()
        )));
    }

    Ok(target)
}

/// Writes `reader` to `file_name` inside `folder`, replacing any existing file.
///
/// Data goes to an anonymous temporary file in the same folder and is renamed
/// into place once complete, so a failed upload never leaves a truncated
/// destination. The temporary file is removed if anything fails.
pub fn upload_file<R: Read>(
    resolver: &PathResolver,
    folder: &str,
    file_name: &str,
    reader: &mut R,
) -> Result<u64, StorageError> {
    let target = prepare_upload(resolver, folder, file_name)?;
    let final_path = target.as_path();
    let parent = final_path
        .parent()
        .ok_or_else(|| StorageError::InvalidPath(target.relative().to_string()))?;

    let mut temp = NamedTempFile::new_in(parent)?;
    let written = io::copy(reader, temp.as_file_mut())?;
    temp.as_file_mut().flush()?;
    temp.as_file().sync_all()?;
    temp.persist(final_path).map_err(|e| StorageError::IoError(e.error))?;

    info!(
        "Stored {} bytes to {} (real: {})",
        written,
        target.relative(),
        final_path.display()
    );
    Ok(written)
}

/// Creates a directory and any missing ancestors
pub fn create_directory(resolver: &PathResolver, path: &str) -> Result<(), StorageError> {
    let target = resolver.resolve(path)?;
    if target.as_path().is_file() {
        return Err(StorageError::Conflict(format!(
            "a file already exists at {}",
            path
        )));
    }

    fs::create_dir_all(target.as_path())?;
    info!(
        "Created directory {:?} (real: {})",
        path,
        target.as_path().display()
    );
    Ok(())
}

/// Deletes a file, or a directory together with its contents.
///
/// A symlink is removed as a link; its target is left alone.
pub fn delete_path(resolver: &PathResolver, path: &str) -> Result<(), StorageError> {
    let target = resolver.resolve_entry(path)?;
    if target.is_root() {
        return Err(StorageError::InvalidArgument(
            "the root directory cannot be deleted".into(),
        ));
    }

    let real_path = target.as_path();
    let metadata = entry_metadata(real_path, path)?;
    if metadata.file_type().is_symlink() {
        remove_link(real_path)?;
    } else if metadata.is_dir() {
        fs::remove_dir_all(real_path)?;
    } else {
        fs::remove_file(real_path)?;
    }

    info!("Deleted {:?} (real: {})", path, real_path.display());
    Ok(())
}

/// Metadata of the entry itself, without following a final symlink
fn entry_metadata(path: &Path, relative: &str) -> Result<Metadata, StorageError> {
    match fs::symlink_metadata(path) {
        Ok(metadata) => Ok(metadata),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(StorageError::NotFound(relative.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(windows)]
fn remove_link(path: &Path) -> io::Result<()> {
    // directory links are removed as directories on Windows
    fs::remove_file(path).or_else(|_| fs::remove_dir(path))
}

#[cfg(not(windows))]
fn remove_link(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransferKind {
    Move,
    Copy,
}

/// Moves a file or directory, overwriting an existing destination file
pub fn move_path(resolver: &PathResolver, from: &str, to: &str) -> Result<(), StorageError> {
    transfer_path(resolver, from, to, TransferKind::Move)
}

/// Copies a file or directory tree, overwriting existing destination files
pub fn copy_path(resolver: &PathResolver, from: &str, to: &str) -> Result<(), StorageError> {
    transfer_path(resolver, from, to, TransferKind::Copy)
}

fn transfer_path(
    resolver: &PathResolver,
    from: &str,
    to: &str,
    kind: TransferKind,
) -> Result<(), StorageError> {
    // a move renames the named entry; a copy reads through links to the content
    let source = match kind {
        TransferKind::Move => resolver.resolve_entry(from)?,
        TransferKind::Copy => resolver.resolve(from)?,
    };
    let dest = resolver.resolve(to)?;

    if source.is_root() {
        return Err(StorageError::InvalidArgument(
            "the root directory cannot be moved or copied".into(),
        ));
    }
    if source == dest {
        return Err(StorageError::InvalidArgument(format!(
            "source and destination are the same: {}",
            source.relative()
        )));
    }

    let source_path = source.as_path();
    let dest_path = dest.as_path();
    let metadata = entry_metadata(source_path, from)?;

    if metadata.file_type().is_symlink() || metadata.is_file() {
        if dest_path.is_dir() {
            return Err(StorageError::Conflict(format!(
                "destination {} is a directory",
                dest.relative()
            )));
        }
        create_parent(dest_path)?;
        match kind {
            TransferKind::Move => fs::rename(source_path, dest_path)?,
            TransferKind::Copy => {
                fs::copy(source_path, dest_path)?;
            }
        }
    } else if metadata.is_dir() {
        if dest_path.is_file() {
            return Err(StorageError::Conflict(format!(
                "destination {} is a file",
                dest.relative()
            )));
        }
        if dest_path.starts_with(source_path) {
            return Err(StorageError::InvalidArgument(format!(
                "cannot place {} inside itself",
                source.relative()
            )));
        }
        create_parent(dest_path)?;
        match kind {
            TransferKind::Move => fs::rename(source_path, dest_path)?,
            TransferKind::Copy => {
                let copied = copy_directory(source_path, dest_path)?;
                debug!("Copied {} files from {}", copied, source.relative());
            }
        }
    } else {
        return Err(StorageError::NotFound(from.to_string()));
    }

    info!(
        "{:?} {} -> {} (real: {} -> {})",
        kind,
        source.relative(),
        dest.relative(),
        source_path.display(),
        dest_path.display()
    );
    Ok(())
}

fn create_parent(path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Depth-first copy of a directory tree; returns the number of files copied.
fn copy_directory(source: &Path, dest: &Path) -> Result<u64, StorageError> {
    fs::create_dir_all(dest)?;
    let mut copied = 0;

    for entry in WalkDir::new(source).min_depth(1) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|_| StorageError::InvalidPath(entry.path().display().to_string()))?;
        let target = dest.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        } else {
            // symlinks could point outside the root; their targets are not copied
            warn!("Skipping symlink during copy: {}", entry.path().display());
        }
    }

    Ok(copied)
}

fn join_relative(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", base, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathResolver) {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("root.txt"), "root").unwrap();
        fs::write(root.join("sub/a.txt"), "hello").unwrap();
        let resolver = PathResolver::new(root).unwrap();
        (temp_dir, resolver)
    }

    #[test]
    fn test_list_root() {
        let (_tmp, resolver) = setup();
        let listing = list_directory(&resolver, "").unwrap();

        assert_eq!(listing.path, "");
        assert_eq!(listing.directories, vec!["sub".to_string()]);
        assert_eq!(
            listing.files,
            vec![FileItem {
                name: "root.txt".into(),
                size: 4
            }]
        );
        assert_eq!(
            listing.stats,
            ListingStats {
                directory_count: 1,
                file_count: 1,
                total_size: 4
            }
        );
    }

    #[test]
    fn test_list_stats_are_not_recursive() {
        let (_tmp, resolver) = setup();
        fs::create_dir_all(resolver.root().join("sub/deeper")).unwrap();
        fs::write(resolver.root().join("sub/deeper/big.bin"), vec![0u8; 1024]).unwrap();

        let listing = list_directory(&resolver, "sub").unwrap();
        assert_eq!(listing.directories, vec!["deeper".to_string()]);
        assert_eq!(listing.stats.total_size, 5);
    }

    #[test]
    fn test_list_missing_or_file_is_not_found() {
        let (_tmp, resolver) = setup();
        assert!(matches!(
            list_directory(&resolver, "missing"),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            list_directory(&resolver, "root.txt"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_outside_root_is_invalid_path() {
        let (_tmp, resolver) = setup();
        assert!(matches!(
            list_directory(&resolver, "../"),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_prepare_download() {
        let (_tmp, resolver) = setup();
        let info = prepare_download(&resolver, "sub/a.txt").unwrap();
        assert_eq!(info.file_name, "a.txt");
        assert_eq!(fs::read_to_string(info.file_path).unwrap(), "hello");

        assert!(matches!(
            prepare_download(&resolver, "sub"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_upload_writes_and_overwrites() {
        let (_tmp, resolver) = setup();
        let written = upload_file(&resolver, "sub", "new.txt", &mut Cursor::new(b"first")).unwrap();
        assert_eq!(written, 5);
        upload_file(&resolver, "sub", "new.txt", &mut Cursor::new(b"second")).unwrap();

        let content = fs::read_to_string(resolver.root().join("sub/new.txt")).unwrap();
        assert_eq!(content, "second");
        assert_eq!(fs::read_dir(resolver.root().join("sub")).unwrap().count(), 2);
    }

    #[test]
    fn test_upload_leaves_similarly_named_files_alone() {
        let (_tmp, resolver) = setup();
        let bystander = resolver.root().join(".a.txt.upload");
        fs::write(&bystander, "keep me").unwrap();

        upload_file(&resolver, "", "a.txt", &mut Cursor::new(b"new")).unwrap();

        assert_eq!(fs::read_to_string(&bystander).unwrap(), "keep me");
        assert_eq!(fs::read_to_string(resolver.root().join("a.txt")).unwrap(), "new");
    }

    #[test]
    fn test_upload_accepts_long_file_name() {
        let (_tmp, resolver) = setup();
        let name = format!("{}.txt", "n".repeat(246));
        assert_eq!(name.len(), 250);

        upload_file(&resolver, "sub", &name, &mut Cursor::new(b"long")).unwrap();
        assert!(resolver.root().join("sub").join(&name).is_file());
    }

    #[test]
    fn test_failed_upload_leaves_no_temporary_file() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("connection reset"))
            }
        }

        let (_tmp, resolver) = setup();
        assert!(upload_file(&resolver, "sub", "a.txt", &mut Broken).is_err());

        let names: Vec<_> = fs::read_dir(resolver.root().join("sub"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.txt"]);
        assert_eq!(fs::read_to_string(resolver.root().join("sub/a.txt")).unwrap(), "hello");
    }

    #[test]
    fn test_upload_strips_directory_from_file_name() {
        let (_tmp, resolver) = setup();
        upload_file(&resolver, "sub", "../../evil.txt", &mut Cursor::new(b"x")).unwrap();

        assert!(resolver.root().join("sub/evil.txt").is_file());
        assert!(!resolver.root().join("evil.txt").exists());
    }

    #[test]
    fn test_upload_to_missing_folder_is_not_found() {
        let (_tmp, resolver) = setup();
        let result = upload_file(&resolver, "nope", "a.txt", &mut Cursor::new(b"x"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_create_directory() {
        let (_tmp, resolver) = setup();
        create_directory(&resolver, "one/two/three").unwrap();
        assert!(resolver.root().join("one/two/three").is_dir());

        // existing directory is fine
        create_directory(&resolver, "one").unwrap();
    }

    #[test]
    fn test_create_directory_over_file_conflicts() {
        let (_tmp, resolver) = setup();
        assert!(matches!(
            create_directory(&resolver, "root.txt"),
            Err(StorageError::Conflict(_))
        ));
    }

    #[test]
    fn test_delete_file_and_directory() {
        let (_tmp, resolver) = setup();
        delete_path(&resolver, "root.txt").unwrap();
        assert!(!resolver.root().join("root.txt").exists());

        delete_path(&resolver, "sub").unwrap();
        assert!(!resolver.root().join("sub").exists());
    }

    #[test]
    fn test_delete_twice_is_not_found() {
        let (_tmp, resolver) = setup();
        delete_path(&resolver, "sub/a.txt").unwrap();
        assert!(matches!(
            delete_path(&resolver, "sub/a.txt"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_root_rejected() {
        let (_tmp, resolver) = setup();
        assert!(matches!(
            delete_path(&resolver, ""),
            Err(StorageError::InvalidArgument(_))
        ));
        assert!(resolver.root().join("root.txt").exists());
    }

    #[test]
    fn test_move_renames_file() {
        let (_tmp, resolver) = setup();
        move_path(&resolver, "sub/a.txt", "sub/b.txt").unwrap();

        let listing = list_directory(&resolver, "sub").unwrap();
        let names: Vec<_> = listing.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b.txt"]);
    }

    #[test]
    fn test_move_creates_destination_parent() {
        let (_tmp, resolver) = setup();
        move_path(&resolver, "root.txt", "archive/2024/root.txt").unwrap();
        assert!(resolver.root().join("archive/2024/root.txt").is_file());
    }

    #[test]
    fn test_move_overwrites_existing_file() {
        let (_tmp, resolver) = setup();
        move_path(&resolver, "root.txt", "sub/a.txt").unwrap();
        let content = fs::read_to_string(resolver.root().join("sub/a.txt")).unwrap();
        assert_eq!(content, "root");
    }

    #[test]
    fn test_move_directory() {
        let (_tmp, resolver) = setup();
        move_path(&resolver, "sub", "moved").unwrap();
        assert!(resolver.root().join("moved/a.txt").is_file());
        assert!(!resolver.root().join("sub").exists());
    }

    #[test]
    fn test_move_missing_source_is_not_found() {
        let (_tmp, resolver) = setup();
        assert!(matches!(
            move_path(&resolver, "ghost.txt", "x.txt"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_copy_directory_preserves_structure() {
        let (_tmp, resolver) = setup();
        fs::create_dir_all(resolver.root().join("sub/inner")).unwrap();
        fs::write(resolver.root().join("sub/inner/b.txt"), "deep").unwrap();

        copy_path(&resolver, "sub", "sub_copy").unwrap();

        let root = resolver.root();
        assert_eq!(fs::read_to_string(root.join("sub_copy/a.txt")).unwrap(), "hello");
        assert_eq!(fs::read_to_string(root.join("sub_copy/inner/b.txt")).unwrap(), "deep");
        assert!(root.join("sub/a.txt").is_file());
    }

    #[test]
    fn test_copy_file_overwrites() {
        let (_tmp, resolver) = setup();
        copy_path(&resolver, "root.txt", "sub/a.txt").unwrap();
        assert_eq!(
            fs::read_to_string(resolver.root().join("sub/a.txt")).unwrap(),
            "root"
        );
        assert!(resolver.root().join("root.txt").is_file());
    }

    #[test]
    fn test_copy_directory_into_itself_rejected() {
        let (_tmp, resolver) = setup();
        assert!(matches!(
            copy_path(&resolver, "sub", "sub/nested"),
            Err(StorageError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_directory_onto_file_conflicts() {
        let (_tmp, resolver) = setup();
        assert!(matches!(
            copy_path(&resolver, "sub", "root.txt"),
            Err(StorageError::Conflict(_))
        ));
        assert!(matches!(
            move_path(&resolver, "root.txt", "sub"),
            Err(StorageError::Conflict(_))
        ));
    }

    #[test]
    fn test_transfer_outside_root_rejected() {
        let (_tmp, resolver) = setup();
        assert!(matches!(
            copy_path(&resolver, "root.txt", "../stolen.txt"),
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            move_path(&resolver, "../../etc/hosts", "hosts"),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_delete_symlink_removes_only_the_link() {
        use std::os::unix::fs::symlink;

        let (_tmp, resolver) = setup();
        let root = resolver.root();
        symlink(root.join("sub"), root.join("alias")).unwrap();
        symlink(root.join("root.txt"), root.join("file_alias")).unwrap();

        delete_path(&resolver, "alias").unwrap();
        delete_path(&resolver, "file_alias").unwrap();

        assert!(fs::symlink_metadata(root.join("alias")).is_err());
        assert!(fs::symlink_metadata(root.join("file_alias")).is_err());
        assert_eq!(fs::read_to_string(root.join("sub/a.txt")).unwrap(), "hello");
        assert!(root.join("root.txt").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_delete_link_leading_outside_root() {
        use std::os::unix::fs::symlink;

        let (_tmp, resolver) = setup();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("keep.txt"), "keep").unwrap();
        symlink(outside.path(), resolver.root().join("escape")).unwrap();

        delete_path(&resolver, "escape").unwrap();
        assert!(fs::symlink_metadata(resolver.root().join("escape")).is_err());
        assert!(outside.path().join("keep.txt").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_move_symlink_moves_only_the_link() {
        use std::os::unix::fs::symlink;

        let (_tmp, resolver) = setup();
        let root = resolver.root();
        symlink(root.join("sub"), root.join("alias")).unwrap();

        move_path(&resolver, "alias", "renamed").unwrap();

        assert!(fs::symlink_metadata(root.join("renamed")).unwrap().file_type().is_symlink());
        assert!(fs::symlink_metadata(root.join("alias")).is_err());
        assert!(root.join("sub/a.txt").is_file());
        assert_eq!(fs::read_to_string(root.join("renamed/a.txt")).unwrap(), "hello");
    }

    #[cfg(unix)]
    #[test]
    fn test_list_hides_links_leading_outside_root() {
        use std::os::unix::fs::symlink;

        let (_tmp, resolver) = setup();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("outside.bin"), vec![0u8; 2048]).unwrap();
        symlink(outside.path().join("outside.bin"), resolver.root().join("sub/escape.bin")).unwrap();
        symlink(outside.path(), resolver.root().join("sub/escape_dir")).unwrap();
        symlink(resolver.root().join("root.txt"), resolver.root().join("sub/inside.txt")).unwrap();
        symlink(outside.path().join("nowhere"), resolver.root().join("sub/dangling")).unwrap();

        let listing = list_directory(&resolver, "sub").unwrap();
        let names: Vec<_> = listing.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "inside.txt"]);
        assert!(listing.directories.is_empty());
        assert_eq!(listing.stats.total_size, 9);
    }
}
