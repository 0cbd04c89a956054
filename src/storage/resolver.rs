//! Path resolution
//!
//! Confines caller-supplied relative paths to the configured root directory.
//! Every filesystem operation goes through [`PathResolver::resolve`] first.

use std::ffi::OsStr;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use log::{debug, warn};

use crate::error::StorageError;

/// Resolves relative paths against a fixed, canonical root
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

/// An absolute path known to be the root or one of its descendants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    absolute: PathBuf,
    relative: String,
}

impl ResolvedPath {
    pub fn as_path(&self) -> &Path {
        &self.absolute
    }

    /// Root-relative form with `/` separators; empty for the root itself.
    pub fn relative(&self) -> &str {
        &self.relative
    }

    pub fn is_root(&self) -> bool {
        self.relative.is_empty()
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.absolute
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.absolute
    }
}

impl PathResolver {
    /// Create a resolver for `root`, creating the directory if it is missing.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref();
        if root.as_os_str().is_empty() {
            return Err(StorageError::InvalidArgument(
                "root directory cannot be empty".into(),
            ));
        }

        fs::create_dir_all(root)?;
        let root = root.canonicalize()?;
        if !root.is_dir() {
            return Err(StorageError::InvalidArgument(format!(
                "root {} is not a directory",
                root.display()
            )));
        }

        debug!("Path resolver rooted at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `relative` to an absolute path inside the root.
    ///
    /// The input is joined onto the root *before* any normalization, so `..`
    /// is always evaluated against the root and never against a base chosen by
    /// the caller. The existing part of the result is then canonicalized, which
    /// resolves symlinks, and the outcome must still sit under the root.
    pub fn resolve(&self, relative: &str) -> Result<ResolvedPath, StorageError> {
        if relative.is_empty() {
            return Ok(ResolvedPath {
                absolute: self.root.clone(),
                relative: String::new(),
            });
        }

        if relative.contains('\0') {
            return Err(StorageError::InvalidPath(relative.escape_default().to_string()));
        }

        let combined = self.root.join(relative);
        let normalized = normalize_lexically(&combined);
        let canonical = canonicalize_existing(&normalized).map_err(|e| match e {
            StorageError::InvalidPath(_) => StorageError::InvalidPath(relative.to_string()),
            other => other,
        })?;

        self.confine(relative, canonical)
    }

    /// Resolve `relative` without dereferencing its final component.
    ///
    /// Only the parent is canonicalized and checked against the root, so a
    /// symlink named by `relative` is returned as the link itself rather than
    /// its target. Used by operations that remove or rename the named entry.
    pub fn resolve_entry(&self, relative: &str) -> Result<ResolvedPath, StorageError> {
        if relative.contains('\0') {
            return Err(StorageError::InvalidPath(relative.escape_default().to_string()));
        }

        let normalized = normalize_lexically(&self.root.join(relative));
        if relative_to_root(&self.root, &normalized).is_some_and(|rel| rel.is_empty()) {
            return self.resolve("");
        }

        let (Some(parent), Some(name)) = (normalized.parent(), normalized.file_name()) else {
            return Err(StorageError::InvalidPath(relative.to_string()));
        };
        let mut entry = canonicalize_existing(parent).map_err(|e| match e {
            StorageError::InvalidPath(_) => StorageError::InvalidPath(relative.to_string()),
            other => other,
        })?;
        entry.push(name);

        self.confine(relative, entry)
    }

    fn confine(&self, relative: &str, absolute: PathBuf) -> Result<ResolvedPath, StorageError> {
        match relative_to_root(&self.root, &absolute) {
            Some(rel) => Ok(ResolvedPath {
                absolute,
                relative: rel,
            }),
            None => {
                warn!(
                    "Rejected path escaping root: {:?} -> {}",
                    relative,
                    absolute.display()
                );
                Err(StorageError::InvalidPath(relative.to_string()))
            }
        }
    }

    /// Root-relative `/`-separated form of a path already known to be under the
    /// root, as produced by walking the tree.
    pub fn relative_path(&self, path: &Path) -> Option<String> {
        relative_to_root(&self.root, path)
    }
}

/// Reduce a client-supplied file name to its base name.
///
/// Both `/` and `\` count as separators so a name like `..\..\x` cannot carry
/// a directory component onto a host that treats either as one.
pub fn sanitize_file_name(name: &str) -> Result<String, StorageError> {
    let base = name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or("");
    if base.is_empty() || base == "." || base == ".." || base.contains('\0') {
        return Err(StorageError::InvalidArgument(format!(
            "invalid file name: {:?}",
            name
        )));
    }
    Ok(base.to_string())
}

/// Collapse `.` and `..` without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // popping past the filesystem root leaves the root in place
                if matches!(normalized.components().next_back(), Some(Component::Normal(_))) {
                    normalized.pop();
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Canonicalize the longest existing ancestor of `path` and re-append the rest.
fn canonicalize_existing(path: &Path) -> Result<PathBuf, StorageError> {
    let mut current = path;
    let mut missing: Vec<&OsStr> = Vec::new();

    loop {
        match current.canonicalize() {
            Ok(mut canonical) => {
                for part in missing.iter().rev() {
                    canonical.push(part);
                }
                return Ok(canonical);
            }
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                // A dangling symlink would let a later create() write wherever it points.
                if fs::symlink_metadata(current).is_ok_and(|m| m.file_type().is_symlink()) {
                    return Err(StorageError::InvalidPath(current.display().to_string()));
                }
                match (current.parent(), current.file_name()) {
                    (Some(parent), Some(name)) => {
                        missing.push(name);
                        current = parent;
                    }
                    _ => return Err(StorageError::IoError(e)),
                }
            }
            Err(e) => return Err(StorageError::IoError(e)),
        }
    }
}

/// Component-wise relative path from `root` to `candidate`.
///
/// Returns `None` when `candidate` is not `root` or a descendant of it. Whole
/// components are compared, so `/data/app2` never matches a root of `/data/app`.
fn relative_to_root(root: &Path, candidate: &Path) -> Option<String> {
    let mut candidate_parts = candidate.components();
    for root_part in root.components() {
        match candidate_parts.next() {
            Some(part) if same_component(root_part, part) => {}
            _ => return None,
        }
    }

    let mut segments = Vec::new();
    for part in candidate_parts {
        match part {
            Component::Normal(name) => segments.push(name.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(segments.join("/"))
}

#[cfg(any(windows, target_os = "macos"))]
fn same_component(a: Component<'_>, b: Component<'_>) -> bool {
    a.as_os_str().to_string_lossy().to_lowercase() == b.as_os_str().to_string_lossy().to_lowercase()
}

#[cfg(not(any(windows, target_os = "macos")))]
fn same_component(a: Component<'_>, b: Component<'_>) -> bool {
    a == b
}
