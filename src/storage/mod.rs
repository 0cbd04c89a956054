//! File system storage management
//!
//! Handles path confinement and the file operations built on it.

pub mod operations;
pub mod resolver;
pub mod results;

pub use operations::{
    copy_path, create_directory, delete_path, list_directory, move_path, prepare_download,
    prepare_upload, upload_file,
};
pub use resolver::{PathResolver, ResolvedPath, sanitize_file_name};
pub use results::{DirectoryListing, DownloadInfo, FileItem, ListingStats};
