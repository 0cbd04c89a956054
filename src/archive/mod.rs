//! Archive module
//!
//! Packs selected files and directories into zip archives.

mod operations;

pub use operations::zip_paths;
