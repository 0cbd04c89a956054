//! Search module
//!
//! Recursive, case-insensitive file and directory name search under the root.

mod operations;
mod results;

pub use operations::search;
pub use results::{FoundDirectory, FoundFile, SearchResult};
