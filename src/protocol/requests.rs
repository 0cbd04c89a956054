//! Request argument models carried as JSON on command lines

use serde::{Deserialize, Serialize};

/// Source and destination for MOVE and COPY
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathPair {
    pub from: String,
    pub to: String,
}

/// Selection for ZIP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathList {
    pub paths: Vec<String>,
}

/// Upload announcement; `size` raw bytes follow once the server accepts it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRequest {
    /// Target folder, root when omitted
    #[serde(default)]
    pub path: String,
    pub file_name: String,
    pub size: u64,
}
