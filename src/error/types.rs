//! Error types
//!
//! Defines domain-specific error types for each module of the explorer.

use std::fmt;
use std::io;

/// Storage module errors (path resolution and file operations)
#[derive(Debug)]
pub enum StorageError {
    InvalidPath(String),
    NotFound(String),
    Conflict(String),
    InvalidArgument(String),
    IoError(io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::InvalidPath(p) => write!(f, "Invalid path: {}", p),
            StorageError::NotFound(p) => write!(f, "Not found: {}", p),
            StorageError::Conflict(p) => write!(f, "Conflict: {}", p),
            StorageError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            StorageError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<io::Error> for StorageError {
    fn from(error: io::Error) -> Self {
        StorageError::IoError(error)
    }
}

impl From<walkdir::Error> for StorageError {
    fn from(error: walkdir::Error) -> Self {
        StorageError::IoError(io::Error::from(error))
    }
}

/// Archive module errors
#[derive(Debug)]
pub enum ArchiveError {
    Storage(StorageError),
    Zip(zip::result::ZipError),
    IoError(io::Error),
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveError::Storage(e) => write!(f, "{}", e),
            ArchiveError::Zip(e) => write!(f, "Zip error: {}", e),
            ArchiveError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ArchiveError {}

impl From<StorageError> for ArchiveError {
    fn from(error: StorageError) -> Self {
        ArchiveError::Storage(error)
    }
}

impl From<zip::result::ZipError> for ArchiveError {
    fn from(error: zip::result::ZipError) -> Self {
        ArchiveError::Zip(error)
    }
}

impl From<io::Error> for ArchiveError {
    fn from(error: io::Error) -> Self {
        ArchiveError::IoError(error)
    }
}

impl From<walkdir::Error> for ArchiveError {
    fn from(error: walkdir::Error) -> Self {
        ArchiveError::IoError(io::Error::from(error))
    }
}

/// KML to GeoJSON conversion errors
#[derive(Debug)]
pub enum ConvertError {
    Xml(quick_xml::Error),
    MissingRoot,
    UnclosedElement(String),
    InvalidCoordinate(String),
    Json(serde_json::Error),
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::Xml(e) => write!(f, "Malformed KML: {}", e),
            ConvertError::MissingRoot => write!(f, "Malformed KML: document has no root element"),
            ConvertError::UnclosedElement(name) => {
                write!(f, "Malformed KML: element <{}> is never closed", name)
            }
            ConvertError::InvalidCoordinate(c) => write!(f, "Invalid coordinate: {}", c),
            ConvertError::Json(e) => write!(f, "GeoJSON serialization failed: {}", e),
        }
    }
}

impl std::error::Error for ConvertError {}

impl From<quick_xml::Error> for ConvertError {
    fn from(error: quick_xml::Error) -> Self {
        ConvertError::Xml(error)
    }
}

impl From<serde_json::Error> for ConvertError {
    fn from(error: serde_json::Error) -> Self {
        ConvertError::Json(error)
    }
}

/// Preview module errors
#[derive(Debug)]
pub enum PreviewError {
    Storage(StorageError),
    Convert(ConvertError),
    IoError(io::Error),
}

impl fmt::Display for PreviewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviewError::Storage(e) => write!(f, "{}", e),
            PreviewError::Convert(e) => write!(f, "{}", e),
            PreviewError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for PreviewError {}

impl From<StorageError> for PreviewError {
    fn from(error: StorageError) -> Self {
        PreviewError::Storage(error)
    }
}

impl From<ConvertError> for PreviewError {
    fn from(error: ConvertError) -> Self {
        PreviewError::Convert(error)
    }
}

impl From<io::Error> for PreviewError {
    fn from(error: io::Error) -> Self {
        PreviewError::IoError(error)
    }
}

/// Protocol module errors (malformed commands and arguments)
#[derive(Debug)]
pub enum ProtocolError {
    MalformedArgument(String),
    CommandTooLong(usize),
    PayloadTooLarge { size: u64, limit: u64 },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::MalformedArgument(msg) => write!(f, "Malformed argument: {}", msg),
            ProtocolError::CommandTooLong(limit) => {
                write!(f, "Command too long (max {} bytes)", limit)
            }
            ProtocolError::PayloadTooLarge { size, limit } => {
                write!(f, "Upload of {} bytes exceeds the {} byte limit", size, limit)
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

/// General server error that encompasses all error types
#[derive(Debug)]
pub enum ServerError {
    Storage(StorageError),
    Archive(ArchiveError),
    Preview(PreviewError),
    Protocol(ProtocolError),
    IoError(io::Error),
    Internal(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Storage(e) => write!(f, "{}", e),
            ServerError::Archive(e) => write!(f, "{}", e),
            ServerError::Preview(e) => write!(f, "{}", e),
            ServerError::Protocol(e) => write!(f, "{}", e),
            ServerError::IoError(e) => write!(f, "I/O error: {}", e),
            ServerError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<StorageError> for ServerError {
    fn from(error: StorageError) -> Self {
        ServerError::Storage(error)
    }
}

impl From<ArchiveError> for ServerError {
    fn from(error: ArchiveError) -> Self {
        ServerError::Archive(error)
    }
}

impl From<PreviewError> for ServerError {
    fn from(error: PreviewError) -> Self {
        ServerError::Preview(error)
    }
}

impl From<ProtocolError> for ServerError {
    fn from(error: ProtocolError) -> Self {
        ServerError::Protocol(error)
    }
}

impl From<io::Error> for ServerError {
    fn from(error: io::Error) -> Self {
        ServerError::IoError(error)
    }
}
