//! Error handlers
//!
//! Maps errors onto protocol reply codes and logs them.

use crate::error::types::{ArchiveError, PreviewError, ProtocolError, ServerError, StorageError};
use crate::protocol::responses;
use log::{error, warn};

/// Log a server error. Client mistakes are warnings, everything else is an error.
pub fn handle_error(err: &ServerError) {
    if error_to_status_code(err) == responses::LOCAL_ERROR {
        error!("Request failed: {}", err);
    } else {
        warn!("Request rejected: {}", err);
    }
}

/// Convert error to a reply code
pub fn error_to_status_code(err: &ServerError) -> u16 {
    match err {
        ServerError::Storage(e) => storage_code(e),
        ServerError::Archive(ArchiveError::Storage(e)) => storage_code(e),
        ServerError::Archive(_) => responses::LOCAL_ERROR,
        ServerError::Preview(PreviewError::Storage(e)) => storage_code(e),
        ServerError::Preview(_) => responses::LOCAL_ERROR,
        ServerError::Protocol(ProtocolError::MalformedArgument(_)) => responses::SYNTAX_ERROR_ARGS,
        ServerError::Protocol(ProtocolError::CommandTooLong(_)) => responses::SYNTAX_ERROR,
        ServerError::Protocol(ProtocolError::PayloadTooLarge { .. }) => {
            responses::INSUFFICIENT_STORAGE
        }
        ServerError::IoError(_) => responses::LOCAL_ERROR,
        ServerError::Internal(_) => responses::LOCAL_ERROR,
    }
}

fn storage_code(err: &StorageError) -> u16 {
    match err {
        StorageError::InvalidPath(_) => responses::NAME_NOT_ALLOWED,
        StorageError::NotFound(_) => responses::FILE_NOT_FOUND,
        StorageError::Conflict(_) => responses::CONFLICT,
        StorageError::InvalidArgument(_) => responses::SYNTAX_ERROR_ARGS,
        StorageError::IoError(_) => responses::LOCAL_ERROR,
    }
}
