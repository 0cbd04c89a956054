//! Explorer protocol implementation
//!
//! Handles command parsing, dispatch, and reply generation.

pub mod commands;
pub mod handlers;
pub mod requests;
pub mod responses;

pub use commands::{Command, CommandStatus, parse_command};
pub use handlers::{error_reply, handle_command};
pub use requests::{PathList, PathPair, UploadRequest};
pub use responses::{Reply, write_reply};
