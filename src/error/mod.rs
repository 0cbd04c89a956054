//! Error handling
//!
//! Defines error types and handling for the explorer.

pub mod handlers;
pub mod types;

pub use handlers::{error_to_status_code, handle_error};
pub use types::*;
