//! Server middleware
//!
//! Provides logging middleware.

pub mod logging;

pub use logging::{log_command, log_connection};
