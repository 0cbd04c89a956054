//! Client session handling
//!
//! Reads command lines from one connection and replies to them.

pub mod handler;
pub mod session;

pub use handler::handle_client;
pub use session::Session;
