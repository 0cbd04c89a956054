//! Server core functionality
//!
//! This module contains the listener and the accept loop that hands each
//! connection to a client session.

pub mod core;

pub use core::Server;
