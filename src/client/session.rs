//! Client session state
//!
//! Everything a connection needs to execute commands. The resolver is shared
//! by every session; sessions carry no per-connection working directory.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::ExplorerConfig;
use crate::storage::PathResolver;

#[derive(Debug, Clone)]
pub struct Session {
    pub client_addr: SocketAddr,
    pub resolver: Arc<PathResolver>,
    /// Largest upload body accepted, in bytes
    pub max_upload_bytes: u64,
    /// Longest command line accepted, in bytes, excluding the line ending
    pub max_command_length: usize,
}

impl Session {
    pub fn new(client_addr: SocketAddr, resolver: Arc<PathResolver>, config: &ExplorerConfig) -> Self {
        Self {
            client_addr,
            resolver,
            max_upload_bytes: config.max_file_size_bytes(),
            max_command_length: config.max_command_length,
        }
    }
}
