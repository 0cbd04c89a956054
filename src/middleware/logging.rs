//! Logging middleware
//!
//! Connection and command logging shared by the server and sessions.

use log::{debug, info};
use std::net::SocketAddr;

use crate::protocol::Command;

/// Log an accepted client connection
pub fn log_connection(client_addr: &SocketAddr, active: usize, max_clients: usize) {
    info!(
        "Client connected: {} ({}/{} clients)",
        client_addr, active, max_clients
    );
}

/// Log a client command. Keep-alives only show up at debug level.
pub fn log_command(client_addr: &SocketAddr, command: &Command) {
    match command {
        Command::Noop => debug!("Client {} executed: {:?}", client_addr, command),
        _ => info!("Client {} executed: {:?}", client_addr, command),
    }
}
