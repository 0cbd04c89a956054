use log::{error, info, warn};
use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::client::{Session, handle_client};
use crate::config::ExplorerConfig;
use crate::error::ServerError;
use crate::middleware::log_connection;
use crate::protocol::responses::{self, Reply};
use crate::protocol::write_reply;
use crate::storage::PathResolver;

pub struct Server {
    listener: TcpListener,
    resolver: Arc<PathResolver>,
    config: Arc<ExplorerConfig>,
    connections: Arc<Semaphore>,
}

impl Server {
    /// Prepare the root directory and bind the command listener.
    pub async fn new(config: ExplorerConfig) -> Result<Self, ServerError> {
        let resolver = PathResolver::new(config.root_path()).map_err(|e| {
            error!("Failed to prepare root directory {}: {}", config.root_path, e);
            e
        })?;
        info!("Server root directory: {}", resolver.root().display());

        let address = config.listen_address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            error!("Failed to bind to {}: {}", address, e);
            e
        })?;
        info!("Server bound to {}", listener.local_addr()?);

        let connections = Arc::new(Semaphore::new(config.max_clients));
        Ok(Self {
            listener,
            resolver: Arc::new(resolver),
            config: Arc::new(config),
            connections,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Canonical root every session is confined to
    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    /// Accept connections until the task is dropped.
    pub async fn start(&self) {
        info!(
            "Starting sandbox explorer on {} (max {} clients)",
            self.config.listen_address(),
            self.config.max_clients
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => self.accept_client(stream, addr),
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }

    fn accept_client(&self, stream: TcpStream, client_addr: SocketAddr) {
        let permit = match Arc::clone(&self.connections).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Rejecting {}: connection limit reached", client_addr);
                tokio::spawn(reject_client(stream));
                return;
            }
        };

        let max_clients = self.config.max_clients;
        log_connection(
            &client_addr,
            max_clients - self.connections.available_permits(),
            max_clients,
        );

        let session = Session::new(client_addr, Arc::clone(&self.resolver), &self.config);

        // Spawn a task for each client so accept loop doesn't block
        tokio::spawn(async move {
            handle_client(stream, session).await;
            drop(permit);
        });
    }
}

async fn reject_client(mut stream: TcpStream) {
    let reply = Reply::message(
        responses::SERVICE_UNAVAILABLE,
        "Too many connections. Try again later.",
    );
    if let Err(e) = write_reply(&mut stream, reply).await {
        warn!("Failed to notify rejected client: {}", e);
    }
}
