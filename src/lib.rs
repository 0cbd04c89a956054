pub mod archive;
pub mod client;
pub mod config;
pub mod error;
pub mod middleware;
pub mod preview;
pub mod protocol;
pub mod search;
pub mod server;
pub mod storage;

pub use config::ExplorerConfig;
pub use server::Server;
