pub mod config;
pub mod handlers;
pub mod observability;
pub mod server;

pub use config::{AppConfig, LoggingConfig, ReconcileSettings, ServerConfig, StorageBackend, StorageConfig};
pub use observability::{init_tracing, set_level};
pub use server::{AppState, CatalogServer, ServerBuilder, build_app, create_state};
