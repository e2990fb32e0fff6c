use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{Router, routing::get};
use catalog_db_memory::InMemoryStorage;
use catalog_db_postgres::PostgresStorage;
use catalog_reconcile::Reconciler;
use catalog_storage::{DynAssociationStore, DynStorage};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{AppConfig, StorageBackend};
use crate::handlers;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub storage: DynStorage,
    /// Reconciler over the `product_tag` join table.
    pub product_tags: Reconciler,
}

impl AppState {
    pub fn new(storage: DynStorage, product_tags: Reconciler) -> Self {
        Self {
            storage,
            product_tags,
        }
    }

    /// State over a fresh in-memory catalog.
    pub fn in_memory(cfg: &AppConfig) -> Self {
        let storage = InMemoryStorage::new();
        let links = storage.product_tags();
        Self::new(Arc::new(storage), reconciler(links, cfg))
    }
}

fn reconciler(links: DynAssociationStore, cfg: &AppConfig) -> Reconciler {
    Reconciler::with_config(links, cfg.reconcile.reconciler_config())
}

/// Opens the configured storage backend.
pub async fn create_state(cfg: &AppConfig) -> anyhow::Result<AppState> {
    match cfg.storage.backend {
        StorageBackend::Memory => {
            tracing::info!("using in-memory storage");
            Ok(AppState::in_memory(cfg))
        }
        StorageBackend::Postgres => {
            let pg = cfg
                .storage
                .postgres
                .clone()
                .context("storage.postgres config is required")?;
            let storage = PostgresStorage::new(pg)
                .await
                .context("failed to open PostgreSQL storage")?;
            tracing::info!("using PostgreSQL storage");
            let links = storage.product_tags();
            Ok(AppState::new(Arc::new(storage), reconciler(links, cfg)))
        }
    }
}

pub fn build_app(state: AppState, cfg: &AppConfig) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route(
            "/api/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/api/categories/{id}",
            get(handlers::get_category)
                .put(handlers::update_category)
                .delete(handlers::delete_category),
        )
        .route(
            "/api/products",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route(
            "/api/products/{id}",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route(
            "/api/tags",
            get(handlers::list_tags).post(handlers::create_tag),
        )
        .route(
            "/api/tags/{id}",
            get(handlers::get_tag)
                .put(handlers::update_tag)
                .delete(handlers::delete_tag),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

pub struct CatalogServer {
    addr: SocketAddr,
    app: Router,
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub async fn build(self) -> anyhow::Result<CatalogServer> {
        let state = create_state(&self.config).await?;
        let app = build_app(state, &self.config);

        Ok(CatalogServer {
            addr: self.addr,
            app,
        })
    }
}

impl CatalogServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
