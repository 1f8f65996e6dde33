use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use idlink_db_memory::MemoryContactStore;
use idlink_db_postgres::PostgresContactStore;
use idlink_reconciler::Reconciler;
use idlink_storage::ContactStore;

use crate::{
    config::{AppConfig, StorageBackend},
    handlers,
    middleware as app_middleware,
};

/// Shared handler state. The store handle is a constructed dependency so
/// tests can substitute an isolated backend.
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<Reconciler>,
    pub expose_errors: bool,
}

/// Builds the contact store selected by the configuration.
pub async fn build_store(cfg: &AppConfig) -> anyhow::Result<Arc<dyn ContactStore>> {
    let store: Arc<dyn ContactStore> = match cfg.storage.backend {
        StorageBackend::Postgres => {
            Arc::new(PostgresContactStore::new(cfg.storage.postgres.clone()).await?)
        }
        StorageBackend::Memory => Arc::new(MemoryContactStore::new()),
    };
    tracing::info!(backend = store.backend_name(), "Contact store initialized");
    Ok(store)
}

/// Builds the application router against the configured store.
pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let store = build_store(cfg).await?;
    Ok(build_app_with_store(cfg, store))
}

/// Builds the application router against an already-constructed store.
pub fn build_app_with_store(cfg: &AppConfig, store: Arc<dyn ContactStore>) -> Router {
    let state = AppState {
        reconciler: Arc::new(Reconciler::new(store)),
        expose_errors: cfg.expose_error_detail(),
    };

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/identify", post(handlers::identify))
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(axum::extract::DefaultBodyLimit::max(cfg.server.body_limit_bytes))
        .with_state(state)
}

pub struct IdlinkServer {
    addr: SocketAddr,
    app: Router,
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
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

    pub async fn build(self) -> anyhow::Result<IdlinkServer> {
        let app = build_app(&self.config).await?;

        Ok(IdlinkServer {
            addr: self.addr,
            app,
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl IdlinkServer {
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
