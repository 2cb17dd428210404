//! REST store for daily records. Keeps one json file per date on disk.

use std::{
    net::{Ipv4Addr, SocketAddr},
    path::PathBuf,
    sync::Arc,
};

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, level_filters::LevelFilter};

use crate::{daemon::shutdown::detect_shutdown, storage::record_storage::RecordStorageImpl};

pub mod error;
pub mod routes;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Parser, Debug, Clone)]
pub struct ServerArgs {
    /// Address to listen on. Defaults to all interfaces on `--port`.
    #[arg(long, env = "LEETTRACK_ADDR")]
    pub addr: Option<SocketAddr>,
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Directory of the record files.
    #[arg(long)]
    pub dir: Option<PathBuf>,
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
}

impl ServerArgs {
    pub fn socket_addr(&self) -> SocketAddr {
        self.addr
            .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port)))
    }
}

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<RecordStorageImpl>,
}

pub fn create_app(storage: RecordStorageImpl) -> Router {
    let state = AppState {
        storage: Arc::new(storage),
    };

    // The browser extension calls from its own origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health))
        .route(
            "/api/stats",
            post(routes::save_stats).get(routes::list_stats),
        )
        .route("/api/stats/:date", get(routes::get_stats))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serves on an already bound listener until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    storage: RecordStorageImpl,
    shutdown: CancellationToken,
) -> Result<()> {
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, create_app(storage))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!("Server stopped");
    Ok(())
}

pub async fn start_server(addr: SocketAddr, record_dir: PathBuf) -> Result<()> {
    let storage = RecordStorageImpl::new(record_dir.clone())
        .with_context(|| format!("Failed to prepare {record_dir:?}"))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    let shutdown_token = CancellationToken::new();
    let (_, result) = tokio::join!(
        detect_shutdown(shutdown_token.clone()),
        async {
            let result = serve(listener, storage, shutdown_token.clone()).await;
            shutdown_token.cancel();
            result
        },
    );
    result
}
