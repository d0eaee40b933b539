use std::sync::Arc;

use anyhow::anyhow;
use axum::Router;
use configs::AppConfig;
use service::store::RedisHashStore;
use service::CookieService;
use tokio::net::TcpListener;
use tracing::info;

use crate::observability::MetricsObserver;
use crate::routes::{self, ServerState};

/// Connect to Redis and confirm it answers `PING` within the startup timeout.
async fn connect_store(cfg: &AppConfig) -> anyhow::Result<RedisHashStore> {
    let redis = &cfg.redis;
    let connect = async {
        let store = RedisHashStore::connect(redis).await?;
        let pong = store.ping().await?;
        Ok::<_, service::ServiceError>((store, pong))
    };
    let (store, pong) = tokio::time::timeout(redis.startup_ping_timeout(), connect)
        .await
        .map_err(|_| anyhow!("timed out connecting to redis at {}", redis.addr))?
        .map_err(|e| anyhow!("failed to connect to redis at {}: {e}", redis.addr))?;
    info!(addr = %redis.addr, %pong, "connected to redis");
    Ok(store)
}

/// Build the router around an already connected service.
pub fn build_app(cookies: CookieService, api_key: &str) -> Router {
    routes::build_router(ServerState::new(cookies, api_key))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl+c");
        std::future::pending::<()>().await;
    }
    info!(event = "shutdown_signal", "received Ctrl+C, shutting down");
}

/// Public entry: connect the store, build the app and serve until Ctrl+C.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let store = connect_store(&cfg).await?;
    let cookies = CookieService::new(Arc::new(store)).with_observer(Arc::new(MetricsObserver::default()));
    let app = build_app(cookies, &cfg.auth.api_key);

    let addr = cfg.server.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %listener.local_addr()?, "cookie api listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
