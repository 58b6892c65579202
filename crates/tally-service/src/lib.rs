//! HTTP REST API for calendar-bucketed time series totals.
//!
//! This crate serves the aggregation engine from `tally-core` over a SQLite
//! store from `tally-store`:
//! - Aggregates a time window of a collection into year, month, day or hour
//!   buckets
//! - Accepts new records and reports per-collection statistics
//!
//! # REST API Endpoints
//!
//! - `GET /api/health` - Service health check
//! - `POST /api/aggregate` - Aggregate a window (JSON body)
//! - `GET /api/aggregate` - Aggregate a window (query string)
//! - `GET /api/records` - List records with filters
//! - `POST /api/records` - Insert records
//! - `GET /api/records/stats` - Per-collection summary
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/tally/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8080"
//!
//! [storage]
//! path = "~/.local/share/tally/data.db"
//! collection = "salary"
//!
//! [output]
//! drop_timezone = false
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use tally_store::Store;

pub mod api;
pub mod config;
pub mod state;

pub use config::{
    Config, ConfigError, OutputConfig, ServerConfig, StorageConfig, ValidationError,
    default_config_path,
};
pub use state::AppState;

/// Build the full application: API routes plus tracing and CORS layers.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(api::router())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Open the configured store and serve until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    config.validate()?;

    info!("Opening database at {:?}", config.storage.path);
    let store = Store::open(&config.storage.path)?;

    let addr: SocketAddr = config.server.bind.parse()?;
    let state = AppState::new(store, config);

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_app_sets_cors_headers() {
        let state = AppState::new(Store::open_in_memory().unwrap(), Config::default());

        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .header(header::ORIGIN, "http://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    #[tokio::test]
    async fn test_app_unknown_route() {
        let state = AppState::new(Store::open_in_memory().unwrap(), Config::default());

        let response = app(state)
            .oneshot(Request::builder().uri("/api/buckets").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
