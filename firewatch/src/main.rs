mod auth;
mod classify;
mod config;
mod db;
mod errors;
mod export;
mod metrics;
mod model;
mod online;
mod rest;
mod store;
mod train;
mod validate;

use axum::http::HeaderValue;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info, warn};

use crate::auth::TokenStore;
use crate::config::Config;
use crate::export::CsvEncoder;
use crate::rest::AppState;
use crate::store::{MemoryBackend, StoreBackend, TelemetryStore};
use crate::train::BaselineTrainer;

#[tokio::main]
async fn main() {
    let config = Arc::new(Config::from_env());

    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("Starting Firewatch telemetry server");
    info!("HTTP server: {}", config.http_addr);
    info!("Online window: {}s", config.online_window_secs);

    // Initialize metrics
    metrics::init_metrics();

    let backend: Arc<dyn StoreBackend> = if config.database_url == "memory" {
        warn!("DATABASE_URL=memory: readings are kept in process and lost on restart");
        Arc::new(MemoryBackend::default())
    } else {
        info!(
            "Database: {}",
            config.database_url.split('@').last().unwrap_or("***")
        );
        match db::make_pool(&config.database_url).await {
            Ok(pool) => Arc::new(db::PgBackend::new(pool)),
            Err(e) => {
                error!("Failed to connect to database: {}", e);
                std::process::exit(1);
            }
        }
    };

    let state = AppState {
        store: TelemetryStore::new(backend),
        tokens: Arc::new(TokenStore::new(config.token_ttl_secs)),
        trainer: Arc::new(BaselineTrainer::new(config.train_max_limit)),
        encoder: Arc::new(CsvEncoder),
        config: config.clone(),
    };

    // Build HTTP app with REST API and metrics endpoint
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .merge(rest::create_router(state))
        .layer(cors_layer(&config.cors_origins));

    let listener = tokio::net::TcpListener::bind(&config.http_addr)
        .await
        .unwrap_or_else(|e| {
            error!("Failed to bind to {}: {}", config.http_addr, e);
            std::process::exit(1);
        });

    info!("HTTP server listening on {}", config.http_addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                error!("HTTP server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Shutting down");
}

fn cors_layer(origins: &str) -> CorsLayer {
    if origins.trim() == "*" {
        CorsLayer::permissive()
    } else {
        let list: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|origin| origin.trim().parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(list))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}
