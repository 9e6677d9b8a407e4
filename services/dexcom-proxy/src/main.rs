//! Dexcom OAuth Data Proxy
//!
//! Backend for a single-page glucose viewer:
//! 1. Redirects the browser to the Dexcom login page
//! 2. Exchanges the returned authorization code for an access token
//! 3. Forwards date-range and EGV queries with the caller's bearer token

mod config;
mod error;
mod handlers;
mod metrics;

use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{FromRef, State};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::get;
use dexcom_api::{ClientCredentials, DexcomClient};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::handlers::ProxyState;
use crate::metrics::ServiceMetrics;

/// Maximum time to wait for in-flight requests after a shutdown signal
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    proxy: ProxyState,
    metrics: ServiceMetrics,
    prometheus: PrometheusHandle,
}

impl FromRef<AppState> for ProxyState {
    fn from_ref(state: &AppState) -> Self {
        state.proxy.clone()
    }
}

/// Build the axum router with all routes and shared state.
///
/// Only the Dexcom routes are counted in the request metrics; health and
/// scrape traffic would drown them out.
fn build_router(state: AppState, max_connections: usize) -> Router {
    let dexcom = Router::new()
        .route("/auth", get(handlers::initiate_auth))
        .route("/callback", get(handlers::handle_callback))
        .route("/daterange", get(handlers::get_date_range))
        .route("/data", get(handlers::get_glucose_data))
        .route_layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            metrics::track_requests,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .nest("/api/dexcom", dexcom)
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting dexcom-proxy");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle = metrics::install_recorder();

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        base_url = %config.dexcom.base_url,
        client_id = %config.dexcom.client_id,
        frontend_url = %config.server.frontend_url,
        "configuration loaded"
    );

    let proxy_state = build_proxy_state(config.dexcom, &config.server)?;

    let app_state = AppState {
        proxy: proxy_state,
        metrics: ServiceMetrics::new(),
        prometheus: prometheus_handle,
    };

    let app = build_router(app_state, config.server.max_connections);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    // The drain timeout starts when the shutdown signal fires, not when the
    // server starts: signal the server to drain, then race it against the timer.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => {
            info!("all in-flight requests drained");
        }
        Ok(Ok(Err(e))) => {
            error!(error = %e, "server error during shutdown");
        }
        Ok(Err(e)) => {
            error!(error = %e, "server task panicked");
        }
        Err(_) => {
            warn!(
                drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "drain timeout exceeded, forcing shutdown"
            );
        }
    }

    info!("shutdown complete");
    Ok(())
}

fn build_proxy_state(
    dexcom: config::DexcomConfig,
    server: &config::ServerConfig,
) -> Result<ProxyState> {
    let client_secret = dexcom
        .client_secret
        .context("client secret missing after config validation")?;

    let mut client = DexcomClient::new(
        reqwest::Client::new(),
        &dexcom.base_url,
        ClientCredentials {
            client_id: dexcom.client_id,
            client_secret,
            redirect_uri: dexcom.redirect_uri,
        },
    )
    .context("failed to build Dexcom client")?;
    if let Some(secs) = server.timeout_secs {
        client = client.with_timeout(Duration::from_secs(secs));
    }

    let frontend_url = reqwest::Url::parse(&server.frontend_url)
        .with_context(|| format!("invalid frontend_url {}", server.frontend_url))?;

    Ok(ProxyState {
        dexcom: client,
        frontend_url,
    })
}

/// Health endpoint: uptime and request counters.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "healthy",
        "uptime_seconds": state.metrics.started_at.elapsed().as_secs(),
        "requests_served": state.metrics.requests_total.load(Ordering::Relaxed),
        "errors_total": state.metrics.errors_total.load(Ordering::Relaxed),
    });

    (
        axum::http::StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
}

/// Prometheus metrics endpoint in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
