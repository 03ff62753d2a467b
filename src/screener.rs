pub mod api;
pub mod app_error;
pub mod auth;
pub mod auth_middleware;
pub mod canonical;
pub mod checks;
pub mod demo_results;
pub mod digest;
pub mod freshness;
pub mod key_store;
pub mod signature;
pub mod signature_params;
pub mod signing;
pub mod static_files;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use serde::Deserialize;
use tokio::signal;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{info, warn, Level};

use auth::{HttpSignatureValidator, DEFAULT_MAX_BODY_BYTES};
use auth_middleware::AuthLayer;
use freshness::DEFAULT_CLOCK_SKEW_SECONDS;
use key_store::KeyStore;

/// One caller's shared secret, base64 encoded.
#[derive(Deserialize, Clone, Debug)]
pub struct SigningKeyConfig {
    pub key_id: String,
    pub secret: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub location: String,
    pub port: String,
    pub address: String,
    #[serde(default = "default_clock_skew_seconds")]
    pub clock_skew_seconds: u64,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default)]
    pub signing_keys: Vec<SigningKeyConfig>,
}

fn default_clock_skew_seconds() -> u64 {
    DEFAULT_CLOCK_SKEW_SECONDS
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Routes for both entity types. Everything except the metadata documents
/// sits behind HTTP signature authentication.
pub fn app(config: Arc<Config>, validator: Arc<HttpSignatureValidator>) -> Router {
    let protected_routes = Router::new()
        .route("/company/config", get(static_files::company_config))
        .route("/company/checks", post(checks::company_start))
        .route("/company/checks/{check_id}/poll", post(checks::company_poll))
        .route("/individual/config", get(static_files::individual_config))
        .route("/individual/checks", post(checks::individual_start))
        .route(
            "/individual/checks/{check_id}/poll",
            post(checks::individual_poll),
        )
        .route_layer(AuthLayer::new(validator));

    let public_routes = Router::new()
        .route("/company/", get(static_files::company_metadata))
        .route("/individual/", get(static_files::individual_metadata));

    Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .layer(Extension(config))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let key_store = KeyStore::from_config(&config.signing_keys)
        .map_err(|e| anyhow::anyhow!("Invalid signing keys: {}", e))?;

    if key_store.is_empty() {
        warn!("No signing keys configured - every protected request will be rejected");
    } else {
        info!("Loaded {} signing key(s)", key_store.len());
    }

    let validator = Arc::new(
        HttpSignatureValidator::new(
            Arc::new(key_store),
            Duration::from_secs(config.clock_skew_seconds),
        )
        .with_max_body_bytes(config.max_body_bytes),
    );

    let config_state = Arc::new(config);
    let bind_address = format!("{}:{}", config_state.address, config_state.port);

    let app = app(config_state, validator);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    info!("running screener on {}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutting down");
}
