use std::path::Path;
use std::sync::Arc;

use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use tracing::{debug, error};

use super::api::EntityType;
use super::app_error::AppError;
use super::Config;

const METADATA_FILE: &str = "metadata.json";
const CONFIG_FILE: &str = "config.json";

/// Serves `{location}/{entity}/{file}` as JSON, read fresh on every request.
pub async fn serve_json(location: &Path, entity: EntityType, file: &str) -> Result<Response, AppError> {
    let path = location.join(entity.as_dir()).join(file);
    debug!("serving static file {}", path.display());

    let contents = tokio::fs::read(&path).await.map_err(|e| {
        error!("Failed to read {}: {}", path.display(), e);
        AppError::from(e)
    })?;

    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, "application/json")],
        contents,
    )
        .into_response())
}

pub async fn company_metadata(config: Extension<Arc<Config>>) -> Result<Response, AppError> {
    serve_json(Path::new(&config.location), EntityType::Company, METADATA_FILE).await
}

pub async fn company_config(config: Extension<Arc<Config>>) -> Result<Response, AppError> {
    serve_json(Path::new(&config.location), EntityType::Company, CONFIG_FILE).await
}

pub async fn individual_metadata(config: Extension<Arc<Config>>) -> Result<Response, AppError> {
    serve_json(Path::new(&config.location), EntityType::Individual, METADATA_FILE).await
}

pub async fn individual_config(config: Extension<Arc<Config>>) -> Result<Response, AppError> {
    serve_json(Path::new(&config.location), EntityType::Individual, CONFIG_FILE).await
}
