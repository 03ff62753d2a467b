use std::path::Path as FsPath;
use std::sync::Arc;

use axum::extract::Path;
use axum::{Extension, Json};
use bytes::Bytes;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};
use uuid::{uuid, Uuid};

use super::api::{
    CheckError, CustomData, EntityType, PollCheckRequest, PollCheckResponse, StartCheckRequest,
    StartCheckResponse,
};
use super::app_error::AppError;
use super::auth::CallerId;
use super::demo_results::{load_error_result, load_poll_result};
use super::Config;

pub const PROVIDER_ID: Uuid = uuid!("6e15bc41-17a1-4568-8549-b5f828b13060");

const DEMO_PROVIDER_DATA: &str = "Demo result. Did not make request to provider.";
const DEMO_REFERENCE: &str = "12345";
const DEFAULT_DEMO_RESULT: &str = "ANY";
const MAX_POLLS: u32 = 6;

/// Parses the body after authentication so schema errors map to 400.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| {
        debug!("Rejected check request body: {}", e);
        AppError::from(e)
    })
}

pub async fn company_start(
    Extension(caller): Extension<CallerId>,
    body: Bytes,
) -> Result<Json<StartCheckResponse>, AppError> {
    let request: StartCheckRequest = parse_body(&body)?;
    info!("Company check {} started by {}", request.id, caller.0);

    Ok(Json(StartCheckResponse::error(vec![CheckError::not_implemented()])))
}

pub async fn company_poll(
    Extension(caller): Extension<CallerId>,
    Path(check_id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<PollCheckResponse>, AppError> {
    let _request: PollCheckRequest = parse_body(&body)?;
    info!("Company check {} polled by {}", check_id, caller.0);

    Ok(Json(PollCheckResponse::error(vec![CheckError::not_implemented()])))
}

pub async fn individual_start(
    config: Extension<Arc<Config>>,
    Extension(caller): Extension<CallerId>,
    body: Bytes,
) -> Result<Json<StartCheckResponse>, AppError> {
    let request: StartCheckRequest = parse_body(&body)?;
    info!("Individual check {} started by {}", request.id, caller.0);

    if let Some(demo_result) = request.demo_result.as_deref() {
        if demo_result.contains("ERROR") {
            let response = load_error_result(FsPath::new(&config.location), demo_result).await?;
            return Ok(Json(response));
        }
    }

    let counter = rand::thread_rng().gen_range(0..MAX_POLLS);

    Ok(Json(StartCheckResponse {
        provider_id: Some(PROVIDER_ID),
        reference: Some(DEMO_REFERENCE.to_string()),
        custom_data: Some(CustomData { counter }),
        provider_data: Some(Value::from(DEMO_PROVIDER_DATA)),
        ..Default::default()
    }))
}

/// Counts down the polls stored in `custom_data`, then returns the demo result.
pub async fn individual_poll(
    config: Extension<Arc<Config>>,
    Extension(caller): Extension<CallerId>,
    Path(check_id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<PollCheckResponse>, AppError> {
    let request: PollCheckRequest = parse_body(&body)?;
    info!("Individual check {} polled by {}", check_id, caller.0);

    let remaining_polls = request.custom_data.counter;

    if remaining_polls == 0 {
        let demo_result = request
            .demo_result
            .as_deref()
            .unwrap_or(DEFAULT_DEMO_RESULT);
        let response = load_poll_result(
            FsPath::new(&config.location),
            EntityType::Individual,
            request.commercial_relationship,
            demo_result,
        )
        .await?;
        return Ok(Json(response));
    }

    Ok(Json(PollCheckResponse {
        provider_id: Some(PROVIDER_ID),
        reference: Some(request.reference),
        custom_data: Some(CustomData {
            counter: remaining_polls - 1,
        }),
        provider_data: Some(Value::from(DEMO_PROVIDER_DATA)),
        ..Default::default()
    }))
}
