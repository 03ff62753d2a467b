use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use super::api::{Charge, CommercialRelationship, EntityType, PollCheckResponse};
use super::app_error::AppError;

const DEMO_RESULTS_DIR: &str = "demo_results";
const ERRORS_DIR: &str = "errors";
const UNSUPPORTED_DEMO_RESULT: &str = "UNSUPPORTED_DEMO_RESULT";
const ALL_DATA: &str = "ALL_DATA";

/// Demo result names double as file names, so only `[A-Za-z0-9_]+` is allowed.
pub fn sanitize_demo_result(name: &str) -> Result<&str, AppError> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        warn!("Rejected demo result name {:?}", name);
        return Err(AppError::invalid_demo_request());
    }
    Ok(name)
}

fn unsupported_path(location: &Path) -> PathBuf {
    location
        .join(DEMO_RESULTS_DIR)
        .join(format!("{}.json", UNSUPPORTED_DEMO_RESULT))
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, AppError> {
    let contents = match tokio::fs::read(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("no demo result at {}", path.display());
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    serde_json::from_slice(&contents).map(Some).map_err(|e| {
        error!("Invalid demo result file {}: {}", path.display(), e);
        AppError::internal_error("Invalid demo result file")
    })
}

/// Falls back to the unsupported-result file when `path` does not exist.
async fn read_or_unsupported<T: DeserializeOwned>(location: &Path, path: &Path) -> Result<T, AppError> {
    if let Some(result) = read_json(path).await? {
        return Ok(result);
    }

    read_json(&unsupported_path(location))
        .await?
        .ok_or_else(|| AppError::internal_error("Missing unsupported demo result file"))
}

/// Final poll result for a check. `ANY` and `ANY_CHARGE` resolve to `ALL_DATA`.
pub async fn load_poll_result(
    location: &Path,
    entity: EntityType,
    relationship: CommercialRelationship,
    demo_result: &str,
) -> Result<PollCheckResponse, AppError> {
    let name = match demo_result {
        "ANY" | "ANY_CHARGE" => ALL_DATA,
        other => sanitize_demo_result(other)?,
    };

    let path = location
        .join(DEMO_RESULTS_DIR)
        .join(entity.demo_results_dir())
        .join(format!("{}.json", name));

    let mut response: PollCheckResponse = read_or_unsupported(location, &path).await?;

    if relationship == CommercialRelationship::Passfort {
        response.charges = vec![
            Charge {
                amount: 100,
                reference: Some("DUMMY REFERENCE".to_string()),
                sku: None,
            },
            Charge {
                amount: 50,
                reference: None,
                sku: Some("NORMAL".to_string()),
            },
        ];
    }

    Ok(response)
}

/// Canned error response, e.g. `ERROR_INVALID_CREDENTIALS`.
pub async fn load_error_result<T: DeserializeOwned>(location: &Path, demo_result: &str) -> Result<T, AppError> {
    let name = sanitize_demo_result(demo_result)?;
    let path = location
        .join(DEMO_RESULTS_DIR)
        .join(ERRORS_DIR)
        .join(format!("{}.json", name));

    read_or_unsupported(location, &path).await
}
