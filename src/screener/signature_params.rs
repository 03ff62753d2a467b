use std::str::FromStr;

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use base64::{engine::general_purpose, Engine as _};
use tracing::debug;

use super::auth::AuthError;

pub const SIGNATURE_HEADER: &str = "signature";
pub const REQUEST_TARGET: &str = "(request-target)";
pub const DATE: &str = "date";

const AUTHORIZATION_SCHEME: &str = "Signature";
// Draft default when `headers` is omitted.
const DEFAULT_COVERED_HEADERS: &str = DATE;

/// Parameters of a draft-cavage HTTP signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureParams {
    pub key_id: String,
    pub algorithm: String,
    pub covered_headers: Vec<String>,
    pub signature: Vec<u8>,
}

impl SignatureParams {
    /// Reads `Authorization: Signature ...`, falling back to a bare `Signature` header.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AuthError> {
        if let Some(value) = headers.get(AUTHORIZATION) {
            let value = value
                .to_str()
                .map_err(|_| AuthError::MalformedSignatureHeader)?;
            let params = strip_scheme(value).ok_or(AuthError::MalformedSignatureHeader)?;
            return params.parse();
        }

        headers
            .get(SIGNATURE_HEADER)
            .ok_or(AuthError::MissingSignatureHeader)?
            .to_str()
            .map_err(|_| AuthError::MalformedSignatureHeader)?
            .parse()
    }

    /// Both the request line and the date must be signed.
    pub fn check_required_coverage(&self) -> Result<(), AuthError> {
        for required in [REQUEST_TARGET, DATE] {
            if !self.covered_headers.iter().any(|name| name == required) {
                return Err(AuthError::MissingRequiredCoverage(required));
            }
        }
        Ok(())
    }
}

impl FromStr for SignatureParams {
    type Err = AuthError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut key_id = None;
        let mut algorithm = None;
        let mut covered = None;
        let mut signature = None;

        for (name, value) in split_params(input)? {
            let slot = match name {
                "keyId" => &mut key_id,
                "algorithm" => &mut algorithm,
                "headers" => &mut covered,
                "signature" => &mut signature,
                other => {
                    debug!("ignoring signature parameter {:?}", other);
                    continue;
                }
            };
            if slot.replace(value).is_some() {
                return Err(AuthError::MalformedSignatureHeader);
            }
        }

        let key_id = key_id
            .filter(|id| !id.is_empty())
            .ok_or(AuthError::MalformedSignatureHeader)?;
        let algorithm = algorithm.ok_or(AuthError::MalformedSignatureHeader)?;
        let signature = general_purpose::STANDARD
            .decode(signature.ok_or(AuthError::MalformedSignatureHeader)?)
            .map_err(|_| AuthError::MalformedSignatureHeader)?;

        let covered_headers = covered
            .unwrap_or(DEFAULT_COVERED_HEADERS)
            .split_whitespace()
            .map(str::to_ascii_lowercase)
            .collect();

        Ok(SignatureParams {
            key_id: key_id.to_string(),
            algorithm: algorithm.to_string(),
            covered_headers,
            signature,
        })
    }
}

fn strip_scheme(value: &str) -> Option<&str> {
    let (scheme, params) = value.trim_start().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case(AUTHORIZATION_SCHEME)
        .then_some(params)
}

/// Splits `name="value",name="value"` pairs. Values never contain quotes.
fn split_params(input: &str) -> Result<Vec<(&str, &str)>, AuthError> {
    let mut params = Vec::new();
    let mut rest = input.trim();

    while !rest.is_empty() {
        let (name, after) = rest
            .split_once('=')
            .ok_or(AuthError::MalformedSignatureHeader)?;
        let after = after
            .trim_start()
            .strip_prefix('"')
            .ok_or(AuthError::MalformedSignatureHeader)?;
        let end = after.find('"').ok_or(AuthError::MalformedSignatureHeader)?;

        params.push((name.trim(), &after[..end]));

        rest = after[end + 1..].trim_start();
        if !rest.is_empty() {
            rest = rest
                .strip_prefix(',')
                .ok_or(AuthError::MalformedSignatureHeader)?
                .trim_start();
        }
    }

    if params.is_empty() {
        return Err(AuthError::MalformedSignatureHeader);
    }

    Ok(params)
}
