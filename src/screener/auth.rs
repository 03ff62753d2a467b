use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, Method, Uri};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, instrument};

use super::canonical;
use super::digest::{self, DIGEST_HEADER};
use super::freshness::FreshnessGuard;
use super::key_store::KeyStore;
use super::signature;
use super::signature_params::SignatureParams;

pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Every reason a request can be denied.
///
/// The variants exist for logs only. The middleware answers all of them with
/// the same bare 401.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing signature header")]
    MissingSignatureHeader,
    #[error("Malformed signature header")]
    MalformedSignatureHeader,
    #[error("Signature does not cover required header: {0}")]
    MissingRequiredCoverage(&'static str),
    #[error("Unknown key")]
    UnknownKey,
    #[error("Date header is stale or malformed")]
    StaleOrMalformedTimestamp,
    #[error("Covered header missing from request: {0}")]
    MissingCoveredHeader(String),
    #[error("Signature verification failed")]
    SignatureMismatch,
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("Body digest does not match")]
    DigestMismatch,
}

impl AuthError {
    /// Stable label for structured logging.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingSignatureHeader => "missing_signature_header",
            AuthError::MalformedSignatureHeader => "malformed_signature_header",
            AuthError::MissingRequiredCoverage(_) => "missing_required_coverage",
            AuthError::UnknownKey => "unknown_key",
            AuthError::StaleOrMalformedTimestamp => "stale_or_malformed_timestamp",
            AuthError::MissingCoveredHeader(_) => "missing_covered_header",
            AuthError::SignatureMismatch => "signature_mismatch",
            AuthError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            AuthError::DigestMismatch => "digest_mismatch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthDecision {
    pub outcome: Outcome,
    pub caller_id: Option<String>,
}

impl AuthDecision {
    pub fn allow(caller_id: String) -> Self {
        Self {
            outcome: Outcome::Allow,
            caller_id: Some(caller_id),
        }
    }

    pub fn deny() -> Self {
        Self {
            outcome: Outcome::Deny,
            caller_id: None,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.outcome == Outcome::Allow
    }
}

/// Authenticated caller, attached to the request extensions on ALLOW.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerId(pub String);

/// Verifies HTTP-signed requests against a fixed key set.
///
/// Checks run cheapest first and stop at the first failure:
/// parse, required coverage, key lookup, freshness, canonical string,
/// signature, body digest.
///
/// Everything up to the signature needs only the request head, so callers
/// holding a streaming body run [`verify_headers`](Self::verify_headers) first
/// and read at most [`max_body_bytes`](Self::max_body_bytes) for
/// [`verify_body`](Self::verify_body).
pub struct HttpSignatureValidator {
    key_store: Arc<KeyStore>,
    freshness: FreshnessGuard,
    max_body_bytes: usize,
}

impl HttpSignatureValidator {
    pub fn new(key_store: Arc<KeyStore>, clock_skew: Duration) -> Self {
        Self {
            key_store,
            freshness: FreshnessGuard::new(clock_skew),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Head-only checks: parse, coverage, key, freshness, signature.
    /// Returns the caller id.
    pub fn verify_headers(
        &self,
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
    ) -> Result<String, AuthError> {
        self.verify_headers_at(method, uri, headers, Utc::now())
    }

    pub fn verify_headers_at(
        &self,
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let params = SignatureParams::from_headers(headers)?;
        params.check_required_coverage()?;

        let key = self
            .key_store
            .lookup(&params.key_id)
            .ok_or(AuthError::UnknownKey)?;

        self.freshness.check(headers, now)?;

        let target = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| uri.path());
        let signing_string = canonical::build(method, target, headers, &params.covered_headers)?;

        signature::verify(&signing_string, &params.signature, key, &params.algorithm)?;

        Ok(key.key_id.clone())
    }

    /// The `digest` header is mandatory whether or not it was signed.
    pub fn verify_body(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), AuthError> {
        let declared_digest = headers
            .get(DIGEST_HEADER)
            .ok_or(AuthError::DigestMismatch)?
            .to_str()
            .map_err(|_| AuthError::DigestMismatch)?;
        digest::verify_digest(declared_digest, body)
    }

    /// Returns the caller id on success.
    pub fn validate_request(
        &self,
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<String, AuthError> {
        self.validate_request_at(method, uri, headers, body, Utc::now())
    }

    #[instrument(
        name = "validate_request",
        skip(self, headers, body, now),
        fields(method = %method, uri_path = %uri.path())
    )]
    pub fn validate_request_at(
        &self,
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let caller_id = self.verify_headers_at(method, uri, headers, now)?;
        self.verify_body(headers, body)?;

        debug!("Signature and digest verified");

        Ok(caller_id)
    }

    /// Collapses the result into the externally visible decision.
    pub fn decide(
        &self,
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
        body: &[u8],
    ) -> AuthDecision {
        match self.validate_request(method, uri, headers, body) {
            Ok(caller_id) => AuthDecision::allow(caller_id),
            Err(_) => AuthDecision::deny(),
        }
    }
}
