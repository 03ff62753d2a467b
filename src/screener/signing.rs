use axum::http::header::{InvalidHeaderValue, AUTHORIZATION, DATE};
use axum::http::{HeaderMap, HeaderValue, Method, Uri};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::auth::AuthError;
use super::canonical;
use super::digest::{digest_header_value, DIGEST_HEADER};
use super::freshness::HTTP_DATE_FORMAT;
use super::key_store::KeyRecord;
use super::signature::{self, SignatureAlgorithm};
use super::signature_params::REQUEST_TARGET;

#[derive(Error, Debug)]
pub enum SigningError {
    #[error("Unable to build signing string: {0}")]
    Canonical(#[from] AuthError),
    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] InvalidHeaderValue),
}

/// Client side of the scheme: stamps `date` and `digest`, then signs.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    key: KeyRecord,
    covered_headers: Vec<String>,
}

impl RequestSigner {
    pub fn new(key_id: impl Into<String>, secret: impl Into<Vec<u8>>) -> Self {
        Self {
            key: KeyRecord::new(key_id, secret),
            covered_headers: vec![REQUEST_TARGET.to_string(), DATE.as_str().to_string()],
        }
    }

    pub fn with_covered_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.covered_headers = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn sign(
        &self,
        method: &Method,
        uri: &Uri,
        headers: &mut HeaderMap,
        body: &[u8],
    ) -> Result<(), SigningError> {
        self.sign_at(method, uri, headers, body, Utc::now())
    }

    /// Existing `date` and `digest` headers are replaced.
    pub fn sign_at(
        &self,
        method: &Method,
        uri: &Uri,
        headers: &mut HeaderMap,
        body: &[u8],
        date: DateTime<Utc>,
    ) -> Result<(), SigningError> {
        headers.insert(
            DATE,
            HeaderValue::from_str(&date.format(HTTP_DATE_FORMAT).to_string())?,
        );
        headers.insert(
            DIGEST_HEADER,
            HeaderValue::from_str(&digest_header_value(body))?,
        );

        let target = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| uri.path());
        let signing_string = canonical::build(method, target, headers, &self.covered_headers)?;
        let signature = signature::sign(
            &signing_string,
            &self.key,
            SignatureAlgorithm::HmacSha256,
        )?;

        let authorization = format!(
            "Signature keyId=\"{}\",algorithm=\"{}\",headers=\"{}\",signature=\"{}\"",
            self.key.key_id,
            SignatureAlgorithm::HmacSha256,
            self.covered_headers.join(" "),
            general_purpose::STANDARD.encode(signature)
        );
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&authorization)?);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screener::signature_params::SignatureParams;
    use chrono::TimeZone;

    #[test]
    fn test_sign_sets_headers() {
        let signer = RequestSigner::new("abc", b"secret".to_vec());
        let uri: Uri = "/company/checks".parse().unwrap();
        let date = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let mut headers = HeaderMap::new();

        signer
            .sign_at(&Method::POST, &uri, &mut headers, b"{}", date)
            .unwrap();

        assert_eq!(headers[DATE], "Tue, 02 Jan 2024 03:04:05 GMT");
        assert_eq!(
            headers[DIGEST_HEADER],
            "SHA-256=RBNvo1WzZ4oRRq0W9+hknpT7T8If536DEMBg9hyq/4o="
        );

        let params = SignatureParams::from_headers(&headers).unwrap();
        assert_eq!(params.key_id, "abc");
        assert_eq!(params.algorithm, "hmac-sha256");
        assert_eq!(params.covered_headers, vec!["(request-target)", "date"]);
        assert_eq!(params.signature.len(), 32);
    }

    #[test]
    fn test_signature_matches_canonical_string() {
        let key = KeyRecord::new("abc", b"secret".to_vec());
        let signer = RequestSigner::new("abc", b"secret".to_vec())
            .with_covered_headers(["(request-target)", "date", "digest"]);
        let uri: Uri = "/individual/checks".parse().unwrap();
        let date = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let mut headers = HeaderMap::new();

        signer
            .sign_at(&Method::POST, &uri, &mut headers, b"{}", date)
            .unwrap();

        let expected = "(request-target): post /individual/checks\n\
                        date: Tue, 02 Jan 2024 03:04:05 GMT\n\
                        digest: SHA-256=RBNvo1WzZ4oRRq0W9+hknpT7T8If536DEMBg9hyq/4o=";
        let params = SignatureParams::from_headers(&headers).unwrap();
        assert!(signature::verify(expected, &params.signature, &key, "hmac-sha256").is_ok());
    }

    #[test]
    fn test_sign_fails_for_absent_covered_header() {
        let signer = RequestSigner::new("abc", b"secret".to_vec())
            .with_covered_headers(["(request-target)", "date", "content-type"]);
        let uri: Uri = "/".parse().unwrap();

        let result = signer.sign(&Method::GET, &uri, &mut HeaderMap::new(), b"");
        assert!(matches!(result, Err(SigningError::Canonical(_))));
    }
}
