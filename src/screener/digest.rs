use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::auth::AuthError;

pub const DIGEST_HEADER: &str = "digest";

const SHA_256: &str = "SHA-256";

/// `SHA-256=<base64>` for the given body.
pub fn digest_header_value(body: &[u8]) -> String {
    format!(
        "{}={}",
        SHA_256,
        general_purpose::STANDARD.encode(Sha256::digest(body))
    )
}

/// Recomputes the body digest and compares it with the declared one.
///
/// The header may carry several `alg=value` entries; only `SHA-256` is
/// checked. Runs whether or not the digest header was signed.
pub fn verify_digest(declared: &str, body: &[u8]) -> Result<(), AuthError> {
    let mut first_algorithm = None;

    for entry in declared.split(',') {
        let (algorithm, value) = entry
            .trim()
            .split_once('=')
            .ok_or(AuthError::DigestMismatch)?;
        let algorithm = algorithm.trim();

        if !algorithm.eq_ignore_ascii_case(SHA_256) {
            first_algorithm.get_or_insert(algorithm);
            continue;
        }

        let declared_digest = general_purpose::STANDARD
            .decode(value.trim())
            .map_err(|_| AuthError::DigestMismatch)?;
        let actual = Sha256::digest(body);

        let digests_match: bool = actual.as_slice().ct_eq(&declared_digest).into();
        return if digests_match {
            Ok(())
        } else {
            Err(AuthError::DigestMismatch)
        };
    }

    Err(AuthError::UnsupportedAlgorithm(
        first_algorithm.unwrap_or_default().to_string(),
    ))
}
