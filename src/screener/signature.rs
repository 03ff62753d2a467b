use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::error;

use super::auth::AuthError;
use super::key_store::KeyRecord;

type HmacSha256 = Hmac<Sha256>;

const HMAC_SHA256: &str = "hmac-sha256";

/// Signature algorithms accepted from callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    HmacSha256,
}

impl SignatureAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureAlgorithm::HmacSha256 => HMAC_SHA256,
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = AuthError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.eq_ignore_ascii_case(HMAC_SHA256) {
            Ok(SignatureAlgorithm::HmacSha256)
        } else {
            Err(AuthError::UnsupportedAlgorithm(value.to_string()))
        }
    }
}

pub fn sign(
    signing_string: &str,
    key: &KeyRecord,
    algorithm: SignatureAlgorithm,
) -> Result<Vec<u8>, AuthError> {
    match algorithm {
        SignatureAlgorithm::HmacSha256 => {
            let mut mac = HmacSha256::new_from_slice(&key.secret).map_err(|e| {
                error!("Unable to key HMAC: {}", e);
                AuthError::SignatureMismatch
            })?;
            mac.update(signing_string.as_bytes());
            Ok(mac.finalize().into_bytes().to_vec())
        }
    }
}

/// Checks `signature` against the MAC of `signing_string` under `key`.
///
/// Unknown algorithms are rejected outright. The comparison is constant time.
pub fn verify(
    signing_string: &str,
    signature: &[u8],
    key: &KeyRecord,
    algorithm: &str,
) -> Result<(), AuthError> {
    let algorithm = SignatureAlgorithm::from_str(algorithm)?;
    let expected = sign(signing_string, key, algorithm)?;

    let signatures_match: bool = expected.as_slice().ct_eq(signature).into();
    if !signatures_match {
        return Err(AuthError::SignatureMismatch);
    }

    Ok(())
}
