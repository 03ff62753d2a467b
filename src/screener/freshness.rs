use std::time::Duration;

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::auth::AuthError;
use super::signature_params::DATE;

pub const DEFAULT_CLOCK_SKEW_SECONDS: u64 = 60;

/// Format used for the `date` header, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// True when `declared` lies within `window` of `now`, in either direction.
pub fn is_fresh(declared: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    let skew = if now >= declared {
        now - declared
    } else {
        declared - now
    };

    match skew.to_std() {
        Ok(skew) => skew <= window,
        Err(_) => false,
    }
}

/// Parses an HTTP date. Accepts IMF-fixdate and the numeric-offset form many
/// clients emit.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .map(|date| date.with_timezone(&Utc))
        .ok()
}

/// Bounds replay exposure by rejecting requests dated outside the window.
#[derive(Debug, Clone, Copy)]
pub struct FreshnessGuard {
    window: Duration,
}

impl FreshnessGuard {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn check(&self, headers: &HeaderMap, now: DateTime<Utc>) -> Result<(), AuthError> {
        let declared = headers
            .get(DATE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_http_date)
            .ok_or(AuthError::StaleOrMalformedTimestamp)?;

        if !is_fresh(declared, now, self.window) {
            debug!(
                "request date {} outside {}s window",
                declared,
                self.window.as_secs()
            );
            return Err(AuthError::StaleOrMalformedTimestamp);
        }

        Ok(())
    }
}
