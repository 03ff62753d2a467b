use axum::http::{HeaderMap, Method};

use super::auth::AuthError;
use super::signature_params::REQUEST_TARGET;

/// Rebuilds the string the caller signed.
///
/// One `name: value` line per covered header, in the declared order, joined by
/// `\n` with no trailing newline. `(request-target)` renders as the lowercased
/// method and the request path. Repeated headers are joined with `", "`.
/// Every covered header must be present on the request.
pub fn build(
    method: &Method,
    path: &str,
    headers: &HeaderMap,
    covered_headers: &[String],
) -> Result<String, AuthError> {
    let mut lines = Vec::with_capacity(covered_headers.len());

    for name in covered_headers {
        let name = name.to_ascii_lowercase();

        if name == REQUEST_TARGET {
            lines.push(format!(
                "{}: {} {}",
                REQUEST_TARGET,
                method.as_str().to_ascii_lowercase(),
                path
            ));
            continue;
        }

        let values = headers
            .get_all(name.as_str())
            .iter()
            .map(|value| value.to_str())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| AuthError::MissingCoveredHeader(name.clone()))?;

        if values.is_empty() {
            return Err(AuthError::MissingCoveredHeader(name));
        }

        lines.push(format!("{}: {}", name, values.join(", ")));
    }

    Ok(lines.join("\n"))
}
