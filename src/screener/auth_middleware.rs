use std::sync::Arc;

use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::Response;
use bytes::Bytes;
use http_body_util::{BodyExt, Limited};
use tower::{Layer, Service};
use tracing::{info, warn};

use super::auth::{AuthError, CallerId, HttpSignatureValidator};

/// Tower service that lets a request through only if its HTTP signature
/// verifies. Once the head verifies, up to the validator's body limit is
/// buffered for the digest check and handed on intact.
#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    validator: Arc<HttpSignatureValidator>,
}

impl<S> AuthMiddleware<S> {
    pub fn new(inner: S, validator: Arc<HttpSignatureValidator>) -> Self {
        Self { inner, validator }
    }
}

impl<S> Service<Request> for AuthMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let validator = self.validator.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let (mut parts, body) = req.into_parts();

            // The body stays unread until the head has verified.
            let caller_id =
                match validator.verify_headers(&parts.method, &parts.uri, &parts.headers) {
                    Ok(caller_id) => caller_id,
                    Err(auth_error) => return Ok(deny(&parts, &auth_error)),
                };

            let body_bytes: Bytes = match Limited::new(body, validator.max_body_bytes())
                .collect()
                .await
            {
                Ok(collected) => collected.to_bytes(),
                Err(e) => {
                    warn!(
                        reason = "unreadable_body",
                        "Failed to collect request body for {} {}: {}",
                        parts.method,
                        parts.uri.path(),
                        e
                    );
                    return Ok(unauthorized());
                }
            };

            if let Err(auth_error) = validator.verify_body(&parts.headers, &body_bytes) {
                return Ok(deny(&parts, &auth_error));
            }

            info!("Authenticated request from caller: {}", caller_id);

            parts.extensions.insert(CallerId(caller_id));
            let new_req = Request::from_parts(parts, Body::from(body_bytes));

            inner.call(new_req).await
        })
    }
}

// The reason is for operators only; the caller always sees the same 401.
fn deny(parts: &Parts, auth_error: &AuthError) -> Response {
    warn!(
        reason = auth_error.kind(),
        "Authentication failed for {} {}",
        parts.method,
        parts.uri.path()
    );
    unauthorized()
}

#[derive(Clone)]
pub struct AuthLayer {
    validator: Arc<HttpSignatureValidator>,
}

impl AuthLayer {
    pub fn new(validator: Arc<HttpSignatureValidator>) -> Self {
        Self { validator }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware::new(inner, self.validator.clone())
    }
}

/// The only denial response: bare 401, empty body.
pub fn unauthorized() -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::UNAUTHORIZED;
    response
}
