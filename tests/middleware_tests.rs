use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode, Uri};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use screener::screener::auth::HttpSignatureValidator;
use screener::screener::digest::digest_header_value;
use screener::screener::key_store::{KeyRecord, KeyStore};
use screener::screener::signing::RequestSigner;
use screener::screener::{app, Config};
use tower::ServiceExt;

const SECRET: &[u8] = b"middleware integration secret";

fn test_app() -> Router {
    let config = Config {
        location: concat!(env!("CARGO_MANIFEST_DIR"), "/static").to_string(),
        port: "0".to_string(),
        address: "127.0.0.1".to_string(),
        clock_skew_seconds: 60,
        max_body_bytes: 64 * 1024,
        signing_keys: vec![],
    };
    let store = KeyStore::new([KeyRecord::new("abc", SECRET.to_vec())]).unwrap();
    let validator = HttpSignatureValidator::new(Arc::new(store), Duration::from_secs(60))
        .with_max_body_bytes(config.max_body_bytes);
    app(Arc::new(config), Arc::new(validator))
}

fn request(method: Method, uri: &str, headers: HeaderMap, body: &'static str) -> Request<Body> {
    let mut req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::from(body))
        .unwrap();
    *req.headers_mut() = headers;
    req
}

fn signed(signer: &RequestSigner, method: Method, uri: &str, body: &'static str) -> Request<Body> {
    let mut headers = HeaderMap::new();
    signer
        .sign(&method, &uri.parse::<Uri>().unwrap(), &mut headers, body.as_bytes())
        .unwrap();
    request(method, uri, headers, body)
}

/// Status, headers and body of a response, for comparing denials.
async fn snapshot(app: Router, req: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, headers, body)
}

async fn assert_unauthorized(req: Request<Body>) {
    let (status, _, body) = snapshot(test_app(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_signed_config_request_allowed() {
    let signer = RequestSigner::new("abc", SECRET);
    let (status, headers, body) =
        snapshot(test_app(), signed(&signer, Method::GET, "/individual/config", "")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-type"], "application/json");
    let config: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(config["check_type"], "INDIVIDUAL_SCREENING");
}

#[tokio::test]
async fn test_unsigned_request_rejected() {
    assert_unauthorized(request(
        Method::GET,
        "/company/config",
        HeaderMap::new(),
        "",
    ))
    .await;
}

#[tokio::test]
async fn test_wrong_secret_rejected() {
    let signer = RequestSigner::new("abc", vec![42u8; 256]);
    assert_unauthorized(signed(&signer, Method::POST, "/company/checks", "{}")).await;
}

#[tokio::test]
async fn test_date_only_coverage_rejected() {
    let signer = RequestSigner::new("abc", SECRET).with_covered_headers(["date"]);
    assert_unauthorized(signed(&signer, Method::POST, "/company/checks", "{}")).await;
}

#[tokio::test]
async fn test_stale_date_rejected() {
    let signer = RequestSigner::new("abc", SECRET);
    let mut headers = HeaderMap::new();
    signer
        .sign_at(
            &Method::POST,
            &"/company/checks".parse::<Uri>().unwrap(),
            &mut headers,
            b"{}",
            Utc::now() - chrono::Duration::seconds(120),
        )
        .unwrap();

    assert_unauthorized(request(Method::POST, "/company/checks", headers, "{}")).await;
}

#[tokio::test]
async fn test_bad_digest_rejected() {
    let signer = RequestSigner::new("abc", SECRET);
    let mut headers = HeaderMap::new();
    signer
        .sign(
            &Method::POST,
            &"/company/checks".parse::<Uri>().unwrap(),
            &mut headers,
            b"{}",
        )
        .unwrap();
    headers.insert(
        "digest",
        HeaderValue::from_str(&digest_header_value(b"something else")).unwrap(),
    );

    assert_unauthorized(request(Method::POST, "/company/checks", headers, "{}")).await;
}

#[tokio::test]
async fn test_request_signed_for_other_path_rejected() {
    let signer = RequestSigner::new("abc", SECRET);
    let mut headers = HeaderMap::new();
    signer
        .sign(
            &Method::GET,
            &"/company/config".parse::<Uri>().unwrap(),
            &mut headers,
            b"",
        )
        .unwrap();

    assert_unauthorized(request(Method::GET, "/individual/config", headers, "")).await;
}

#[tokio::test]
async fn test_denials_are_indistinguishable() {
    let unknown_key = RequestSigner::new("nobody", SECRET);
    let wrong_secret = RequestSigner::new("abc", b"not the secret".to_vec());
    let date_only = RequestSigner::new("abc", SECRET).with_covered_headers(["date"]);

    let first = snapshot(
        test_app(),
        signed(&unknown_key, Method::GET, "/company/config", ""),
    )
    .await;
    let second = snapshot(
        test_app(),
        signed(&wrong_secret, Method::GET, "/company/config", ""),
    )
    .await;
    let third = snapshot(
        test_app(),
        signed(&date_only, Method::GET, "/company/config", ""),
    )
    .await;
    let unsigned = snapshot(
        test_app(),
        request(Method::GET, "/company/config", HeaderMap::new(), ""),
    )
    .await;

    assert_eq!(first.0, StatusCode::UNAUTHORIZED);
    assert_eq!(first, second);
    assert_eq!(first, third);
    assert_eq!(first, unsigned);
}

#[tokio::test]
async fn test_every_protected_route_requires_signature() {
    let check_id = "0c8c7d1c-8d0a-4b55-9a0b-0d6a4a0c6a11";
    let routes = [
        (Method::GET, "/company/config".to_string()),
        (Method::POST, "/company/checks".to_string()),
        (Method::POST, format!("/company/checks/{}/poll", check_id)),
        (Method::GET, "/individual/config".to_string()),
        (Method::POST, "/individual/checks".to_string()),
        (Method::POST, format!("/individual/checks/{}/poll", check_id)),
    ];

    for (method, uri) in routes {
        let response = test_app()
            .oneshot(request(method.clone(), &uri, HeaderMap::new(), "{}"))
            .await
            .unwrap();
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{} {} was not protected",
            method,
            uri
        );
    }
}

#[tokio::test]
async fn test_metadata_is_public() {
    for uri in ["/company/", "/individual/"] {
        let (status, headers, body) = snapshot(
            test_app(),
            request(Method::GET, uri, HeaderMap::new(), ""),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["content-type"], "application/json");
        let metadata: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(metadata["protocol_version"], 1);
    }
}

#[tokio::test]
async fn test_unsigned_large_body_is_never_read() {
    let read = Arc::new(AtomicUsize::new(0));
    let counter = read.clone();
    let body = Body::new(Body::from(vec![b'{'; 16 * 1024 * 1024]).map_frame(move |frame| {
        if let Some(data) = frame.data_ref() {
            counter.fetch_add(data.len(), Ordering::SeqCst);
        }
        frame
    }));
    let req = Request::builder()
        .method(Method::POST)
        .uri("/company/checks")
        .body(body)
        .unwrap();

    let (status, _, response_body) = snapshot(test_app(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(response_body.is_empty());
    assert_eq!(read.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_signed_body_over_limit_rejected() {
    let body = format!(r#"{{"padding":"{}"}}"#, "x".repeat(128 * 1024));
    let mut headers = HeaderMap::new();
    RequestSigner::new("abc", SECRET)
        .sign(
            &Method::POST,
            &"/company/checks".parse::<Uri>().unwrap(),
            &mut headers,
            body.as_bytes(),
        )
        .unwrap();
    let mut req = Request::builder()
        .method(Method::POST)
        .uri("/company/checks")
        .body(Body::from(body))
        .unwrap();
    *req.headers_mut() = headers;

    let (status, _, response_body) = snapshot(test_app(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(response_body.is_empty());
}
