// HttpSubmissionClient against an in-process backend

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use shared::config::{BackendConfig, RetrySettings};
use shared::models::KEY_DATA_LENGTH;
use shared::{ProximityKey, RegistrationToken};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use submission::{
    ExposureSubmissionService, MockKeyRetriever, MockTokenStore, SubmissionClient,
    SubmissionErrorKind, TestResult, TransportError,
};
use transport::{HttpSubmissionClient, RetryConfig};

const TOKEN: &str = "dummyRegistrationToken";

/// Behaviour and recorded traffic of the fake backend
#[derive(Clone, Default)]
struct Backend {
    submit_status: Arc<Mutex<Vec<StatusCode>>>,
    result_body: Arc<Mutex<Option<Value>>>,
    submit_calls: Arc<AtomicUsize>,
    fetch_calls: Arc<AtomicUsize>,
    last_authorization: Arc<Mutex<Option<String>>>,
    last_submission: Arc<Mutex<Option<Value>>>,
    last_result_request: Arc<Mutex<Option<Value>>>,
}

impl Backend {
    /// Statuses returned by successive submit calls; the last one repeats
    fn with_submit_statuses(self, statuses: Vec<StatusCode>) -> Self {
        *self.submit_status.lock().unwrap() = statuses;
        self
    }

    fn with_result_body(self, body: Value) -> Self {
        *self.result_body.lock().unwrap() = Some(body);
        self
    }
}

async fn submit_keys(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    let call = backend.submit_calls.fetch_add(1, Ordering::SeqCst);
    *backend.last_authorization.lock().unwrap() = headers
        .get("cwa-authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    *backend.last_submission.lock().unwrap() = Some(body);

    let statuses = backend.submit_status.lock().unwrap();
    let status = statuses
        .get(call)
        .or_else(|| statuses.last())
        .copied()
        .unwrap_or(StatusCode::OK);
    status
}

async fn test_result(
    State(backend): State<Backend>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    backend.fetch_calls.fetch_add(1, Ordering::SeqCst);
    *backend.last_result_request.lock().unwrap() = Some(body);

    match backend.result_body.lock().unwrap().clone() {
        Some(body) => (StatusCode::OK, Json(body)),
        None => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({}))),
    }
}

async fn spawn_backend(backend: Backend) -> String {
    let app = Router::new()
        .route("/version/v1/diagnosis-keys", post(submit_keys))
        .route("/version/v1/testresult", post(test_result))
        .with_state(backend);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn client_for(base_url: &str, retry: RetryConfig) -> HttpSubmissionClient {
    let config = BackendConfig {
        submission_url: base_url.to_string(),
        verification_url: base_url.to_string(),
        timeout_secs: 5,
    };
    // Local test server must not be routed through any ambient proxy
    let http = reqwest::Client::builder()
        .no_proxy()
        .timeout(config.timeout())
        .build()
        .unwrap();
    HttpSubmissionClient::with_http_client(http, &config, retry)
}

fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        backoff_multiplier: 2.0,
    }
}

fn test_key() -> ProximityKey {
    ProximityKey::new(vec![0xab; KEY_DATA_LENGTH], 2_650_000, 6).unwrap()
}

#[tokio::test]
async fn test_submit_sends_keys_and_token() {
    let backend = Backend::default();
    let url = spawn_backend(backend.clone()).await;
    let client = client_for(&url, RetryConfig::none());

    client
        .submit(&[test_key()], &RegistrationToken::new(TOKEN))
        .await
        .unwrap();

    assert_eq!(
        backend.last_authorization.lock().unwrap().as_deref(),
        Some(TOKEN)
    );
    let body = backend.last_submission.lock().unwrap().clone().unwrap();
    assert_eq!(body["keys"][0]["keyData"], "ab".repeat(KEY_DATA_LENGTH));
    assert_eq!(body["keys"][0]["transmissionRiskLevel"], 6);
}

#[tokio::test]
async fn test_submit_maps_bad_request() {
    let backend = Backend::default().with_submit_statuses(vec![StatusCode::BAD_REQUEST]);
    let url = spawn_backend(backend.clone()).await;
    let client = client_for(&url, fast_retry());

    let err = client
        .submit(&[test_key()], &RegistrationToken::new(TOKEN))
        .await
        .unwrap_err();

    assert_eq!(err, TransportError::InvalidPayloadOrHeaders);
    assert_eq!(backend.submit_calls.load(Ordering::SeqCst), 1, "400 is not retried");
}

#[tokio::test]
async fn test_submit_maps_forbidden_to_invalid_token() {
    let backend = Backend::default().with_submit_statuses(vec![StatusCode::FORBIDDEN]);
    let url = spawn_backend(backend).await;
    let client = client_for(&url, RetryConfig::none());

    let err = client
        .submit(&[test_key()], &RegistrationToken::new(TOKEN))
        .await
        .unwrap_err();

    assert_eq!(err, TransportError::InvalidToken);
}

#[tokio::test]
async fn test_submit_is_sent_once_despite_retry_config() {
    let backend = Backend::default().with_submit_statuses(vec![
        StatusCode::SERVICE_UNAVAILABLE,
        StatusCode::FORBIDDEN,
    ]);
    let url = spawn_backend(backend.clone()).await;
    let client = client_for(&url, fast_retry());

    let err = client
        .submit(&[test_key()], &RegistrationToken::new(TOKEN))
        .await
        .unwrap_err();

    assert_eq!(err, TransportError::ServerError(503));
    assert_eq!(backend.submit_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_service_posts_keys_once_per_submission() {
    let backend = Backend::default().with_submit_statuses(vec![
        StatusCode::SERVICE_UNAVAILABLE,
        StatusCode::FORBIDDEN,
    ]);
    let url = spawn_backend(backend.clone()).await;
    let retry = RetryConfig::from(&RetrySettings {
        max_attempts: 3,
        initial_delay_ms: 1,
        max_delay_ms: 5,
    });

    let service = ExposureSubmissionService::new(
        Arc::new(MockKeyRetriever::with_keys(vec![test_key()])),
        Arc::new(client_for(&url, retry)),
        Arc::new(MockTokenStore::with_token(TOKEN)),
    );

    let err = service.submit_exposure().await.unwrap_err();

    assert_eq!(err.kind(), SubmissionErrorKind::Other);
    let cause = err
        .cause()
        .and_then(|cause| cause.downcast_ref::<TransportError>());
    assert_eq!(cause, Some(&TransportError::ServerError(503)));
    assert_eq!(backend.submit_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_fetch_result_returns_raw_code() {
    let backend = Backend::default().with_result_body(json!({ "testResult": 4 }));
    let url = spawn_backend(backend.clone()).await;
    let client = client_for(&url, RetryConfig::none());

    let code = client
        .fetch_result(&RegistrationToken::new(TOKEN))
        .await
        .unwrap();

    assert_eq!(code, 4);
    let request = backend.last_result_request.lock().unwrap().clone().unwrap();
    assert_eq!(request, json!({ "registrationToken": TOKEN }));
}

#[tokio::test]
async fn test_fetch_result_rejects_malformed_body() {
    let backend = Backend::default().with_result_body(json!({ "result": "positive" }));
    let url = spawn_backend(backend).await;
    let client = client_for(&url, RetryConfig::none());

    let err = client
        .fetch_result(&RegistrationToken::new(TOKEN))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_fetch_result_server_error_after_retries() {
    let backend = Backend::default();
    let url = spawn_backend(backend.clone()).await;
    let client = client_for(&url, fast_retry());

    let err = client
        .fetch_result(&RegistrationToken::new(TOKEN))
        .await
        .unwrap_err();

    assert_eq!(err, TransportError::ServerError(500));
    assert_eq!(backend.fetch_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(&format!("http://{}", addr), RetryConfig::none());
    let err = client
        .fetch_result(&RegistrationToken::new(TOKEN))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Network(_)));
}

#[tokio::test]
async fn test_service_end_to_end_over_http() {
    let backend = Backend::default().with_result_body(json!({ "testResult": 2 }));
    let url = spawn_backend(backend.clone()).await;

    let service = ExposureSubmissionService::new(
        Arc::new(MockKeyRetriever::with_keys(vec![test_key()])),
        Arc::new(client_for(&url, RetryConfig::none())),
        Arc::new(MockTokenStore::with_token(TOKEN)),
    );

    assert!(service.submit_exposure().await.is_ok());
    assert_eq!(service.get_test_result().await.unwrap(), TestResult::Positive);
    assert_eq!(backend.submit_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_service_surfaces_unknown_code_over_http() {
    let backend = Backend::default().with_result_body(json!({ "testResult": 4 }));
    let url = spawn_backend(backend).await;

    let service = ExposureSubmissionService::new(
        Arc::new(MockKeyRetriever::with_keys(Vec::new())),
        Arc::new(client_for(&url, RetryConfig::none())),
        Arc::new(MockTokenStore::with_token(TOKEN)),
    );

    let err = service.get_test_result().await.unwrap_err();
    assert_eq!(err.kind(), SubmissionErrorKind::Other);
}
