use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use shared::config::{BackendConfig, Config};
use shared::{ProximityKey, RegistrationToken};
use submission::{SubmissionClient, TransportError};
use tracing::{debug, warn};

use crate::retry::{retry_with_backoff, RetryConfig};

const SUBMISSION_PATH: &str = "/version/v1/diagnosis-keys";
const TEST_RESULT_PATH: &str = "/version/v1/testresult";

const AUTHORIZATION_HEADER: &str = "cwa-authorization";
const FAKE_HEADER: &str = "cwa-fake";

/// Client for the diagnosis key submission and verification servers.
///
/// The retry policy only applies to test result queries; key submission is
/// never repeated.
pub struct HttpSubmissionClient {
    client: Client,
    submission_url: String,
    verification_url: String,
    retry: RetryConfig,
}

#[derive(Debug, Serialize)]
struct SubmissionPayload<'a> {
    keys: &'a [ProximityKey],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TestResultRequest<'a> {
    registration_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestResultResponse {
    test_result: u32,
}

impl HttpSubmissionClient {
    pub fn new(config: &BackendConfig, retry: RetryConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| {
                TransportError::RequestCouldNotBeBuilt(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self::with_http_client(client, config, retry))
    }

    /// Use a preconfigured reqwest client, e.g. one with custom proxy or TLS settings
    pub fn with_http_client(client: Client, config: &BackendConfig, retry: RetryConfig) -> Self {
        Self {
            client,
            submission_url: config.submission_url.trim_end_matches('/').to_string(),
            verification_url: config.verification_url.trim_end_matches('/').to_string(),
            retry,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        Self::new(&config.backend, RetryConfig::from(&config.retry))
    }

    async fn submit_once(
        &self,
        keys: &[ProximityKey],
        token: &RegistrationToken,
    ) -> Result<(), TransportError> {
        let url = format!("{}{}", self.submission_url, SUBMISSION_PATH);

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION_HEADER, token.as_str())
            .header(FAKE_HEADER, "0")
            .json(&SubmissionPayload { keys })
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        warn!("Submission server returned {}: {}", status, body);
        Err(map_status(status))
    }

    async fn fetch_result_once(&self, token: &RegistrationToken) -> Result<u32, TransportError> {
        let url = format!("{}{}", self.verification_url, TEST_RESULT_PATH);

        let response = self
            .client
            .post(&url)
            .json(&TestResultRequest {
                registration_token: token.as_str(),
            })
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Verification server returned {}: {}", status, body);
            return Err(map_status(status));
        }

        let body: TestResultResponse = response.json().await.map_err(|e| {
            TransportError::InvalidResponse(format!("Failed to parse test result response: {}", e))
        })?;

        Ok(body.test_result)
    }
}

#[async_trait]
impl SubmissionClient for HttpSubmissionClient {
    async fn submit(
        &self,
        keys: &[ProximityKey],
        token: &RegistrationToken,
    ) -> Result<(), TransportError> {
        // Single attempt: the server may have accepted the keys and consumed
        // the token even when the response is lost or a 5xx.
        debug!("POST {} keys to submission server", keys.len());
        self.submit_once(keys, token).await
    }

    async fn fetch_result(&self, token: &RegistrationToken) -> Result<u32, TransportError> {
        debug!("POST test result query for token {}", token);
        retry_with_backoff(
            "fetch_test_result",
            &self.retry,
            TransportError::is_transient,
            || self.fetch_result_once(token),
        )
        .await
    }
}

fn map_status(status: StatusCode) -> TransportError {
    match status {
        StatusCode::BAD_REQUEST => TransportError::InvalidPayloadOrHeaders,
        StatusCode::FORBIDDEN => TransportError::InvalidToken,
        other => TransportError::ServerError(other.as_u16()),
    }
}

fn map_request_error(err: reqwest::Error) -> TransportError {
    if err.is_builder() {
        TransportError::RequestCouldNotBeBuilt(err.to_string())
    } else {
        TransportError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            map_status(StatusCode::BAD_REQUEST),
            TransportError::InvalidPayloadOrHeaders
        );
        assert_eq!(map_status(StatusCode::FORBIDDEN), TransportError::InvalidToken);
        assert_eq!(
            map_status(StatusCode::SERVICE_UNAVAILABLE),
            TransportError::ServerError(503)
        );
        assert_eq!(map_status(StatusCode::NOT_FOUND), TransportError::ServerError(404));
    }

    #[test]
    fn test_trailing_slashes_are_trimmed() {
        let config = BackendConfig {
            submission_url: "https://submission.example/".to_string(),
            verification_url: "https://verification.example//".to_string(),
            timeout_secs: 5,
        };

        let client = HttpSubmissionClient::new(&config, RetryConfig::none()).unwrap();
        assert_eq!(client.submission_url, "https://submission.example");
        assert_eq!(client.verification_url, "https://verification.example");
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            backend: BackendConfig {
                submission_url: "https://submission.example".to_string(),
                verification_url: "https://verification.example".to_string(),
                timeout_secs: 10,
            },
            retry: shared::config::RetrySettings {
                max_attempts: 5,
                initial_delay_ms: 50,
                max_delay_ms: 500,
            },
            storage: shared::config::StorageConfig {
                token_path: "token.json".into(),
            },
            key_retrieval: shared::config::KeyRetrievalConfig { window_days: 14 },
        };

        let client = HttpSubmissionClient::from_config(&config).unwrap();
        assert_eq!(client.retry.max_attempts, 5);
        assert_eq!(client.verification_url, "https://verification.example");
    }

    #[test]
    fn test_test_result_request_shape() {
        let json = serde_json::to_value(TestResultRequest {
            registration_token: "abc",
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "registrationToken": "abc" }));
    }
}
