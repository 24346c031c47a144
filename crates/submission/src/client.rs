//! Remote submission/result API contract

use async_trait::async_trait;
use shared::{ProximityKey, RegistrationToken};
use thiserror::Error;

/// Transport or protocol failure reported by a [`SubmissionClient`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Invalid payload or headers")]
    InvalidPayloadOrHeaders,

    #[error("Registration token rejected by the server")]
    InvalidToken,

    #[error("Server error: status {0}")]
    ServerError(u16),

    #[error("Request could not be built: {0}")]
    RequestCouldNotBeBuilt(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    /// Whether another attempt could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Network(_) => true,
            TransportError::ServerError(status) => *status >= 500,
            _ => false,
        }
    }
}

/// Remote operations needed by the submission service
#[async_trait]
pub trait SubmissionClient: Send + Sync {
    /// Upload `keys` under `token`
    async fn submit(
        &self,
        keys: &[ProximityKey],
        token: &RegistrationToken,
    ) -> Result<(), TransportError>;

    /// Fetch the raw test result code for `token`
    async fn fetch_result(&self, token: &RegistrationToken) -> Result<u32, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(TransportError::Network("reset".to_string()).is_transient());
        assert!(TransportError::ServerError(503).is_transient());
        assert!(!TransportError::ServerError(404).is_transient());
        assert!(!TransportError::InvalidToken.is_transient());
        assert!(!TransportError::InvalidPayloadOrHeaders.is_transient());
    }
}
