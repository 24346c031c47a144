//! Caller-facing error taxonomy shared by both service operations

use thiserror::Error;

use crate::client::TransportError;

/// Boxed underlying cause carried by [`SubmissionError::Other`]
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Closed set of outcomes a caller has to handle
#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("No proximity keys available for submission")]
    NoKeys,

    #[error("No registration token stored")]
    NoRegistrationToken,

    #[error("Submission failed: {0}")]
    Other(#[source] Cause),
}

/// Case tag of a [`SubmissionError`], for comparisons that ignore the cause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmissionErrorKind {
    NoKeys,
    NoRegistrationToken,
    Other,
}

impl SubmissionError {
    pub fn other<E>(cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SubmissionError::Other(Box::new(cause))
    }

    pub fn kind(&self) -> SubmissionErrorKind {
        match self {
            SubmissionError::NoKeys => SubmissionErrorKind::NoKeys,
            SubmissionError::NoRegistrationToken => SubmissionErrorKind::NoRegistrationToken,
            SubmissionError::Other(_) => SubmissionErrorKind::Other,
        }
    }

    /// Underlying cause of an `Other` error
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            SubmissionError::Other(cause) => Some(cause.as_ref()),
            _ => None,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            SubmissionError::NoKeys => {
                "No exposure keys are available yet. Please try again later.".to_string()
            }
            SubmissionError::NoRegistrationToken => {
                "This device is not registered for a test. Please scan your test QR code first."
                    .to_string()
            }
            SubmissionError::Other(_) => {
                "Something went wrong while contacting the server. Please try again.".to_string()
            }
        }
    }
}

/// Tag-only equality. Two `Other` errors are never equal, whatever their causes.
impl PartialEq for SubmissionError {
    fn eq(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (SubmissionError::NoKeys, SubmissionError::NoKeys)
                | (SubmissionError::NoRegistrationToken, SubmissionError::NoRegistrationToken)
        )
    }
}

impl From<TransportError> for SubmissionError {
    fn from(err: TransportError) -> Self {
        SubmissionError::other(err)
    }
}

impl From<UnknownTestResultCode> for SubmissionError {
    fn from(err: UnknownTestResultCode) -> Self {
        SubmissionError::other(err)
    }
}

/// Backend returned a test result code outside the known set
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Unknown test result code: {0}")]
pub struct UnknownTestResultCode(pub u32);
