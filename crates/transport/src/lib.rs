//! HTTP implementation of the submission client

pub mod http_client;
pub mod retry;

pub use http_client::HttpSubmissionClient;
pub use retry::{retry_with_backoff, RetryConfig};
