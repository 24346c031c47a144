//! Mock collaborators for tests and local development

use async_trait::async_trait;
use shared::{ProximityKey, RegistrationToken};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock as StdRwLock;
use tokio::sync::RwLock;

use crate::client::{SubmissionClient, TransportError};
use crate::retrieval::{KeyRetrievalError, KeyRetriever};
use crate::store::TokenStore;

/// Key retriever returning a fixed result on every call
pub struct MockKeyRetriever {
    result: Result<Vec<ProximityKey>, KeyRetrievalError>,
    calls: AtomicUsize,
}

impl MockKeyRetriever {
    pub fn new(result: Result<Vec<ProximityKey>, KeyRetrievalError>) -> Self {
        Self {
            result,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_keys(keys: Vec<ProximityKey>) -> Self {
        Self::new(Ok(keys))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyRetriever for MockKeyRetriever {
    async fn retrieve_keys(&self) -> Result<Vec<ProximityKey>, KeyRetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Submission client with configurable outcomes that records every call.
///
/// By default submissions succeed and the test result code is 2 (positive).
pub struct MockSubmissionClient {
    submit_error: Option<TransportError>,
    result_code: Result<u32, TransportError>,
    submit_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    submissions: RwLock<Vec<(Vec<ProximityKey>, RegistrationToken)>>,
}

impl Default for MockSubmissionClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSubmissionClient {
    pub fn new() -> Self {
        Self {
            submit_error: None,
            result_code: Ok(2),
            submit_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            submissions: RwLock::new(Vec::new()),
        }
    }

    pub fn with_submit_error(mut self, error: TransportError) -> Self {
        self.submit_error = Some(error);
        self
    }

    pub fn with_result_code(mut self, code: u32) -> Self {
        self.result_code = Ok(code);
        self
    }

    pub fn with_fetch_error(mut self, error: TransportError) -> Self {
        self.result_code = Err(error);
        self
    }

    pub fn submit_count(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Keys and token of every submit call, in call order
    pub async fn submissions(&self) -> Vec<(Vec<ProximityKey>, RegistrationToken)> {
        self.submissions.read().await.clone()
    }
}

#[async_trait]
impl SubmissionClient for MockSubmissionClient {
    async fn submit(
        &self,
        keys: &[ProximityKey],
        token: &RegistrationToken,
    ) -> Result<(), TransportError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submissions
            .write()
            .await
            .push((keys.to_vec(), token.clone()));

        match &self.submit_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn fetch_result(&self, _token: &RegistrationToken) -> Result<u32, TransportError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.result_code.clone()
    }
}

/// Token store kept in memory that counts reads
#[derive(Default)]
pub struct MockTokenStore {
    token: StdRwLock<Option<RegistrationToken>>,
    reads: AtomicUsize,
}

impl MockTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<RegistrationToken>) -> Self {
        Self {
            token: StdRwLock::new(Some(token.into())),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl TokenStore for MockTokenStore {
    fn registration_token(&self) -> Option<RegistrationToken> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_registration_token(&self, token: RegistrationToken) -> shared::Result<()> {
        *self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token);
        Ok(())
    }
}
