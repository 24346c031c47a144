use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::SubmissionClient;
use crate::error::SubmissionError;
use crate::result::TestResult;
use crate::retrieval::KeyRetriever;
use crate::store::TokenStore;

/// Orchestrates key submission and test result retrieval.
///
/// Holds no mutable state of its own: the registration token lives in the
/// [`TokenStore`], keys and result codes only live for the duration of a call.
/// One instance can serve any number of concurrent calls.
pub struct ExposureSubmissionService {
    key_retriever: Arc<dyn KeyRetriever>,
    client: Arc<dyn SubmissionClient>,
    store: Arc<dyn TokenStore>,
}

impl ExposureSubmissionService {
    pub fn new(
        key_retriever: Arc<dyn KeyRetriever>,
        client: Arc<dyn SubmissionClient>,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            key_retriever,
            client,
            store,
        }
    }

    /// Whether the enrollment flow has stored a registration token
    pub fn has_registration_token(&self) -> bool {
        self.store.registration_token().is_some()
    }

    /// Submit the locally recorded keys under the stored registration token.
    ///
    /// Both preconditions are checked before any network I/O: keys first,
    /// then the token. At most one submit call is made and it is never retried.
    pub async fn submit_exposure(&self) -> Result<(), SubmissionError> {
        debug!("Retrieving proximity keys for submission");
        let keys = match self.key_retriever.retrieve_keys().await {
            Ok(keys) if !keys.is_empty() => keys,
            Ok(_) => {
                warn!("Exposure submission aborted: no proximity keys available");
                return Err(SubmissionError::NoKeys);
            }
            Err(e) => {
                warn!("Exposure submission aborted: key retrieval failed: {}", e);
                return Err(SubmissionError::NoKeys);
            }
        };

        let token = self.store.registration_token().ok_or_else(|| {
            warn!("Exposure submission aborted: no registration token stored");
            SubmissionError::NoRegistrationToken
        })?;

        debug!("Submitting {} proximity keys for token {}", keys.len(), token);
        if let Err(e) = self.client.submit(&keys, &token).await {
            warn!("Exposure submission failed: {}", e);
            return Err(SubmissionError::from(e));
        }

        info!("Submitted {} proximity keys", keys.len());
        Ok(())
    }

    /// Fetch and interpret the test result for the stored registration token.
    ///
    /// A code outside the known set fails with `Other`, carrying the code.
    pub async fn get_test_result(&self) -> Result<TestResult, SubmissionError> {
        let token = self.store.registration_token().ok_or_else(|| {
            warn!("Test result query aborted: no registration token stored");
            SubmissionError::NoRegistrationToken
        })?;

        debug!("Fetching test result for token {}", token);
        let code = self.client.fetch_result(&token).await.map_err(|e| {
            warn!("Fetching test result failed: {}", e);
            SubmissionError::from(e)
        })?;

        let result = TestResult::try_from(code).map_err(|e| {
            warn!("Backend returned an unparseable test result: {}", e);
            SubmissionError::from(e)
        })?;

        info!("Received test result: {}", result);
        Ok(result)
    }

    /// Run [`submit_exposure`](Self::submit_exposure) on the tokio runtime and
    /// hand the outcome to `completion`, which is called exactly once.
    pub fn submit_exposure_with<F>(self: &Arc<Self>, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(Option<SubmissionError>) + Send + 'static,
    {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = service.submit_exposure().await;
            completion(outcome.err());
        })
    }

    /// Run [`get_test_result`](Self::get_test_result) on the tokio runtime and
    /// hand the outcome to `completion`, which is called exactly once.
    pub fn get_test_result_with<F>(self: &Arc<Self>, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<TestResult, SubmissionError>) + Send + 'static,
    {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = service.get_test_result().await;
            completion(outcome);
        })
    }
}
