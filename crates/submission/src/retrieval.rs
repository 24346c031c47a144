//! Access to the device-local proximity keys

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::ProximityKey;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyRetrievalError {
    #[error("Key retrieval not authorized by the user")]
    NotAuthorized,

    #[error("Key retrieval unavailable: {0}")]
    Unavailable(String),
}

/// Source of the keys recorded on this device for the recent window.
///
/// `Ok` with an empty vector means no keys exist; the service treats it the
/// same way as an error.
#[async_trait]
pub trait KeyRetriever: Send + Sync {
    async fn retrieve_keys(&self) -> Result<Vec<ProximityKey>, KeyRetrievalError>;
}

/// Key retriever backed by keys handed to it at runtime.
///
/// Keys older than the configured window are left out of every retrieval.
pub struct InMemoryKeyRetriever {
    keys: Arc<RwLock<Vec<ProximityKey>>>,
    window_days: u32,
    authorized: AtomicBool,
}

impl InMemoryKeyRetriever {
    pub fn new(window_days: u32) -> Self {
        Self {
            keys: Arc::new(RwLock::new(Vec::new())),
            window_days,
            authorized: AtomicBool::new(true),
        }
    }

    pub fn from_config(config: &shared::config::KeyRetrievalConfig) -> Self {
        Self::new(config.window_days)
    }

    pub async fn add_key(&self, key: ProximityKey) {
        self.keys.write().await.push(key);
    }

    pub fn set_authorized(&self, authorized: bool) {
        self.authorized.store(authorized, Ordering::SeqCst);
    }

    /// Keys inside the window ending at `now`, in insertion order
    pub async fn keys_at(&self, now: DateTime<Utc>) -> Vec<ProximityKey> {
        self.keys
            .read()
            .await
            .iter()
            .filter(|key| key.is_within_window(now, self.window_days))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl KeyRetriever for InMemoryKeyRetriever {
    async fn retrieve_keys(&self) -> Result<Vec<ProximityKey>, KeyRetrievalError> {
        if !self.authorized.load(Ordering::SeqCst) {
            return Err(KeyRetrievalError::NotAuthorized);
        }

        let keys = self.keys_at(Utc::now()).await;
        debug!(
            "Retrieved {} proximity keys from the last {} days",
            keys.len(),
            self.window_days
        );
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use shared::models::KEY_DATA_LENGTH;

    fn key_started(at: DateTime<Utc>) -> ProximityKey {
        ProximityKey::new(
            vec![1u8; KEY_DATA_LENGTH],
            ProximityKey::interval_number(at),
            2,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_retrieves_only_keys_within_window() {
        let retriever = InMemoryKeyRetriever::new(14);
        let now = Utc::now();
        let recent = key_started(now - Duration::days(1));
        let stale = key_started(now - Duration::days(30));

        retriever.add_key(stale).await;
        retriever.add_key(recent.clone()).await;

        let keys = retriever.retrieve_keys().await.unwrap();
        assert_eq!(keys, vec![recent]);
    }

    #[tokio::test]
    async fn test_empty_retriever_yields_no_keys() {
        let retriever = InMemoryKeyRetriever::new(14);
        assert!(retriever.retrieve_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_retrieval_fails() {
        let retriever = InMemoryKeyRetriever::new(14);
        retriever.add_key(key_started(Utc::now())).await;
        retriever.set_authorized(false);

        assert_eq!(
            retriever.retrieve_keys().await,
            Err(KeyRetrievalError::NotAuthorized)
        );
    }
}
