use serde::{Deserialize, Serialize};
use shared::config::StorageConfig;
use shared::{Error, RegistrationToken, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use submission::TokenStore;
use tracing::{debug, info};

/// Token store that lives only as long as the process
#[derive(Default)]
pub struct InMemoryTokenStore {
    token: RwLock<Option<RegistrationToken>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for InMemoryTokenStore {
    fn registration_token(&self) -> Option<RegistrationToken> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_registration_token(&self, token: RegistrationToken) -> Result<()> {
        *self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token);
        Ok(())
    }
}

/// On-disk format of the token file
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredToken {
    registration_token: Option<RegistrationToken>,
}

/// Token store persisted as a single JSON document.
///
/// The file is read once on open and rewritten on every set. Writes go to a
/// sibling temp file first and are renamed into place.
pub struct FileTokenStore {
    path: PathBuf,
    token: RwLock<Option<RegistrationToken>>,
}

impl FileTokenStore {
    /// Open the store at `path`. A missing file means no token.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let stored = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<StoredToken>(&bytes).map_err(|e| {
                Error::Storage(format!("Corrupt token file {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No token file at {}, starting empty", path.display());
                StoredToken::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            token: RwLock::new(stored.registration_token),
        })
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        Self::open(&config.token_path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, stored: &StoredToken) -> Result<()> {
        let json = serde_json::to_vec_pretty(stored)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn registration_token(&self) -> Option<RegistrationToken> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_registration_token(&self, token: RegistrationToken) -> Result<()> {
        // Hold the write lock across the write so concurrent sets cannot interleave
        let mut current = self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        self.persist(&StoredToken {
            registration_token: Some(token.clone()),
        })?;

        info!("Stored registration token {}", token);
        *current = Some(token);
        Ok(())
    }
}
