use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{CredentialStore, MemoryCredentialStore, StoreError};
use crate::config::{APP_NAME, DEFAULT_SERVER};
use crate::models::{Credentials, Session};

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    credentials: Credentials,
    #[serde(default)]
    server: Option<String>,
}

/// Persists the session as JSON in a cache directory.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    cache_dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Store under the platform cache directory, e.g. `~/.cache/mygeotab-api`.
    pub fn in_cache_dir() -> Result<Self, StoreError> {
        let cache_root = dirs::cache_dir()
            .ok_or_else(|| StoreError::Unavailable("Could not find cache directory".into()))?;
        Ok(Self::under(&cache_root))
    }

    /// Store in this crate's directory below `cache_root`.
    pub fn under(cache_root: &Path) -> Self {
        Self::new(cache_root.join(APP_NAME))
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

/// The store a client uses when none is injected: the session file in the
/// platform cache directory, or memory only when there is no cache directory.
pub fn default_credential_store() -> Arc<dyn CredentialStore> {
    match FileCredentialStore::in_cache_dir() {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(error = %e, "Sessions will not outlive this process");
            Arc::new(MemoryCredentialStore::new())
        }
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self) -> Result<Option<Session>, StoreError> {
        let path = self.session_path();
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<StoredSession>(&contents) {
            Ok(stored) => Ok(Some(Session {
                credentials: stored.credentials,
                path: stored.server.unwrap_or_else(|| DEFAULT_SERVER.to_string()),
            })),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring malformed session file");
                Ok(None)
            }
        }
    }

    async fn set(&self, credentials: &Credentials, server: &str) -> Result<(), StoreError> {
        let path = self.session_path();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let stored = StoredSession {
            credentials: credentials.clone(),
            server: (!server.is_empty()).then(|| server.to_string()),
        };
        tokio::fs::write(&path, serde_json::to_string_pretty(&stored)?).await?;
        debug!(path = %path.display(), "Session saved");
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.session_path()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
