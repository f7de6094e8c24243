use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Credentials, Session};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage location unavailable: {0}")]
    Unavailable(String),
}

/// Durable storage for the most recently issued session.
///
/// `get` returns `None` when nothing usable is stored, including when the
/// stored data is malformed.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self) -> Result<Option<Session>, StoreError>;

    async fn set(&self, credentials: &Credentials, server: &str) -> Result<(), StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;
}

/// Process-local store. Data is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    session: Mutex<Option<Session>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self) -> Result<Option<Session>, StoreError> {
        Ok(self.slot().clone())
    }

    async fn set(&self, credentials: &Credentials, server: &str) -> Result<(), StoreError> {
        *self.slot() = Some(Session {
            credentials: credentials.clone(),
            path: server.to_string(),
        });
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.slot().take();
        Ok(())
    }
}
