use async_trait::async_trait;
use keyring::Entry;
use tracing::warn;

use super::{CredentialStore, StoreError};
use crate::config::{APP_NAME, DEFAULT_SERVER};
use crate::models::{Credentials, Session};

const CREDENTIALS_KEY: &str = "geotabAPI_credentials";
const SERVER_KEY: &str = "geotabAPI_server";

/// Stores the session in the OS keychain as two entries: the serialized
/// credentials and the server address.
#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    service: String,
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new(APP_NAME)
    }
}

impl KeyringCredentialStore {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, StoreError> {
        Ok(Entry::new(&self.service, key)?)
    }

    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl CredentialStore for KeyringCredentialStore {
    async fn get(&self) -> Result<Option<Session>, StoreError> {
        let Some(stored) = self.read(CREDENTIALS_KEY)? else {
            return Ok(None);
        };
        let credentials: Credentials = match serde_json::from_str(&stored) {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed credentials in keychain");
                return Ok(None);
            }
        };
        let path = self
            .read(SERVER_KEY)?
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SERVER.to_string());
        Ok(Some(Session { credentials, path }))
    }

    async fn set(&self, credentials: &Credentials, server: &str) -> Result<(), StoreError> {
        let serialized = serde_json::to_string(credentials)?;
        self.entry(CREDENTIALS_KEY)?.set_password(&serialized)?;
        if !server.is_empty() {
            self.entry(SERVER_KEY)?.set_password(server)?;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.delete(CREDENTIALS_KEY)?;
        self.delete(SERVER_KEY)
    }
}
