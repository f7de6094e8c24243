//! Client configuration.
//!
//! Options are fixed when the client is built. They can be constructed in
//! code or loaded from `~/.config/mygeotab-api/config.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "mygeotab-api";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Server used until a login or the credential store says otherwise.
pub const DEFAULT_SERVER: &str = "my.geotab.com";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 180;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientOptions {
    /// Persist issued sessions to the credential store and reuse them.
    pub remember_me: bool,
    /// Bound on a single transport send, in seconds. Zero disables it.
    pub timeout: u64,
    /// Return the whole `{status, data}` response instead of `data.result`.
    pub full_response: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            remember_me: true,
            timeout: DEFAULT_TIMEOUT_SECS,
            full_response: false,
        }
    }
}

impl ClientOptions {
    pub fn remember_me(mut self, remember_me: bool) -> Self {
        self.remember_me = remember_me;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = secs;
        self
    }

    pub fn full_response(mut self, full_response: bool) -> Self {
        self.full_response = full_response;
        self
    }

    /// The transport timeout, or `None` when disabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}

/// Build the JSON-RPC endpoint for a server.
///
/// A bare host is addressed over https. An explicit scheme is kept as-is.
pub fn call_url(server: &str) -> String {
    let server = if server.is_empty() { DEFAULT_SERVER } else { server };
    let trimmed = server.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        format!("{}/apiv1/", trimmed)
    } else {
        format!("https://{}/apiv1/", trimmed)
    }
}
