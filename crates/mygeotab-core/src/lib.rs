//! MyGeotab API client core.
//!
//! Authenticates against a MyGeotab server, caches the issued session,
//! renews it transparently when the server rejects it, and forwards named
//! JSON-RPC calls (including batched multi-calls) with the current
//! credentials attached.
//!
//! ```no_run
//! # async fn demo() -> Result<(), mygeotab_core::ApiError> {
//! use mygeotab_core::{ApiClient, Authentication, ClientOptions, LoginCredentials};
//! use serde_json::json;
//!
//! let auth = Authentication::new(LoginCredentials::with_password(
//!     "database",
//!     "user@example.com",
//!     "password",
//! ));
//! let api = ApiClient::new(auth, ClientOptions::default())?;
//! let devices = api.call("Get", json!({"typeName": "Device"})).await?;
//! # let _ = devices;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

#[cfg(test)]
mod testing;

pub use api::{
    ApiClient, ApiClientBuilder, ApiError, CallDispatcher, Callbacks, HttpTransport, Transport,
    TransportError, TransportErrorKind,
};
pub use auth::{
    default_credential_store, CredentialStore, FileCredentialStore, KeyringCredentialStore,
    MemoryCredentialStore, SessionManager, StoreError,
};
pub use config::ClientOptions;
pub use models::{Authentication, Credentials, LoginCredentials, RemoteError, RpcResponse, Session};
