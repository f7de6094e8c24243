//! Session lifecycle and credential persistence.
//!
//! This module provides:
//! - `SessionManager`: owns the current credentials and server, sources them
//!   per call and performs single-flight logins
//! - `CredentialStore`: pluggable durable storage for issued sessions, with
//!   file (the default), keyring and in-memory implementations

pub mod credentials;
pub mod file_store;
pub mod session;
pub mod store;

pub use credentials::KeyringCredentialStore;
pub use file_store::{default_credential_store, FileCredentialStore};
pub use session::SessionManager;
pub use store::{CredentialStore, MemoryCredentialStore, StoreError};
