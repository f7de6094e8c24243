//! JSON-RPC client module for the MyGeotab API.
//!
//! This module provides the `ApiClient` facade, the `CallDispatcher` that
//! attaches credentials and renews rejected sessions, and the `Transport`
//! seam with its reqwest-backed implementation.
//!
//! All calls are `POST https://<server>/apiv1/` with a `{method, params}`
//! body; the session id travels in `params.credentials`.

pub mod callbacks;
pub mod client;
pub mod dispatcher;
pub mod error;
pub mod transport;

pub use callbacks::Callbacks;
pub use client::{ApiClient, ApiClientBuilder};
pub use dispatcher::CallDispatcher;
pub use error::{ApiError, TransportError, TransportErrorKind};
pub use transport::{HttpTransport, Transport};
