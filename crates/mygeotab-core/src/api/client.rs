//! Public entry point for MyGeotab API calls.
//!
//! `ApiClient` composes a `SessionManager` and a `CallDispatcher`. It holds no
//! session logic of its own.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use super::{ApiError, CallDispatcher, HttpTransport, Transport};
use crate::auth::{default_credential_store, CredentialStore, SessionManager};
use crate::config::ClientOptions;
use crate::models::{Authentication, Credentials, MultiCallEntry, Session, MULTI_CALL_METHOD};

/// MyGeotab API client.
/// Clone is cheap - the session and transport are shared.
#[derive(Clone)]
pub struct ApiClient {
    session: Arc<SessionManager>,
    dispatcher: CallDispatcher,
}

impl ApiClient {
    /// Create a client with the HTTP transport and the session file store.
    pub fn new(authentication: Authentication, options: ClientOptions) -> Result<Self, ApiError> {
        Self::builder(authentication).options(options).build()
    }

    pub fn builder(authentication: Authentication) -> ApiClientBuilder {
        ApiClientBuilder {
            authentication,
            options: ClientOptions::default(),
            store: None,
            transport: None,
        }
    }

    pub fn options(&self) -> &ClientOptions {
        self.session.options()
    }

    /// The server calls are currently sent to.
    pub fn server(&self) -> String {
        self.session.server()
    }

    /// Log in with the configured database, user and password.
    pub async fn authenticate(&self) -> Result<Credentials, ApiError> {
        self.session.authenticate().await
    }

    /// Call a remote method.
    ///
    /// Returns `data.result`, or the whole `{status, data}` response when the
    /// client was built with `full_response`.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, ApiError> {
        self.dispatcher.dispatch(method, params).await
    }

    /// Call a remote method and decode its result.
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ApiError> {
        let response = self.dispatcher.dispatch_raw(method, params).await?;
        let result = super::dispatcher::shape_response(method, response, false)?;
        serde_json::from_value(result).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse {} result: {}", method, e))
        })
    }

    /// Send several calls in one `ExecuteMultiCall` request.
    pub async fn multi_call<I, S>(&self, calls: I) -> Result<Value, ApiError>
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let calls: Vec<MultiCallEntry> = calls
            .into_iter()
            .map(|(method, params)| MultiCallEntry {
                method: method.into(),
                params,
            })
            .collect();
        debug!(count = calls.len(), "Sending multi-call");
        self.call(MULTI_CALL_METHOD, json!({ "calls": calls })).await
    }

    /// The cached session unless `force_new`, otherwise a fresh login.
    pub async fn get_session(&self, force_new: bool) -> Result<Session, ApiError> {
        if !force_new {
            if let Some(session) = self.session.cached().await? {
                return Ok(session);
            }
        }
        self.session.login_session().await
    }

    /// Drop the current session everywhere and log in again.
    pub async fn forget(&self) -> Result<Credentials, ApiError> {
        self.session.forget().await?;
        self.session.authenticate().await
    }
}

pub struct ApiClientBuilder {
    authentication: Authentication,
    options: ClientOptions,
    store: Option<Arc<dyn CredentialStore>>,
    transport: Option<Arc<dyn Transport>>,
}

impl ApiClientBuilder {
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the default session file store.
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the default HTTP transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<ApiClient, ApiError> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new()?),
        };
        let store = match self.store {
            Some(store) => store,
            None => default_credential_store(),
        };

        let session = Arc::new(SessionManager::new(
            self.authentication,
            self.options,
            store,
            transport.clone(),
        )?);
        let dispatcher = CallDispatcher::new(session.clone(), transport);
        Ok(ApiClient {
            session,
            dispatcher,
        })
    }
}
