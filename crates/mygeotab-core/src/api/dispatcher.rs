use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{ApiError, Transport};
use crate::auth::SessionManager;
use crate::models::{Credentials, RpcEnvelope, RpcResponse, Session, AUTHENTICATE_METHOD};

/// Sends one logical call with credentials attached.
///
/// A call whose session is rejected is re-authenticated and resent exactly
/// once. Login calls and any other error are returned without a retry.
#[derive(Clone)]
pub struct CallDispatcher {
    session: Arc<SessionManager>,
    transport: Arc<dyn Transport>,
    timeout: Option<Duration>,
    full_response: bool,
}

impl CallDispatcher {
    pub fn new(session: Arc<SessionManager>, transport: Arc<dyn Transport>) -> Self {
        let timeout = session.options().request_timeout();
        let full_response = session.options().full_response;
        Self {
            session,
            transport,
            timeout,
            full_response,
        }
    }

    /// Dispatch and shape the response: the whole response when configured
    /// for full responses, otherwise `data.result` with remote errors as `Err`.
    pub async fn dispatch(&self, method: &str, params: Value) -> Result<Value, ApiError> {
        let response = self.dispatch_raw(method, params).await?;
        shape_response(method, response, self.full_response)
    }

    /// Dispatch and return the transport response untouched. Remote errors
    /// are inside the response; `Err` carries authentication, transport and
    /// store failures.
    pub async fn dispatch_raw(&self, method: &str, params: Value) -> Result<RpcResponse, ApiError> {
        if method == AUTHENTICATE_METHOD {
            return self.dispatch_login(params).await;
        }

        let mut params = object_params(params)?;
        let session = self.session.resolve().await?;
        let response = self.send(method, &session, &mut params).await?;

        let rejected = match &response.data.error {
            Some(error) if error.is_session_expired() => error.clone(),
            _ => return Ok(response),
        };

        warn!(method = method, "Session rejected by server, re-authenticating");
        let renewed = self
            .session
            .refresh_after_rejection(&session.credentials, &rejected)
            .await?;
        debug!(method = method, server = %renewed.path, "Retrying with renewed session");
        self.send(method, &renewed, &mut params).await
    }

    /// A direct `Authenticate` call goes through the session's single-flight
    /// login, so it cannot race a login the session is already running. The
    /// params must name the configured identity.
    async fn dispatch_login(&self, params: Value) -> Result<RpcResponse, ApiError> {
        if !self.session.matches_login(&params) {
            return Err(ApiError::Configuration(
                "Authenticate params must match the configured database and userName".into(),
            ));
        }
        match self.session.login_session().await {
            Ok(session) => Ok(RpcResponse::success(json!({
                "credentials": session.credentials,
                "path": session.path,
            }))),
            Err(ApiError::Authentication(error)) => Ok(RpcResponse::failure(error)),
            Err(e) => Err(e),
        }
    }

    async fn send(
        &self,
        method: &str,
        session: &Session,
        params: &mut Value,
    ) -> Result<RpcResponse, ApiError> {
        attach_credentials(params, &session.credentials)?;
        Ok(self
            .transport
            .send(method, &session.path, params, self.timeout)
            .await?)
    }
}

/// Call params are a JSON object; a missing (null) params value becomes `{}`.
fn object_params(params: Value) -> Result<Value, ApiError> {
    match params {
        Value::Null => Ok(Value::Object(Default::default())),
        Value::Object(_) => Ok(params),
        _ => Err(ApiError::Configuration(
            "call parameters must be a JSON object".into(),
        )),
    }
}

fn attach_credentials(params: &mut Value, credentials: &Credentials) -> Result<(), ApiError> {
    let Some(object) = params.as_object_mut() else {
        return Err(ApiError::Configuration(
            "call parameters must be a JSON object".into(),
        ));
    };
    let credentials = serde_json::to_value(credentials)
        .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
    object.insert("credentials".to_string(), credentials);
    Ok(())
}

/// Reshape a transport response into what the caller asked for.
pub fn shape_response(
    method: &str,
    response: RpcResponse,
    full_response: bool,
) -> Result<Value, ApiError> {
    if full_response {
        return serde_json::to_value(&response)
            .map_err(|e| ApiError::InvalidResponse(e.to_string()));
    }
    match response.data {
        RpcEnvelope {
            error: Some(error), ..
        } => Err(ApiError::from_remote(method, error)),
        RpcEnvelope { result, .. } => Ok(result.unwrap_or(Value::Null)),
    }
}
