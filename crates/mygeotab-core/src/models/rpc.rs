use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Credentials;

/// Method name of the login call.
pub const AUTHENTICATE_METHOD: &str = "Authenticate";

/// Reserved method name for batched calls.
pub const MULTI_CALL_METHOD: &str = "ExecuteMultiCall";

/// Login `path` value meaning "keep using the current server".
pub const THIS_SERVER: &str = "ThisServer";

/// Remote error type reported for an invalid or expired session.
pub const INVALID_USER_EXCEPTION: &str = "InvalidUserException";

/// JSON-RPC request body.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<'a> {
    pub method: &'a str,
    pub params: &'a Value,
}

/// Body of a JSON-RPC response: exactly one of `result` or `error` is expected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteError>,
}

/// Normalized transport response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub status: u16,
    pub data: RpcEnvelope,
}

impl RpcResponse {
    pub fn success(result: Value) -> Self {
        Self {
            status: 200,
            data: RpcEnvelope {
                result: Some(result),
                error: None,
            },
        }
    }

    pub fn failure(error: RemoteError) -> Self {
        Self {
            status: 200,
            data: RpcEnvelope {
                result: None,
                error: Some(error),
            },
        }
    }
}

/// Application-level error payload reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Value>,
}

impl RemoteError {
    /// Build an error payload of the given `data.type`.
    pub fn of_type(error_type: &str, message: &str) -> Self {
        Self {
            name: Some("JSONRPCError".to_string()),
            message: message.to_string(),
            code: None,
            data: Some(serde_json::json!({ "type": error_type })),
            errors: Vec::new(),
        }
    }

    /// The classified error type: `data.type`, falling back to `name`.
    pub fn error_type(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.get("type"))
            .and_then(Value::as_str)
            .or(self.name.as_deref())
    }

    pub fn is_session_expired(&self) -> bool {
        self.error_type() == Some(INVALID_USER_EXCEPTION)
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.error_type() {
            Some(t) => write!(f, "{}: {}", t, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// `result` of a successful login call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResult {
    pub credentials: Credentials,
    #[serde(default = "default_login_path")]
    pub path: String,
}

fn default_login_path() -> String {
    THIS_SERVER.to_string()
}

impl LoginResult {
    /// The server to switch to, or `None` when the sentinel says to stay put.
    pub fn redirect(&self) -> Option<&str> {
        Self::redirect_target(&self.path)
    }

    pub fn redirect_target(path: &str) -> Option<&str> {
        if path.is_empty() || path == THIS_SERVER {
            None
        } else {
            Some(path)
        }
    }
}

/// One entry of an `ExecuteMultiCall` batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiCallEntry {
    pub method: String,
    pub params: Value,
}
