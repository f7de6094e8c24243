use serde::{Deserialize, Serialize};

/// Credentials identifying an authenticated session.
///
/// Issued by the server on login and replaced wholesale on re-authentication.
/// The password is never part of this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub database: String,
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

/// A live (credentials, server) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub credentials: Credentials,
    pub path: String,
}

/// Login material supplied when the client is constructed.
///
/// Either `password` (a login will be performed) or `session_id` (an
/// already-issued session is reused) must be present.
#[derive(Clone, Default, Deserialize)]
pub struct LoginCredentials {
    pub database: String,
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<String>,
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("database", &self.database)
            .field("user_name", &self.user_name)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("session_id", &self.session_id)
            .finish()
    }
}

impl LoginCredentials {
    pub fn with_password(database: &str, user_name: &str, password: &str) -> Self {
        Self {
            database: database.to_string(),
            user_name: user_name.to_string(),
            password: Some(password.to_string()),
            session_id: None,
        }
    }

    pub fn with_session_id(database: &str, user_name: &str, session_id: &str) -> Self {
        Self {
            database: database.to_string(),
            user_name: user_name.to_string(),
            password: None,
            session_id: Some(session_id.to_string()),
        }
    }

    /// Session credentials for a pre-supplied session id, if any.
    pub fn session_credentials(&self) -> Option<Credentials> {
        self.session_id.as_ref().map(|session_id| Credentials {
            database: self.database.clone(),
            user_name: self.user_name.clone(),
            session_id: session_id.clone(),
        })
    }
}

/// Constructor input: login material plus an optional server path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Authentication {
    pub credentials: LoginCredentials,
    #[serde(default)]
    pub path: Option<String>,
}

impl Authentication {
    pub fn new(credentials: LoginCredentials) -> Self {
        Self {
            credentials,
            path: None,
        }
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }
}
