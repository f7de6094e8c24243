use std::sync::{Arc, Mutex, RwLock};

use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::CredentialStore;
use crate::api::{ApiError, Transport};
use crate::config::{ClientOptions, DEFAULT_SERVER};
use crate::models::{
    Authentication, Credentials, LoginCredentials, LoginResult, RemoteError, Session,
    AUTHENTICATE_METHOD,
};

type LoginOutcome = Result<Session, ApiError>;

#[derive(Debug)]
struct SessionState {
    credentials: Option<Credentials>,
    server: String,
    /// A construction-time session id that still has to be written to the store.
    unsaved: bool,
}

/// Owns the current session and decides where credentials come from.
///
/// Sources are tried cheapest first: in-memory credentials, the credential
/// store (when `remember_me` is on), then a fresh login. Concurrent logins
/// are coalesced so only one `Authenticate` request is in flight at a time.
pub struct SessionManager {
    login: LoginCredentials,
    options: ClientOptions,
    state: RwLock<SessionState>,
    store: Arc<dyn CredentialStore>,
    transport: Arc<dyn Transport>,
    in_flight: Mutex<Option<broadcast::Sender<LoginOutcome>>>,
}

impl SessionManager {
    /// Validate the constructor input and build the manager.
    pub fn new(
        authentication: Authentication,
        options: ClientOptions,
        store: Arc<dyn CredentialStore>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ApiError> {
        let Authentication { credentials: login, path } = authentication;

        if login.database.is_empty() {
            return Err(ApiError::Configuration("database not provided".into()));
        }
        if login.user_name.is_empty() {
            return Err(ApiError::Configuration("userName not provided".into()));
        }
        if login.password.is_none() && login.session_id.is_none() {
            return Err(ApiError::Configuration(
                "authentication must provide either a password or a sessionId".into(),
            ));
        }
        if login.session_id.is_some() && path.is_none() {
            return Err(ApiError::Configuration(
                "Must provide server path if providing sessionId in authentication object".into(),
            ));
        }

        let credentials = login.session_credentials();
        let state = SessionState {
            unsaved: credentials.is_some() && options.remember_me,
            credentials,
            server: path
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| DEFAULT_SERVER.to_string()),
        };

        Ok(Self {
            login,
            options,
            state: RwLock::new(state),
            store,
            transport,
            in_flight: Mutex::new(None),
        })
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// The server calls are currently sent to.
    pub fn server(&self) -> String {
        self.read_state().server.clone()
    }

    /// The in-memory session, if any.
    pub fn current(&self) -> Option<Session> {
        let state = self.read_state();
        state.credentials.clone().map(|credentials| Session {
            credentials,
            path: state.server.clone(),
        })
    }

    /// Whether a fresh login is possible at all.
    pub fn can_login(&self) -> bool {
        self.login.password.is_some()
    }

    /// Produce a session for an outgoing call without forcing a login when a
    /// usable one exists.
    pub async fn resolve(&self) -> Result<Session, ApiError> {
        if let Some(session) = self.cached().await? {
            return Ok(session);
        }
        self.login_session().await
    }

    /// The in-memory session, else the stored one when `remember_me` is on.
    /// Never touches the network.
    pub async fn cached(&self) -> Result<Option<Session>, ApiError> {
        if let Some(session) = self.current() {
            self.persist_unsaved(&session).await?;
            return Ok(Some(session));
        }
        if !self.options.remember_me {
            return Ok(None);
        }
        match self.store.get().await? {
            Some(stored) => {
                debug!(server = %stored.path, "Restored session from credential store");
                let mut state = self.write_state();
                if !stored.path.is_empty() {
                    state.server = stored.path.clone();
                }
                state.credentials = Some(stored.credentials.clone());
                Ok(Some(Session {
                    credentials: stored.credentials,
                    path: state.server.clone(),
                }))
            }
            None => Ok(None),
        }
    }

    /// Log in with the configured database, user and password.
    pub async fn authenticate(&self) -> Result<Credentials, ApiError> {
        self.login_session().await.map(|s| s.credentials)
    }

    /// Single-flight login: callers arriving while a login is outstanding
    /// wait for its outcome instead of sending another request.
    pub async fn login_session(&self) -> LoginOutcome {
        self.single_flight(None).await
    }

    /// Whether the params of a direct `Authenticate` call name the configured
    /// database and user (and password, when one is given).
    pub fn matches_login(&self, params: &Value) -> bool {
        let password_matches = match params.get("password").and_then(Value::as_str) {
            Some(password) => self.login.password.as_deref() == Some(password),
            None => true,
        };
        params.get("database").and_then(Value::as_str) == Some(self.login.database.as_str())
            && params.get("userName").and_then(Value::as_str)
                == Some(self.login.user_name.as_str())
            && password_matches
    }

    /// Run a login, or join the one already outstanding. With `rejected` set
    /// the leader forgets the rejected session (memory and store) before it
    /// logs in, so no other caller can slip a login in between.
    async fn single_flight(&self, rejected: Option<&Credentials>) -> LoginOutcome {
        loop {
            let mut receiver = match self.enter_flight(rejected) {
                Flight::Reuse(session) => {
                    debug!("Session already renewed by another call");
                    return Ok(session);
                }
                Flight::Join(receiver) => receiver,
                Flight::Lead => {
                    let flight = InFlight {
                        slot: &self.in_flight,
                    };
                    let outcome = match rejected {
                        Some(_) => self.replace_session().await,
                        None => self.login().await,
                    };
                    flight.complete(outcome.clone());
                    return outcome;
                }
            };

            debug!("Joining in-flight login");
            match receiver.recv().await {
                Ok(outcome) => return outcome,
                // The leading login was dropped before finishing; take over.
                Err(_) => continue,
            }
        }
    }

    fn enter_flight(&self, rejected: Option<&Credentials>) -> Flight {
        let mut slot = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(sender) = slot.as_ref() {
            return Flight::Join(sender.subscribe());
        }
        if let (Some(rejected), Some(current)) = (rejected, self.current()) {
            if current.credentials.session_id != rejected.session_id {
                return Flight::Reuse(current);
            }
        }
        let (sender, _) = broadcast::channel(1);
        *slot = Some(sender);
        Flight::Lead
    }

    async fn replace_session(&self) -> LoginOutcome {
        self.forget().await?;
        self.login().await
    }

    async fn login(&self) -> LoginOutcome {
        let Some(password) = self.login.password.as_deref() else {
            return Err(ApiError::Configuration(
                "password required to authenticate".into(),
            ));
        };
        let params = json!({
            "database": self.login.database,
            "userName": self.login.user_name,
            "password": password,
        });
        let server = self.server();
        info!(database = %self.login.database, server = %server, "Authenticating");

        let response = self
            .transport
            .send(
                AUTHENTICATE_METHOD,
                &server,
                &params,
                self.options.request_timeout(),
            )
            .await?;

        if let Some(error) = response.data.error {
            warn!(error_type = ?error.error_type(), "Authentication rejected");
            return Err(ApiError::Authentication(error));
        }
        let result = response.data.result.ok_or_else(|| {
            ApiError::InvalidResponse("authentication response carried no result".into())
        })?;
        let login: LoginResult = serde_json::from_value(result).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse authentication result: {}", e))
        })?;

        self.accept_login(login).await
    }

    /// Adopt the result of a successful login: follow a server redirect,
    /// persist when remembered and replace the in-memory credentials.
    async fn accept_login(&self, login: LoginResult) -> LoginOutcome {
        let server = self.update_server_from_response(&login.path);
        self.persist_if_remembered(&login.credentials, &server)
            .await?;
        {
            let mut state = self.write_state();
            state.credentials = Some(login.credentials.clone());
            state.unsaved = false;
        }
        debug!(server = %server, "Session established");
        Ok(Session {
            credentials: login.credentials,
            path: server,
        })
    }

    /// Switch servers unless `path` is the "this server" sentinel.
    /// Returns the server in effect afterwards.
    pub fn update_server_from_response(&self, path: &str) -> String {
        let mut state = self.write_state();
        let redirect = LoginResult::redirect_target(path);
        if let Some(target) = redirect {
            if target != state.server {
                info!(from = %state.server, to = %target, "Server changed by login response");
            }
            state.server = target.to_string();
        }
        state.server.clone()
    }

    pub async fn persist_if_remembered(
        &self,
        credentials: &Credentials,
        server: &str,
    ) -> Result<(), ApiError> {
        if self.options.remember_me {
            self.store.set(credentials, server).await?;
        }
        Ok(())
    }

    /// Clear the store and the in-memory credentials, whatever `remember_me`
    /// says. Does not log in again.
    pub async fn forget(&self) -> Result<(), ApiError> {
        {
            let mut state = self.write_state();
            state.credentials = None;
            state.unsaved = false;
        }
        self.store.clear().await?;
        Ok(())
    }

    /// Recover from the server rejecting `rejected`.
    ///
    /// If another call already replaced the rejected session, its successor is
    /// returned as-is. Otherwise the session is forgotten and a fresh login is
    /// performed, coalesced with any other login in flight. Without a password
    /// to log in with, the rejection is surfaced as an authentication error.
    pub async fn refresh_after_rejection(
        &self,
        rejected: &Credentials,
        error: &RemoteError,
    ) -> LoginOutcome {
        if self.can_login() {
            return self.single_flight(Some(rejected)).await;
        }

        if let Some(current) = self.current() {
            if current.credentials.session_id != rejected.session_id {
                return Ok(current);
            }
            self.forget().await?;
        }
        warn!("Pre-supplied session rejected and no password available");
        Err(ApiError::Authentication(error.clone()))
    }

    async fn persist_unsaved(&self, session: &Session) -> Result<(), ApiError> {
        let unsaved = std::mem::take(&mut self.write_state().unsaved);
        if unsaved {
            self.store
                .set(&session.credentials, &session.path)
                .await?;
        }
        Ok(())
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

enum Flight {
    Lead,
    Join(broadcast::Receiver<LoginOutcome>),
    Reuse(Session),
}

/// Clears the in-flight slot when the leading login finishes or is dropped.
/// Dropping the sender wakes any waiters so one of them can take over.
struct InFlight<'a> {
    slot: &'a Mutex<Option<broadcast::Sender<LoginOutcome>>>,
}

impl InFlight<'_> {
    fn complete(self, outcome: LoginOutcome) {
        let sender = self.take();
        if let Some(sender) = sender {
            // No receivers is fine: nobody else was waiting.
            let _ = sender.send(outcome);
        }
    }

    fn take(&self) -> Option<broadcast::Sender<LoginOutcome>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.take();
    }
}
