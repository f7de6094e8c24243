//! Scripted stand-ins for the server and the credential store, shared by the
//! unit tests of the session and dispatch layers.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::api::{Transport, TransportError, TransportErrorKind};
use crate::auth::{CredentialStore, MemoryCredentialStore, StoreError};
use crate::models::{
    Authentication, Credentials, LoginCredentials, RemoteError, RpcResponse, Session,
    AUTHENTICATE_METHOD, INVALID_USER_EXCEPTION, MULTI_CALL_METHOD,
};

pub const SERVER: &str = "www.myaddin.com";
pub const DATABASE: &str = "testDB";
pub const USER: &str = "testUser@test.com";
pub const PASSWORD: &str = "Password!23";
pub const FIRST_SESSION: &str = "3225932739582116430";
pub const SECOND_SESSION: &str = "3225932739582116431";
const SESSION_BASE: u64 = 3225932739582116430;

pub fn login(database: &str) -> Authentication {
    Authentication::new(LoginCredentials::with_password(database, USER, PASSWORD)).with_path(SERVER)
}

pub fn credentials(session_id: &str) -> Credentials {
    Credentials {
        database: DATABASE.to_string(),
        user_name: USER.to_string(),
        session_id: session_id.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct SentCall {
    pub method: String,
    pub server: String,
    pub params: Value,
}

impl SentCall {
    pub fn session_id(&self) -> Option<&str> {
        self.params
            .get("credentials")
            .and_then(|c| c.get("sessionId"))
            .and_then(Value::as_str)
    }
}

/// In-process imitation of a MyGeotab server.
///
/// Each login issues the next session id (`...430`, `...431`, ...). Sessions
/// can be expired individually, or all at once to simulate a server that
/// keeps rejecting every session.
#[derive(Default)]
pub struct MockGeotab {
    calls: Mutex<Vec<SentCall>>,
    logins: AtomicUsize,
    expired: Mutex<HashSet<String>>,
    reject_all_sessions: AtomicBool,
    network_down: AtomicBool,
    login_path: Mutex<Option<String>>,
    delay: Option<Duration>,
}

impl MockGeotab {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every send suspends for `delay` before answering.
    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn expire(&self, session_id: &str) {
        self.expired
            .lock()
            .unwrap()
            .insert(session_id.to_string());
    }

    pub fn reject_all_sessions(&self) {
        self.reject_all_sessions.store(true, Ordering::SeqCst);
    }

    pub fn set_network_down(&self, down: bool) {
        self.network_down.store(down, Ordering::SeqCst);
    }

    pub fn redirect_logins_to(&self, path: &str) {
        *self.login_path.lock().unwrap() = Some(path.to_string());
    }

    pub fn sent(&self) -> Vec<SentCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sent_count(&self, method: &str) -> usize {
        self.sent().iter().filter(|c| c.method == method).count()
    }

    pub fn login_count(&self) -> usize {
        self.sent_count(AUTHENTICATE_METHOD)
    }

    fn authenticate(&self, params: &Value) -> RpcResponse {
        let database = params["database"].as_str().unwrap_or_default();
        if database == "badinfo" || params["password"].as_str() != Some(PASSWORD) {
            return RpcResponse::failure(RemoteError::of_type(
                INVALID_USER_EXCEPTION,
                "Incorrect login credentials",
            ));
        }
        let n = self.logins.fetch_add(1, Ordering::SeqCst) as u64;
        let path = self
            .login_path
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| "ThisServer".to_string());
        RpcResponse::success(json!({
            "credentials": {
                "database": database,
                "userName": params["userName"],
                "sessionId": (SESSION_BASE + n).to_string(),
            },
            "path": path,
        }))
    }

    fn session_valid(&self, params: &Value) -> bool {
        let Some(session_id) = params
            .get("credentials")
            .and_then(|c| c.get("sessionId"))
            .and_then(Value::as_str)
        else {
            return false;
        };
        !self.reject_all_sessions.load(Ordering::SeqCst)
            && !self.expired.lock().unwrap().contains(session_id)
    }

    fn execute(method: &str, params: &Value) -> Result<Value, RemoteError> {
        let type_name = params["typeName"].as_str().unwrap_or_default();
        match (method, type_name) {
            ("Get", "Device") => Ok(json!([{
                "id": "test1",
                "licensePlate": "L0L 0L0L",
                "vehicleIdentificationNumber": "AM32W8FV9BU601382",
                "comment": "Comment",
                "name": "DeviceName",
                "serialNumber": "G70000000000"
            }])),
            ("Get", "User") => Ok(json!([{
                "id": "test1",
                "language": "en",
                "firstName": "Test",
                "lastName": "User",
                "name": USER
            }])),
            ("GetCountOf", "Device") => Ok(json!(2000)),
            ("GetCountOf", "User") => Ok(json!(2001)),
            (MULTI_CALL_METHOD, _) => {
                let calls = params["calls"].as_array().cloned().unwrap_or_default();
                calls
                    .iter()
                    .map(|c| Self::execute(c["method"].as_str().unwrap_or_default(), &c["params"]))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            _ => Err(RemoteError::of_type(
                "MissingMethodException",
                &format!("The method \"{}\" could not be found", method),
            )),
        }
    }
}

#[async_trait]
impl Transport for MockGeotab {
    async fn send(
        &self,
        method: &str,
        server: &str,
        params: &Value,
        _timeout: Option<Duration>,
    ) -> Result<RpcResponse, TransportError> {
        self.calls.lock().unwrap().push(SentCall {
            method: method.to_string(),
            server: server.to_string(),
            params: params.clone(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.network_down.load(Ordering::SeqCst) {
            return Err(TransportError::new(
                TransportErrorKind::Connect,
                "getaddrinfo ENOTFOUND",
            ));
        }

        if method == AUTHENTICATE_METHOD {
            return Ok(self.authenticate(params));
        }
        if !self.session_valid(params) {
            return Ok(RpcResponse::failure(RemoteError::of_type(
                INVALID_USER_EXCEPTION,
                "Incorrect login credentials",
            )));
        }
        Ok(match Self::execute(method, params) {
            Ok(result) => RpcResponse::success(result),
            Err(error) => RpcResponse::failure(error),
        })
    }
}

/// Memory store that counts writes and clears.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryCredentialStore,
    sets: AtomicUsize,
    clears: AtomicUsize,
    clear_delay: Option<Duration>,
}

impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every `clear` suspends for `delay` before removing the session.
    pub fn with_clear_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            clear_delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialStore for CountingStore {
    async fn get(&self) -> Result<Option<Session>, StoreError> {
        self.inner.get().await
    }

    async fn set(&self, credentials: &Credentials, server: &str) -> Result<(), StoreError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(credentials, server).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.clear_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.clear().await
    }
}
