//! Data types exchanged with the MyGeotab server.
//!
//! - `credentials`: session credentials and the constructor-time login input
//! - `rpc`: the JSON-RPC request/response envelope and remote error payloads

pub mod credentials;
pub mod rpc;

pub use credentials::{Authentication, Credentials, LoginCredentials, Session};
pub use rpc::{
    LoginResult, MultiCallEntry, RemoteError, RpcEnvelope, RpcRequest, RpcResponse,
    AUTHENTICATE_METHOD, INVALID_USER_EXCEPTION, MULTI_CALL_METHOD, THIS_SERVER,
};
