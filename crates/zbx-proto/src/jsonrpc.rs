//! JSON-RPC 2.0 message types for the HTTP API.
//!
//! The API deviates from plain JSON-RPC in one way: the session token travels
//! in the request body as `auth`, and is `null` before login.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const APPLICATION_ERROR: i32 = -32500;

/// Login method, returns the session token as its result
pub const LOGIN_METHOD: &str = "user.login";

/// Version method, returns the API version string as its result
pub const VERSION_METHOD: &str = "apiinfo.version";

/// JSON-RPC 2.0 request as sent to the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
    pub id: u64,
    pub auth: Option<String>,
}

impl RpcRequest {
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value, id: u64, auth: Option<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
            auth,
        }
    }

    /// Serialize this request to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// JSON-RPC 2.0 error object
///
/// Every field is optional on the wire; older API versions omit `code` on
/// some errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    #[must_use]
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
            data: None,
        }
    }

    #[must_use]
    pub fn with_data(code: i32, message: impl Into<String>, data: Value) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
            data: Some(data),
        }
    }

    /// The `data` field when it is a string, which is where the API puts
    /// the human-readable detail.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.data.as_ref().and_then(Value::as_str)
    }

    /// Whether this error means the session token was rejected.
    #[must_use]
    pub fn is_not_authorized(&self) -> bool {
        [Some(self.message.as_str()), self.detail()]
            .into_iter()
            .flatten()
            .map(str::to_ascii_lowercase)
            .any(|text| text.contains("not authorized") || text.contains("session terminated"))
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.code, self.detail()) {
            (Some(code), Some(detail)) => {
                write!(f, "RPC error {code}: {} {detail}", self.message)
            }
            (Some(code), None) => write!(f, "RPC error {code}: {}", self.message),
            (None, _) => write!(f, "RPC error: {}", self.message),
        }
    }
}

impl std::error::Error for RpcError {}

/// Parameters of a login call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginParams {
    pub username: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization_before_login() {
        let req = RpcRequest::new("host.get", json!({"output": "extend"}), 0, None);
        let value: Value = serde_json::from_slice(&req.to_vec().unwrap()).unwrap();

        assert_eq!(
            value,
            json!({
                "jsonrpc": "2.0",
                "method": "host.get",
                "params": {"output": "extend"},
                "id": 0,
                "auth": null
            })
        );
    }

    #[test]
    fn test_request_serialization_with_token() {
        let req = RpcRequest::new("item.get", json!({}), 7, Some("abc123".to_string()));
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["auth"], "abc123");
        assert_eq!(value["id"], 7);
    }

    #[test]
    fn test_rpc_error_without_code() {
        let err: RpcError = serde_json::from_value(json!({"message": "foobar"})).unwrap();
        assert!(err.code.is_none());
        assert_eq!(err.message, "foobar");
        assert_eq!(err.to_string(), "RPC error: foobar");
    }

    #[test]
    fn test_rpc_error_not_authorized_in_data() {
        let err: RpcError = serde_json::from_value(json!({
            "code": -32602,
            "message": "Invalid params.",
            "data": "Not authorized"
        }))
        .unwrap();
        assert!(err.is_not_authorized());
        assert_eq!(err.detail(), Some("Not authorized"));
        assert!(err.to_string().contains("-32602"));
    }

    #[test]
    fn test_rpc_error_session_terminated() {
        let err = RpcError::with_data(
            INVALID_PARAMS,
            "Invalid params.",
            json!("Session terminated, re-login, please."),
        );
        assert!(err.is_not_authorized());
    }

    #[test]
    fn test_rpc_error_other_is_not_auth() {
        let err = RpcError::with_data(
            INVALID_PARAMS,
            "Invalid params.",
            json!("No permissions to referred object or it does not exist!"),
        );
        assert!(!err.is_not_authorized());

        let err = RpcError::new(METHOD_NOT_FOUND, "Method not found");
        assert!(!err.is_not_authorized());
    }

    #[test]
    fn test_rpc_error_non_string_data() {
        let err = RpcError::with_data(APPLICATION_ERROR, "Application error.", json!({"x": 1}));
        assert!(err.detail().is_none());
        assert!(!err.is_not_authorized());
    }
}
