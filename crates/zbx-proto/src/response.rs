//! Classification of JSON-RPC replies.

use serde_json::Value;

use crate::jsonrpc::RpcError;

/// Shape of a non-empty `result`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Text, number or boolean
    Scalar,
    Sequence,
    Mapping,
}

/// An HTTP status plus the decoded JSON-RPC payload.
///
/// All classification is computed from the payload on each call.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcResponse {
    status: u16,
    payload: Value,
}

impl RpcResponse {
    #[must_use]
    pub fn new(status: u16, payload: Value) -> Self {
        Self { status, payload }
    }

    /// Decode a raw HTTP body.
    ///
    /// Error statuses often carry HTML or nothing at all; such bodies are
    /// classified with an empty payload instead of failing.
    ///
    /// # Errors
    ///
    /// Returns an error if the status is 2xx and the body is not JSON.
    pub fn from_body(status: u16, body: &[u8]) -> Result<Self, serde_json::Error> {
        match serde_json::from_slice(body) {
            Ok(payload) => Ok(Self::new(status, payload)),
            Err(_) if !is_success_status(status) => {
                Ok(Self::new(status, Value::Object(serde_json::Map::new())))
            }
            Err(e) => Err(e),
        }
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// True when the HTTP status is outside the 2xx range
    #[must_use]
    pub fn is_non_ok(&self) -> bool {
        !is_success_status(self.status)
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.is_non_ok() || self.payload.get("error").is_some()
    }

    /// The `error` object, if the payload carries one.
    #[must_use]
    pub fn error(&self) -> Option<RpcError> {
        let raw = self.payload.get("error")?;
        Some(serde_json::from_value(raw.clone()).unwrap_or_else(|_| RpcError {
            code: None,
            message: raw.to_string(),
            data: None,
        }))
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        if !self.is_error() {
            return None;
        }
        self.payload
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
    }

    /// True when the server rejected the session token
    #[must_use]
    pub fn is_not_authorized(&self) -> bool {
        self.error().is_some_and(|e| e.is_not_authorized())
    }

    /// The raw `result`, whether or not it is empty.
    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        self.payload.get("result")
    }

    #[must_use]
    pub fn into_result(self) -> Option<Value> {
        match self.payload {
            Value::Object(mut map) => map.remove("result"),
            _ => None,
        }
    }

    /// True when `result` is present and is not an empty string, array or
    /// object.
    #[must_use]
    pub fn has_data(&self) -> bool {
        match self.result() {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(a)) => !a.is_empty(),
            Some(Value::Object(o)) => !o.is_empty(),
            Some(Value::Bool(_) | Value::Number(_)) => true,
        }
    }

    /// Shape of the result, only when [`has_data`](Self::has_data) holds.
    #[must_use]
    pub fn shape(&self) -> Option<Shape> {
        if !self.has_data() {
            return None;
        }
        match self.result()? {
            Value::Array(_) => Some(Shape::Sequence),
            Value::Object(_) => Some(Shape::Mapping),
            _ => Some(Shape::Scalar),
        }
    }
}

fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}
