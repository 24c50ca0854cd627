//! Requests spoken over the binary JSON protocol.

use bytes::Bytes;
use serde_json::{Map, Value, json};
use zbx_types::{JmxQuery, Jvm, Measurement};

use crate::frame::{self, FrameError, Payload};

/// Request type for pushing trapper values
pub const SENDER_DATA: &str = "sender data";

/// Request type for Java gateway JMX reads
pub const JAVA_GATEWAY_JMX: &str = "java gateway jmx";

/// One outgoing call: a request type tag plus its fields.
///
/// Serializes to `{"request": <type>, ...fields}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolRequest {
    request_type: String,
    fields: Payload,
}

impl ProtocolRequest {
    #[must_use]
    pub fn new(request_type: impl Into<String>, fields: Payload) -> Self {
        Self {
            request_type: request_type.into(),
            fields,
        }
    }

    /// Build a `sender data` request carrying the given measurements as-is.
    ///
    /// # Errors
    ///
    /// Returns an error if a measurement cannot be serialized.
    pub fn sender_data(measurements: &[Measurement]) -> Result<Self, serde_json::Error> {
        let mut fields = Map::new();
        fields.insert("data".to_string(), serde_json::to_value(measurements)?);
        Ok(Self::new(SENDER_DATA, fields))
    }

    /// Build a `java gateway jmx` request reading `queries` from `jvm`.
    #[must_use]
    pub fn java_gateway_jmx(jvm: &Jvm, queries: &[JmxQuery]) -> Self {
        let keys: Vec<String> = queries.iter().map(JmxQuery::item_key).collect();

        let mut fields = Map::new();
        fields.insert("conn".to_string(), json!(jvm.host));
        fields.insert("port".to_string(), json!(jvm.port));
        fields.insert("username".to_string(), json!(jvm.username));
        fields.insert("password".to_string(), json!(jvm.password));
        fields.insert("keys".to_string(), json!(keys));
        Self::new(JAVA_GATEWAY_JMX, fields)
    }

    #[must_use]
    pub fn request_type(&self) -> &str {
        &self.request_type
    }

    #[must_use]
    pub fn fields(&self) -> &Payload {
        &self.fields
    }

    /// The JSON body of this request.
    #[must_use]
    pub fn body(&self) -> Value {
        let mut body = Map::with_capacity(self.fields.len() + 1);
        body.insert(
            "request".to_string(),
            Value::String(self.request_type.clone()),
        );
        body.extend(self.fields.clone());
        Value::Object(body)
    }

    /// The complete framed byte sequence for this request.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be serialized or is too large.
    pub fn to_frame(&self) -> Result<Bytes, FrameError> {
        frame::encode(&self.request_type, &self.fields)
    }
}
