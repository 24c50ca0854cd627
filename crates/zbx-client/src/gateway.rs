//! Java gateway client: reads JMX attributes from local or remote JVMs.
//!
//! The gateway speaks the same binary JSON protocol as the trapper. Replies
//! carry no keys, so values are matched to queries purely by position.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use zbx_proto::{Payload, ProtocolRequest};
use zbx_types::{JmxQuery, JmxReading, JmxValue, Jvm};

use crate::error::{Error, Result};
use crate::protocol::{Exchange, ProtocolClient};
use crate::settings::GatewaySettings;

fn integer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+$").expect("integer pattern is valid"))
}

fn float_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[.\d]+$").expect("float pattern is valid"))
}

/// Turn a numeric-looking reply string into a number.
///
/// Digits only become an integer, digits and dots a float, anything else
/// stays text. Integers too large for `i64` fall back to float, and
/// dotted strings that are not a single number (`1.2.3`) stay text.
#[must_use]
pub fn coerce(value: Value) -> JmxValue {
    let Value::String(text) = value else {
        return JmxValue::Other(value);
    };

    if integer_pattern().is_match(&text) {
        if let Ok(n) = text.parse::<i64>() {
            return JmxValue::Integer(n);
        }
    }
    if float_pattern().is_match(&text) {
        if let Ok(f) = text.parse::<f64>() {
            return JmxValue::Float(f);
        }
    }
    JmxValue::Text(text)
}

/// One element of the gateway's `data` array
#[derive(Debug, Deserialize)]
struct ReplyItem {
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Reads JMX attributes through a Java gateway.
#[derive(Debug, Clone)]
pub struct JavaGateway {
    client: ProtocolClient,
}

impl JavaGateway {
    #[must_use]
    pub fn new(settings: &GatewaySettings) -> Self {
        Self {
            client: ProtocolClient::new(settings.host.clone(), settings.port, settings.timeout()),
        }
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.client = self.client.with_cancellation(token);
        self
    }

    #[must_use]
    pub fn client(&self) -> &ProtocolClient {
        &self.client
    }

    /// Read `queries` from `jvm` in one call.
    ///
    /// Readings come back in query order; do not reorder the queries between
    /// building them and reading the result. A per-attribute failure is
    /// reported on the reading's `error` field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Reported`] when the gateway rejects the whole call
    /// (e.g. the JVM is unreachable), or a transport or framing error.
    pub async fn measure<I>(&self, jvm: &Jvm, queries: I) -> Result<Vec<JmxReading>>
    where
        I: IntoIterator<Item = JmxQuery>,
    {
        let queries: Vec<JmxQuery> = queries.into_iter().collect();
        self.client.request(self, (jvm.clone(), queries)).await
    }
}

impl Exchange for JavaGateway {
    type Input = (Jvm, Vec<JmxQuery>);
    type Output = Vec<JmxReading>;

    fn create_request(&self, (jvm, queries): &Self::Input) -> Result<ProtocolRequest> {
        Ok(ProtocolRequest::java_gateway_jmx(jvm, queries))
    }

    fn handle_response(
        &self,
        mut payload: Payload,
        (jvm, queries): Self::Input,
    ) -> Result<Vec<JmxReading>> {
        if payload.get("response").and_then(Value::as_str) != Some("success") {
            let message = payload
                .get("error")
                .and_then(Value::as_str)
                .map_or_else(|| Value::Object(payload.clone()).to_string(), str::to_string);
            return Err(Error::reported(message));
        }

        let items: Vec<ReplyItem> = match payload.remove("data") {
            Some(data) => serde_json::from_value(data)?,
            None => Vec::new(),
        };

        if items.len() != queries.len() {
            warn!(
                "Java gateway returned {} values for {} queries on {}:{}",
                items.len(),
                queries.len(),
                jvm.host,
                jvm.port
            );
        }

        let readings: Vec<JmxReading> = items
            .into_iter()
            .zip(queries)
            .map(|(item, query)| {
                JmxReading::new(
                    query,
                    item.value.map(coerce),
                    item.error,
                    jvm.host.clone(),
                    jvm.port,
                )
            })
            .collect();

        debug!(
            "Read {} JMX values from {}:{}",
            readings.len(),
            jvm.host,
            jvm.port
        );
        Ok(readings)
    }
}
