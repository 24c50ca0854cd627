//! Shared types for the zbx clients.
//!
//! This crate provides the data carried by the trapper and Java gateway
//! protocols. All types are serializable so they can be embedded directly
//! into request bodies and decoded from replies.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One metric sample pushed to a trapper item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Host the value belongs to. Filled in by the sender when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Item key, e.g. `app.requests[total]`
    pub key: String,

    pub value: Value,

    /// Unix timestamp of the sample
    #[serde(
        rename = "clock",
        alias = "time",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Option<i64>,
}

impl Measurement {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            host: None,
            key: key.into(),
            value: value.into(),
            time: None,
        }
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn at(mut self, time: i64) -> Self {
        self.time = Some(time);
        self
    }
}

/// Status returned by the trapper after a `sender data` request.
///
/// The trapper reports a single summary for the whole batch, e.g.
/// `processed: 1; failed: 0; total: 1; seconds spent: 0.000055`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrapperSummary {
    pub response: Option<String>,
    pub info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds_spent: Option<f64>,
}

impl TrapperSummary {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.response.as_deref() == Some("success")
    }
}

/// A JVM reachable through the Java gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jvm {
    pub host: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Jvm {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
        }
    }

    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

/// A single bean attribute to read from a JVM.
///
/// Any extra fields are opaque to the gateway and are echoed back on the
/// matching [`JmxReading`], so callers can tag queries with their own
/// identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JmxQuery {
    pub bean: String,
    pub attribute: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JmxQuery {
    #[must_use]
    pub fn new(bean: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            bean: bean.into(),
            attribute: attribute.into(),
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn tag(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    /// Item key understood by the gateway: `jmx[<bean>,<attribute>]`
    #[must_use]
    pub fn item_key(&self) -> String {
        format!("jmx[{},{}]", self.bean, self.attribute)
    }
}

/// A value read through the gateway after numeric sniffing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JmxValue {
    Integer(i64),
    Float(f64),
    Text(String),
    /// Reply values that were not strings are passed through untouched
    Other(Value),
}

/// One result record of a JMX query, in request order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JmxReading {
    #[serde(flatten)]
    pub query: JmxQuery,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<JmxValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub host: String,
    pub port: u16,
}

impl JmxReading {
    /// Keys the reading sets itself; query tags with these names are dropped
    pub const OWN_KEYS: [&'static str; 4] = ["value", "error", "host", "port"];

    /// Build a reading for `query` taken from the JVM at `host:port`.
    ///
    /// The JVM's address and the read value win over query tags of the same
    /// name.
    #[must_use]
    pub fn new(
        mut query: JmxQuery,
        value: Option<JmxValue>,
        error: Option<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        query.extra.retain(|key, _| !Self::OWN_KEYS.contains(&key.as_str()));
        Self {
            query,
            value,
            error,
            host: host.into(),
            port,
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_jmx_reading_fields_win_over_query_tags() {
        let query = JmxQuery::new("java.lang:type=Runtime", "Uptime")
            .tag("host", "tagged-host")
            .tag("port", 1)
            .tag("value", "tagged")
            .tag("error", "tagged")
            .tag("team", "infra");

        let reading = JmxReading::new(query, Some(JmxValue::Integer(5)), None, "app-01", 9010);
        let json = serde_json::to_value(&reading).unwrap();

        assert_eq!(
            json,
            json!({
                "bean": "java.lang:type=Runtime",
                "attribute": "Uptime",
                "team": "infra",
                "value": 5,
                "host": "app-01",
                "port": 9010
            })
        );
        assert!(!reading.query.extra.contains_key("host"));
    }

    #[test]
    fn test_measurement_skips_absent_fields() {
        let m = Measurement::new("question.life", 42);
        let value = serde_json::to_value(&m).unwrap();
        assert_eq!(value, json!({"key": "question.life", "value": 42}));
    }

    #[test]
    fn test_measurement_time_serializes_as_clock() {
        let m = Measurement::new("cpu.load", 0.5).with_host("web-01").at(1_700_000_000);
        let value = serde_json::to_value(&m).unwrap();
        assert_eq!(value["clock"], 1_700_000_000);
        assert_eq!(value["host"], "web-01");
        assert!(value.get("time").is_none());
    }

    #[test]
    fn test_measurement_accepts_time_alias() {
        let m: Measurement =
            serde_json::from_value(json!({"key": "k", "value": "v", "time": 12})).unwrap();
        assert_eq!(m.time, Some(12));
        assert!(m.host.is_none());
    }

    #[test]
    fn test_jmx_query_item_key() {
        let q = JmxQuery::new("java.lang:type=Memory", "HeapMemoryUsage.used");
        assert_eq!(q.item_key(), "jmx[java.lang:type=Memory,HeapMemoryUsage.used]");
    }

    #[test]
    fn test_jmx_reading_flattens_query() {
        let reading = JmxReading {
            query: JmxQuery::new("kafka:type=logs", "Size").tag("topic", "events"),
            value: Some(JmxValue::Integer(42)),
            error: None,
            host: "kafka-1".to_string(),
            port: 9999,
        };
        let value = serde_json::to_value(&reading).unwrap();
        assert_eq!(
            value,
            json!({
                "bean": "kafka:type=logs",
                "attribute": "Size",
                "topic": "events",
                "value": 42,
                "host": "kafka-1",
                "port": 9999
            })
        );
    }

    #[test]
    fn test_jmx_value_untagged_forms() {
        assert_eq!(serde_json::to_value(JmxValue::Float(3.5)).unwrap(), json!(3.5));
        assert_eq!(
            serde_json::to_value(JmxValue::Text("running".into())).unwrap(),
            json!("running")
        );
        assert_eq!(
            serde_json::to_value(JmxValue::Other(json!([1, 2]))).unwrap(),
            json!([1, 2])
        );
    }

    #[test]
    fn test_jvm_credentials_optional() {
        let jvm = Jvm::new("localhost", 9010);
        assert_eq!(
            serde_json::to_value(&jvm).unwrap(),
            json!({"host": "localhost", "port": 9010})
        );
        let jvm = jvm.with_credentials("admin", "secret");
        assert_eq!(jvm.username.as_deref(), Some("admin"));
    }

    #[test]
    fn test_trapper_summary_success() {
        let summary = TrapperSummary {
            response: Some("success".to_string()),
            ..TrapperSummary::default()
        };
        assert!(summary.is_success());
        assert!(!TrapperSummary::default().is_success());
    }
}
