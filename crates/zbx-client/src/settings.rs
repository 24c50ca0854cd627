//! Client settings.
//!
//! Everything is supplied by the caller; nothing here reads files or the
//! environment. The one ambient default is the local machine name, used as
//! the target host for trapper values that do not name one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::Error;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_TRAPPER_PORT: u16 = 10051;
pub const DEFAULT_GATEWAY_PORT: u16 = 10052;

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_trapper_port() -> u16 {
    DEFAULT_TRAPPER_PORT
}

fn default_gateway_port() -> u16 {
    DEFAULT_GATEWAY_PORT
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// Name of the local machine, or `localhost` when it cannot be determined.
#[must_use]
pub fn default_zabbix_host() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(default_host)
}

/// Settings for a [`Sender`](crate::Sender)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrapperSettings {
    /// Trapper (server or proxy) to connect to
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_trapper_port")]
    pub port: u16,

    /// Monitored host that measurements without a `host` are filed under
    #[serde(default = "default_zabbix_host")]
    pub zabbix_host: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for TrapperSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_trapper_port(),
            zabbix_host: default_zabbix_host(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl TrapperSettings {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Settings for a [`JavaGateway`](crate::JavaGateway)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_gateway_port(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl GatewaySettings {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// How to authenticate against the JSON-RPC API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Credentials {
    /// Log in with `user.login` and use the returned session token
    Password { username: String, password: String },

    /// Use a pre-issued API token directly; no login call is made
    Token { token: String },
}

impl Credentials {
    #[must_use]
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password {
            username: username.into(),
            password: password.into(),
        }
    }

    #[must_use]
    pub fn token(token: impl Into<String>) -> Self {
        Self::Token {
            token: token.into(),
        }
    }
}

/// Settings for an [`RpcConnection`](crate::RpcConnection)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSettings {
    /// Full endpoint URL, e.g. `https://zabbix.example.com/api_jsonrpc.php`
    pub url: String,

    pub credentials: Credentials,

    #[serde(default)]
    pub supported_versions: ApiVersionRange,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ApiSettings {
    #[must_use]
    pub fn new(url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            url: url.into(),
            credentials,
            supported_versions: ApiVersionRange::default(),
            timeout_ms: default_timeout_ms(),
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Major/minor API version. Patch levels are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl ApiVersion {
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl FromStr for ApiVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('.');
        let mut next = || {
            parts
                .next()
                .and_then(|p| p.parse::<u32>().ok())
                .ok_or_else(|| Error::Config(format!("Invalid API version: {s}")))
        };
        let major = next()?;
        let minor = next()?;
        Ok(Self { major, minor })
    }
}

impl TryFrom<String> for ApiVersion {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ApiVersion> for String {
    fn from(v: ApiVersion) -> Self {
        v.to_string()
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Inclusive range of API versions a connection accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiVersionRange {
    pub min: ApiVersion,
    pub max: ApiVersion,
}

impl ApiVersionRange {
    #[must_use]
    pub const fn new(min: ApiVersion, max: ApiVersion) -> Self {
        Self { min, max }
    }

    /// A range accepting exactly one major/minor version
    #[must_use]
    pub const fn exactly(version: ApiVersion) -> Self {
        Self::new(version, version)
    }

    #[must_use]
    pub fn contains(&self, version: ApiVersion) -> bool {
        self.min <= version && version <= self.max
    }
}

impl Default for ApiVersionRange {
    fn default() -> Self {
        Self::new(ApiVersion::new(5, 4), ApiVersion::new(7, 4))
    }
}

impl fmt::Display for ApiVersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}-{}", self.min, self.max)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trapper_defaults() {
        let settings: TrapperSettings = serde_json::from_value(json!({})).unwrap();
        assert_eq!(settings.host, "localhost");
        assert_eq!(settings.port, 10051);
        assert!(!settings.zabbix_host.is_empty());
        assert_eq!(settings.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_trapper_camel_case() {
        let settings: TrapperSettings = serde_json::from_value(json!({
            "host": "zabbix.internal",
            "zabbixHost": "web-01",
            "timeoutMs": 500
        }))
        .unwrap();
        assert_eq!(settings.zabbix_host, "web-01");
        assert_eq!(settings.timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_gateway_defaults() {
        let settings = GatewaySettings::default();
        assert_eq!(settings.host, "localhost");
        assert_eq!(settings.port, 10052);
    }

    #[test]
    fn test_credentials_untagged() {
        let creds: Credentials =
            serde_json::from_value(json!({"username": "Admin", "password": "zabbix"})).unwrap();
        assert_eq!(creds, Credentials::password("Admin", "zabbix"));

        let creds: Credentials = serde_json::from_value(json!({"token": "abc"})).unwrap();
        assert_eq!(creds, Credentials::token("abc"));
    }

    #[test]
    fn test_api_settings_from_json() {
        let settings: ApiSettings = serde_json::from_value(json!({
            "url": "http://localhost/api_jsonrpc.php",
            "credentials": {"username": "Admin", "password": "zabbix"},
            "supportedVersions": {"min": "6.0", "max": "6.4"}
        }))
        .unwrap();
        assert_eq!(
            settings.supported_versions,
            ApiVersionRange::new(ApiVersion::new(6, 0), ApiVersion::new(6, 4))
        );
        assert_eq!(settings.timeout_ms, 10_000);
    }

    #[test]
    fn test_api_version_parse_ignores_patch() {
        let v: ApiVersion = "6.0.21".parse().unwrap();
        assert_eq!(v, ApiVersion::new(6, 0));
        assert_eq!(v.to_string(), "6.0");
    }

    #[test]
    fn test_api_version_parse_rejects_garbage() {
        assert!("latest".parse::<ApiVersion>().is_err());
        assert!("7".parse::<ApiVersion>().is_err());
        assert!("".parse::<ApiVersion>().is_err());
    }

    #[test]
    fn test_version_range_contains() {
        let range = ApiVersionRange::new(ApiVersion::new(1, 4), ApiVersion::new(2, 0));
        assert!(range.contains(ApiVersion::new(1, 4)));
        assert!(range.contains(ApiVersion::new(1, 9)));
        assert!(range.contains(ApiVersion::new(2, 0)));
        assert!(!range.contains(ApiVersion::new(1, 3)));
        assert!(!range.contains(ApiVersion::new(2, 1)));
    }

    #[test]
    fn test_version_range_display() {
        assert_eq!(ApiVersionRange::exactly(ApiVersion::new(1, 4)).to_string(), "1.4");
        assert_eq!(ApiVersionRange::default().to_string(), "5.4-7.4");
    }
}
