//! JSON-RPC session manager for the HTTP API.
//!
//! A connection logs in lazily on its first call, checks the server's API
//! version once, and then stamps every call with the session token and the
//! next request id. When the server reports the token as no longer valid,
//! the connection logs in again and repeats the call, once.
//!
//! Request ids start at 0 and every call handed to the transport consumes
//! one, including login and version calls and calls rejected for a stale
//! token.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use zbx_proto::{LOGIN_METHOD, LoginParams, RpcRequest, RpcResponse, VERSION_METHOD};

use crate::error::{Error, Result};
use crate::settings::{ApiSettings, ApiVersion, ApiVersionRange, Credentials};
use crate::transport::{HttpTransport, Transport};

/// Where a connection stands in its login sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No token; the next call logs in first
    Unauthenticated,
    /// Token held, server version not yet checked
    Authenticated,
    /// Token held and server version accepted
    Ready,
}

/// One authenticated session against the JSON-RPC API.
///
/// Methods that talk to the server take `&mut self`, so a connection carries
/// at most one call at a time. Share it behind a lock if several tasks need
/// it.
#[derive(Debug)]
pub struct RpcConnection<T = HttpTransport> {
    transport: T,
    credentials: Credentials,
    supported: ApiVersionRange,
    auth: Option<String>,
    request_id: u64,
    server_version: Option<ApiVersion>,
    cancel: Option<CancellationToken>,
}

impl RpcConnection<HttpTransport> {
    /// Create a connection to `settings.url`. No request is made until the
    /// first call.
    ///
    /// # Errors
    ///
    /// Returns `Error::Http` if the HTTP client cannot be constructed.
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        let transport = HttpTransport::new(settings.url.clone(), settings.timeout())?;
        Ok(Self::with_transport(transport, settings))
    }
}

impl<T: Transport> RpcConnection<T> {
    #[must_use]
    pub fn with_transport(transport: T, settings: &ApiSettings) -> Self {
        Self {
            transport,
            credentials: settings.credentials.clone(),
            supported: settings.supported_versions,
            auth: None,
            request_id: 0,
            server_version: None,
            cancel: None,
        }
    }

    /// Abort in-flight and future calls once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Id the next transport call will carry
    #[must_use]
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        match (&self.auth, self.server_version) {
            (None, _) => SessionState::Unauthenticated,
            (Some(_), None) => SessionState::Authenticated,
            (Some(_), Some(_)) => SessionState::Ready,
        }
    }

    #[must_use]
    pub fn auth_token(&self) -> Option<&str> {
        self.auth.as_deref()
    }

    /// Version reported by the server, once it has been checked
    #[must_use]
    pub fn server_version(&self) -> Option<ApiVersion> {
        self.server_version
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Call `method` with `params`, logging in and checking the server
    /// version first if that has not happened yet.
    ///
    /// Error replies other than a rejected token are returned as an
    /// [`RpcResponse`] for the caller to inspect.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`] if login fails or the token is
    /// rejected twice in a row, [`Error::Version`] if the server's API version
    /// is not supported, or a transport error, which is never retried.
    pub async fn request(&mut self, method: &str, params: Value) -> Result<RpcResponse> {
        match self.cancel.clone() {
            Some(token) => tokio::select! {
                () = token.cancelled() => Err(Error::Cancelled),
                response = self.request_with_reauth(method, params) => response,
            },
            None => self.request_with_reauth(method, params).await,
        }
    }

    /// Call `method` and deserialize its `result`.
    ///
    /// # Errors
    ///
    /// Everything [`request`](Self::request) returns, plus
    /// [`Error::Reported`] for an error reply and `Error::Json` if the result
    /// does not match `R`.
    pub async fn call<R: DeserializeOwned>(&mut self, method: &str, params: Value) -> Result<R> {
        let response = self.request(method, params).await?;

        if response.is_error() {
            return Err(match response.error() {
                Some(error) => error.into(),
                None => Error::Reported {
                    code: None,
                    message: format!("HTTP status {}", response.status()),
                },
            });
        }

        let result = response
            .into_result()
            .ok_or_else(|| Error::reported(format!("{method} returned no result")))?;
        Ok(serde_json::from_value(result)?)
    }

    async fn request_with_reauth(&mut self, method: &str, params: Value) -> Result<RpcResponse> {
        let mut retried = false;

        loop {
            self.ensure_ready().await?;

            let auth = self.auth.clone();
            let response = self.dispatch(method, params.clone(), auth).await?;
            if !response.is_not_authorized() {
                return Ok(response);
            }

            self.auth = None;
            let reason = response
                .error()
                .map_or_else(|| "Not authorized".to_string(), |e| e.to_string());

            if retried || matches!(self.credentials, Credentials::Token { .. }) {
                return Err(Error::Authentication(reason));
            }

            warn!("Session rejected on {}: {}; logging in again", method, reason);
            retried = true;
        }
    }

    async fn ensure_ready(&mut self) -> Result<()> {
        if self.auth.is_none() {
            self.authorize().await?;
        }
        if self.server_version.is_none() {
            self.check_version().await?;
        }
        Ok(())
    }

    async fn authorize(&mut self) -> Result<()> {
        let (username, password) = match &self.credentials {
            Credentials::Token { token } => {
                self.auth = Some(token.clone());
                return Ok(());
            }
            Credentials::Password { username, password } => (username.clone(), password.clone()),
        };

        let params = serde_json::to_value(LoginParams {
            username: username.clone(),
            password,
        })?;
        let response = self.dispatch(LOGIN_METHOD, params, None).await?;

        if response.is_error() {
            let reason = response
                .error()
                .map_or_else(|| format!("HTTP status {}", response.status()), |e| e.to_string());
            return Err(Error::Authentication(reason));
        }

        match response.into_result() {
            Some(Value::String(token)) if !token.is_empty() => {
                info!("Logged in as {}", username);
                self.auth = Some(token);
                Ok(())
            }
            other => Err(Error::Authentication(format!(
                "login returned no session token: {other:?}"
            ))),
        }
    }

    async fn check_version(&mut self) -> Result<()> {
        // The API refuses a token on this method
        let params = Value::Object(serde_json::Map::new());
        let response = self.dispatch(VERSION_METHOD, params, None).await?;

        if response.is_error() {
            return Err(match response.error() {
                Some(error) => error.into(),
                None => Error::Reported {
                    code: None,
                    message: format!("HTTP status {}", response.status()),
                },
            });
        }

        let found = match response.into_result() {
            Some(Value::String(version)) => version,
            other => other.map_or_else(String::new, |v| v.to_string()),
        };

        let version: ApiVersion = found.parse().map_err(|_| Error::Version {
            found: found.clone(),
            supported: self.supported,
        })?;

        if !self.supported.contains(version) {
            return Err(Error::Version {
                found,
                supported: self.supported,
            });
        }

        debug!("Server API version {} accepted", version);
        self.server_version = Some(version);
        Ok(())
    }

    async fn dispatch(
        &mut self,
        method: &str,
        params: Value,
        auth: Option<String>,
    ) -> Result<RpcResponse> {
        let id = self.request_id;
        self.request_id += 1;

        let request = RpcRequest::new(method, params, id, auth);
        let reply = self.transport.send(&request).await?;
        let response = RpcResponse::from_body(reply.status, &reply.body)?;

        debug!(
            "{} id={} -> status={} error={}",
            method,
            id,
            response.status(),
            response.is_error()
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ApiSettings {
        ApiSettings::new(
            "http://localhost/api_jsonrpc.php",
            Credentials::password("Admin", "zabbix"),
        )
    }

    #[test]
    fn test_new_connection_is_unauthenticated() {
        let conn = RpcConnection::new(&settings()).unwrap();
        assert_eq!(conn.state(), SessionState::Unauthenticated);
        assert_eq!(conn.request_id(), 0);
        assert!(conn.auth_token().is_none());
        assert!(conn.server_version().is_none());
        assert_eq!(conn.transport().url(), "http://localhost/api_jsonrpc.php");
    }
}
