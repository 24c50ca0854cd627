//! HTTP transport for the JSON-RPC API.

use std::future::Future;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use zbx_proto::RpcRequest;

use crate::error::Result;

/// Content type the API expects on every call
pub const JSON_RPC_CONTENT_TYPE: &str = "application/json-rpc";

/// Status code and raw body of one HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpReply {
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Carries one JSON-RPC request to the API and returns the raw reply.
///
/// Implementations must not retry; the connection decides what to do with
/// failures.
pub trait Transport {
    /// Send `request` and wait for the reply.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the request cannot be delivered or no
    /// reply arrives.
    fn send(&mut self, request: &RpcRequest) -> impl Future<Output = Result<HttpReply>> + Send;
}

/// [`Transport`] over HTTP(S) with `reqwest`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    /// Build a transport posting to `url`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Http` if the HTTP client cannot be constructed.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for HttpTransport {
    async fn send(&mut self, request: &RpcRequest) -> Result<HttpReply> {
        let body = request.to_vec()?;
        debug!("POST {} method={} id={}", self.url, request.method, request.id);

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, JSON_RPC_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(HttpReply::new(status, body.to_vec()))
    }
}
