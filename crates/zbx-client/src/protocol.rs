//! Request lifecycle shared by the binary-protocol clients.
//!
//! Each call opens a fresh TCP connection, writes one framed request, reads
//! one framed reply and closes the socket. Connections are never reused: the
//! server closes idle sockets on its own schedule, and a failed call cannot
//! leave state behind for the next one.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use zbx_proto::{FrameCodec, Payload, ProtocolRequest};

use crate::error::{Error, Result};

/// Request building and reply handling for one protocol.
///
/// Implemented by [`Sender`](crate::Sender) and
/// [`JavaGateway`](crate::JavaGateway); [`ProtocolClient::request`] drives
/// the socket in between.
pub trait Exchange {
    /// Arguments of one call, handed back to `handle_response`
    type Input;
    type Output;

    /// Build the request for one call.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be turned into a request; no
    /// socket is opened in that case.
    fn create_request(&self, input: &Self::Input) -> Result<ProtocolRequest>;

    /// Turn the decoded reply into the call's result.
    ///
    /// # Errors
    ///
    /// Returns an error if the reply reports a failure of the whole call.
    fn handle_response(&self, payload: Payload, input: Self::Input) -> Result<Self::Output>;
}

/// One endpoint speaking the binary JSON protocol
#[derive(Debug, Clone)]
pub struct ProtocolClient {
    host: String,
    port: u16,
    timeout: Duration,
    cancel: Option<CancellationToken>,
}

impl ProtocolClient {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
            cancel: None,
        }
    }

    /// Abort in-flight and future calls once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Perform one call: build, send, receive, handle.
    ///
    /// # Errors
    ///
    /// Returns the request builder's error, a transport error (connect,
    /// write, read, timeout, cancellation), a framing error if the reply is
    /// not a valid frame, or the response handler's error.
    pub async fn request<E: Exchange>(&self, exchange: &E, input: E::Input) -> Result<E::Output> {
        let request = exchange.create_request(&input)?;
        let payload = self.round_trip(request).await?;
        exchange.handle_response(payload, input)
    }

    async fn round_trip(&self, request: ProtocolRequest) -> Result<Payload> {
        let timed = tokio::time::timeout(self.timeout, self.send_and_receive(request));

        let outcome = match &self.cancel {
            Some(token) => tokio::select! {
                () = token.cancelled() => return Err(Error::Cancelled),
                outcome = timed => outcome,
            },
            None => timed.await,
        };

        outcome.map_err(|_| Error::Timeout)?
    }

    // The socket is owned by `framed` and closed when it drops, on every path
    async fn send_and_receive(&self, request: ProtocolRequest) -> Result<Payload> {
        debug!(
            "Sending '{}' request to {}:{}",
            request.request_type(),
            self.host,
            self.port
        );

        let stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        let mut framed = Framed::new(stream, FrameCodec::new());

        framed.send(request).await?;

        match framed.next().await {
            Some(reply) => Ok(reply?),
            None => Err(Error::ConnectionClosed),
        }
    }
}
