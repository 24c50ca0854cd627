//! Clients for a Zabbix server.
//!
//! # Architecture
//!
//! - [`Sender`]: pushes trapper measurements over the binary JSON protocol
//! - [`JavaGateway`]: reads JMX attributes through the Java gateway, same
//!   protocol
//! - [`RpcConnection`]: authenticated JSON-RPC session against the HTTP API
//!
//! The two binary clients share [`ProtocolClient`], which opens one TCP
//! connection per call. Wire formats live in `zbx-proto`, plain data types in
//! `zbx-types`; both are re-exported here.
//!
//! # Example
//!
//! ```no_run
//! use zbx_client::{Measurement, Sender, TrapperSettings};
//!
//! # async fn run() -> zbx_client::Result<()> {
//! let sender = Sender::new(&TrapperSettings {
//!     host: "zabbix.example.com".into(),
//!     ..TrapperSettings::default()
//! });
//! let summary = sender
//!     .transmit([Measurement::new("app.requests", 42), Measurement::new("app.state", "up")])
//!     .await?;
//! println!("{:?}", summary.info);
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod gateway;
pub mod protocol;
pub mod sender;
pub mod settings;
pub mod transport;

pub use connection::{RpcConnection, SessionState};
pub use error::{Error, Result};
pub use gateway::{JavaGateway, coerce};
pub use protocol::{Exchange, ProtocolClient};
pub use sender::Sender;
pub use settings::{
    ApiSettings, ApiVersion, ApiVersionRange, Credentials, DEFAULT_GATEWAY_PORT, DEFAULT_HOST,
    DEFAULT_TRAPPER_PORT, GatewaySettings, TrapperSettings,
};
pub use transport::{HttpReply, HttpTransport, JSON_RPC_CONTENT_TYPE, Transport};

pub use zbx_proto::{RpcError, RpcRequest, RpcResponse, Shape};
pub use zbx_types::{JmxQuery, JmxReading, JmxValue, Jvm, Measurement, TrapperSummary};

pub use tokio_util::sync::CancellationToken;
