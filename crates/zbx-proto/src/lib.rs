//! Wire formats spoken by the zbx clients.
//!
//! # Architecture
//!
//! - [`frame`]: binary JSON framing (`ZBXD\x01` header, length, footer, body)
//!   as a pure encode/decode pair and as a tokio-util codec
//! - [`request`]: outgoing binary-protocol requests for the trapper and the
//!   Java gateway
//! - [`jsonrpc`]: JSON-RPC 2.0 request and error types for the HTTP API
//! - [`response`]: classification of JSON-RPC replies
//!
//! # Example
//!
//! ```
//! use zbx_proto::{ProtocolRequest, frame};
//! use zbx_types::Measurement;
//!
//! let request = ProtocolRequest::sender_data(&[Measurement::new("k", 1).with_host("h")])?;
//! let bytes = request.to_frame()?;
//! assert_eq!(&bytes[..frame::HEADER_SIZE], frame::HEADER);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod frame;
pub mod jsonrpc;
pub mod request;
pub mod response;

pub use frame::{FrameCodec, FrameError, Payload};
pub use jsonrpc::{
    APPLICATION_ERROR, INVALID_PARAMS, JSONRPC_VERSION, LOGIN_METHOD, LoginParams,
    METHOD_NOT_FOUND, RpcError, RpcRequest, VERSION_METHOD,
};
pub use request::{JAVA_GATEWAY_JMX, ProtocolRequest, SENDER_DATA};
pub use response::{RpcResponse, Shape};
