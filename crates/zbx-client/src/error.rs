//! Error types for the zbx-client crate.
//!
//! This module provides a unified error type for the trapper, Java gateway and
//! JSON-RPC clients.

use zbx_proto::{FrameError, RpcError};

use crate::settings::ApiVersionRange;

/// Unified error type for client operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The peer did not speak the binary JSON protocol
    #[error("Framing error: {0}")]
    Framing(FrameError),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Unsupported API version {found} (supported: {supported})")]
    Version {
        found: String,
        supported: ApiVersionRange,
    },

    /// A well-formed error reply that blocks the whole call
    #[error("Service error: {message}")]
    Reported { code: Option<i32>, message: String },

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Request timeout")]
    Timeout,

    #[error("Request cancelled")]
    Cancelled,

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    pub fn reported(message: impl Into<String>) -> Self {
        Self::Reported {
            code: None,
            message: message.into(),
        }
    }

    /// True for socket, HTTP and timeout failures. These are never retried
    /// by the clients.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Http(_) | Self::ConnectionClosed | Self::Timeout | Self::Cancelled
        )
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::Io(e) => Self::Io(e),
            FrameError::Truncated(_) => Self::ConnectionClosed,
            other => Self::Framing(other),
        }
    }
}

impl From<RpcError> for Error {
    fn from(e: RpcError) -> Self {
        let message = match e.detail() {
            Some(detail) => format!("{} {detail}", e.message),
            None => e.message,
        };
        Self::Reported {
            code: e.code,
            message,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ApiVersion;
    use serde_json::json;

    #[test]
    fn test_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err: Error = io_err.into();

        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_transport());
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn test_frame_io_error_unwraps_to_transport() {
        let frame_err = FrameError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ));
        let err: Error = frame_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_transport());
    }

    #[test]
    fn test_truncated_frame_is_connection_closed() {
        let err: Error = FrameError::Truncated(6).into();
        assert!(matches!(err, Error::ConnectionClosed));
        assert!(err.is_transport());
    }

    #[test]
    fn test_frame_header_error_keeps_bytes() {
        let err: Error = FrameError::InvalidHeader(b"HTTP/".to_vec()).into();
        match err {
            Error::Framing(ref inner) => {
                assert_eq!(inner.offending_header(), Some(&b"HTTP/"[..]));
            }
            _ => panic!("Expected Framing error"),
        }
        assert!(!err.is_transport());
    }

    #[test]
    fn test_error_from_rpc_error() {
        let rpc_err = RpcError::with_data(
            -32602,
            "Invalid params.",
            json!("Host with the same name already exists."),
        );
        let err: Error = rpc_err.into();

        match err {
            Error::Reported { code, message } => {
                assert_eq!(code, Some(-32602));
                assert_eq!(
                    message,
                    "Invalid params. Host with the same name already exists."
                );
            }
            _ => panic!("Expected Reported error"),
        }
    }

    #[test]
    fn test_error_display() {
        assert_eq!(Error::ConnectionClosed.to_string(), "Connection closed");
        assert_eq!(Error::Timeout.to_string(), "Request timeout");
        assert_eq!(Error::Cancelled.to_string(), "Request cancelled");

        let err = Error::Version {
            found: "1.3".to_string(),
            supported: ApiVersionRange::exactly(ApiVersion::new(1, 4)),
        };
        assert_eq!(err.to_string(), "Unsupported API version 1.3 (supported: 1.4)");

        let err = Error::Authentication("Login name or password is incorrect.".to_string());
        assert!(err.to_string().starts_with("Authentication failed"));
    }

    #[test]
    fn test_reported_is_not_transport() {
        assert!(!Error::reported("failed").is_transport());
        assert!(!Error::Authentication(String::new()).is_transport());
    }
}
