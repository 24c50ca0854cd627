//! Binary JSON framing used by the trapper and Java gateway protocols.
//!
//! Every message is a JSON object wrapped in a small binary preamble:
//!
//! ```text
//! +-----------+----------------+-----------+------------------+
//! |  5 bytes  |  4 bytes       |  4 bytes  |  N bytes         |
//! |  ZBXD\x01 |  (length i32LE)|  (zeros)  |  (JSON payload)  |
//! +-----------+----------------+-----------+------------------+
//! ```
//!
//! The header is checked before anything else. A peer that answers with a
//! different header is reported through [`FrameError::InvalidHeader`] with
//! the bytes it actually sent, and the body is never parsed.

use std::io::{self, Read};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde_json::{Map, Value};
use tokio_util::codec::{Decoder, Encoder};

use crate::request::ProtocolRequest;

/// Protocol marker that opens every frame
pub const HEADER: &[u8; HEADER_SIZE] = b"ZBXD\x01";

/// Header size in bytes
pub const HEADER_SIZE: usize = 5;

/// Size of the length field plus the footer that follows it
pub const LENGTH_FOOTER_SIZE: usize = 8;

/// Footer written after the length field
const FOOTER: [u8; 4] = [0; 4];

/// Everything before the JSON body
const PREAMBLE_SIZE: usize = HEADER_SIZE + LENGTH_FOOTER_SIZE;

/// Maximum message size (16 MB)
const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// A decoded frame body
pub type Payload = Map<String, Value>;

/// Serialize `{"request": request_type, ...fields}` into a complete frame.
///
/// Keys in `fields` win over the `request` tag if both are present.
///
/// # Errors
///
/// Returns an error if the fields cannot be serialized or the body exceeds
/// the maximum frame size.
pub fn encode(request_type: &str, fields: &Payload) -> Result<Bytes, FrameError> {
    let mut body = Map::with_capacity(fields.len() + 1);
    body.insert("request".to_string(), Value::String(request_type.to_string()));
    body.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));

    let json = serde_json::to_vec(&Value::Object(body))?;
    let mut dst = BytesMut::with_capacity(PREAMBLE_SIZE + json.len());
    write_frame(&json, &mut dst)?;
    Ok(dst.freeze())
}

/// Decode a frame whose preamble has already been read.
///
/// `length_footer` holds the 8 bytes that follow the header; only the first
/// four carry the body length. The body is read from `body`.
///
/// # Errors
///
/// Returns [`FrameError::InvalidHeader`] without touching `body` when the
/// header does not match. Otherwise returns an error if the length is
/// invalid, the body cannot be read, or it is not a JSON object.
pub fn decode<R: Read>(
    header: &[u8],
    length_footer: &[u8],
    body: &mut R,
) -> Result<Payload, FrameError> {
    check_header(header)?;

    let Some(length) = length_footer.first_chunk::<4>() else {
        return Err(FrameError::TruncatedPreamble(length_footer.len()));
    };
    let length = body_length(i32::from_le_bytes(*length))?;

    let mut buf = vec![0u8; length];
    body.read_exact(&mut buf)?;
    parse_body(&buf)
}

fn check_header(header: &[u8]) -> Result<(), FrameError> {
    if header == HEADER {
        Ok(())
    } else {
        Err(FrameError::InvalidHeader(header.to_vec()))
    }
}

fn body_length(declared: i32) -> Result<usize, FrameError> {
    let length = usize::try_from(declared).map_err(|_| FrameError::InvalidLength(declared))?;
    if length > MAX_MESSAGE_SIZE {
        return Err(FrameError::MessageTooLarge(length));
    }
    Ok(length)
}

fn parse_body(body: &[u8]) -> Result<Payload, FrameError> {
    let json_str = std::str::from_utf8(body)?;
    match serde_json::from_str(json_str)? {
        Value::Object(map) => Ok(map),
        other => Err(FrameError::NotAnObject(other)),
    }
}

// Body size is checked against MAX_MESSAGE_SIZE (fits in i32)
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn write_frame(json: &[u8], dst: &mut BytesMut) -> Result<(), FrameError> {
    if json.len() > MAX_MESSAGE_SIZE {
        return Err(FrameError::MessageTooLarge(json.len()));
    }

    dst.reserve(PREAMBLE_SIZE + json.len());
    dst.put_slice(HEADER);
    dst.put_i32_le(json.len() as i32);
    dst.put_slice(&FOOTER);
    dst.put_slice(json);
    Ok(())
}

/// Codec for binary JSON frames over a stream socket
#[derive(Debug, Default)]
pub struct FrameCodec {
    current_length: Option<usize>,
}

impl FrameCodec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for FrameCodec {
    type Item = Payload;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.current_length.is_none() {
            if src.len() < HEADER_SIZE {
                return Ok(None);
            }

            if &src[..HEADER_SIZE] != HEADER {
                let header = src.split_to(HEADER_SIZE);
                return Err(FrameError::InvalidHeader(header.to_vec()));
            }

            if src.len() < PREAMBLE_SIZE {
                return Ok(None);
            }

            src.advance(HEADER_SIZE);
            let declared = src.get_i32_le();
            src.advance(FOOTER.len());

            self.current_length = Some(body_length(declared)?);
        }

        let Some(length) = self.current_length else {
            return Ok(None);
        };

        if src.len() < length {
            src.reserve(length - src.len());
            return Ok(None);
        }

        let body = src.split_to(length);
        self.current_length = None;

        parse_body(&body).map(Some)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload) = self.decode(buf)? {
            return Ok(Some(payload));
        }
        if buf.is_empty() && self.current_length.is_none() {
            return Ok(None);
        }

        // Too short for a header, but already not ours
        if self.current_length.is_none()
            && buf.len() < HEADER_SIZE
            && !HEADER.starts_with(&buf[..])
        {
            return Err(FrameError::InvalidHeader(buf.split().to_vec()));
        }

        let received = buf.len();
        buf.clear();
        self.current_length = None;
        Err(FrameError::Truncated(received))
    }
}

impl Encoder<ProtocolRequest> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: ProtocolRequest, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serde_json::to_vec(&item.body())?;
        write_frame(&json, dst)
    }
}

/// Errors that can occur while framing or unframing a message
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Invalid header: {0:?}")]
    InvalidHeader(Vec<u8>),

    #[error("Truncated preamble: got {0} of {LENGTH_FOOTER_SIZE} length bytes")]
    TruncatedPreamble(usize),

    /// The stream ended part way through a frame
    #[error("Stream ended inside a frame after {0} bytes")]
    Truncated(usize),

    #[error("Invalid body length: {0}")]
    InvalidLength(i32),

    #[error("Message too large: {0} bytes (max: {MAX_MESSAGE_SIZE})")]
    MessageTooLarge(usize),

    #[error("Frame body is not a JSON object: {0}")]
    NotAnObject(Value),
}

impl FrameError {
    /// The bytes a peer sent in place of the protocol header, if that is
    /// what went wrong.
    #[must_use]
    pub fn offending_header(&self) -> Option<&[u8]> {
        match self {
            Self::InvalidHeader(bytes) => Some(bytes),
            _ => None,
        }
    }
}
