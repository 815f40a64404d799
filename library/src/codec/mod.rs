//! Value codec service: typed values to and from opaque bytes.
//!
//! `Outer` encodings occupy a whole byte stream. `Nested` encodings are one part
//! of a larger stream and carry a little-endian `u32` length prefix so the
//! reader knows where the value ends.

mod bincode_codec;
mod json_codec;

pub use bincode_codec::BincodeCodec;
pub use json_codec::JsonCodec;

use crate::error::{DecodeError, EncodeError};

const FRAME_HEADER_LEN: usize = 4;

/// Whether a value is the whole stream or a part of one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodecContext {
    Outer,
    Nested,
}

/// Encodes and decodes values of one type.
pub trait Codec<T>: Send + Sync {
    fn encode(&self, value: &T, context: CodecContext) -> Result<Vec<u8>, EncodeError>;

    /// Decode a value. Malformed input is always an error, never a default value.
    fn decode(&self, bytes: &[u8], context: CodecContext) -> Result<T, DecodeError>;
}

/// Prefix `payload` with its length.
pub fn frame(payload: Vec<u8>) -> Result<Vec<u8>, EncodeError> {
    let len = u32::try_from(payload.len()).map_err(|_| EncodeError::FrameTooLarge(payload.len()))?;
    let mut framed = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    framed.extend_from_slice(&len.to_le_bytes());
    framed.extend(payload);
    Ok(framed)
}

/// Split one length-prefixed frame off the front of `bytes`.
///
/// Returns the frame's payload and the remaining bytes.
pub fn split_frame(bytes: &[u8]) -> Result<(&[u8], &[u8]), DecodeError> {
    if bytes.len() < FRAME_HEADER_LEN {
        return Err(DecodeError::Truncated {
            expected: FRAME_HEADER_LEN,
            found: bytes.len(),
        });
    }
    let (header, rest) = bytes.split_at(FRAME_HEADER_LEN);
    let mut len = [0u8; FRAME_HEADER_LEN];
    len.copy_from_slice(header);
    let len = u32::from_le_bytes(len) as usize;
    if rest.len() < len {
        return Err(DecodeError::Truncated {
            expected: len,
            found: rest.len(),
        });
    }
    Ok(rest.split_at(len))
}

/// Apply the framing a context requires to an already-encoded payload.
pub(crate) fn wrap(payload: Vec<u8>, context: CodecContext) -> Result<Vec<u8>, EncodeError> {
    match context {
        CodecContext::Outer => Ok(payload),
        CodecContext::Nested => frame(payload),
    }
}

/// The payload to hand to the underlying decoder for a context.
pub(crate) fn unwrap(bytes: &[u8], context: CodecContext) -> Result<&[u8], DecodeError> {
    match context {
        CodecContext::Outer => Ok(bytes),
        CodecContext::Nested => split_frame(bytes).map(|(payload, _)| payload),
    }
}
