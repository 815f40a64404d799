use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{Codec, CodecContext, unwrap, wrap};
use crate::error::{DecodeError, EncodeError};

/// Human-readable codec, handy for debugging broadcast payloads.
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Codec<T> for JsonCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T, context: CodecContext) -> Result<Vec<u8>, EncodeError> {
        wrap(serde_json::to_vec(value)?, context)
    }

    fn decode(&self, bytes: &[u8], context: CodecContext) -> Result<T, DecodeError> {
        Ok(serde_json::from_slice(unwrap(bytes, context)?)?)
    }
}
