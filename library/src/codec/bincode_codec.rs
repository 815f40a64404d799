use std::marker::PhantomData;

use bincode::Options;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{Codec, CodecContext, unwrap, wrap};
use crate::error::{DecodeError, EncodeError};

/// Compact binary codec for any serde type.
///
/// Trailing bytes after a value are rejected so a corrupted or mismatched blob
/// never decodes silently.
pub struct BincodeCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> BincodeCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    fn options() -> impl Options {
        bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .reject_trailing_bytes()
    }
}

impl<T> Default for BincodeCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Codec<T> for BincodeCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T, context: CodecContext) -> Result<Vec<u8>, EncodeError> {
        let payload = Self::options().serialize(value)?;
        wrap(payload, context)
    }

    fn decode(&self, bytes: &[u8], context: CodecContext) -> Result<T, DecodeError> {
        let payload = unwrap(bytes, context)?;
        Ok(Self::options().deserialize(payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;

    #[test]
    fn test_roundtrip_values_in_both_contexts() {
        let codec = BincodeCodec::<Vec<Value>>::new();
        let values = vec![
            Value::from(1),
            Value::from(2.5),
            Value::pair("k", vec![Value::Null, Value::from(true)]),
        ];
        for context in [CodecContext::Outer, CodecContext::Nested] {
            let bytes = codec.encode(&values, context).unwrap();
            assert_eq!(codec.decode(&bytes, context).unwrap(), values);
        }
    }

    #[test]
    fn test_outer_rejects_trailing_bytes() {
        let codec = BincodeCodec::<u32>::new();
        let mut bytes = codec.encode(&7, CodecContext::Outer).unwrap();
        bytes.push(0xff);
        assert!(codec.decode(&bytes, CodecContext::Outer).is_err());
    }

    #[test]
    fn test_malformed_bytes_fail() {
        let codec = BincodeCodec::<String>::new();
        assert!(matches!(
            codec.decode(&[0xff, 0xff], CodecContext::Outer),
            Err(DecodeError::Bincode(_))
        ));
    }
}
