//! Lazily decoded broadcast values.
//!
//! A [`BroadcastValue`] pairs a backend-distributed byte blob with the codec that
//! produced it. Workers call [`BroadcastValue::value`]; the first call on an
//! instance decodes the blob, every later call returns the cached result.

use std::fmt;
use std::sync::Arc;

use log::error;
use once_cell::sync::OnceCell;

use crate::backend::{BackendSession, Broadcast};
use crate::codec::{Codec, CodecContext};
use crate::error::{DecodeError, Result};

pub struct BroadcastValue<T> {
    broadcast: Broadcast,
    codec: Arc<dyn Codec<T>>,
    /// Empty until the first successful decode, never changed afterwards.
    value: OnceCell<T>,
}

impl<T> BroadcastValue<T> {
    pub fn new(broadcast: Broadcast, codec: Arc<dyn Codec<T>>) -> Self {
        Self {
            broadcast,
            codec,
            value: OnceCell::new(),
        }
    }

    /// Encode `value` and distribute it through `session`.
    pub fn create(
        session: &dyn BackendSession,
        value: &T,
        codec: Arc<dyn Codec<T>>,
    ) -> Result<Self> {
        let bytes = codec.encode(value, CodecContext::Outer)?;
        let broadcast = session.broadcast(bytes)?;
        Ok(Self::new(broadcast, codec))
    }

    /// The decoded value.
    ///
    /// Concurrent first callers block while exactly one of them decodes. A
    /// failed decode leaves the cell empty, so a later call retries.
    pub fn value(&self) -> std::result::Result<&T, DecodeError> {
        self.value.get_or_try_init(|| {
            self.codec
                .decode(self.broadcast.value(), CodecContext::Outer)
                .inspect_err(|e| {
                    error!(
                        "Error deserializing broadcast variable {}: {}",
                        self.broadcast.id(),
                        e
                    )
                })
        })
    }

    pub fn is_decoded(&self) -> bool {
        self.value.get().is_some()
    }

    pub fn broadcast(&self) -> &Broadcast {
        &self.broadcast
    }
}

/// A clone is what a worker receives: the blob and codec, without the decoded
/// value, which the clone computes again on first use.
impl<T> Clone for BroadcastValue<T> {
    fn clone(&self) -> Self {
        Self::new(self.broadcast.clone(), Arc::clone(&self.codec))
    }
}

impl<T> fmt::Debug for BroadcastValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastValue")
            .field("broadcast", &self.broadcast)
            .field("decoded", &self.is_decoded())
            .finish()
    }
}
