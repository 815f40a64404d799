//! Backend abstraction: the distributed-compute session evaluators submit work to.

mod local;

pub use local::LocalSession;

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::Result;
use crate::model::Value;

/// Per-partition computation: `(partition index, partition elements) -> new elements`.
pub type PartitionFn<'a> = dyn Fn(usize, &[Value]) -> Result<Vec<Value>> + Sync + 'a;

/// A backend execution session.
///
/// Every method that creates data returns a new, immutable [`Dataset`]; inputs
/// are only ever borrowed.
pub trait BackendSession: Send + Sync {
    /// Job name, for logging.
    fn job_name(&self) -> &str;

    /// Master endpoint the session is attached to, for logging.
    fn master(&self) -> &str;

    /// Partition count used when an operation does not specify one.
    fn default_parallelism(&self) -> usize;

    /// Distribute an immutable blob to all workers.
    fn broadcast(&self, bytes: Vec<u8>) -> Result<Broadcast>;

    /// Turn driver-side values into a dataset with `partitions` partitions.
    fn parallelize(&self, values: Vec<Value>, partitions: usize) -> Result<Dataset>;

    /// Run `f` over every partition of `input`.
    fn map_partitions(&self, input: &Dataset, f: &PartitionFn<'_>) -> Result<Dataset>;

    /// Redistribute `Pair` elements so that equal keys share a partition.
    fn shuffle_by_key(&self, input: &Dataset, partitions: usize) -> Result<Dataset>;

    /// Concatenate datasets, keeping their partitions.
    fn union(&self, inputs: &[Dataset]) -> Result<Dataset>;

    /// Gather all elements to the driver, in partition order.
    fn collect(&self, input: &Dataset) -> Result<Vec<Value>>;
}

/// A backend-side distributed collection.
#[derive(Clone)]
pub struct Dataset {
    id: Uuid,
    partitions: Arc<Vec<Vec<Value>>>,
}

impl Dataset {
    pub fn new(partitions: Vec<Vec<Value>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            partitions: Arc::new(partitions),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn partitions(&self) -> &[Vec<Value>] {
        &self.partitions
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    pub fn len(&self) -> usize {
        self.partitions.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.partitions.iter().flatten()
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("id", &self.id)
            .field("partitions", &self.num_partitions())
            .field("len", &self.len())
            .finish()
    }
}

/// Handle to an immutable blob distributed to every worker.
#[derive(Clone)]
pub struct Broadcast {
    id: u64,
    bytes: Arc<[u8]>,
}

impl Broadcast {
    pub fn new(id: u64, bytes: Vec<u8>) -> Self {
        Self {
            id,
            bytes: bytes.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The blob, as resident on the worker.
    pub fn value(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Broadcast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broadcast")
            .field("id", &self.id)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}
