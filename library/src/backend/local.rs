//! In-process backend: partitions are processed on a dedicated rayon pool.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, info};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use super::{BackendSession, Broadcast, Dataset, PartitionFn};
use crate::config::RunnerOptions;
use crate::error::{Result, RunnerError};
use crate::model::Value;

/// A backend session running on the local machine.
///
/// Accepts the masters `local` (one thread), `local[N]` and `local[*]` (one
/// thread per available core).
pub struct LocalSession {
    job_name: String,
    master: String,
    default_parallelism: usize,
    pool: ThreadPool,
    next_broadcast_id: AtomicU64,
}

impl LocalSession {
    pub fn new(options: &RunnerOptions) -> Result<Self> {
        let threads = parse_local_master(&options.master)?;
        let default_parallelism = options.default_parallelism.unwrap_or(threads).max(1);
        let job_name = options.job_name.clone();
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name({
                let job_name = job_name.clone();
                move |i| format!("{}-worker-{}", job_name, i)
            })
            .build()
            .map_err(|e| RunnerError::backend(format!("failed to start worker pool: {}", e)))?;

        info!(
            "Started local session '{}' on {} ({} worker threads)",
            job_name, options.master, threads
        );

        Ok(Self {
            job_name,
            master: options.master.clone(),
            default_parallelism,
            pool,
            next_broadcast_id: AtomicU64::new(0),
        })
    }
}

impl BackendSession for LocalSession {
    fn job_name(&self) -> &str {
        &self.job_name
    }

    fn master(&self) -> &str {
        &self.master
    }

    fn default_parallelism(&self) -> usize {
        self.default_parallelism
    }

    fn broadcast(&self, bytes: Vec<u8>) -> Result<Broadcast> {
        let id = self.next_broadcast_id.fetch_add(1, Ordering::Relaxed);
        debug!("Broadcasting blob {} ({} bytes)", id, bytes.len());
        Ok(Broadcast::new(id, bytes))
    }

    fn parallelize(&self, values: Vec<Value>, partitions: usize) -> Result<Dataset> {
        let partitions = partitions.max(1);
        let chunk = values.len().div_ceil(partitions).max(1);
        let mut remaining = values.into_iter();
        let parts: Vec<Vec<Value>> = (0..partitions)
            .map(|_| remaining.by_ref().take(chunk).collect())
            .collect();
        Ok(Dataset::new(parts))
    }

    fn map_partitions(&self, input: &Dataset, f: &PartitionFn<'_>) -> Result<Dataset> {
        let parts = self.pool.install(|| {
            input
                .partitions()
                .par_iter()
                .enumerate()
                .map(|(index, partition)| f(index, partition))
                .collect::<Result<Vec<_>>>()
        })?;
        Ok(Dataset::new(parts))
    }

    fn shuffle_by_key(&self, input: &Dataset, partitions: usize) -> Result<Dataset> {
        let partitions = partitions.max(1);
        // Bucket every input partition in parallel, then merge buckets in
        // input-partition order so the output is deterministic.
        let bucketed = self.pool.install(|| {
            input
                .partitions()
                .par_iter()
                .map(|partition| {
                    let mut buckets = vec![Vec::new(); partitions];
                    for element in partition {
                        let (key, _) = element.as_pair().ok_or_else(|| {
                            RunnerError::execution(format!(
                                "shuffle by key expects key/value pairs, got {}",
                                element
                            ))
                        })?;
                        buckets[partition_for(key, partitions)].push(element.clone());
                    }
                    Ok(buckets)
                })
                .collect::<Result<Vec<Vec<Vec<Value>>>>>()
        })?;

        let mut parts = vec![Vec::new(); partitions];
        for buckets in bucketed {
            for (index, bucket) in buckets.into_iter().enumerate() {
                parts[index].extend(bucket);
            }
        }
        Ok(Dataset::new(parts))
    }

    fn union(&self, inputs: &[Dataset]) -> Result<Dataset> {
        let parts = inputs
            .iter()
            .flat_map(|d| d.partitions().iter().cloned())
            .collect();
        Ok(Dataset::new(parts))
    }

    fn collect(&self, input: &Dataset) -> Result<Vec<Value>> {
        Ok(input.iter().cloned().collect())
    }
}

fn partition_for(key: &Value, partitions: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % partitions as u64) as usize
}

/// Thread count for a `local`, `local[N]` or `local[*]` master.
fn parse_local_master(master: &str) -> Result<usize> {
    let master = master.trim();
    if master == "local" {
        return Ok(1);
    }
    let threads = master
        .strip_prefix("local[")
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| {
            RunnerError::InvalidConfig(format!(
                "unsupported master '{}': expected local, local[N] or local[*]",
                master
            ))
        })?;
    if threads == "*" {
        return Ok(std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1));
    }
    match threads.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(RunnerError::InvalidConfig(format!(
            "invalid thread count in master '{}'",
            master
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(master: &str) -> LocalSession {
        LocalSession::new(&RunnerOptions::default().with_master(master)).unwrap()
    }

    #[test]
    fn test_parse_local_master() {
        assert_eq!(parse_local_master("local").unwrap(), 1);
        assert_eq!(parse_local_master("local[3]").unwrap(), 3);
        assert!(parse_local_master("local[*]").unwrap() >= 1);
        assert!(parse_local_master("local[0]").is_err());
        assert!(parse_local_master("spark://host:7077").is_err());
        assert!(parse_local_master("local[x]").is_err());
    }

    #[test]
    fn test_parallelize_keeps_order_across_partitions() {
        let session = session("local[2]");
        let values: Vec<Value> = (1..=5).map(Value::from).collect();
        let dataset = session.parallelize(values.clone(), 2).unwrap();
        assert_eq!(dataset.num_partitions(), 2);
        assert_eq!(session.collect(&dataset).unwrap(), values);
    }

    #[test]
    fn test_parallelize_empty_input() {
        let session = session("local");
        let dataset = session.parallelize(Vec::new(), 3).unwrap();
        assert_eq!(dataset.num_partitions(), 3);
        assert!(dataset.is_empty());
    }

    #[test]
    fn test_map_partitions_sees_partition_index() {
        let session = session("local[2]");
        let dataset = session
            .parallelize(vec![Value::from(0); 4], 2)
            .unwrap();
        let tagged = session
            .map_partitions(&dataset, &|index, part| {
                Ok(part.iter().map(|_| Value::from(index as i64)).collect())
            })
            .unwrap();
        assert_eq!(
            session.collect(&tagged).unwrap(),
            vec![Value::from(0), Value::from(0), Value::from(1), Value::from(1)]
        );
    }

    #[test]
    fn test_map_partitions_propagates_errors() {
        let session = session("local[2]");
        let dataset = session.parallelize(vec![Value::from(1)], 1).unwrap();
        let err = session
            .map_partitions(&dataset, &|_, _| Err(RunnerError::execution("boom")))
            .unwrap_err();
        assert!(matches!(err, RunnerError::Execution(_)));
    }

    #[test]
    fn test_shuffle_colocates_keys() {
        let session = session("local[4]");
        let values = vec![
            Value::pair("a", 1),
            Value::pair("b", 2),
            Value::pair("a", 3),
            Value::pair("c", 4),
            Value::pair("b", 5),
        ];
        let dataset = session.parallelize(values, 3).unwrap();
        let shuffled = session.shuffle_by_key(&dataset, 4).unwrap();
        assert_eq!(shuffled.len(), 5);
        for key in ["a", "b", "c"] {
            let holding: Vec<usize> = shuffled
                .partitions()
                .iter()
                .enumerate()
                .filter(|(_, p)| p.iter().any(|e| e.as_pair().unwrap().0 == &Value::from(key)))
                .map(|(i, _)| i)
                .collect();
            assert_eq!(holding.len(), 1, "key {} split across partitions", key);
        }
    }

    #[test]
    fn test_shuffle_rejects_non_pairs() {
        let session = session("local");
        let dataset = session.parallelize(vec![Value::from(1)], 1).unwrap();
        assert!(session.shuffle_by_key(&dataset, 2).is_err());
    }

    #[test]
    fn test_broadcast_ids_are_unique() {
        let session = session("local");
        let a = session.broadcast(vec![1]).unwrap();
        let b = session.broadcast(vec![2]).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(b.value(), &[2]);
    }
}
