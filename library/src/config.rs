use serde::{Deserialize, Serialize};

pub const DEFAULT_MASTER: &str = "local[*]";
pub const DEFAULT_JOB_NAME: &str = "dataflow-runner";

/// Options for creating a runner and its backend session.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct RunnerOptions {
    /// Backend master, e.g. `local`, `local[4]` or `local[*]`.
    pub master: String,
    pub job_name: String,
    /// Partitions per dataset when an operation does not say otherwise.
    /// Defaults to the number of worker threads.
    pub default_parallelism: Option<usize>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            master: DEFAULT_MASTER.to_string(),
            job_name: DEFAULT_JOB_NAME.to_string(),
            default_parallelism: None,
        }
    }
}

impl RunnerOptions {
    pub fn with_master(mut self, master: &str) -> Self {
        self.master = master.to_string();
        self
    }

    pub fn with_job_name(mut self, job_name: &str) -> Self {
        self.job_name = job_name.to_string();
        self
    }

    pub fn with_default_parallelism(mut self, partitions: usize) -> Self {
        self.default_parallelism = Some(partitions);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let options: RunnerOptions = serde_json::from_str(r#"{"job_name": "wordcount"}"#).unwrap();
        assert_eq!(options.master, DEFAULT_MASTER);
        assert_eq!(options.job_name, "wordcount");
        assert_eq!(options.default_parallelism, None);
    }
}
