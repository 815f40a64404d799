use std::fs;
use std::path::{Path, PathBuf};

use dataflow_runner::RunnerOptions;
use directories::ProjectDirs;
use log::{debug, info};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "runner.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Values given on the command line; each one set replaces the file's.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub master: Option<String>,
    pub job_name: Option<String>,
    pub default_parallelism: Option<usize>,
}

/// `runner.toml` in the platform config directory, if there is one.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "dataflow", "dataflow-runner")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

pub fn parse_options(toml_str: &str, path: &Path) -> Result<RunnerOptions, ConfigError> {
    toml::from_str(toml_str).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_options_file(path: &Path) -> Result<RunnerOptions, ConfigError> {
    let toml_str = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let options = parse_options(&toml_str, path)?;
    info!("Loaded runner options from {}", path.display());
    Ok(options)
}

/// Resolve the options for one run.
///
/// An explicit `--config` file must exist. Without one, the default config
/// file is used when present and defaults apply otherwise.
pub fn load_options(explicit: Option<&Path>, overrides: &Overrides) -> Result<RunnerOptions, ConfigError> {
    let mut options = match explicit {
        Some(path) => load_options_file(path)?,
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => load_options_file(&path)?,
            None => {
                debug!("No config file found, using default runner options");
                RunnerOptions::default()
            }
        },
    };
    apply_overrides(&mut options, overrides);
    Ok(options)
}

pub fn apply_overrides(options: &mut RunnerOptions, overrides: &Overrides) {
    if let Some(master) = &overrides.master {
        options.master = master.clone();
    }
    if let Some(job_name) = &overrides.job_name {
        options.job_name = job_name.clone();
    }
    if let Some(partitions) = overrides.default_parallelism {
        options.default_parallelism = Some(partitions);
    }
}
