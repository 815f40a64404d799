use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use dataflow_runner::{Pipeline, PipelineRunner};
use log::info;

mod config;
mod functions;

#[derive(Parser, Debug)]
#[command(name = "dataflow-run")]
#[command(about = "Run a dataflow pipeline described in JSON")]
struct Cli {
    /// Path to the pipeline JSON file
    pipeline: PathBuf,

    /// Runner options file (TOML). Defaults to runner.toml in the config directory
    #[arg(long)]
    config: Option<PathBuf>,

    /// Backend master: local, local[N] or local[*]
    #[arg(long)]
    master: Option<String>,

    /// Job name reported by the backend
    #[arg(long)]
    job_name: Option<String>,

    /// Default number of partitions per dataset
    #[arg(long)]
    parallelism: Option<usize>,

    /// Print the contents of every dataset no transform consumes
    #[arg(long)]
    print: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let overrides = config::Overrides {
        master: cli.master.clone(),
        job_name: cli.job_name.clone(),
        default_parallelism: cli.parallelism,
    };
    let options = config::load_options(cli.config.as_deref(), &overrides)?;

    let json = fs::read_to_string(&cli.pipeline)
        .with_context(|| format!("failed to read pipeline {}", cli.pipeline.display()))?;
    let pipeline = Pipeline::from_json(&json)
        .with_context(|| format!("invalid pipeline {}", cli.pipeline.display()))?;
    info!(
        "Loaded pipeline '{}' with {} transforms",
        pipeline.name,
        pipeline.transforms().count()
    );

    let runner = PipelineRunner::create(options, functions::builtin_functions());
    let result = runner
        .run(&pipeline)
        .with_context(|| format!("pipeline '{}' failed", pipeline.name))?;

    if cli.print {
        for handle in pipeline.terminal_outputs() {
            if result.get(&handle).and_then(|r| r.as_dataset()).is_none() {
                continue;
            }
            let values = result
                .collect(&handle)
                .with_context(|| format!("failed to collect {}", handle))?;
            println!("== {} ({} elements)", handle, values.len());
            for value in values {
                println!("{}", value);
            }
        }
    }
    Ok(())
}
