use anyhow::Result;
use clap::Parser;
use post_sentiment::config::{Config, DEFAULT_CHUNK_SIZE, ExecMode};
use post_sentiment::driver::PipelineDriver;
use post_sentiment::sentiment::ScoreEngine;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Add sentiment and engagement features to every post file in a directory.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Directory holding the input *.parquet files
    #[arg(long, default_value = "data/silver/posts")]
    input_dir: PathBuf,

    /// Directory receiving the *_sentiment.parquet outputs
    #[arg(long, default_value = "data/silver/posts_sentiment")]
    output_dir: PathBuf,

    /// Rows scored per chunk
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Score rows of each chunk on this many threads (0 = all cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Also write the run report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Config {
        let mode = match self.threads {
            None => ExecMode::Sequential,
            Some(0) => ExecMode::Parallel { threads: None },
            Some(n) => ExecMode::Parallel { threads: Some(n) },
        };
        let config = Config::new(self.input_dir, self.output_dir)
            .with_chunk_size(self.chunk_size)
            .with_mode(mode);
        match self.report {
            Some(path) => config.with_report_path(path),
            None => config,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn main() -> Result<ExitCode> {
    init_tracing();
    let config = Cli::parse().into_config();
    tracing::info!(?config, "starting post-sentiment");

    let engine = ScoreEngine::initialize()?;
    let report = PipelineDriver::new(config, &engine)?.run()?;
    report.print();

    Ok(if report.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
