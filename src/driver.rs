//! Whole-run orchestration.
//!
//! [`PipelineDriver`] finds the inputs, skips every file whose output already
//! exists, enriches the rest one after another, and collects a
//! [`RunReport`]. A file that fails is recorded and the run moves on; only
//! problems with the run as a whole (bad config, no inputs, unusable output
//! directory) end it early.
//!
//! Resumption is keyed on the output path alone. An output written under a
//! different chunk size or model is still treated as done.

use crate::config::{Config, ExecMode};
use crate::io::glob::discover_inputs;
use crate::report::{FileOutcome, FileReport, RunReport};
use crate::sentiment::{ScoreEngine, SentimentModel};
use crate::transform::ChunkedFileTransformer;
use anyhow::{Context, Result};
use std::fs::create_dir_all;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

pub struct PipelineDriver<'e, M> {
    config: Config,
    engine: &'e ScoreEngine<M>,
}

impl<'e, M: SentimentModel> PipelineDriver<'e, M> {
    /// # Errors
    /// Returns an error if `config` does not validate.
    pub fn new(config: Config, engine: &'e ScoreEngine<M>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, engine })
    }

    /// Process every input file.
    ///
    /// # Errors
    /// Only run-level problems are errors: no input files, or an output
    /// directory that cannot be created. Per-file failures are reported in
    /// the returned [`RunReport`].
    pub fn run(&self) -> Result<RunReport> {
        let started = Instant::now();
        let sources = discover_inputs(&self.config)?;
        create_dir_all(&self.config.output_dir)
            .with_context(|| format!("mkdir -p {}", self.config.output_dir.display()))?;

        if let ExecMode::Parallel { threads } = self.config.mode {
            let threads = threads.unwrap_or_else(num_cpus::get);
            // ok() to ignore "already built" when a pool exists
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build_global()
                .ok();
            info!(threads, "parallel scoring enabled");
        }
        info!(
            files = sources.len(),
            input_dir = %self.config.input_dir.display(),
            chunk_size = self.config.chunk_size,
            "found input files"
        );

        let transformer =
            ChunkedFileTransformer::new(self.engine, self.config.chunk_size, self.config.mode);
        let mut report = RunReport::new(&self.config.output_dir);
        for (idx, source) in sources.iter().enumerate() {
            info!(file = idx + 1, of = sources.len(), source = %source.display(), "processing");
            report.push(self.process_file(&transformer, source));
        }
        report.finish(started.elapsed());

        if let Some(path) = &self.config.report_path
            && let Err(e) = report.save_to_file(path)
        {
            warn!(path = %path.display(), error = %format!("{e:#}"), "could not save run report");
        }
        Ok(report)
    }

    fn process_file(&self, transformer: &ChunkedFileTransformer<'_, M>, source: &Path) -> FileReport {
        let destination = match self.config.destination_for(source) {
            Ok(d) => d,
            Err(e) => {
                return FileReport {
                    source: source.to_path_buf(),
                    destination: Default::default(),
                    outcome: FileOutcome::Failed {
                        error: format!("{e:#}"),
                    },
                };
            }
        };

        let outcome = if destination.exists() {
            info!(destination = %destination.display(), "skip (already done)");
            FileOutcome::Skipped
        } else {
            match transformer.transform(source, &destination) {
                Ok(stats) => FileOutcome::Processed(stats),
                Err(e) => {
                    let error = format!("{e:#}");
                    warn!(source = %source.display(), %error, "file failed");
                    FileOutcome::Failed { error }
                }
            }
        };

        FileReport {
            source: source.to_path_buf(),
            destination,
            outcome,
        }
    }
}
