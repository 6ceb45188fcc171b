//! Run reporting.
//!
//! A [`RunReport`] records what happened to every input file (processed,
//! skipped because its output already existed, or failed) together with the
//! aggregate row count and wall time of the run.
//!
//! # Example
//!
//! ```no_run
//! use post_sentiment::config::Config;
//! use post_sentiment::driver::PipelineDriver;
//! use post_sentiment::sentiment::ScoreEngine;
//!
//! # fn main() -> anyhow::Result<()> {
//! let engine = ScoreEngine::initialize()?;
//! let report = PipelineDriver::new(Config::default(), &engine)?.run()?;
//!
//! // Print a summary to stdout
//! report.print();
//! // Or save to file
//! report.save_to_file("run_report.json")?;
//! # Ok(())
//! # }
//! ```

use crate::transform::TransformStats;
use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What happened to one input file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileOutcome {
    Processed(TransformStats),
    /// The destination already existed; the file was not touched.
    Skipped,
    /// The transform failed; `error` carries the full context chain.
    Failed { error: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileReport {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub outcome: FileOutcome,
}

impl FileReport {
    fn to_json(&self) -> Value {
        let mut obj = json!({
            "source": self.source.display().to_string(),
            "destination": self.destination.display().to_string(),
        });
        let extra = match &self.outcome {
            FileOutcome::Processed(stats) => json!({
                "status": "processed",
                "rows": stats.rows,
                "chunks": stats.chunks,
                "bytes_written": stats.bytes_written,
                "elapsed_ms": millis(stats.elapsed),
            }),
            FileOutcome::Skipped => json!({ "status": "skipped" }),
            FileOutcome::Failed { error } => json!({ "status": "failed", "error": error }),
        };
        if let (Some(obj), Value::Object(extra)) = (obj.as_object_mut(), extra) {
            obj.extend(extra);
        }
        obj
    }
}

/// Per-file outcomes plus totals for one pipeline run.
#[derive(Clone, Debug, Default)]
pub struct RunReport {
    output_dir: PathBuf,
    files: Vec<FileReport>,
    elapsed: Duration,
}

impl RunReport {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, file: FileReport) {
        self.files.push(file);
    }

    /// Record the total wall time of the run.
    pub fn finish(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }

    /// Every file, in processing order.
    #[must_use]
    pub fn files(&self) -> &[FileReport] {
        &self.files
    }

    fn processed(&self) -> impl Iterator<Item = &TransformStats> {
        self.files.iter().filter_map(|f| match &f.outcome {
            FileOutcome::Processed(stats) => Some(stats),
            _ => None,
        })
    }

    #[must_use]
    pub fn processed_count(&self) -> usize {
        self.processed().count()
    }

    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.outcome == FileOutcome::Skipped)
            .count()
    }

    /// Files that failed, with their error text.
    #[must_use]
    pub fn failures(&self) -> Vec<(&Path, &str)> {
        self.files
            .iter()
            .filter_map(|f| match &f.outcome {
                FileOutcome::Failed { error } => Some((f.source.as_path(), error.as_str())),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures().is_empty()
    }

    /// Rows written during this run (skipped files contribute nothing).
    #[must_use]
    pub fn rows_processed(&self) -> u64 {
        self.processed().map(|s| s.rows).sum()
    }

    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.processed().map(|s| s.bytes_written).sum()
    }

    /// Human-readable summary, including an itemized failure list.
    #[must_use]
    pub fn render(&self) -> String {
        let rule = "=".repeat(60);
        let mut out = String::new();
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(
            out,
            "Done. {} rows with sentiment in {:.1} minutes",
            with_thousands(self.rows_processed()),
            self.elapsed.as_secs_f64() / 60.0
        );
        let _ = writeln!(
            out,
            "Files: {} processed, {} skipped, {} failed ({} total)",
            self.processed_count(),
            self.skipped_count(),
            self.failures().len(),
            self.files.len()
        );
        let _ = writeln!(out, "Output: {}/", self.output_dir.display());

        let failures = self.failures();
        if !failures.is_empty() {
            let _ = writeln!(out, "\nFailed files:");
            for (source, error) in failures {
                let _ = writeln!(out, "  ✗ {}: {error}", source.display());
            }
        }
        out
    }

    /// Print [`render`](Self::render) to stdout.
    pub fn print(&self) {
        print!("{}", self.render());
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "output_dir": self.output_dir.display().to_string(),
            "files_total": self.files.len(),
            "files_processed": self.processed_count(),
            "files_skipped": self.skipped_count(),
            "files_failed": self.failures().len(),
            "rows_processed": self.rows_processed(),
            "bytes_written": self.bytes_written(),
            "elapsed_ms": millis(self.elapsed),
            "files": self.files.iter().map(FileReport::to_json).collect::<Vec<_>>(),
        })
    }

    /// Save [`to_json`](Self::to_json) as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written to.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let formatted = serde_json::to_string_pretty(&self.to_json())?;
        let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        file.write_all(formatted.as_bytes())
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn with_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i).is_multiple_of(3) {
            out.push(',');
        }
        out.push(c);
    }
    out
}
