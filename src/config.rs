//! Run configuration.
//!
//! A [`Config`] is fixed before the run starts. [`Config::default`] matches
//! the directory layout of the analytics corpus:
//! `data/silver/posts` → `data/silver/posts_sentiment`.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// Rows per chunk. Sized to keep one in-flight chunk of typical post rows
/// well under 500 MB resident.
pub const DEFAULT_CHUNK_SIZE: usize = 50_000;

/// Extension of input and output files.
pub const PARQUET_EXTENSION: &str = "parquet";

/// Appended to an input file stem to name its output.
pub const OUTPUT_SUFFIX: &str = "_sentiment";

/// How rows within one chunk are derived.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecMode {
    /// One row after another on the calling thread.
    #[default]
    Sequential,
    /// Rows of a chunk are scored on a rayon pool; output order is unchanged.
    /// `threads: None` uses every available core.
    Parallel { threads: Option<usize> },
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Directory scanned for `*.parquet` inputs.
    pub input_dir: PathBuf,
    /// Directory receiving `*_sentiment.parquet` outputs. Created if missing.
    pub output_dir: PathBuf,
    /// Maximum rows per chunk.
    pub chunk_size: usize,
    pub mode: ExecMode,
    /// Where to save the JSON run report, if anywhere.
    pub report_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/silver/posts"),
            output_dir: PathBuf::from("data/silver/posts_sentiment"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            mode: ExecMode::Sequential,
            report_path: None,
        }
    }
}

impl Config {
    /// Config for the given directories with every other setting defaulted.
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: ExecMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = Some(path.into());
        self
    }

    /// Reject settings the pipeline cannot run with.
    ///
    /// # Errors
    /// - `chunk_size` is zero
    /// - a parallel mode asks for zero threads
    /// - input and output directories are the same (outputs would be picked
    ///   up as inputs on the next run)
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            bail!("chunk size must be at least 1 row");
        }
        if let ExecMode::Parallel { threads: Some(0) } = self.mode {
            bail!("parallel mode needs at least 1 thread");
        }
        if same_dir(&self.input_dir, &self.output_dir) {
            bail!(
                "input and output directories must differ (both are {})",
                self.input_dir.display()
            );
        }
        Ok(())
    }

    /// Glob pattern matching every input file.
    #[must_use]
    pub fn input_pattern(&self) -> String {
        let dir = glob::Pattern::escape(&self.input_dir.to_string_lossy());
        format!("{dir}/*.{PARQUET_EXTENSION}")
    }

    /// Output path for `source`: `<output_dir>/<stem>_sentiment.parquet`.
    ///
    /// # Errors
    /// Returns an error if `source` has no file name.
    pub fn destination_for(&self, source: &Path) -> Result<PathBuf> {
        let stem = source
            .file_stem()
            .with_context(|| format!("no file name in {}", source.display()))?;
        let mut name = stem.to_os_string();
        name.push(OUTPUT_SUFFIX);
        name.push(".");
        name.push(PARQUET_EXTENSION);
        Ok(self.output_dir.join(name))
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    normalized(a) == normalized(b)
}

/// Canonical form of `path`, even when it does not exist yet: the nearest
/// existing parent is canonicalized and the file name joined back on.
fn normalized(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    if let (Some(parent), Some(name)) = (absolute.parent(), absolute.file_name())
        && let Ok(parent) = parent.canonicalize()
    {
        return parent.join(name);
    }
    absolute
}
