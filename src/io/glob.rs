//! Input discovery.
//!
//! Inputs are found with a glob pattern and always returned in sorted order,
//! so a run visits files in the same sequence every time.
//!
//! ```no_run
//! use post_sentiment::config::Config;
//! use post_sentiment::io::glob::discover_inputs;
//!
//! let files = discover_inputs(&Config::default())?;
//! # use anyhow::Error; Ok::<(), Error>(())
//! ```

use crate::config::Config;
use anyhow::{Context, Result, bail};
use glob::glob;
use std::path::PathBuf;

/// Expand a glob pattern into a sorted vector of matching regular files.
///
/// Directories that happen to match are skipped. Zero matches is not an
/// error here.
///
/// # Errors
///
/// Returns an error if the pattern is invalid or a matched entry cannot be
/// read.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?;

    let mut result = Vec::new();
    for entry in paths {
        let path =
            entry.with_context(|| format!("error reading glob entry for pattern: {pattern}"))?;
        if path.is_file() {
            result.push(path);
        }
    }

    result.sort();
    Ok(result)
}

/// Every `*.parquet` file in the configured input directory, sorted by name.
///
/// # Errors
///
/// Fails when nothing matches: the upstream stage that produces the input
/// directory has not run yet, and there is nothing to enrich.
pub fn discover_inputs(config: &Config) -> Result<Vec<PathBuf>> {
    let files = expand_glob(&config.input_pattern())?;
    if files.is_empty() {
        bail!(
            "no parquet files found in {}; run the upstream stage that produces them first",
            config.input_dir.display()
        );
    }
    Ok(files)
}
