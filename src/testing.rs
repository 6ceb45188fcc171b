//! Testing utilities.
//!
//! - **Fixtures**: typed post rows, the matching scored-row shape, and helpers
//!   to write them as Parquet inputs and read enriched outputs back.
//! - **Stub models**: [`SentimentModel`] implementations with trivially
//!   predictable scores, for tests that care about plumbing rather than
//!   about VADER's scores.
//!
//! # Quick Start
//!
//! ```no_run
//! use post_sentiment::config::Config;
//! use post_sentiment::driver::PipelineDriver;
//! use post_sentiment::sentiment::ScoreEngine;
//! use post_sentiment::testing::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let tmp = tempfile::tempdir()?;
//! let input = tmp.path().join("in");
//! std::fs::create_dir_all(&input)?;
//! write_posts(input.join("posts.parquet"), &sample_posts())?;
//!
//! let engine = ScoreEngine::initialize()?;
//! let config = Config::new(&input, tmp.path().join("out"));
//! PipelineDriver::new(config, &engine)?.run()?;
//!
//! let rows = read_scored(tmp.path().join("out/posts_sentiment.parquet"))?;
//! assert_eq!(rows.len(), 3);
//! # Ok(())
//! # }
//! ```

pub mod fixtures;

pub use fixtures::*;

use crate::sentiment::SentimentModel;

/// Scores every text the same.
#[derive(Clone, Copy, Debug)]
pub struct FixedModel(pub f64);

impl SentimentModel for FixedModel {
    fn compound(&self, _text: &str) -> f64 {
        self.0
    }
}

/// Scores a text by its length: one thousandth per character.
///
/// Makes truncation observable: anything scored above `0.512` would mean
/// more than 512 characters reached the model.
#[derive(Clone, Copy, Debug, Default)]
pub struct LengthModel;

impl SentimentModel for LengthModel {
    #[allow(clippy::cast_precision_loss)]
    fn compound(&self, text: &str) -> f64 {
        text.chars().count() as f64 / 1000.0
    }
}
