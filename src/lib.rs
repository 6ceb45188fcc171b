//! # post-sentiment
//!
//! A **batch feature-engineering pipeline** that enriches a directory of
//! Parquet post files with sentiment scores and engagement features, writing
//! one enriched file per input.
//!
//! ## Key Features
//!
//! - **Bounded memory** - each file is streamed in fixed-size chunks, scored,
//!   and written out chunk by chunk
//! - **Resumable** - inputs whose output already exists are skipped, so an
//!   interrupted run can simply be started again
//! - **Atomic outputs** - an output file is either complete or absent, never
//!   truncated
//! - **Failure isolation** - one unreadable file is reported and the run
//!   continues with the rest
//! - **Pass-through schema** - every input column is kept; eight derived
//!   columns are appended
//!
//! ## Quick Start
//!
//! ```no_run
//! use post_sentiment::config::Config;
//! use post_sentiment::driver::PipelineDriver;
//! use post_sentiment::sentiment::ScoreEngine;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! // Build the scorer once; it is reused for every row of every file.
//! let engine = ScoreEngine::initialize()?;
//!
//! let config = Config::new("data/silver/posts", "data/silver/posts_sentiment")
//!     .with_chunk_size(50_000);
//! let report = PipelineDriver::new(config, &engine)?.run()?;
//! report.print();
//! # Ok(())
//! # }
//! ```
//!
//! ## Derived Columns
//!
//! | column                | meaning                                              |
//! |-----------------------|------------------------------------------------------|
//! | `title_sentiment`     | compound score of `title`, in `[-1, 1]`              |
//! | `fulltext_sentiment`  | compound score of `full_text`, in `[-1, 1]`          |
//! | `sentiment_label`     | positive / negative / neutral, from the title score  |
//! | `sentiment_bucket`    | five-way strength bucket, from the title score       |
//! | `title_word_count`    | whitespace tokens in `title`                         |
//! | `selftext_word_count` | whitespace tokens in `selftext`                      |
//! | `has_body`            | `selftext_word_count > 10`                           |
//! | `score_per_comment`   | `score / num_comments`, `0.0` with no comments       |
//!
//! ## Module Overview
//!
//! - [`sentiment`] - the scoring model, engine and label/bucket classification
//! - [`features`] - per-row derivation and Arrow batch assembly
//! - [`transform`] - one file in, one enriched file out
//! - [`driver`] - discovery, resumption and per-file failure isolation
//! - [`report`] - run summary, printable and as JSON
//! - [`config`] - run settings
//! - [`io`] - glob discovery and Parquet reading/atomic writing
//! - [`testing`] - fixtures and stub models for tests

pub mod config;
pub mod driver;
pub mod features;
pub mod io;
pub mod report;
pub mod sentiment;
pub mod testing;
pub mod transform;

pub use config::{Config, ExecMode};
pub use driver::PipelineDriver;
pub use features::{DerivedFeatures, FeatureDeriver, InputRecord};
pub use report::{FileOutcome, FileReport, RunReport};
pub use sentiment::{ScoreEngine, SentimentBucket, SentimentLabel, SentimentModel, VaderModel};
pub use transform::{ChunkedFileTransformer, TransformStats};
