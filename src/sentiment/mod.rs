//! Sentiment scoring.
//!
//! - [`SentimentModel`] is the scoring capability: text in, compound score out.
//! - [`ScoreEngine`] owns a model, built once per process, and applies the
//!   scoring policy around it (null handling, truncation, clamping).
//! - [`SentimentLabel`] and [`SentimentBucket`] classify a score.
//!
//! The engine is constructed by the caller and handed to the pipeline by
//! reference; there is no global scorer.
//!
//! ```
//! use post_sentiment::sentiment::{ScoreEngine, SentimentBucket, SentimentLabel};
//!
//! let engine = ScoreEngine::initialize()?;
//! let s = engine.score(Some("I love this"));
//! assert_eq!(SentimentLabel::from_score(s), SentimentLabel::Positive);
//! assert_eq!(SentimentBucket::from_score(s), SentimentBucket::StronglyPositive);
//! assert_eq!(engine.score(None), 0.0);
//! # Ok::<(), anyhow::Error>(())
//! ```

mod vader;

pub use vader::VaderModel;

use anyhow::{Result, bail};
use std::fmt;
use std::time::Instant;
use tracing::info;

/// Only the first this-many characters of a text are scored.
pub const MAX_SCORED_CHARS: usize = 512;

/// Scores at or beyond `±LABEL_THRESHOLD` are polar.
pub const LABEL_THRESHOLD: f64 = 0.05;

/// Scores at or beyond `±STRONG_THRESHOLD` are strongly polar.
pub const STRONG_THRESHOLD: f64 = 0.5;

/// A text → compound-score capability.
///
/// Implementations must be deterministic and should return a value in
/// `[-1, 1]`; [`ScoreEngine`] clamps anything outside that range and maps
/// non-finite results to `0.0`. `Send + Sync` lets one engine serve parallel
/// derivation.
pub trait SentimentModel: Send + Sync {
    fn compound(&self, text: &str) -> f64;
}

/// Owns the (expensive to build) model and scores text with it.
pub struct ScoreEngine<M = VaderModel> {
    model: M,
}

impl ScoreEngine<VaderModel> {
    /// Build the VADER model. Call once and reuse the engine.
    ///
    /// A warm-up text is scored here so the lexicon is loaded before the
    /// first file rather than inside it.
    ///
    /// # Errors
    /// Fails if the warm-up score is not finite.
    pub fn initialize() -> Result<Self> {
        let started = Instant::now();
        let model = VaderModel::new();
        let warm_up = model.compound("I love this");
        if !warm_up.is_finite() {
            bail!("sentiment model returned {warm_up} for its warm-up text");
        }
        info!(
            elapsed_ms = started.elapsed().as_millis(),
            "sentiment model initialized"
        );
        Ok(Self { model })
    }
}

impl<M: SentimentModel> ScoreEngine<M> {
    /// Wrap an already-built model.
    pub const fn with_model(model: M) -> Self {
        Self { model }
    }

    /// Compound score of `text` in `[-1, 1]`.
    ///
    /// `None` and empty text score `0.0`. Text longer than
    /// [`MAX_SCORED_CHARS`] characters is cut to that length first.
    pub fn score(&self, text: Option<&str>) -> f64 {
        let Some(text) = text.filter(|t| !t.is_empty()) else {
            return 0.0;
        };
        let score = self.model.compound(truncate_chars(text, MAX_SCORED_CHARS));
        if score.is_finite() {
            score.clamp(-1.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Longest prefix of `text` holding at most `max_chars` characters.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Three-way polarity of a score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= LABEL_THRESHOLD {
            Self::Positive
        } else if score <= -LABEL_THRESHOLD {
            Self::Negative
        } else {
            Self::Neutral
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

/// Five-way polarity and strength of a score.
///
/// Boundary values go to the outer bucket: `0.5` is strongly positive,
/// `-0.05` mildly negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SentimentBucket {
    StronglyPositive,
    MildlyPositive,
    Neutral,
    MildlyNegative,
    StronglyNegative,
}

impl SentimentBucket {
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= STRONG_THRESHOLD {
            Self::StronglyPositive
        } else if score >= LABEL_THRESHOLD {
            Self::MildlyPositive
        } else if score <= -STRONG_THRESHOLD {
            Self::StronglyNegative
        } else if score <= -LABEL_THRESHOLD {
            Self::MildlyNegative
        } else {
            Self::Neutral
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StronglyPositive => "strongly_positive",
            Self::MildlyPositive => "mildly_positive",
            Self::Neutral => "neutral",
            Self::MildlyNegative => "mildly_negative",
            Self::StronglyNegative => "strongly_negative",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SentimentBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
