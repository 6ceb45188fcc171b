//! VADER valence-aware sentiment scoring.
//!
//! [`VaderModel`] adapts [`vader_sentiment::SentimentIntensityAnalyzer`] to
//! [`SentimentModel`]. The analyzer carries the full VADER lexicon, the emoji
//! lexicon and the rule set (boosters, negation, "but" contrast, ALL-CAPS,
//! punctuation emphasis, idioms such as "kind of" and "at least").

use super::SentimentModel;
use vader_sentiment::SentimentIntensityAnalyzer;

const COMPOUND: &str = "compound";

pub struct VaderModel {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl VaderModel {
    #[must_use]
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }
}

impl Default for VaderModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentModel for VaderModel {
    fn compound(&self, text: &str) -> f64 {
        self.analyzer
            .polarity_scores(text)
            .get(COMPOUND)
            .copied()
            .unwrap_or(0.0)
    }
}
