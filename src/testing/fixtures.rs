//! Pre-built post datasets and Parquet helpers for tests.

use crate::io::parquet::{read_parquet_vec, write_parquet_vec};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// An input row as the upstream stage writes it, plus an `id` column that
/// the pipeline must carry through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRow {
    pub id: String,
    pub title: Option<String>,
    pub full_text: Option<String>,
    pub selftext: Option<String>,
    pub score: i64,
    pub num_comments: i64,
}

impl PostRow {
    pub fn new(id: impl Into<String>, title: Option<&str>, score: i64, num_comments: i64) -> Self {
        Self {
            id: id.into(),
            title: title.map(str::to_string),
            full_text: None,
            selftext: None,
            score,
            num_comments,
        }
    }

    #[must_use]
    pub fn with_full_text(mut self, text: &str) -> Self {
        self.full_text = Some(text.to_string());
        self
    }

    #[must_use]
    pub fn with_selftext(mut self, text: &str) -> Self {
        self.selftext = Some(text.to_string());
        self
    }
}

/// An enriched output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPostRow {
    pub id: String,
    pub title: Option<String>,
    pub full_text: Option<String>,
    pub selftext: Option<String>,
    pub score: i64,
    pub num_comments: i64,
    pub title_sentiment: f64,
    pub fulltext_sentiment: f64,
    pub sentiment_label: String,
    pub sentiment_bucket: String,
    pub title_word_count: i64,
    pub selftext_word_count: i64,
    pub has_body: bool,
    pub score_per_comment: f64,
}

/// The three-row reference dataset: a positive title without comments, a
/// negative title with a long body, and an all-null row.
///
/// # Example
///
/// ```
/// use post_sentiment::testing::sample_posts;
///
/// let posts = sample_posts();
/// assert_eq!(posts.len(), 3);
/// ```
#[must_use]
pub fn sample_posts() -> Vec<PostRow> {
    vec![
        PostRow::new("p1", Some("I love this"), 10, 0)
            .with_full_text("")
            .with_selftext("ok"),
        PostRow::new("p2", Some("terrible day"), 20, 4)
            .with_full_text("")
            .with_selftext(&"word ".repeat(15)),
        PostRow::new("p3", None, 0, 0),
    ]
}

const TITLES: [&str; 8] = [
    "I love this new release",
    "terrible day at the office",
    "Is anyone else seeing this?",
    "This is NOT good at all!!!",
    "best purchase I have made",
    "the update broke everything",
    "weekly discussion thread",
    "",
];

/// `n` deterministic rows cycling through varied titles, bodies and
/// comment counts (including zero comments and null fields).
#[must_use]
pub fn generated_posts(n: usize) -> Vec<PostRow> {
    (0..n)
        .map(|i| {
            let title = (i % 11 != 0).then(|| TITLES[i % TITLES.len()]);
            let mut row = PostRow::new(format!("g{i}"), title, (i as i64 * 7) % 500, (i as i64) % 5);
            if i % 3 == 0 {
                row = row.with_selftext(&"lorem ipsum ".repeat(i % 9));
            }
            if i % 4 != 0 {
                row = row.with_full_text(TITLES[(i + 3) % TITLES.len()]);
            }
            row
        })
        .collect()
}

/// Write rows as a Parquet input file.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_posts(path: impl AsRef<Path>, rows: &[PostRow]) -> Result<usize> {
    write_parquet_vec(path, rows)
}

/// Read an enriched output file back as typed rows.
///
/// # Errors
/// Returns an error if the file cannot be read or lacks a derived column.
pub fn read_scored(path: impl AsRef<Path>) -> Result<Vec<ScoredPostRow>> {
    read_parquet_vec(path)
}
