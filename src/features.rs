//! Derived feature columns.
//!
//! Every derived value is a pure function of its own row: sentiment of the
//! title and full text, labels from the title score, word counts, a body flag
//! and comment-normalized score. Batches can therefore be split anywhere
//! without changing the output.
//!
//! Raw columns are read through Arrow's safe casts, so a value that does not
//! parse (say, a non-numeric `score`) becomes null and then a neutral default
//! instead of failing the batch. A missing column, or one whose type cannot
//! be cast at all, is a schema error for the whole file.

use crate::config::ExecMode;
use crate::sentiment::{ScoreEngine, SentimentBucket, SentimentLabel, SentimentModel};
use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Float64Array, Int64Array, StringArray,
};
use arrow::compute::{can_cast_types, cast};
use arrow::datatypes::{DataType, Field, Float64Type, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use rayon::prelude::*;
use std::sync::Arc;

/// Column names read from inputs and added to outputs.
pub mod columns {
    pub const TITLE: &str = "title";
    pub const FULL_TEXT: &str = "full_text";
    pub const SELFTEXT: &str = "selftext";
    pub const SCORE: &str = "score";
    pub const NUM_COMMENTS: &str = "num_comments";

    pub const TITLE_SENTIMENT: &str = "title_sentiment";
    pub const FULLTEXT_SENTIMENT: &str = "fulltext_sentiment";
    pub const SENTIMENT_LABEL: &str = "sentiment_label";
    pub const SENTIMENT_BUCKET: &str = "sentiment_bucket";
    pub const TITLE_WORD_COUNT: &str = "title_word_count";
    pub const SELFTEXT_WORD_COUNT: &str = "selftext_word_count";
    pub const HAS_BODY: &str = "has_body";
    pub const SCORE_PER_COMMENT: &str = "score_per_comment";

    /// Derived columns, in output order.
    pub const DERIVED: [&str; 8] = [
        TITLE_SENTIMENT,
        FULLTEXT_SENTIMENT,
        SENTIMENT_LABEL,
        SENTIMENT_BUCKET,
        TITLE_WORD_COUNT,
        SELFTEXT_WORD_COUNT,
        HAS_BODY,
        SCORE_PER_COMMENT,
    ];
}

/// A selftext needs more than this many words to count as a body.
pub const BODY_WORD_THRESHOLD: u64 = 10;

/// One input row, borrowed from the Arrow columns of its batch.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputRecord<'a> {
    pub title: Option<&'a str>,
    pub full_text: Option<&'a str>,
    pub selftext: Option<&'a str>,
    pub score: f64,
    pub num_comments: f64,
}

/// The eight values added to every row.
#[derive(Clone, Debug, PartialEq)]
pub struct DerivedFeatures {
    pub title_sentiment: f64,
    pub fulltext_sentiment: f64,
    /// From `title_sentiment` only; the full-text score never feeds the labels.
    pub sentiment_label: SentimentLabel,
    /// From `title_sentiment` only.
    pub sentiment_bucket: SentimentBucket,
    pub title_word_count: u64,
    pub selftext_word_count: u64,
    pub has_body: bool,
    pub score_per_comment: f64,
}

/// Whitespace-delimited token count; `None` counts as empty.
///
/// Besides Unicode `White_Space`, the ASCII information separators
/// U+001C..U+001F also split words.
#[must_use]
pub fn word_count(text: Option<&str>) -> u64 {
    text.map_or(0, |t| {
        t.split(is_word_separator).filter(|w| !w.is_empty()).count() as u64
    })
}

fn is_word_separator(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

/// `score / num_comments`, or `0.0` when there are no comments.
///
/// Zero comments means no engagement signal at all, so the raw score is not
/// passed through.
#[must_use]
pub fn score_per_comment(score: f64, num_comments: f64) -> f64 {
    if num_comments > 0.0 {
        score / num_comments
    } else {
        0.0
    }
}

/// Computes [`DerivedFeatures`] for rows and whole Arrow batches.
pub struct FeatureDeriver<'e, M> {
    engine: &'e ScoreEngine<M>,
    mode: ExecMode,
}

impl<'e, M: SentimentModel> FeatureDeriver<'e, M> {
    pub const fn new(engine: &'e ScoreEngine<M>, mode: ExecMode) -> Self {
        Self { engine, mode }
    }

    /// Features of a single row.
    pub fn derive(&self, record: &InputRecord<'_>) -> DerivedFeatures {
        let title_sentiment = self.engine.score(record.title);
        let fulltext_sentiment = self.engine.score(record.full_text);
        let selftext_word_count = word_count(record.selftext);
        DerivedFeatures {
            title_sentiment,
            fulltext_sentiment,
            sentiment_label: SentimentLabel::from_score(title_sentiment),
            sentiment_bucket: SentimentBucket::from_score(title_sentiment),
            title_word_count: word_count(record.title),
            selftext_word_count,
            has_body: selftext_word_count > BODY_WORD_THRESHOLD,
            score_per_comment: score_per_comment(record.score, record.num_comments),
        }
    }

    /// Features of every row in `columns`, in row order.
    pub fn derive_all(&self, columns: &InputColumns) -> Vec<DerivedFeatures> {
        let n = columns.len();
        match self.mode {
            ExecMode::Sequential => (0..n).map(|i| self.derive(&columns.record(i))).collect(),
            ExecMode::Parallel { .. } => (0..n)
                .into_par_iter()
                .map(|i| self.derive(&columns.record(i)))
                .collect(),
        }
    }

    /// Score `batch` and return it with the derived columns appended.
    ///
    /// `schema` must be [`output_schema`] of the batch's own schema.
    ///
    /// # Errors
    /// Fails if a required column is missing or uncastable, or if the
    /// resulting columns do not match `schema`.
    pub fn derive_batch(&self, batch: &RecordBatch, schema: &SchemaRef) -> Result<RecordBatch> {
        let input = InputColumns::from_batch(batch)?;
        let derived = self.derive_all(&input);

        let mut arrays: Vec<ArrayRef> = batch
            .schema()
            .fields()
            .iter()
            .zip(batch.columns())
            .filter(|(field, _)| !is_derived(field.name()))
            .map(|(_, col)| Arc::clone(col))
            .collect();
        arrays.extend(derived_arrays(&derived));

        RecordBatch::try_new(Arc::clone(schema), arrays).context("assemble scored batch")
    }
}

/// The five raw columns of one batch, cast to the types derivation reads.
pub struct InputColumns {
    title: StringArray,
    full_text: StringArray,
    selftext: StringArray,
    score: Float64Array,
    num_comments: Float64Array,
}

impl InputColumns {
    /// Confirm `schema` carries every required column in a castable type.
    ///
    /// # Errors
    /// Names the first missing or incompatible column.
    pub fn check_schema(schema: &Schema) -> Result<()> {
        for (name, target) in required_columns() {
            let field = schema
                .field_with_name(name)
                .with_context(|| format!("input has no `{name}` column"))?;
            if !can_cast_types(field.data_type(), &target) {
                bail!(
                    "column `{name}` has type {}, which cannot be read as {target}",
                    field.data_type()
                );
            }
        }
        Ok(())
    }

    /// Extract and cast the required columns of `batch`.
    ///
    /// # Errors
    /// Fails if a column is missing or its cast fails outright.
    pub fn from_batch(batch: &RecordBatch) -> Result<Self> {
        Ok(Self {
            title: text_column(batch, columns::TITLE)?,
            full_text: text_column(batch, columns::FULL_TEXT)?,
            selftext: text_column(batch, columns::SELFTEXT)?,
            score: numeric_column(batch, columns::SCORE)?,
            num_comments: numeric_column(batch, columns::NUM_COMMENTS)?,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.title.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
    }

    /// Row `i`. Panics if `i >= self.len()`.
    #[must_use]
    pub fn record(&self, i: usize) -> InputRecord<'_> {
        InputRecord {
            title: text_at(&self.title, i),
            full_text: text_at(&self.full_text, i),
            selftext: text_at(&self.selftext, i),
            score: number_at(&self.score, i),
            num_comments: number_at(&self.num_comments, i),
        }
    }
}

fn required_columns() -> [(&'static str, DataType); 5] {
    [
        (columns::TITLE, DataType::Utf8),
        (columns::FULL_TEXT, DataType::Utf8),
        (columns::SELFTEXT, DataType::Utf8),
        (columns::SCORE, DataType::Float64),
        (columns::NUM_COMMENTS, DataType::Float64),
    ]
}

fn raw_column<'b>(batch: &'b RecordBatch, name: &str) -> Result<&'b ArrayRef> {
    batch
        .column_by_name(name)
        .with_context(|| format!("input has no `{name}` column"))
}

fn text_column(batch: &RecordBatch, name: &str) -> Result<StringArray> {
    let cast_col = cast(raw_column(batch, name)?, &DataType::Utf8)
        .with_context(|| format!("read `{name}` as text"))?;
    cast_col
        .as_string_opt::<i32>()
        .cloned()
        .with_context(|| format!("`{name}` did not cast to Utf8"))
}

fn numeric_column(batch: &RecordBatch, name: &str) -> Result<Float64Array> {
    let cast_col = cast(raw_column(batch, name)?, &DataType::Float64)
        .with_context(|| format!("read `{name}` as number"))?;
    cast_col
        .as_primitive_opt::<Float64Type>()
        .cloned()
        .with_context(|| format!("`{name}` did not cast to Float64"))
}

fn text_at(array: &StringArray, i: usize) -> Option<&str> {
    (!array.is_null(i)).then(|| array.value(i))
}

fn number_at(array: &Float64Array, i: usize) -> f64 {
    if array.is_null(i) {
        return 0.0;
    }
    let v = array.value(i);
    if v.is_finite() { v } else { 0.0 }
}

fn is_derived(name: &str) -> bool {
    columns::DERIVED.contains(&name)
}

/// Arrow fields of the derived columns, in output order.
#[must_use]
pub fn derived_fields() -> Vec<Field> {
    vec![
        Field::new(columns::TITLE_SENTIMENT, DataType::Float64, false),
        Field::new(columns::FULLTEXT_SENTIMENT, DataType::Float64, false),
        Field::new(columns::SENTIMENT_LABEL, DataType::Utf8, false),
        Field::new(columns::SENTIMENT_BUCKET, DataType::Utf8, false),
        Field::new(columns::TITLE_WORD_COUNT, DataType::Int64, false),
        Field::new(columns::SELFTEXT_WORD_COUNT, DataType::Int64, false),
        Field::new(columns::HAS_BODY, DataType::Boolean, false),
        Field::new(columns::SCORE_PER_COMMENT, DataType::Float64, false),
    ]
}

/// Input fields (minus any stale derived columns) followed by the derived fields.
#[must_use]
pub fn output_schema(input: &Schema) -> SchemaRef {
    let mut fields: Vec<Field> = input
        .fields()
        .iter()
        .filter(|f| !is_derived(f.name()))
        .map(|f| f.as_ref().clone())
        .collect();
    fields.extend(derived_fields());
    Arc::new(Schema::new_with_metadata(fields, input.metadata().clone()))
}

fn count_to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn derived_arrays(rows: &[DerivedFeatures]) -> Vec<ArrayRef> {
    vec![
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.title_sentiment))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.fulltext_sentiment))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.sentiment_label.as_str()))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.sentiment_bucket.as_str()))),
        Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| count_to_i64(r.title_word_count)))),
        Arc::new(Int64Array::from_iter_values(
            rows.iter().map(|r| count_to_i64(r.selftext_word_count)),
        )),
        Arc::new(BooleanArray::from(rows.iter().map(|r| r.has_body).collect::<Vec<_>>())),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.score_per_comment))),
    ]
}
