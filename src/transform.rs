//! One input file → one enriched output file.
//!
//! [`ChunkedFileTransformer`] streams the source in batches of at most
//! `chunk_size` rows, scores each batch, and appends it to an
//! [`AtomicParquetWriter`] whose row groups are the same size. Memory stays
//! proportional to the chunk size for both the read and the write side, and
//! rows leave in the order they arrived.
//!
//! Nothing becomes visible at the destination until every row has been
//! written and the row count checked against the source footer. Any failure
//! leaves the destination absent.

use crate::config::ExecMode;
use crate::features::{FeatureDeriver, InputColumns, output_schema};
use crate::io::parquet::{AtomicParquetWriter, open_batches, writer_properties};
use crate::sentiment::{ScoreEngine, SentimentModel};
use anyhow::{Context, Result, bail};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::info;

/// Outcome of transforming one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransformStats {
    pub rows: u64,
    pub chunks: usize,
    pub bytes_written: u64,
    pub elapsed: Duration,
}

pub struct ChunkedFileTransformer<'e, M> {
    deriver: FeatureDeriver<'e, M>,
    chunk_size: usize,
}

impl<'e, M: SentimentModel> ChunkedFileTransformer<'e, M> {
    /// `chunk_size` of zero is treated as one.
    pub fn new(engine: &'e ScoreEngine<M>, chunk_size: usize, mode: ExecMode) -> Self {
        Self {
            deriver: FeatureDeriver::new(engine, mode),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Enrich `source` into `destination`.
    ///
    /// # Errors
    /// Fails if the source cannot be opened, lacks a required column, a
    /// batch cannot be decoded or scored, the written row count differs from
    /// the source, or the output cannot be written. The destination is not
    /// created in any of these cases.
    pub fn transform(&self, source: &Path, destination: &Path) -> Result<TransformStats> {
        let started = Instant::now();
        let input = open_batches(source, self.chunk_size)?;
        InputColumns::check_schema(&input.schema)
            .with_context(|| format!("schema of {}", source.display()))?;

        let schema = output_schema(&input.schema);
        let mut writer = AtomicParquetWriter::create(
            destination,
            schema.clone(),
            writer_properties(self.chunk_size),
        )?;

        let mut chunks = 0usize;
        for batch in input.batches {
            let batch = batch.with_context(|| {
                format!("decode chunk {} of {}", chunks + 1, source.display())
            })?;
            let scored = self
                .deriver
                .derive_batch(&batch, &schema)
                .with_context(|| format!("score chunk {} of {}", chunks + 1, source.display()))?;
            writer.write(&scored)?;
            chunks += 1;
            info!(
                chunk = chunks,
                rows_done = writer.rows(),
                rows_total = input.total_rows,
                "chunk scored"
            );
        }

        let rows = writer.rows();
        if rows != input.total_rows {
            bail!(
                "{} declares {} rows but {} were read",
                source.display(),
                input.total_rows,
                rows
            );
        }
        let bytes_written = writer.finish()?;

        let stats = TransformStats {
            rows,
            chunks,
            bytes_written,
            elapsed: started.elapsed(),
        };
        info!(
            source = %source.display(),
            destination = %destination.display(),
            rows = stats.rows,
            chunks = stats.chunks,
            bytes = stats.bytes_written,
            elapsed_ms = stats.elapsed.as_millis(),
            "file enriched"
        );
        Ok(stats)
    }
}
