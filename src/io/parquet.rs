//! Parquet I/O.
//!
//! This module provides:
//! - **Chunked reading**: [`open_batches`] yields a file as Arrow record
//!   batches of bounded size, in file order.
//! - **Atomic writing**: [`AtomicParquetWriter`] writes into a temporary file
//!   next to the destination and renames it into place only on
//!   [`finish`](AtomicParquetWriter::finish). Dropping it unfinished removes
//!   the temporary file, so a destination path either holds a complete file
//!   or nothing.
//! - **Typed vector I/O** powered by Serde + Arrow: [`write_parquet_vec`] and
//!   [`read_parquet_vec`], used for fixtures and inspection.

use anyhow::{Context, Result};
use arrow::datatypes::{FieldRef, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_arrow::schema::{SchemaLike, TracingOptions};
use serde_arrow::{from_record_batch, to_record_batch};
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A Parquet file opened for chunked reading.
pub struct BatchSource {
    /// Arrow schema of the file.
    pub schema: SchemaRef,
    /// Row count according to the file footer.
    pub total_rows: u64,
    /// Batches of at most the requested size, in file order.
    pub batches: ParquetRecordBatchReader,
}

/// Open `path` and prepare to read it `batch_size` rows at a time.
///
/// Only the footer is read here; row data is decoded lazily as `batches`
/// is iterated.
///
/// # Errors
/// Returns an error if the file cannot be opened or is not valid Parquet.
pub fn open_batches(path: impl AsRef<Path>, batch_size: usize) -> Result<BatchSource> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("read parquet footer of {}", path.display()))?;

    let schema = builder.schema().clone();
    let total_rows = builder.metadata().file_metadata().num_rows().cast_unsigned();
    let batches = builder
        .with_batch_size(batch_size.max(1))
        .build()
        .context("build ParquetRecordBatchReader")?;

    Ok(BatchSource {
        schema,
        total_rows,
        batches,
    })
}

/// Snappy-compressed output whose row groups hold at most `row_group_size` rows.
#[must_use]
pub fn writer_properties(row_group_size: usize) -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_max_row_group_size(row_group_size.max(1))
        .build()
}

/// Parquet writer that only ever exposes complete files at its destination.
pub struct AtomicParquetWriter {
    writer: ArrowWriter<File>,
    temp: NamedTempFile,
    final_path: PathBuf,
    rows: u64,
}

impl AtomicParquetWriter {
    /// Start writing a file with `schema` that will land at `final_path`.
    ///
    /// The temporary file lives in the destination directory so the final
    /// rename stays on one filesystem.
    ///
    /// # Errors
    /// Returns an error if the temporary file or the Arrow writer cannot be
    /// created.
    pub fn create(
        final_path: impl AsRef<Path>,
        schema: SchemaRef,
        props: WriterProperties,
    ) -> Result<Self> {
        let final_path = final_path.as_ref().to_path_buf();
        let dir = match final_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let temp = NamedTempFile::new_in(&dir)
            .with_context(|| format!("create temporary file in {}", dir.display()))?;
        let handle = temp.as_file().try_clone().context("clone temporary file handle")?;
        let writer =
            ArrowWriter::try_new(handle, schema, Some(props)).context("create ArrowWriter")?;

        Ok(Self {
            writer,
            temp,
            final_path,
            rows: 0,
        })
    }

    /// Append a batch. Row groups are flushed as they fill up.
    ///
    /// # Errors
    /// Returns an error if encoding or the underlying write fails.
    pub fn write(&mut self, batch: &RecordBatch) -> Result<()> {
        self.writer
            .write(batch)
            .with_context(|| format!("write batch for {}", self.final_path.display()))?;
        self.rows += batch.num_rows() as u64;
        Ok(())
    }

    /// Rows written so far.
    #[must_use]
    pub const fn rows(&self) -> u64 {
        self.rows
    }

    /// Close the file, sync it, and move it to its destination.
    ///
    /// Returns the size of the finished file in bytes.
    ///
    /// # Errors
    /// Returns an error if closing, syncing or renaming fails; the temporary
    /// file is removed in that case.
    pub fn finish(self) -> Result<u64> {
        let Self {
            writer,
            temp,
            final_path,
            ..
        } = self;
        writer.close().context("close ArrowWriter")?;
        temp.as_file().sync_all().context("sync temporary file")?;
        let file = temp
            .persist(&final_path)
            .map_err(|e| e.error)
            .with_context(|| format!("move output into place at {}", final_path.display()))?;
        let bytes = file
            .metadata()
            .with_context(|| format!("stat {}", final_path.display()))?
            .len();
        Ok(bytes)
    }
}

/// Write a typed slice to a Parquet file, schema inferred from `T`.
///
/// Works for an empty slice too (a zero-row file with the full schema).
///
/// # Errors
/// An error is returned if schema inference, conversion or writing fails.
pub fn write_parquet_vec<T: Serialize + Deserialize<'static>>(
    path: impl AsRef<Path>,
    data: &[T],
) -> Result<usize> {
    let fields: Vec<FieldRef> = Vec::<FieldRef>::from_type::<T>(TracingOptions::default())
        .context("infer Arrow schema from type T")?;
    let batch: RecordBatch =
        to_record_batch(&fields, &data).context("convert rows to RecordBatch")?;

    let mut writer = AtomicParquetWriter::create(
        path,
        batch.schema(),
        writer_properties(data.len().max(1)),
    )?;
    writer.write(&batch)?;
    writer.finish()?;
    Ok(data.len())
}

/// Read an entire Parquet file into a typed `Vec<T>`.
///
/// # Errors
/// Returns an error if the file cannot be read or a batch does not convert
/// to `T`.
pub fn read_parquet_vec<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    let source = open_batches(path, 64 * 1024)?;
    let mut out: Vec<T> = Vec::new();
    for batch in source.batches {
        let batch = batch.context("read next batch")?;
        let mut rows: Vec<T> =
            from_record_batch(&batch).context("deserialize RecordBatch rows to T")?;
        out.append(&mut rows);
    }
    Ok(out)
}
