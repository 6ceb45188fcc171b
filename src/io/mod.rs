//! File discovery and Parquet reading/writing.

pub mod glob;
pub mod parquet;
