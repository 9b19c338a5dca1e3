//! Storage layer: CSV files and DuckDB tables for flattened case rows.

mod error;
pub use error::StoreError;

pub mod csv;
pub use csv::CsvSink;

#[cfg(feature = "duckdb")]
pub mod duck;
#[cfg(feature = "duckdb")]
pub use duck::{DEFAULT_TABLE, DuckStore};

use std::path::Path;

use arrow::record_batch::RecordBatch;

/// A destination for one run's rows.
pub trait Export {
    /// Write `batch` and return the number of rows persisted.
    fn export(&self, batch: &RecordBatch) -> Result<usize, StoreError>;

    /// Where the rows end up.
    fn location(&self) -> &Path;
}
