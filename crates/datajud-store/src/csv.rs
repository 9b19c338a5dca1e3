//! CSV output: UTF-8 with a byte-order mark, header row, one file per run.
//!
//! The BOM lets spreadsheet tools detect the encoding of the accented
//! Portuguese headers and names.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use arrow::csv::WriterBuilder;
use arrow::record_batch::RecordBatch;
use tracing::info;

use crate::{Export, StoreError};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Writes a batch to a CSV file that must not exist yet.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `{dir}/{stem}.csv`, or `{stem}_2.csv`, `{stem}_3.csv`, ... when taken.
    pub fn unique_in(dir: &Path, stem: &str) -> Self {
        let mut path = dir.join(format!("{stem}.csv"));
        let mut n = 2u32;
        while path.exists() {
            path = dir.join(format!("{stem}_{n}.csv"));
            n += 1;
        }
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl Export for CsvSink {
    fn export(&self, batch: &RecordBatch) -> Result<usize, StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }
        let file = File::create_new(&self.path).map_err(|e| self.io_err(e))?;
        let mut out = BufWriter::new(file);
        out.write_all(UTF8_BOM).map_err(|e| self.io_err(e))?;

        let mut writer = WriterBuilder::new().with_header(true).build(out);
        writer.write(batch)?;
        writer.into_inner().flush().map_err(|e| self.io_err(e))?;

        info!(path = %self.path.display(), rows = batch.num_rows(), "wrote csv");
        Ok(batch.num_rows())
    }

    fn location(&self) -> &Path {
        &self.path
    }
}
