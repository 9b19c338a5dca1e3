//! DuckDB output: one table per extraction, replaced on every run.

use std::path::{Path, PathBuf};

use arrow::array::{Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use duckdb::types::Value;
use duckdb::{Connection, appender_params_from_iter};
use tracing::info;

use crate::{Export, StoreError};

pub const DEFAULT_TABLE: &str = "processos";

/// DuckDB store holding one table of case rows.
///
/// Supports both in-memory (ephemeral) and persistent (file-backed) modes.
/// Use [`open`](Self::open) for in-memory and [`open_persistent`](Self::open_persistent)
/// for the database file a run leaves behind.
pub struct DuckStore {
    conn: Connection,
    path: PathBuf,
    table: String,
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
            table: DEFAULT_TABLE.to_string(),
        })
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
            table: DEFAULT_TABLE.to_string(),
        })
    }

    /// Target a different table. Names are restricted to `[A-Za-z_][A-Za-z0-9_]*`.
    pub fn with_table(mut self, table: &str) -> Result<Self, StoreError> {
        let valid = table
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(StoreError::InvalidTable(table.to_string()));
        }
        self.table = table.to_string();
        Ok(self)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Drop and recreate the table from `batch`'s schema, then append every row.
    pub fn replace_table(&self, batch: &RecordBatch) -> Result<usize, StoreError> {
        let schema = batch.schema();
        let columns = schema
            .fields()
            .iter()
            .map(|f| Ok(format!("{} {}", quote_ident(f.name()), sql_type(f.data_type())?)))
            .collect::<Result<Vec<_>, StoreError>>()?;
        let ddl = format!(
            "CREATE OR REPLACE TABLE {} ({})",
            quote_ident(&self.table),
            columns.join(", ")
        );
        self.conn.execute_batch(&ddl)?;

        let mut appender = self.conn.appender(&self.table)?;
        for row in 0..batch.num_rows() {
            let values = batch
                .columns()
                .iter()
                .map(|col| cell(col.as_ref(), row))
                .collect::<Result<Vec<_>, StoreError>>()?;
            appender.append_row(appender_params_from_iter(values))?;
        }
        appender.flush()?;

        let count = self.count()?;
        info!(table = %self.table, count, "replaced table");
        Ok(count)
    }

    /// Number of rows in the target table.
    pub fn count(&self) -> Result<usize, StoreError> {
        let sql = format!("SELECT count(*)::BIGINT AS cnt FROM {}", quote_ident(&self.table));
        let batches = self.query_arrow(&sql)?;
        let batch = batches.first().ok_or(StoreError::NoResults)?;
        let col = batch
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| StoreError::Other("count column not i64".into()))?;
        Ok(col.value(0) as usize)
    }

    /// Execute arbitrary SQL and return Arrow RecordBatches.
    pub fn query_arrow(&self, sql: &str) -> Result<Vec<RecordBatch>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();
        Ok(batches)
    }
}

impl Export for DuckStore {
    fn export(&self, batch: &RecordBatch) -> Result<usize, StoreError> {
        self.replace_table(batch)
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn sql_type(dt: &DataType) -> Result<&'static str, StoreError> {
    match dt {
        DataType::Utf8 => Ok("VARCHAR"),
        DataType::Int64 => Ok("BIGINT"),
        DataType::Float64 => Ok("DOUBLE"),
        other => Err(StoreError::Other(format!("unsupported column type {other}"))),
    }
}

fn cell(col: &dyn Array, row: usize) -> Result<Value, StoreError> {
    if col.is_null(row) {
        return Ok(Value::Null);
    }
    let any = col.as_any();
    if let Some(arr) = any.downcast_ref::<StringArray>() {
        return Ok(Value::Text(arr.value(row).to_string()));
    }
    if let Some(arr) = any.downcast_ref::<Int64Array>() {
        return Ok(Value::BigInt(arr.value(row)));
    }
    if let Some(arr) = any.downcast_ref::<Float64Array>() {
        return Ok(Value::Double(arr.value(row)));
    }
    Err(StoreError::Other(format!(
        "unsupported column type {}",
        col.data_type()
    )))
}
