//! Flatten, dedupe and persist one run's raw hits.

use std::path::PathBuf;

use anyhow::Context;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use clap::ValueEnum;
use datajud_client::FetchOutcome;
use datajud_core::{Flattener, RawRecord, cases, dedupe_cases};
use datajud_store::{CsvSink, DuckStore, Export};
use tracing::info;

use crate::naming;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// UTF-8 CSV with BOM, new dated file per run.
    Csv,
    /// DuckDB file, table replaced on every run.
    Duckdb,
}

/// Where and how the rows of one run are written.
#[derive(Debug, Clone)]
pub struct ExportPlan {
    pub format: OutputFormat,
    pub out_dir: PathBuf,
    pub tribunal: String,
    pub label: String,
    pub table: String,
    pub today: NaiveDate,
}

pub struct ExportReport {
    pub path: PathBuf,
    /// Raw hits before deduplication.
    pub fetched: usize,
    /// Rows written.
    pub rows: usize,
    pub batch: RecordBatch,
}

pub fn export(records: &[RawRecord], plan: &ExportPlan) -> anyhow::Result<ExportReport> {
    let rows = Flattener::new(plan.today).flatten(records);
    let rows = dedupe_cases(rows);
    info!(fetched = records.len(), unique = rows.len(), "flattened cases");

    let batch = cases::to_record_batch(&rows).context("building record batch")?;

    let sink: Box<dyn Export> = match plan.format {
        OutputFormat::Csv => {
            let stem = naming::csv_stem(&plan.tribunal, &plan.label, plan.today);
            Box::new(CsvSink::unique_in(&plan.out_dir, &stem))
        }
        OutputFormat::Duckdb => {
            let file = naming::database_file(&plan.tribunal, &plan.label, plan.today);
            let path = plan.out_dir.join(file);
            let store = DuckStore::open_persistent(&path)
                .with_context(|| format!("opening {}", path.display()))?
                .with_table(&plan.table)?;
            Box::new(store)
        }
    };

    let written = sink
        .export(&batch)
        .with_context(|| format!("writing {}", sink.location().display()))?;

    Ok(ExportReport {
        path: sink.location().to_path_buf(),
        fetched: records.len(),
        rows: written,
        batch,
    })
}

/// Export whatever a run collected, including a run that stopped early.
/// Returns `None` without touching the output directory when nothing was
/// fetched.
pub fn export_outcome(
    outcome: &FetchOutcome,
    plan: &ExportPlan,
) -> anyhow::Result<Option<ExportReport>> {
    if outcome.records.is_empty() {
        info!(stop = %outcome.stop, "no records collected, skipping export");
        return Ok(None);
    }
    export(&outcome.records, plan).map(Some)
}
