//! Terminal rendering of exported case rows.
//!
//! A short table preview of the first rows and a vertical card per case,
//! grouped by section.

use std::fmt::Write;

use arrow::array::Array;
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use arrow::util::pretty::pretty_format_batches;
use datajud_core::cases;

/// Columns shown in the table preview.
const PREVIEW: &[&str] = &[
    cases::CNJ,
    cases::FILING_DATE,
    cases::CLAIM_VALUE_FORMATTED,
    cases::DEFENDANTS,
];

// ── Card section groupings ──

const IDENTITY: &[&str] = &[cases::CNJ, cases::TRIBUNAL, cases::CLASS_NAME];

const DATES: &[&str] = &[cases::FILING_DATE, cases::DAYS_IN_PROGRESS];

const VALUE: &[&str] = &[cases::CLAIM_VALUE_FORMATTED];

const PARTIES: &[&str] = &[cases::PLAINTIFFS, cases::DEFENDANTS];

const COURT: &[&str] = &[cases::COURT_UNIT, cases::MUNICIPALITY];

const CLASSIFICATION: &[&str] = &[cases::SUBJECTS, cases::SECRECY_LEVEL, cases::ELECTRONIC];

// ── Public API ──

/// Table of the first `limit` rows, restricted to the preview columns.
pub fn preview_table(batch: &RecordBatch, limit: usize) -> Result<String, ArrowError> {
    let schema = batch.schema();
    let indices: Vec<usize> = PREVIEW
        .iter()
        .filter_map(|name| schema.index_of(name).ok())
        .collect();
    let projected = batch.project(&indices)?;
    let head = projected.slice(0, limit.min(projected.num_rows()));
    Ok(pretty_format_batches(&[head])?.to_string())
}

/// One case as a vertical card grouped by section.
pub fn format_case_card(batch: &RecordBatch, row: usize) -> Result<String, ArrowError> {
    let mut out = String::new();
    let cnj = cell(batch, cases::CNJ, row)?.unwrap_or_default();
    let class = cell(batch, cases::CLASS_NAME, row)?.unwrap_or_default();

    let _ = writeln!(out, "=== {cnj} ===");
    if !class.is_empty() {
        let _ = writeln!(out, "{class}");
    }
    let _ = writeln!(out);

    write_section(&mut out, batch, row, "Identity", IDENTITY)?;
    write_section(&mut out, batch, row, "Dates", DATES)?;
    write_section(&mut out, batch, row, "Value", VALUE)?;
    write_section(&mut out, batch, row, "Parties", PARTIES)?;
    write_section(&mut out, batch, row, "Court", COURT)?;
    write_section(&mut out, batch, row, "Classification", CLASSIFICATION)?;
    Ok(out)
}

pub fn print_preview(batch: &RecordBatch, limit: usize) -> anyhow::Result<()> {
    if batch.num_rows() == 0 || limit == 0 {
        return Ok(());
    }
    println!("{}", preview_table(batch, limit)?);
    Ok(())
}

/// Print cards for the first `limit` rows.
pub fn print_cards(batch: &RecordBatch, limit: usize) -> anyhow::Result<()> {
    for row in 0..limit.min(batch.num_rows()) {
        print!("{}", format_case_card(batch, row)?);
    }
    Ok(())
}

// ── Section rendering ──

fn write_section(
    out: &mut String,
    batch: &RecordBatch,
    row: usize,
    header: &str,
    cols: &[&str],
) -> Result<(), ArrowError> {
    let mut lines = Vec::new();
    for &col_name in cols {
        if let Some(value) = cell(batch, col_name, row)?
            && !value.is_empty()
        {
            lines.push(format!("  {:<26} {}", col_name, value));
        }
    }
    // Sections with nothing to show are skipped.
    if lines.is_empty() {
        return Ok(());
    }

    let _ = writeln!(out, "{header}");
    for line in lines {
        let _ = writeln!(out, "{line}");
    }
    let _ = writeln!(out);
    Ok(())
}

// ── Helpers ──

/// Display text of one cell, `None` when the column is absent or null.
fn cell(batch: &RecordBatch, col_name: &str, row: usize) -> Result<Option<String>, ArrowError> {
    let Ok(idx) = batch.schema().index_of(col_name) else {
        return Ok(None);
    };
    let col = batch.column(idx);
    if row >= col.len() || col.is_null(row) {
        return Ok(None);
    }
    let formatter = ArrayFormatter::try_new(col.as_ref(), &FormatOptions::default())?;
    Ok(Some(formatter.value(row).to_string()))
}
