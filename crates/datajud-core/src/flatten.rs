//! Flatten raw DataJud hits into one tabular row per case.
//!
//! Flattening is total: every field has a default and no shape of `_source`
//! makes it fail. Missing objects, wrong types and stray array entries all
//! fall back to the values in [`defaults`].

use std::collections::HashSet;
use std::hash::Hash;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use crate::format;
use crate::record::RawRecord;

/// Fallbacks applied when a field is absent or unusable.
pub mod defaults {
    pub const TEXT: &str = "";
    pub const CLAIM_VALUE: f64 = 0.0;
    pub const SECRECY_LEVEL: i64 = 0;
    pub const DAYS_IN_PROGRESS: i64 = 0;
    /// Name used for a party whose person record carries no name.
    pub const PARTY_NAME: &str = "Desconhecido";
    pub const ELECTRONIC_YES: &str = "Sim";
    pub const ELECTRONIC_NO: &str = "Não";
    pub const LIST_SEPARATOR: &str = ", ";
}

/// Pole code for the active side (plaintiffs).
pub const POLE_ACTIVE: &str = "AT";
/// Pole code for the passive side (defendants).
pub const POLE_PASSIVE: &str = "PA";

/// One case, flattened. Keyed by `cnj`.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseRow {
    pub cnj: String,
    pub class_name: String,
    /// `DD/MM/YYYY`, or the raw value when it could not be reformatted.
    pub filing_date: String,
    pub days_in_progress: i64,
    pub claim_value: f64,
    pub claim_value_formatted: String,
    pub court_unit: String,
    pub municipality_code: String,
    pub tribunal: String,
    pub plaintiffs: String,
    pub defendants: String,
    pub secrecy_level: i64,
    pub electronic: String,
    pub subjects: String,
}

/// Maps raw hits to [`CaseRow`]s relative to a reference date.
#[derive(Debug, Clone, Copy)]
pub struct Flattener {
    today: NaiveDate,
}

impl Flattener {
    /// `today` is the reference for `days_in_progress`.
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn flatten(&self, records: &[RawRecord]) -> Vec<CaseRow> {
        let rows: Vec<CaseRow> = records.iter().map(|r| self.flatten_one(r)).collect();
        debug!(count = rows.len(), "flattened records");
        rows
    }

    pub fn flatten_one(&self, record: &RawRecord) -> CaseRow {
        let source = &record.source;
        let basic = source.get("dadosBasicos");

        let cnj = first_text(&[
            basic.and_then(|b| b.get("numero")),
            source.get("numeroProcesso"),
        ]);

        let raw_date = first_text(&[
            basic.and_then(|b| b.get("dataAjuizamento")),
            source.get("dataAjuizamento"),
        ]);
        let days_in_progress = format::parse_filing_date(&raw_date)
            .map(|d| (self.today - d).num_days())
            .unwrap_or(defaults::DAYS_IN_PROGRESS);

        let claim_value = [
            basic.and_then(|b| b.get("valor")),
            source.get("valorCausa"),
        ]
        .into_iter()
        .flatten()
        .find_map(number)
        .unwrap_or(defaults::CLAIM_VALUE);

        let (plaintiffs, defendants) = parties(basic.and_then(|b| b.get("polo")));

        let court = source.get("orgaoJulgador");
        let municipality = court.and_then(|c| c.get("codigoMunicipioIBGE"));

        let secrecy_level = basic
            .and_then(|b| b.get("nivelSigilo"))
            .and_then(integer)
            .unwrap_or(defaults::SECRECY_LEVEL);

        let electronic = match basic.and_then(|b| b.get("procEl")).and_then(integer) {
            Some(1) => defaults::ELECTRONIC_YES,
            _ => defaults::ELECTRONIC_NO,
        };

        CaseRow {
            cnj,
            class_name: text(source.get("classe")),
            filing_date: format::filing_date(&raw_date),
            days_in_progress,
            claim_value,
            claim_value_formatted: format::brl(claim_value),
            court_unit: text(court),
            municipality_code: text(municipality),
            tribunal: text(source.get("tribunal")),
            plaintiffs,
            defendants,
            secrecy_level,
            electronic: electronic.to_string(),
            subjects: subjects(source.get("assuntos")),
        }
    }
}

/// Keep the first row for each key, preserving order. Idempotent.
pub fn dedupe_by_key<T, K, F>(rows: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let before = rows.len();
    let mut seen = HashSet::with_capacity(before);
    let kept: Vec<T> = rows.into_iter().filter(|row| seen.insert(key(row))).collect();
    if kept.len() < before {
        debug!(removed = before - kept.len(), "dropped duplicate rows");
    }
    kept
}

/// Dedupe case rows by CNJ number.
pub fn dedupe_cases(rows: Vec<CaseRow>) -> Vec<CaseRow> {
    dedupe_by_key(rows, |r| r.cnj.clone())
}

// ── Field helpers ──

/// Text form of a raw value. Objects collapse to their `nome`/`name` field
/// when present, otherwise to their JSON form.
fn text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => defaults::TEXT.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(map)) => match map.get("nome").or_else(|| map.get("name")) {
            Some(inner @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => {
                text(Some(inner))
            }
            _ => Value::Object(map.clone()).to_string(),
        },
        Some(other) => other.to_string(),
    }
}

/// First candidate that yields non-empty text.
fn first_text(candidates: &[Option<&Value>]) -> String {
    candidates
        .iter()
        .map(|c| text(*c))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn subjects(value: Option<&Value>) -> String {
    let Some(Value::Array(items)) = value else {
        return defaults::TEXT.to_string();
    };
    items
        .iter()
        .filter(|item| item.is_object())
        .map(|item| text(item.get("nome")))
        .collect::<Vec<_>>()
        .join(defaults::LIST_SEPARATOR)
}

fn parties(value: Option<&Value>) -> (String, String) {
    let mut active = Vec::new();
    let mut passive = Vec::new();

    if let Some(Value::Array(poles)) = value {
        for pole in poles {
            let name = pole
                .pointer("/parte/pessoa/nome")
                .map(|v| text(Some(v)))
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| defaults::PARTY_NAME.to_string());
            match pole.get("polo").and_then(Value::as_str) {
                Some(POLE_ACTIVE) => active.push(name),
                Some(POLE_PASSIVE) => passive.push(name),
                _ => {}
            }
        }
    }

    (
        active.join(defaults::LIST_SEPARATOR),
        passive.join(defaults::LIST_SEPARATOR),
    )
}
