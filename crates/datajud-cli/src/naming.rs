//! Output file names: tribunal, run label and the run date.

use chrono::NaiveDate;

/// `{tribunal}_{label}_{YYYY-MM-DD}`; the CSV sink adds the extension.
pub fn csv_stem(tribunal: &str, label: &str, date: NaiveDate) -> String {
    format!(
        "{}_{}_{}",
        slug(tribunal),
        slug(label),
        date.format("%Y-%m-%d")
    )
}

/// `extracao_{tribunal}_{label}_{YYYYMMDD}.duckdb`
pub fn database_file(tribunal: &str, label: &str, date: NaiveDate) -> String {
    format!(
        "extracao_{}_{}_{}.duckdb",
        slug(tribunal),
        slug(label),
        date.format("%Y%m%d")
    )
}

/// Keep ASCII alphanumerics, `-` and `_`; everything else becomes `_`.
fn slug(s: &str) -> String {
    let out: String = s
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() { "run".to_string() } else { out }
}
