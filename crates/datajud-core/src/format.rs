//! Display formatting for filing dates and claim values (pt-BR conventions).

use chrono::NaiveDate;

/// Reformat a filing timestamp into `DD/MM/YYYY`.
///
/// Compact values (`YYYYMMDDhhmmss` or any prefix of at least 8 chars) are
/// read from their first 8 characters. ISO values (`YYYY-MM-DD...`) are read
/// from their date part. Anything shorter than 8 characters is returned
/// unchanged. Positions count characters, not bytes.
pub fn filing_date(raw: &str) -> String {
    if let Some((y, m, d)) = iso_parts(raw) {
        return format!("{d}/{m}/{y}");
    }
    let head: Vec<char> = raw.chars().take(8).collect();
    if head.len() < 8 {
        return raw.to_string();
    }
    let part = |r: std::ops::Range<usize>| head[r].iter().collect::<String>();
    format!("{}/{}/{}", part(6..8), part(4..6), part(0..4))
}

/// Parse the calendar date of a filing timestamp, compact or ISO.
pub fn parse_filing_date(raw: &str) -> Option<NaiveDate> {
    let (y, m, d) = iso_parts(raw).or_else(|| {
        Some((raw.get(0..4)?, raw.get(4..6)?, raw.get(6..8)?))
    })?;
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}

fn iso_parts(raw: &str) -> Option<(&str, &str, &str)> {
    let bytes = raw.as_bytes();
    if bytes.len() >= 10 && bytes[4] == b'-' && bytes[7] == b'-' {
        Some((raw.get(0..4)?, raw.get(5..7)?, raw.get(8..10)?))
    } else {
        None
    }
}

/// Render a value as Brazilian currency: `R$ 1.234,50`.
///
/// Non-finite values render as zero.
pub fn brl(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("R$ {sign}{grouped},{frac_part}")
}
