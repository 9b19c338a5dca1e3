//! Filing-date window that bounds a search.

use chrono::{Duration, NaiveDateTime};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("window start {start} is after end {end}")]
    Inverted {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

/// How the window bounds are rendered in the range filter.
///
/// The `dataAjuizamento` index accepts both shapes; the rolling LGPD
/// collection uses the compact form, the subject-code collection the ISO form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateEncoding {
    /// `20230501000000`
    #[default]
    Compact,
    /// `2023-05-01T00:00:00.000Z`
    Iso,
}

impl DateEncoding {
    pub fn render(self, ts: &NaiveDateTime) -> String {
        match self {
            DateEncoding::Compact => ts.format("%Y%m%d%H%M%S").to_string(),
            DateEncoding::Iso => ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        }
    }
}

/// Inclusive `[start, end]` bounds on the filing date. Always `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl SearchWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, WindowError> {
        if start > end {
            return Err(WindowError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Rolling window ending at `now` and reaching `days` back.
    pub fn last_days(days: u32, now: NaiveDateTime) -> Self {
        Self {
            start: now - Duration::days(i64::from(days)),
            end: now,
        }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }
}
