//! Format-specific parsers for the twelve supported report exports.
//!
//! Parsers are free functions: all per-call state (column maps, error
//! accumulators, date trackers) lives on the stack of one `parse` call, so
//! concurrent uploads of the same report type never share mutable state.
//! A bad row records a `ParseError` and parsing continues; only an unreadable
//! container surfaces as a single synthetic error at row 0.

pub mod advertising;
pub mod advertising_bulk;
pub mod daily_sales;
pub mod idq;
pub mod inventory;
pub mod parent_child;
pub mod product_performance;
pub mod restocking;
pub mod search_terms;
pub mod sku_campaign;
pub mod sku_ranking;

use serde::Serialize;

use crate::coerce::looks_like_iso_date;

/// One recoverable row-level problem. Row numbers are 1-indexed positions in
/// the original file, counting skipped header/metadata lines.
#[derive(Debug, Clone, Serialize)]
pub struct ParseError {
    pub row: i64,
    pub field: Option<String>,
    pub message: String,
    pub raw_value: Option<String>,
}

impl ParseError {
    pub fn for_row(row: i64, field: &str, message: &str, raw_value: &str) -> Self {
        Self {
            row,
            field: Some(field.to_string()),
            message: message.to_string(),
            raw_value: if raw_value.is_empty() {
                None
            } else {
                Some(raw_value.to_string())
            },
        }
    }

    /// File-level failure: the whole container was unreadable. Reported at
    /// row 0 alongside whatever partial data was extracted first.
    pub fn for_file(message: &str) -> Self {
        Self {
            row: 0,
            field: None,
            message: message.to_string(),
            raw_value: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParseMetadata {
    pub total_rows: i64,
    pub parsed_rows: i64,
    pub skipped_rows: i64,
    pub date_range: Option<DateRange>,
}

impl ParseMetadata {
    /// `skipped_rows` is derived by subtraction rather than counted per skip.
    /// The formula drifts if a row ever both parses and errors; no current
    /// parser does that.
    pub fn from_counts(total_rows: i64, parsed_rows: i64, date_range: Option<DateRange>) -> Self {
        Self {
            total_rows,
            parsed_rows,
            skipped_rows: total_rows - parsed_rows,
            date_range,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParseResult<T> {
    pub data: Vec<T>,
    pub errors: Vec<ParseError>,
    pub metadata: ParseMetadata,
}

/// Accumulates observed `YYYY-MM-DD` dates into a min/max range. Values that
/// failed date coercion (passed through unchanged) are ignored.
#[derive(Debug, Default)]
pub struct DateRangeTracker {
    start: Option<String>,
    end: Option<String>,
}

impl DateRangeTracker {
    pub fn observe(&mut self, date: &str) {
        if !looks_like_iso_date(date) {
            return;
        }

        match &self.start {
            Some(current) if current.as_str() <= date => {}
            _ => self.start = Some(date.to_string()),
        }
        match &self.end {
            Some(current) if current.as_str() >= date => {}
            _ => self.end = Some(date.to_string()),
        }
    }

    pub fn into_range(self) -> Option<DateRange> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some(DateRange { start, end }),
            _ => None,
        }
    }
}

/// Splits content into non-blank lines, stripping a leading UTF-8 BOM.
pub(crate) fn non_blank_lines(content: &str) -> Vec<&str> {
    content
        .trim_start_matches('\u{feff}')
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect()
}

/// Division guard shared by every derived metric: a zero denominator yields
/// 0, never infinity or NaN.
pub(crate) fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    numerator / denominator
}

pub(crate) fn today_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}
