//! Restock limits export: one row per storage type with capacity counters.
//! Utilization is derived from the raw counters when the file omits it.

use crate::coerce::{looks_like_iso_date, parse_date, parse_float, parse_percentage, split_csv_line};
use crate::columns::ColumnMap;
use crate::parsers::{
    DateRange, ParseError, ParseMetadata, ParseResult, non_blank_lines, safe_ratio, today_iso,
};

const HEADER_LINES: i64 = 1;

const COLUMN_VARIANTS: &[(&str, &[&str])] = &[
    ("storage_type", &["storage type", "storage"]),
    ("utilization", &["utilization"]),
    ("limit", &["maximum", "limit", "capacity"]),
    ("used", &["used", "utilized"]),
    ("date", &["date"]),
];

#[derive(Debug, Clone)]
pub struct RestockingRow {
    pub storage_type: String,
    pub snapshot_date: String,
    pub storage_limit: f64,
    pub storage_used: f64,
    pub utilization_percentage: f64,
}

pub fn parse(content: &str) -> ParseResult<RestockingRow> {
    let lines = non_blank_lines(content);
    let headers = lines
        .first()
        .map(|line| split_csv_line(line))
        .unwrap_or_default();
    let columns = ColumnMap::resolve(&headers, COLUMN_VARIANTS);
    let fallback_date = today_iso();

    let mut data = Vec::new();
    let mut errors = Vec::new();
    let mut total_rows = 0_i64;
    let mut observed_date = fallback_date.clone();

    for (index, line) in lines.iter().skip(HEADER_LINES as usize).enumerate() {
        total_rows += 1;
        let row_number = index as i64 + HEADER_LINES + 1;
        let fields = split_csv_line(line);

        let storage_type_raw = columns.get(&fields, "storage_type");
        if storage_type_raw.is_empty() {
            errors.push(ParseError::for_row(
                row_number,
                "storage_type",
                "Row is missing its storage type.",
                "",
            ));
            continue;
        }

        let snapshot_date = {
            let parsed = parse_date(&columns.get(&fields, "date"));
            if looks_like_iso_date(&parsed) { parsed } else { fallback_date.clone() }
        };
        observed_date = snapshot_date.clone();

        let storage_limit = parse_float(&columns.get(&fields, "limit"));
        let storage_used = parse_float(&columns.get(&fields, "used"));
        let utilization_raw = columns.get(&fields, "utilization");
        let utilization_percentage = if utilization_raw.is_empty() {
            safe_ratio(storage_used, storage_limit) * 100.0
        } else {
            parse_percentage(&utilization_raw)
        };

        data.push(RestockingRow {
            storage_type: normalize_storage_type(&storage_type_raw),
            snapshot_date,
            storage_limit,
            storage_used,
            utilization_percentage,
        });
    }

    let date_range = Some(DateRange {
        start: observed_date.clone(),
        end: observed_date,
    });
    let parsed_rows = data.len() as i64;
    ParseResult {
        data,
        errors,
        metadata: ParseMetadata::from_counts(total_rows, parsed_rows, date_range),
    }
}

pub fn normalize_storage_type(value: &str) -> String {
    let lower = value.to_lowercase();
    for known in ["oversize", "apparel", "footwear", "flammable", "aerosol"] {
        if lower.contains(known) {
            return known.to_string();
        }
    }
    "standard".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_utilization_when_column_is_absent() {
        let content = "Storage Type,Maximum Capacity,Used Capacity\nStandard-Size,1000,250\n";
        let result = parse(content);

        let row = &result.data[0];
        assert_eq!(row.storage_type, "standard");
        assert_eq!(row.utilization_percentage, 25.0);
    }

    #[test]
    fn prefers_explicit_utilization_column() {
        let content = "Storage Type,Maximum Capacity,Used Capacity,Utilization\nOversize,100,10,12.5%\n";
        let result = parse(content);

        let row = &result.data[0];
        assert_eq!(row.storage_type, "oversize");
        assert_eq!(row.utilization_percentage, 12.5);
    }

    #[test]
    fn zero_limit_does_not_divide_by_zero() {
        let content = "Storage Type,Maximum Capacity,Used Capacity\nApparel,0,50\n";
        let result = parse(content);
        assert_eq!(result.data[0].utilization_percentage, 0.0);
    }

    #[test]
    fn storage_type_normalizes_by_substring() {
        assert_eq!(normalize_storage_type("Oversize storage"), "oversize");
        assert_eq!(normalize_storage_type("FLAMMABLE"), "flammable");
        assert_eq!(normalize_storage_type("Standard-Size"), "standard");
        assert_eq!(normalize_storage_type("unknown"), "standard");
    }
}
