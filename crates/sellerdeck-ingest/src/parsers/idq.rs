//! Inventory data quality (IDQ) export. Aged/stranded flags are derived from
//! the raw unit counts when the file does not carry them directly.

use crate::coerce::{
    looks_like_iso_date, parse_boolean, parse_date, parse_float, parse_int, split_csv_line,
};
use crate::columns::ColumnMap;
use crate::parsers::{
    DateRange, ParseError, ParseMetadata, ParseResult, non_blank_lines, today_iso,
};

const HEADER_LINES: i64 = 1;

const COLUMN_VARIANTS: &[(&str, &[&str])] = &[
    ("sku", &["seller sku", "sku"]),
    ("asin", &["asin"]),
    ("product_name", &["product name", "title", "item name"]),
    ("idq_score", &["idq", "quality score", "score"]),
    ("aged_units", &["aged 90", "aged"]),
    ("stranded_units", &["stranded"]),
    ("is_aged", &["is aged"]),
    ("is_stranded", &["is stranded"]),
    ("recommended_action", &["recommended action", "recommendation", "action"]),
    ("date", &["date"]),
];

#[derive(Debug, Clone)]
pub struct IdqRow {
    pub sku: String,
    pub snapshot_date: String,
    pub asin: String,
    pub product_name: String,
    pub idq_score: f64,
    pub aged_90_plus_units: i64,
    pub stranded_units: i64,
    pub is_aged: bool,
    pub is_stranded: bool,
    pub recommended_action: String,
}

pub fn parse(content: &str) -> ParseResult<IdqRow> {
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

        let sku = columns.get(&fields, "sku");
        if sku.is_empty() {
            errors.push(ParseError::for_row(row_number, "sku", "Row is missing its SKU.", ""));
            continue;
        }

        let snapshot_date = {
            let parsed = parse_date(&columns.get(&fields, "date"));
            if looks_like_iso_date(&parsed) { parsed } else { fallback_date.clone() }
        };
        observed_date = snapshot_date.clone();

        let aged_90_plus_units = parse_int(&columns.get(&fields, "aged_units"));
        let stranded_units = parse_int(&columns.get(&fields, "stranded_units"));
        let is_aged_raw = columns.get(&fields, "is_aged");
        let is_stranded_raw = columns.get(&fields, "is_stranded");

        data.push(IdqRow {
            sku,
            snapshot_date,
            asin: columns.get(&fields, "asin"),
            product_name: columns.get(&fields, "product_name"),
            idq_score: parse_float(&columns.get(&fields, "idq_score")),
            aged_90_plus_units,
            stranded_units,
            is_aged: if is_aged_raw.is_empty() {
                aged_90_plus_units > 0
            } else {
                parse_boolean(&is_aged_raw)
            },
            is_stranded: if is_stranded_raw.is_empty() {
                stranded_units > 0
            } else {
                parse_boolean(&is_stranded_raw)
            },
            recommended_action: normalize_recommended_action(
                &columns.get(&fields, "recommended_action"),
            ),
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

pub fn normalize_recommended_action(value: &str) -> String {
    let lower = value.to_lowercase();
    if lower.contains("liquidat") {
        return "liquidate".to_string();
    }
    if lower.contains("remov") {
        return "removal".to_string();
    }
    if lower.contains("price") || lower.contains("reduc") {
        return "price_reduction".to_string();
    }
    "none".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_flags_from_unit_counts() {
        let content = "Seller SKU,ASIN,IDQ Score,Aged 90+ Units,Stranded Units\n\
                       SKU-1,B01AAA111,72.5,12,0\n";
        let result = parse(content);

        let row = &result.data[0];
        assert_eq!(row.idq_score, 72.5);
        assert!(row.is_aged);
        assert!(!row.is_stranded);
        assert_eq!(row.recommended_action, "none");
    }

    #[test]
    fn explicit_flag_columns_win_over_derivation() {
        let content = "SKU,Aged Units,Is Aged,Is Stranded\nSKU-1,50,no,yes\n";
        let result = parse(content);

        let row = &result.data[0];
        assert!(!row.is_aged);
        assert!(row.is_stranded);
    }

    #[test]
    fn recommended_action_normalizes_to_closed_set() {
        assert_eq!(normalize_recommended_action("Liquidate now"), "liquidate");
        assert_eq!(normalize_recommended_action("Create removal order"), "removal");
        assert_eq!(normalize_recommended_action("Price reduction"), "price_reduction");
        assert_eq!(normalize_recommended_action("hold"), "none");
    }

    #[test]
    fn missing_sku_is_an_error() {
        let content = "SKU,IDQ Score\n,99\n";
        let result = parse(content);
        assert!(result.data.is_empty());
        assert_eq!(result.errors.len(), 1);
    }
}
