//! Detail page sales & traffic by ASIN: fixed-position CSV, exported either
//! at child-ASIN or parent-ASIN grain. Both shapes share one layout; only
//! the identifier column's meaning differs.

use std::collections::HashMap;

use crate::coerce::{parse_currency, parse_int, split_csv_line};
use crate::parsers::{ParseError, ParseMetadata, ParseResult, non_blank_lines};

const HEADER_LINES: i64 = 1;
const TITLE_MAX_CHARS: usize = 500;

const COL_ASIN: usize = 0;
const COL_TITLE: usize = 1;
const COL_SESSIONS: usize = 2;
const COL_PAGE_VIEWS: usize = 3;
const COL_UNITS_ORDERED: usize = 4;
const COL_ORDERED_PRODUCT_SALES: usize = 5;

#[derive(Debug, Clone)]
pub struct PerformanceRow {
    pub asin: String,
    pub title: String,
    pub sessions: i64,
    pub page_views: i64,
    pub units_ordered: i64,
    pub ordered_product_sales: f64,
}

/// Child-ASIN export.
pub fn parse_child_report(content: &str) -> ParseResult<PerformanceRow> {
    parse_performance(content, "child_asin")
}

/// Parent-ASIN export.
pub fn parse_parent_report(content: &str) -> ParseResult<PerformanceRow> {
    parse_performance(content, "parent_asin")
}

fn parse_performance(content: &str, asin_field: &str) -> ParseResult<PerformanceRow> {
    let lines = non_blank_lines(content);

    let mut data = Vec::new();
    let mut errors = Vec::new();
    let mut total_rows = 0_i64;

    for (index, line) in lines.iter().skip(HEADER_LINES as usize).enumerate() {
        total_rows += 1;
        let row_number = index as i64 + HEADER_LINES + 1;
        let fields = split_csv_line(line);

        let asin = fields.get(COL_ASIN).cloned().unwrap_or_default();
        if asin.is_empty() {
            errors.push(ParseError::for_row(
                row_number,
                asin_field,
                "Row is missing its ASIN.",
                "",
            ));
            continue;
        }

        let title = fields.get(COL_TITLE).cloned().unwrap_or_default();
        data.push(PerformanceRow {
            asin,
            title: truncate_title(&title),
            sessions: parse_int(field(&fields, COL_SESSIONS)),
            page_views: parse_int(field(&fields, COL_PAGE_VIEWS)),
            units_ordered: parse_int(field(&fields, COL_UNITS_ORDERED)),
            ordered_product_sales: parse_currency(field(&fields, COL_ORDERED_PRODUCT_SALES)),
        });
    }

    let parsed_rows = data.len() as i64;
    ParseResult {
        data,
        errors,
        metadata: ParseMetadata::from_counts(total_rows, parsed_rows, None),
    }
}

/// Collapses rows sharing an ASIN to the one with the highest sales figure.
/// Highest value wins, not last writer; first-seen order is preserved.
pub fn deduplicate(rows: Vec<PerformanceRow>) -> Vec<PerformanceRow> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut deduped: Vec<PerformanceRow> = Vec::new();

    for row in rows {
        match positions.get(&row.asin) {
            Some(existing_index) => {
                if row.ordered_product_sales > deduped[*existing_index].ordered_product_sales {
                    deduped[*existing_index] = row;
                }
            }
            None => {
                positions.insert(row.asin.clone(), deduped.len());
                deduped.push(row);
            }
        }
    }

    deduped
}

fn truncate_title(title: &str) -> String {
    title.chars().take(TITLE_MAX_CHARS).collect()
}

fn field<'a>(fields: &'a [String], index: usize) -> &'a str {
    fields.get(index).map(String::as_str).unwrap_or("")
}
