//! Sales & traffic by date export: fixed-position CSV straight from the
//! seller dashboard, one row per calendar day.

use crate::coerce::{
    looks_like_iso_date, parse_currency, parse_date, parse_int, parse_percentage, split_csv_line,
};
use crate::parsers::{
    DateRangeTracker, ParseError, ParseMetadata, ParseResult, non_blank_lines,
};

const HEADER_LINES: i64 = 1;

// Column order in the dashboard export; the layout is static.
const COL_DATE: usize = 0;
const COL_ORDERED_PRODUCT_SALES: usize = 1;
const COL_UNITS_ORDERED: usize = 2;
const COL_SESSIONS: usize = 3;
const COL_PAGE_VIEWS: usize = 4;
const COL_BUY_BOX_PERCENTAGE: usize = 5;
const COL_UNIT_SESSION_PERCENTAGE: usize = 6;
const COL_AVERAGE_SELLING_PRICE: usize = 7;

#[derive(Debug, Clone)]
pub struct DailySalesRow {
    pub date: String,
    pub ordered_product_sales: f64,
    pub units_ordered: i64,
    pub sessions: i64,
    pub page_views: i64,
    pub buy_box_percentage: f64,
    pub unit_session_percentage: f64,
    pub average_selling_price: f64,
}

pub fn parse(content: &str) -> ParseResult<DailySalesRow> {
    let lines = non_blank_lines(content);
    let data_lines = lines.iter().skip(HEADER_LINES as usize);

    let mut data = Vec::new();
    let mut errors = Vec::new();
    let mut dates = DateRangeTracker::default();
    let mut total_rows = 0_i64;

    for (index, line) in data_lines.enumerate() {
        total_rows += 1;
        let row_number = index as i64 + HEADER_LINES + 1;
        let fields = split_csv_line(line);

        let raw_date = fields.get(COL_DATE).map(String::as_str).unwrap_or("");
        let date = parse_date(raw_date);
        if !looks_like_iso_date(&date) {
            errors.push(ParseError::for_row(
                row_number,
                "date",
                "Row is missing a parseable date.",
                raw_date,
            ));
            continue;
        }

        dates.observe(&date);
        data.push(DailySalesRow {
            date,
            ordered_product_sales: parse_currency(field(&fields, COL_ORDERED_PRODUCT_SALES)),
            units_ordered: parse_int(field(&fields, COL_UNITS_ORDERED)),
            sessions: parse_int(field(&fields, COL_SESSIONS)),
            page_views: parse_int(field(&fields, COL_PAGE_VIEWS)),
            buy_box_percentage: parse_percentage(field(&fields, COL_BUY_BOX_PERCENTAGE)),
            unit_session_percentage: parse_percentage(field(&fields, COL_UNIT_SESSION_PERCENTAGE)),
            average_selling_price: parse_currency(field(&fields, COL_AVERAGE_SELLING_PRICE)),
        });
    }

    let parsed_rows = data.len() as i64;
    ParseResult {
        data,
        errors,
        metadata: ParseMetadata::from_counts(total_rows, parsed_rows, dates.into_range()),
    }
}

fn field<'a>(fields: &'a [String], index: usize) -> &'a str {
    fields.get(index).map(String::as_str).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Date,Ordered product sales,Units ordered,Sessions,Page views,Buy Box percentage,Unit session percentage,Average selling price";

    #[test]
    fn parses_rows_and_infers_date_range() {
        let content = format!(
            "{HEADER}\n01/05/25,\"$1,200.50\",40,300,450,85.5%,13.3%,$30.01\n01/06/25,$900.00,30,250,380,84.0%,12.0%,$30.00\n"
        );
        let result = parse(&content);

        assert_eq!(result.data.len(), 2);
        assert!(result.errors.is_empty());
        assert_eq!(result.metadata.total_rows, 2);
        assert_eq!(result.metadata.parsed_rows, 2);
        assert_eq!(result.metadata.skipped_rows, 0);

        let first = &result.data[0];
        assert_eq!(first.date, "2025-01-05");
        assert_eq!(first.ordered_product_sales, 1200.5);
        assert_eq!(first.units_ordered, 40);
        assert_eq!(first.buy_box_percentage, 85.5);

        let range = result.metadata.date_range.as_ref();
        assert!(range.is_some());
        if let Some(range) = range {
            assert_eq!(range.start, "2025-01-05");
            assert_eq!(range.end, "2025-01-06");
        }
    }

    #[test]
    fn bad_date_errors_and_skips_row_without_aborting() {
        let content = format!("{HEADER}\nnot-a-date,$10.00,1,1,1,0%,0%,$10.00\n01/07/25,$20.00,2,2,2,0%,0%,$10.00\n");
        let result = parse(&content);

        assert_eq!(result.data.len(), 1);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].row, 2);
        assert_eq!(result.metadata.skipped_rows, 1);
    }

    #[test]
    fn header_only_file_parses_to_zero_rows() {
        let result = parse(&format!("{HEADER}\n"));
        assert!(result.data.is_empty());
        assert!(result.errors.is_empty());
        assert_eq!(result.metadata.total_rows, 0);
    }
}
