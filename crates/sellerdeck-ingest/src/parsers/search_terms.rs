//! Brand-analytics search terms export. The first line is exporter metadata
//! (it usually carries the reporting date), the second line is the real
//! header, so two lines are skipped and row numbers account for both.

use std::collections::HashSet;

use crate::coerce::{looks_like_iso_date, parse_date, parse_int, parse_percentage, split_csv_line};
use crate::parsers::{
    DateRange, ParseError, ParseMetadata, ParseResult, non_blank_lines, today_iso,
};

const HEADER_LINES: i64 = 2;

const COL_DEPARTMENT: usize = 0;
const COL_SEARCH_TERM: usize = 1;
const COL_FREQUENCY_RANK: usize = 2;
const COL_CLICKED_ASIN: usize = 3;
const COL_CLICKED_ITEM_NAME: usize = 4;
const COL_CLICK_SHARE: usize = 5;
const COL_CONVERSION_SHARE: usize = 6;

#[derive(Debug, Clone)]
pub struct SearchTermRow {
    pub search_term: String,
    pub reporting_date: String,
    pub department: String,
    pub search_frequency_rank: i64,
    pub clicked_asin: String,
    pub clicked_item_name: String,
    pub click_share: f64,
    pub conversion_share: f64,
}

pub fn parse(content: &str) -> ParseResult<SearchTermRow> {
    let lines = non_blank_lines(content);
    let reporting_date = lines
        .first()
        .and_then(|metadata_line| extract_reporting_date(metadata_line))
        .unwrap_or_else(today_iso);

    let mut data = Vec::new();
    let mut errors = Vec::new();
    let mut total_rows = 0_i64;

    for (index, line) in lines.iter().skip(HEADER_LINES as usize).enumerate() {
        total_rows += 1;
        let row_number = index as i64 + HEADER_LINES + 1;
        let fields = split_csv_line(line);

        let search_term = fields.get(COL_SEARCH_TERM).cloned().unwrap_or_default();
        if search_term.is_empty() {
            errors.push(ParseError::for_row(
                row_number,
                "search_term",
                "Row is missing its search term.",
                "",
            ));
            continue;
        }

        data.push(SearchTermRow {
            search_term,
            reporting_date: reporting_date.clone(),
            department: fields.get(COL_DEPARTMENT).cloned().unwrap_or_default(),
            search_frequency_rank: parse_int(field(&fields, COL_FREQUENCY_RANK)),
            clicked_asin: fields.get(COL_CLICKED_ASIN).cloned().unwrap_or_default(),
            clicked_item_name: fields.get(COL_CLICKED_ITEM_NAME).cloned().unwrap_or_default(),
            click_share: parse_percentage(field(&fields, COL_CLICK_SHARE)),
            conversion_share: parse_percentage(field(&fields, COL_CONVERSION_SHARE)),
        });
    }

    let date_range = Some(DateRange {
        start: reporting_date.clone(),
        end: reporting_date,
    });
    let parsed_rows = data.len() as i64;
    ParseResult {
        data,
        errors,
        metadata: ParseMetadata::from_counts(total_rows, parsed_rows, date_range),
    }
}

/// Collapses rows sharing a (term, reporting date) key, keeping the first
/// occurrence. Deliberately asymmetric with the performance reports, which
/// keep the highest-sales row instead.
pub fn deduplicate(rows: Vec<SearchTermRow>) -> Vec<SearchTermRow> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut deduped = Vec::new();

    for row in rows {
        let key = (row.search_term.clone(), row.reporting_date.clone());
        if seen.insert(key) {
            deduped.push(row);
        }
    }

    deduped
}

/// Scans the metadata line for anything that coerces to a date.
fn extract_reporting_date(metadata_line: &str) -> Option<String> {
    for token in metadata_line.split(|character: char| {
        character.is_whitespace() || matches!(character, ',' | '=' | '"' | '[' | ']')
    }) {
        if token.is_empty() {
            continue;
        }
        let candidate = parse_date(token);
        if looks_like_iso_date(&candidate) {
            return Some(candidate);
        }
    }
    None
}

fn field<'a>(fields: &'a [String], index: usize) -> &'a str {
    fields.get(index).map(String::as_str).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    const METADATA: &str = "\"Search Terms Report\",\"Reporting Range=01/31/25\"";
    const HEADER: &str = "Department,Search Term,Search Frequency Rank,#1 Clicked ASIN,#1 Product Title,#1 Click Share,#1 Conversion Share";

    #[test]
    fn skips_two_header_lines_and_reads_reporting_date_from_metadata() {
        let content = format!(
            "{METADATA}\n{HEADER}\nAmazon.com,garlic press,\"1,200\",B01AAA111,Press,22.5%,8.1%\n"
        );
        let result = parse(&content);

        assert_eq!(result.data.len(), 1);
        let row = &result.data[0];
        assert_eq!(row.search_term, "garlic press");
        assert_eq!(row.reporting_date, "2025-01-31");
        assert_eq!(row.search_frequency_rank, 1200);
        assert_eq!(row.click_share, 22.5);
    }

    #[test]
    fn error_rows_account_for_two_line_offset() {
        let content = format!("{METADATA}\n{HEADER}\nAmazon.com,,1,,,0%,0%\n");
        let result = parse(&content);

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].row, 3);
        assert_eq!(result.metadata.skipped_rows, 1);
    }

    #[test]
    fn deduplicate_keeps_first_occurrence_not_highest_value() {
        let content = format!(
            "{METADATA}\n{HEADER}\nA,garlic press,10,B01AAA111,First,5%,1%\nA,garlic press,99,B01BBB222,Second,50%,9%\n"
        );
        let result = parse(&content);
        let deduped = deduplicate(result.data);

        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].search_frequency_rank, 10);
        assert_eq!(deduped[0].clicked_item_name, "First");
    }

    #[test]
    fn missing_metadata_date_falls_back_to_today() {
        let content = format!("\"no date here\"\n{HEADER}\nA,term,1,,,0%,0%\n");
        let result = parse(&content);
        assert!(looks_like_iso_date(&result.data[0].reporting_date));
    }
}
