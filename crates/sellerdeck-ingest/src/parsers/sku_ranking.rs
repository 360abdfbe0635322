//! Catalog ranking export (BSR, rating, buy box ownership), usually sourced
//! from third-party trackers with wildly inconsistent headers.

use crate::coerce::{
    looks_like_iso_date, parse_date, parse_float, parse_int, split_csv_line,
};
use crate::columns::ColumnMap;
use crate::parsers::{
    DateRange, ParseError, ParseMetadata, ParseResult, non_blank_lines, today_iso,
};

const HEADER_LINES: i64 = 1;

const COLUMN_VARIANTS: &[(&str, &[&str])] = &[
    ("asin", &["asin"]),
    ("sku", &["sku"]),
    ("product_name", &["product name", "title", "item name"]),
    ("category", &["category"]),
    ("bsr", &["best seller", "bsr", "sales rank", "rank"]),
    ("rating", &["rating", "stars"]),
    ("review_count", &["review"]),
    ("buy_box_seller", &["buy box seller", "buy box owner", "buybox", "buy box"]),
    ("date", &["date"]),
];

#[derive(Debug, Clone)]
pub struct SkuRankingRow {
    pub asin: String,
    pub snapshot_date: String,
    pub sku: String,
    pub product_name: String,
    pub category: String,
    pub best_seller_rank: i64,
    pub rating: f64,
    pub review_count: i64,
    pub buy_box_seller: String,
    pub buy_box_is_amazon: bool,
}

pub fn parse(content: &str) -> ParseResult<SkuRankingRow> {
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

        let asin = columns.get(&fields, "asin");
        if asin.is_empty() {
            errors.push(ParseError::for_row(row_number, "asin", "Row is missing its ASIN.", ""));
            continue;
        }

        let snapshot_date = {
            let parsed = parse_date(&columns.get(&fields, "date"));
            if looks_like_iso_date(&parsed) { parsed } else { fallback_date.clone() }
        };
        observed_date = snapshot_date.clone();

        let buy_box_seller = columns.get(&fields, "buy_box_seller");
        data.push(SkuRankingRow {
            asin,
            snapshot_date,
            sku: columns.get(&fields, "sku"),
            product_name: columns.get(&fields, "product_name"),
            category: columns.get(&fields, "category"),
            best_seller_rank: parse_int(&columns.get(&fields, "bsr")),
            rating: parse_float(&columns.get(&fields, "rating")),
            review_count: parse_int(&columns.get(&fields, "review_count")),
            buy_box_is_amazon: is_amazon_seller(&buy_box_seller),
            buy_box_seller,
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

pub fn is_amazon_seller(seller: &str) -> bool {
    let lower = seller.to_lowercase();
    lower.contains("amazon") || lower.contains("amzn")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ranking_rows() {
        let content = "ASIN,SKU,Title,Category,Best Seller Rank,Rating,Review Count,Buy Box Seller\n\
                       B01AAA111,SKU-1,Garlic Press,Kitchen,\"1,542\",4.6,312,Amazon.com\n";
        let result = parse(content);

        let row = &result.data[0];
        assert_eq!(row.best_seller_rank, 1542);
        assert_eq!(row.rating, 4.6);
        assert!(row.buy_box_is_amazon);
    }

    #[test]
    fn buy_box_seller_detection_by_substring() {
        assert!(is_amazon_seller("Amazon.com"));
        assert!(is_amazon_seller("AMZN Warehouse"));
        assert!(!is_amazon_seller("Third Party Toys"));
        assert!(!is_amazon_seller(""));
    }

    #[test]
    fn missing_asin_is_an_error() {
        let content = "ASIN,Rating\n,4.0\nB01BBB222,3.5\n";
        let result = parse(content);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.data.len(), 1);
    }
}
