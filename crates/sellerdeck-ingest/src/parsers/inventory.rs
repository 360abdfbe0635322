//! FBA inventory export: tab-separated with a fixed column order. Each
//! parsed row becomes a snapshot dated to the upload day.

use crate::coerce::{parse_currency, parse_int, split_tsv_line};
use crate::parsers::{
    DateRange, ParseError, ParseMetadata, ParseResult, non_blank_lines, today_iso,
};

const HEADER_LINES: i64 = 1;

const COL_SKU: usize = 0;
const COL_FNSKU: usize = 1;
const COL_ASIN: usize = 2;
const COL_PRODUCT_NAME: usize = 3;
const COL_CONDITION: usize = 4;
const COL_YOUR_PRICE: usize = 5;
const COL_AFN_FULFILLABLE: usize = 6;
const COL_AFN_INBOUND_SHIPPED: usize = 7;

#[derive(Debug, Clone)]
pub struct InventoryRow {
    pub sku: String,
    pub fnsku: String,
    pub asin: String,
    pub product_name: String,
    pub condition: String,
    pub snapshot_date: String,
    pub your_price: f64,
    pub afn_fulfillable_quantity: i64,
    pub afn_inbound_shipped_quantity: i64,
}

pub fn parse(content: &str) -> ParseResult<InventoryRow> {
    let lines = non_blank_lines(content);
    let snapshot_date = today_iso();

    let mut data = Vec::new();
    let mut errors = Vec::new();
    let mut total_rows = 0_i64;

    for (index, line) in lines.iter().skip(HEADER_LINES as usize).enumerate() {
        total_rows += 1;
        let row_number = index as i64 + HEADER_LINES + 1;
        let fields = split_tsv_line(line);

        let asin = fields.get(COL_ASIN).cloned().unwrap_or_default();
        if asin.is_empty() {
            errors.push(ParseError::for_row(
                row_number,
                "asin",
                "Row is missing its ASIN.",
                "",
            ));
            continue;
        }

        data.push(InventoryRow {
            sku: fields.get(COL_SKU).cloned().unwrap_or_default(),
            fnsku: fields.get(COL_FNSKU).cloned().unwrap_or_default(),
            asin,
            product_name: fields.get(COL_PRODUCT_NAME).cloned().unwrap_or_default(),
            condition: fields.get(COL_CONDITION).cloned().unwrap_or_default(),
            snapshot_date: snapshot_date.clone(),
            your_price: parse_currency(field(&fields, COL_YOUR_PRICE)),
            afn_fulfillable_quantity: parse_int(field(&fields, COL_AFN_FULFILLABLE)),
            afn_inbound_shipped_quantity: parse_int(field(&fields, COL_AFN_INBOUND_SHIPPED)),
        });
    }

    let date_range = Some(DateRange {
        start: snapshot_date.clone(),
        end: snapshot_date,
    });
    let parsed_rows = data.len() as i64;
    ParseResult {
        data,
        errors,
        metadata: ParseMetadata::from_counts(total_rows, parsed_rows, date_range),
    }
}

fn field<'a>(fields: &'a [String], index: usize) -> &'a str {
    fields.get(index).map(String::as_str).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "sku\tfnsku\tasin\tproduct-name\tcondition\tyour-price\tafn-fulfillable-quantity\tafn-inbound-shipped-quantity";

    #[test]
    fn parses_tab_separated_rows() {
        let content =
            format!("{HEADER}\nSKU-1\tX001ABC\tB01AAA111\tGarlic Press\tNEW\t19.99\t42\t12\n");
        let result = parse(&content);

        assert_eq!(result.data.len(), 1);
        let row = &result.data[0];
        assert_eq!(row.sku, "SKU-1");
        assert_eq!(row.condition, "NEW");
        assert_eq!(row.your_price, 19.99);
        assert_eq!(row.afn_fulfillable_quantity, 42);
    }

    #[test]
    fn missing_asin_is_an_error() {
        let content = format!("{HEADER}\nSKU-1\tX001ABC\t\tNo ASIN\tNEW\t9.99\t1\t0\n");
        let result = parse(&content);

        assert!(result.data.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field.as_deref(), Some("asin"));
    }
}
