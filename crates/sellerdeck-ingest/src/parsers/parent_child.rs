//! Parent/child ASIN relationship export. Besides the fixed mapping columns
//! this report carries an open-ended set of variation columns (Color, Size,
//! Style, ...) that differ per catalog; any unclaimed header matching a known
//! variation word is swept into a free-form attribute map.

use std::collections::BTreeMap;

use crate::coerce::split_csv_line;
use crate::columns::ColumnMap;
use crate::parsers::{ParseError, ParseMetadata, ParseResult, non_blank_lines};

const HEADER_LINES: i64 = 1;

const COLUMN_VARIANTS: &[(&str, &[&str])] = &[
    ("parent_asin", &["parent asin", "parent"]),
    ("child_asin", &["child asin", "child"]),
    ("child_sku", &["sku"]),
    ("title", &["title", "product name", "item name"]),
];

const VARIATION_WORDS: &[&str] = &[
    "color", "colour", "size", "style", "material", "pattern", "scent", "model",
    "package quantity", "unit count",
];

#[derive(Debug, Clone)]
pub struct ParentChildRow {
    pub parent_asin: String,
    pub child_asin: String,
    pub child_sku: String,
    pub title: String,
    pub variation_attributes: BTreeMap<String, String>,
}

pub fn parse(content: &str) -> ParseResult<ParentChildRow> {
    let lines = non_blank_lines(content);
    let headers = lines
        .first()
        .map(|line| split_csv_line(line))
        .unwrap_or_default();
    let columns = ColumnMap::resolve(&headers, COLUMN_VARIANTS);
    let variation_columns = variation_columns(&columns, &headers);

    let mut data = Vec::new();
    let mut errors = Vec::new();
    let mut total_rows = 0_i64;

    for (index, line) in lines.iter().skip(HEADER_LINES as usize).enumerate() {
        total_rows += 1;
        let row_number = index as i64 + HEADER_LINES + 1;
        let fields = split_csv_line(line);

        let parent_asin = columns.get(&fields, "parent_asin");
        if parent_asin.is_empty() {
            errors.push(ParseError::for_row(
                row_number,
                "parent_asin",
                "Row is missing its parent ASIN.",
                "",
            ));
            continue;
        }
        let child_asin = columns.get(&fields, "child_asin");
        if child_asin.is_empty() {
            errors.push(ParseError::for_row(
                row_number,
                "child_asin",
                "Row is missing its child ASIN.",
                "",
            ));
            continue;
        }

        let mut variation_attributes = BTreeMap::new();
        for (column_index, attribute_name) in &variation_columns {
            if let Some(value) = fields.get(*column_index)
                && !value.is_empty()
            {
                variation_attributes.insert(attribute_name.clone(), value.clone());
            }
        }

        data.push(ParentChildRow {
            parent_asin,
            child_asin,
            child_sku: columns.get(&fields, "child_sku"),
            title: columns.get(&fields, "title"),
            variation_attributes,
        });
    }

    let parsed_rows = data.len() as i64;
    ParseResult {
        data,
        errors,
        metadata: ParseMetadata::from_counts(total_rows, parsed_rows, None),
    }
}

fn variation_columns(columns: &ColumnMap, headers: &[String]) -> Vec<(usize, String)> {
    columns
        .unclaimed_indexes(headers)
        .into_iter()
        .filter_map(|index| {
            let header = headers[index].trim();
            let lower = header.to_lowercase();
            VARIATION_WORDS
                .iter()
                .any(|word| lower.contains(word))
                .then(|| (index, header.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mapping_and_sweeps_variation_columns() {
        let content = "Parent ASIN,Child ASIN,SKU,Title,Color,Size,Internal Note\n\
                       B0PARENT01,B0CHILD001,SKU-1,Widget Blue Small,Blue,Small,ignore me\n";
        let result = parse(content);

        assert_eq!(result.data.len(), 1);
        let row = &result.data[0];
        assert_eq!(row.parent_asin, "B0PARENT01");
        assert_eq!(row.child_asin, "B0CHILD001");
        assert_eq!(row.variation_attributes.get("Color").map(String::as_str), Some("Blue"));
        assert_eq!(row.variation_attributes.get("Size").map(String::as_str), Some("Small"));
        assert!(!row.variation_attributes.contains_key("Internal Note"));
    }

    #[test]
    fn empty_variation_cells_are_omitted() {
        let content = "Parent ASIN,Child ASIN,Color,Size\nB0PARENT01,B0CHILD001,Blue,\n";
        let result = parse(content);
        let row = &result.data[0];
        assert!(row.variation_attributes.contains_key("Color"));
        assert!(!row.variation_attributes.contains_key("Size"));
    }

    #[test]
    fn missing_identifiers_error_per_row() {
        let content = "Parent ASIN,Child ASIN\n,B0CHILD001\nB0PARENT01,\nB0PARENT01,B0CHILD002\n";
        let result = parse(content);

        assert_eq!(result.data.len(), 1);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].field.as_deref(), Some("parent_asin"));
        assert_eq!(result.errors[1].field.as_deref(), Some("child_asin"));
        assert_eq!(result.metadata.total_rows, 3);
    }
}
