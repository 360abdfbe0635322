//! SKU-to-campaign mapping export, typically hand-maintained or produced by
//! third-party tools, so headers are matched loosely.

use crate::coerce::split_csv_line;
use crate::columns::ColumnMap;
use crate::parsers::{ParseError, ParseMetadata, ParseResult, non_blank_lines};

const HEADER_LINES: i64 = 1;

const COLUMN_VARIANTS: &[(&str, &[&str])] = &[
    ("sku", &["seller sku", "sku"]),
    ("campaign_id", &["campaign id"]),
    ("campaign_name", &["campaign name", "campaign"]),
    ("campaign_type", &["campaign type", "ad type"]),
    ("targeting_type", &["targeting type", "targeting"]),
    ("state", &["state", "status"]),
];

#[derive(Debug, Clone)]
pub struct SkuCampaignRow {
    pub sku: String,
    pub campaign_id: String,
    pub campaign_name: String,
    pub campaign_type: String,
    pub targeting_type: String,
    pub state: String,
}

pub fn parse(content: &str) -> ParseResult<SkuCampaignRow> {
    let lines = non_blank_lines(content);
    let headers = lines
        .first()
        .map(|line| split_csv_line(line))
        .unwrap_or_default();
    let columns = ColumnMap::resolve(&headers, COLUMN_VARIANTS);

    let mut data = Vec::new();
    let mut errors = Vec::new();
    let mut total_rows = 0_i64;

    for (index, line) in lines.iter().skip(HEADER_LINES as usize).enumerate() {
        total_rows += 1;
        let row_number = index as i64 + HEADER_LINES + 1;
        let fields = split_csv_line(line);

        let sku = columns.get(&fields, "sku");
        if sku.is_empty() {
            errors.push(ParseError::for_row(row_number, "sku", "Row is missing its SKU.", ""));
            continue;
        }

        let campaign_name = columns.get(&fields, "campaign_name");
        let campaign_id = {
            let raw = columns.get(&fields, "campaign_id");
            if raw.is_empty() { campaign_name.clone() } else { raw }
        };
        if campaign_id.is_empty() {
            errors.push(ParseError::for_row(
                row_number,
                "campaign_id",
                "Row is missing its campaign.",
                "",
            ));
            continue;
        }

        data.push(SkuCampaignRow {
            sku,
            campaign_id,
            campaign_name,
            campaign_type: normalize_campaign_type(&columns.get(&fields, "campaign_type")),
            targeting_type: normalize_targeting_type(&columns.get(&fields, "targeting_type")),
            state: columns.get(&fields, "state"),
        });
    }

    let parsed_rows = data.len() as i64;
    ParseResult {
        data,
        errors,
        metadata: ParseMetadata::from_counts(total_rows, parsed_rows, None),
    }
}

pub fn normalize_campaign_type(value: &str) -> String {
    let lower = value.to_lowercase();
    if lower.contains("brand") || lower == "sb" {
        return "SB".to_string();
    }
    if lower.contains("display") || lower == "sd" {
        return "SD".to_string();
    }
    "SP".to_string()
}

pub fn normalize_targeting_type(value: &str) -> String {
    let lower = value.to_lowercase();
    if lower.contains("auto") {
        return "auto".to_string();
    }
    if lower.contains("keyword") {
        return "keyword".to_string();
    }
    if lower.contains("product") {
        return "product".to_string();
    }
    "manual".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mapping_rows_with_loose_headers() {
        let content = "Seller SKU,Campaign Name,Campaign ID,Ad Type,Targeting Type,Status\n\
                       SKU-1,Main Campaign,111222,Sponsored Products,Automatic,enabled\n";
        let result = parse(content);

        assert_eq!(result.data.len(), 1);
        let row = &result.data[0];
        assert_eq!(row.sku, "SKU-1");
        assert_eq!(row.campaign_id, "111222");
        assert_eq!(row.campaign_type, "SP");
        assert_eq!(row.targeting_type, "auto");
    }

    #[test]
    fn campaign_id_falls_back_to_name() {
        let content = "SKU,Campaign Name\nSKU-1,Main Campaign\n";
        let result = parse(content);
        assert_eq!(result.data[0].campaign_id, "Main Campaign");
    }

    #[test]
    fn missing_sku_or_campaign_is_an_error() {
        let content = "SKU,Campaign Name\n,Main\nSKU-2,\n";
        let result = parse(content);

        assert!(result.data.is_empty());
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].field.as_deref(), Some("sku"));
        assert_eq!(result.errors[1].field.as_deref(), Some("campaign_id"));
    }

    #[test]
    fn normalizations_cover_the_closed_sets() {
        assert_eq!(normalize_campaign_type("Sponsored Brands"), "SB");
        assert_eq!(normalize_campaign_type("sd"), "SD");
        assert_eq!(normalize_campaign_type("anything else"), "SP");

        assert_eq!(normalize_targeting_type("AUTO targeting"), "auto");
        assert_eq!(normalize_targeting_type("keyword"), "keyword");
        assert_eq!(normalize_targeting_type("Product attribute"), "product");
        assert_eq!(normalize_targeting_type(""), "manual");
    }
}
