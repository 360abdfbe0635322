//! Flat advertising report CSV. Column order and naming vary by exporter,
//! so headers are resolved through the column map rather than by position.

use crate::coerce::{
    looks_like_iso_date, parse_currency, parse_date, parse_float, parse_int, split_csv_line,
};
use crate::columns::ColumnMap;
use crate::parsers::{
    DateRangeTracker, ParseError, ParseMetadata, ParseResult, non_blank_lines, safe_ratio,
    today_iso,
};

const HEADER_LINES: i64 = 1;

const COLUMN_VARIANTS: &[(&str, &[&str])] = &[
    ("date", &["date", "day"]),
    ("campaign_id", &["campaign id"]),
    ("campaign_name", &["campaign name", "campaign"]),
    ("ad_group_id", &["ad group id", "adgroup id"]),
    ("ad_group_name", &["ad group name", "adgroup name", "ad group"]),
    ("keyword_id", &["keyword id", "targeting id"]),
    ("keyword_text", &["keyword text", "customer search term", "targeting"]),
    ("match_type", &["match type"]),
    ("campaign_type", &["campaign type", "ad type", "product line"]),
    ("impressions", &["impression"]),
    ("clicks", &["click"]),
    ("spend", &["spend", "cost"]),
    ("sales", &["sales", "revenue"]),
    ("orders", &["orders", "purchases", "conversions"]),
    ("units", &["units"]),
];

#[derive(Debug, Clone)]
pub struct AdvertisingRow {
    pub report_date: String,
    pub campaign_id: String,
    pub campaign_name: String,
    pub ad_group_id: String,
    pub ad_group_name: String,
    pub keyword_id: String,
    pub keyword_text: String,
    pub match_type: String,
    pub campaign_type: String,
    pub sku: String,
    pub impressions: i64,
    pub clicks: i64,
    pub spend: f64,
    pub sales: f64,
    pub orders: i64,
    pub units: i64,
    pub acos: f64,
    pub roas: f64,
    pub ctr: f64,
    pub cpc: f64,
    pub conversion_rate: f64,
}

impl AdvertisingRow {
    /// Recomputes every derived ratio from the raw counters. ACOS, CTR, and
    /// conversion rate are stored as whole percentages; each is guarded
    /// against a zero denominator.
    pub fn recompute_derived_metrics(&mut self) {
        self.acos = safe_ratio(self.spend, self.sales) * 100.0;
        self.roas = safe_ratio(self.sales, self.spend);
        self.ctr = safe_ratio(self.clicks as f64, self.impressions as f64) * 100.0;
        self.cpc = safe_ratio(self.spend, self.clicks as f64);
        self.conversion_rate = safe_ratio(self.orders as f64, self.clicks as f64) * 100.0;
    }
}

/// Campaign type from an explicit column value when present, else inferred
/// from the campaign name; the default is SP.
pub fn resolve_campaign_type(explicit: &str, campaign_name: &str) -> String {
    let explicit_lower = explicit.to_lowercase();
    if !explicit_lower.is_empty() {
        if explicit_lower.contains("brand") || explicit_lower == "sb" {
            return "SB".to_string();
        }
        if explicit_lower.contains("display") || explicit_lower == "sd" {
            return "SD".to_string();
        }
        if explicit_lower.contains("product") || explicit_lower == "sp" {
            return "SP".to_string();
        }
    }

    let name_lower = format!(" {} ", campaign_name.to_lowercase());
    if name_lower.contains("sponsored brand") || name_lower.contains(" sb ") {
        return "SB".to_string();
    }
    if name_lower.contains("sponsored display") || name_lower.contains(" sd ") {
        return "SD".to_string();
    }
    "SP".to_string()
}

pub fn parse(content: &str) -> ParseResult<AdvertisingRow> {
    let lines = non_blank_lines(content);
    let headers = lines
        .first()
        .map(|line| split_csv_line(line))
        .unwrap_or_default();
    let columns = ColumnMap::resolve(&headers, COLUMN_VARIANTS);
    let fallback_date = today_iso();

    let mut data = Vec::new();
    let mut errors = Vec::new();
    let mut dates = DateRangeTracker::default();
    let mut total_rows = 0_i64;

    for (index, line) in lines.iter().skip(HEADER_LINES as usize).enumerate() {
        total_rows += 1;
        let row_number = index as i64 + HEADER_LINES + 1;
        let fields = split_csv_line(line);

        let campaign_name = columns.get(&fields, "campaign_name");
        if campaign_name.is_empty() {
            errors.push(ParseError::for_row(
                row_number,
                "campaign_name",
                "Row is missing its campaign.",
                "",
            ));
            continue;
        }

        let raw_date = columns.get(&fields, "date");
        let parsed_date = parse_date(&raw_date);
        let report_date = if looks_like_iso_date(&parsed_date) {
            parsed_date
        } else {
            fallback_date.clone()
        };
        dates.observe(&report_date);

        // Exports without id columns key on names; empty string, never null,
        // keeps the composite key satisfiable.
        let campaign_id = non_empty_or(&columns.get(&fields, "campaign_id"), &campaign_name);
        let ad_group_name = columns.get(&fields, "ad_group_name");
        let ad_group_id = non_empty_or(&columns.get(&fields, "ad_group_id"), &ad_group_name);

        let mut row = AdvertisingRow {
            report_date,
            campaign_type: resolve_campaign_type(
                &columns.get(&fields, "campaign_type"),
                &campaign_name,
            ),
            campaign_id,
            campaign_name,
            ad_group_id,
            ad_group_name,
            keyword_id: columns.get(&fields, "keyword_id"),
            keyword_text: columns.get(&fields, "keyword_text"),
            match_type: columns.get(&fields, "match_type"),
            sku: String::new(),
            impressions: parse_int(&columns.get(&fields, "impressions")),
            clicks: parse_int(&columns.get(&fields, "clicks")),
            spend: parse_currency(&columns.get(&fields, "spend")),
            sales: parse_currency(&columns.get(&fields, "sales")),
            orders: parse_int(&columns.get(&fields, "orders")),
            units: parse_float(&columns.get(&fields, "units")) as i64,
            acos: 0.0,
            roas: 0.0,
            ctr: 0.0,
            cpc: 0.0,
            conversion_rate: 0.0,
        };
        row.recompute_derived_metrics();
        data.push(row);
    }

    let parsed_rows = data.len() as i64;
    ParseResult {
        data,
        errors,
        metadata: ParseMetadata::from_counts(total_rows, parsed_rows, dates.into_range()),
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_columns_regardless_of_order() {
        let content = "Clicks,Campaign Name,Date,Spend,7 Day Total Sales,Impressions\n\
                       5,Garlic Press SP,01/15/25,$12.50,$125.00,1000\n";
        let result = parse(content);

        assert_eq!(result.data.len(), 1);
        let row = &result.data[0];
        assert_eq!(row.report_date, "2025-01-15");
        assert_eq!(row.campaign_name, "Garlic Press SP");
        assert_eq!(row.impressions, 1000);
        assert_eq!(row.clicks, 5);
        assert_eq!(row.spend, 12.5);
        assert_eq!(row.acos, 10.0);
        assert_eq!(row.ctr, 0.5);
    }

    #[test]
    fn campaign_type_prefers_explicit_column() {
        assert_eq!(resolve_campaign_type("Sponsored Brands", "anything"), "SB");
        assert_eq!(resolve_campaign_type("sd", "anything"), "SD");
        assert_eq!(resolve_campaign_type("", "Holiday Sponsored Display push"), "SD");
        assert_eq!(resolve_campaign_type("", "Brand SB defense"), "SB");
        assert_eq!(resolve_campaign_type("", "plain campaign"), "SP");
    }

    #[test]
    fn zero_sales_yields_zero_acos_not_infinity() {
        let content = "Campaign Name,Spend,Sales,Clicks,Impressions,Orders\n\
                       No Sales Yet,$5.00,$0.00,0,100,0\n";
        let result = parse(content);

        let row = &result.data[0];
        assert_eq!(row.acos, 0.0);
        assert_eq!(row.roas, 0.0);
        assert_eq!(row.cpc, 0.0);
        assert_eq!(row.conversion_rate, 0.0);
    }

    #[test]
    fn missing_campaign_is_an_error_and_parsing_continues() {
        let content = "Campaign Name,Spend\n,\n$ok-name,$1.00\n";
        let result = parse(content);

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].row, 2);
        assert_eq!(result.data.len(), 1);
    }

    #[test]
    fn ids_fall_back_to_names_when_columns_are_absent() {
        let content = "Campaign Name,Ad Group Name,Spend\nMain,Exact,$1.00\n";
        let result = parse(content);

        let row = &result.data[0];
        assert_eq!(row.campaign_id, "Main");
        assert_eq!(row.ad_group_id, "Exact");
        assert_eq!(row.keyword_id, "");
    }
}
