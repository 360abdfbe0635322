//! Closed catalog of supported report types. Dispatch to the parser itself
//! happens in `ingest`, keyed on this enum; the catalog here is what upload
//! UIs and tooling consume.

use serde::Serialize;

use crate::{IngestError, IngestResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportType {
    DailySales,
    ProductPerformance,
    ParentPerformance,
    SearchTerms,
    Inventory,
    Advertising,
    AdvertisingBulk,
    SkuCampaign,
    ParentChild,
    Restocking,
    IdqScores,
    SkuRankings,
}

pub const ALL_REPORT_TYPES: [ReportType; 12] = [
    ReportType::DailySales,
    ReportType::ProductPerformance,
    ReportType::ParentPerformance,
    ReportType::SearchTerms,
    ReportType::Inventory,
    ReportType::Advertising,
    ReportType::AdvertisingBulk,
    ReportType::SkuCampaign,
    ReportType::ParentChild,
    ReportType::Restocking,
    ReportType::IdqScores,
    ReportType::SkuRankings,
];

impl ReportType {
    pub fn from_identifier(identifier: &str) -> IngestResult<Self> {
        ALL_REPORT_TYPES
            .into_iter()
            .find(|report_type| report_type.identifier() == identifier)
            .ok_or_else(|| IngestError::unknown_report_type(identifier))
    }

    pub fn identifier(&self) -> &'static str {
        match self {
            Self::DailySales => "daily_sales",
            Self::ProductPerformance => "product_performance",
            Self::ParentPerformance => "parent_performance",
            Self::SearchTerms => "search_terms",
            Self::Inventory => "inventory",
            Self::Advertising => "advertising",
            Self::AdvertisingBulk => "advertising_bulk",
            Self::SkuCampaign => "sku_campaign",
            Self::ParentChild => "parent_child",
            Self::Restocking => "restocking",
            Self::IdqScores => "idq_scores",
            Self::SkuRankings => "sku_rankings",
        }
    }

    /// Table the type's rows persist into; also the `table_name` recorded in
    /// the audit log.
    pub fn target_table(&self) -> &'static str {
        match self {
            Self::DailySales => "daily_sales",
            Self::ProductPerformance => "product_performance",
            Self::ParentPerformance => "parent_performance",
            Self::SearchTerms => "search_terms",
            Self::Inventory => "inventory_snapshots",
            Self::Advertising | Self::AdvertisingBulk => "advertising_metrics",
            Self::SkuCampaign => "sku_campaign_mappings",
            Self::ParentChild => "parent_child_mappings",
            Self::Restocking => "restocking_limits",
            Self::IdqScores => "idq_scores",
            Self::SkuRankings => "sku_rankings",
        }
    }

    /// Binary container types stay base64-encoded all the way to the parser.
    pub fn expects_binary_content(&self) -> bool {
        matches!(self, Self::AdvertisingBulk)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportTypeInfo {
    pub identifier: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub filename_hint: &'static str,
    pub target_table: &'static str,
}

pub fn is_valid_report_type(identifier: &str) -> bool {
    ReportType::from_identifier(identifier).is_ok()
}

pub fn report_catalog() -> Vec<ReportTypeInfo> {
    ALL_REPORT_TYPES
        .into_iter()
        .map(|report_type| ReportTypeInfo {
            identifier: report_type.identifier(),
            label: report_type.label(),
            description: report_type.description(),
            filename_hint: report_type.filename_hint(),
            target_table: report_type.target_table(),
        })
        .collect()
}

impl ReportType {
    fn label(&self) -> &'static str {
        match self {
            Self::DailySales => "Daily Sales",
            Self::ProductPerformance => "Product Performance (Child ASIN)",
            Self::ParentPerformance => "Parent ASIN Performance",
            Self::SearchTerms => "Search Terms",
            Self::Inventory => "FBA Inventory",
            Self::Advertising => "Advertising Report (CSV)",
            Self::AdvertisingBulk => "Advertising Bulk File (Excel)",
            Self::SkuCampaign => "SKU-Campaign Mapping",
            Self::ParentChild => "Parent-Child Mapping",
            Self::Restocking => "Restock Limits",
            Self::IdqScores => "IDQ Scores",
            Self::SkuRankings => "SKU Rankings",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::DailySales => "Sales & traffic by date from the seller dashboard.",
            Self::ProductPerformance => "Detail page sales & traffic by child ASIN.",
            Self::ParentPerformance => "Detail page sales & traffic rolled up by parent ASIN.",
            Self::SearchTerms => "Brand analytics top search terms report.",
            Self::Inventory => "FBA manage-inventory snapshot (tab-separated).",
            Self::Advertising => "Flat campaign/keyword advertising report.",
            Self::AdvertisingBulk => "Multi-sheet bulk operations workbook from the ads console.",
            Self::SkuCampaign => "Mapping of seller SKUs to advertising campaigns.",
            Self::ParentChild => "Parent-to-child ASIN relationships with variation attributes.",
            Self::Restocking => "FBA restock limits by storage type.",
            Self::IdqScores => "Inventory data quality scores and aged/stranded units.",
            Self::SkuRankings => "Best seller rank, rating, and buy box ownership by ASIN.",
        }
    }

    fn filename_hint(&self) -> &'static str {
        match self {
            Self::DailySales => "BusinessReport-MM-DD-YYYY.csv",
            Self::ProductPerformance => "DetailSalesTrafficByChildItem.csv",
            Self::ParentPerformance => "DetailSalesTrafficByParentItem.csv",
            Self::SearchTerms => "Search_Terms_US.csv",
            Self::Inventory => "FBA+Inventory+Report.txt",
            Self::Advertising => "Sponsored Products Campaign report.csv",
            Self::AdvertisingBulk => "bulk-a1b2c3-20250101-20250131-xyz.xlsx",
            Self::SkuCampaign => "sku_campaign_mapping.csv",
            Self::ParentChild => "parent_child_mapping.csv",
            Self::Restocking => "Restock_Limits.csv",
            Self::IdqScores => "idq_report.csv",
            Self::SkuRankings => "sku_rankings.csv",
        }
    }
}
