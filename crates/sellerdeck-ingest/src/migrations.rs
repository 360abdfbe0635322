use rusqlite::Connection;
use rusqlite_migration::{M, Migrations};

const BOOTSTRAP_SQL: &str = include_str!("migrations/0001_bootstrap.sql");

pub const REPORT_STORE_TABLES: [&str; 11] = [
    "daily_sales",
    "product_performance",
    "parent_performance",
    "search_terms",
    "inventory_snapshots",
    "advertising_metrics",
    "sku_campaign_mappings",
    "parent_child_mappings",
    "restocking_limits",
    "idq_scores",
    "sku_rankings",
];

pub fn run_pending(conn: &mut Connection) -> rusqlite_migration::Result<()> {
    let migrations = Migrations::new(vec![M::up(BOOTSTRAP_SQL)]);
    migrations.to_latest(conn)
}
