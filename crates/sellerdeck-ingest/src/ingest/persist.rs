//! Type-specific save strategies. Every writer upserts against the store's
//! natural key, stamps the rows with the owning upload session, and reports
//! how many rows were inserted versus refreshed.
//!
//! Advertising rows are written in chunks of 500, each chunk inside its own
//! transaction. A failure partway leaves earlier chunks committed; re-running
//! the same upload converges because every write is an upsert.

use std::path::Path;

use rusqlite::{Connection, params};
use tracing::warn;

use crate::IngestResult;
use crate::parsers::advertising::AdvertisingRow;
use crate::parsers::daily_sales::DailySalesRow;
use crate::parsers::idq::IdqRow;
use crate::parsers::inventory::InventoryRow;
use crate::parsers::parent_child::ParentChildRow;
use crate::parsers::product_performance::PerformanceRow;
use crate::parsers::restocking::RestockingRow;
use crate::parsers::search_terms::SearchTermRow;
use crate::parsers::sku_campaign::SkuCampaignRow;
use crate::parsers::sku_ranking::SkuRankingRow;
use crate::state::map_sqlite_error;

const ADVERTISING_CHUNK_SIZE: usize = 500;

#[derive(Debug, Clone, Copy, Default)]
pub struct SaveOutcome {
    pub inserted: i64,
    pub updated: i64,
}

impl SaveOutcome {
    fn record(&mut self, existed: bool) {
        if existed {
            self.updated += 1;
        } else {
            self.inserted += 1;
        }
    }
}

pub fn save_daily_sales(
    connection: &mut Connection,
    db_path: &Path,
    client_id: &str,
    source_id: &str,
    rows: &[DailySalesRow],
) -> IngestResult<SaveOutcome> {
    let mut outcome = SaveOutcome::default();
    let transaction = connection
        .transaction()
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    for row in rows {
        let existed = row_exists(
            &transaction,
            db_path,
            "SELECT 1 FROM daily_sales WHERE client_id = ?1 AND sale_date = ?2",
            params![client_id, &row.date],
        )?;
        transaction
            .execute(
                "INSERT INTO daily_sales (
                    client_id, sale_date, sessions, page_views, units_ordered,
                    ordered_product_sales, buy_box_percentage, unit_session_percentage,
                    average_selling_price, data_source_type, data_source_id
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'manual_upload', ?10)
                 ON CONFLICT (client_id, sale_date) DO UPDATE SET
                    sessions = excluded.sessions,
                    page_views = excluded.page_views,
                    units_ordered = excluded.units_ordered,
                    ordered_product_sales = excluded.ordered_product_sales,
                    buy_box_percentage = excluded.buy_box_percentage,
                    unit_session_percentage = excluded.unit_session_percentage,
                    average_selling_price = excluded.average_selling_price,
                    data_source_type = excluded.data_source_type,
                    data_source_id = excluded.data_source_id",
                params![
                    client_id,
                    &row.date,
                    row.sessions,
                    row.page_views,
                    row.units_ordered,
                    row.ordered_product_sales,
                    row.buy_box_percentage,
                    row.unit_session_percentage,
                    row.average_selling_price,
                    source_id
                ],
            )
            .map_err(|error| map_sqlite_error(db_path, &error))?;
        outcome.record(existed);
    }

    transaction
        .commit()
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    Ok(outcome)
}

pub fn save_product_performance(
    connection: &mut Connection,
    db_path: &Path,
    client_id: &str,
    source_id: &str,
    rows: &[PerformanceRow],
) -> IngestResult<SaveOutcome> {
    save_performance(
        connection,
        db_path,
        client_id,
        source_id,
        rows,
        "product_performance",
        "child_asin",
    )
}

pub fn save_parent_performance(
    connection: &mut Connection,
    db_path: &Path,
    client_id: &str,
    source_id: &str,
    rows: &[PerformanceRow],
) -> IngestResult<SaveOutcome> {
    save_performance(
        connection,
        db_path,
        client_id,
        source_id,
        rows,
        "parent_performance",
        "parent_asin",
    )
}

// The child and parent stores share a shape; only the table and the ASIN
// column differ. Both are trusted identifiers, never caller input.
fn save_performance(
    connection: &mut Connection,
    db_path: &Path,
    client_id: &str,
    source_id: &str,
    rows: &[PerformanceRow],
    table: &str,
    asin_column: &str,
) -> IngestResult<SaveOutcome> {
    let mut outcome = SaveOutcome::default();
    let transaction = connection
        .transaction()
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let exists_sql =
        format!("SELECT 1 FROM {table} WHERE client_id = ?1 AND {asin_column} = ?2");
    let upsert_sql = format!(
        "INSERT INTO {table} (
            client_id, {asin_column}, title, sessions, page_views, units_ordered,
            ordered_product_sales, data_source_type, data_source_id
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'manual_upload', ?8)
         ON CONFLICT (client_id, {asin_column}) DO UPDATE SET
            title = excluded.title,
            sessions = excluded.sessions,
            page_views = excluded.page_views,
            units_ordered = excluded.units_ordered,
            ordered_product_sales = excluded.ordered_product_sales,
            data_source_type = excluded.data_source_type,
            data_source_id = excluded.data_source_id"
    );

    for row in rows {
        let existed = row_exists(&transaction, db_path, &exists_sql, params![client_id, &row.asin])?;
        transaction
            .execute(
                &upsert_sql,
                params![
                    client_id,
                    &row.asin,
                    &row.title,
                    row.sessions,
                    row.page_views,
                    row.units_ordered,
                    row.ordered_product_sales,
                    source_id
                ],
            )
            .map_err(|error| map_sqlite_error(db_path, &error))?;
        outcome.record(existed);
    }

    transaction
        .commit()
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    Ok(outcome)
}

pub fn save_search_terms(
    connection: &mut Connection,
    db_path: &Path,
    client_id: &str,
    source_id: &str,
    rows: &[SearchTermRow],
) -> IngestResult<SaveOutcome> {
    let mut outcome = SaveOutcome::default();
    let transaction = connection
        .transaction()
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    for row in rows {
        let existed = row_exists(
            &transaction,
            db_path,
            "SELECT 1 FROM search_terms
             WHERE client_id = ?1 AND search_term = ?2 AND reporting_date = ?3",
            params![client_id, &row.search_term, &row.reporting_date],
        )?;
        transaction
            .execute(
                "INSERT INTO search_terms (
                    client_id, search_term, reporting_date, department,
                    search_frequency_rank, clicked_asin, clicked_item_name,
                    click_share, conversion_share, data_source_type, data_source_id
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'manual_upload', ?10)
                 ON CONFLICT (client_id, search_term, reporting_date) DO UPDATE SET
                    department = excluded.department,
                    search_frequency_rank = excluded.search_frequency_rank,
                    clicked_asin = excluded.clicked_asin,
                    clicked_item_name = excluded.clicked_item_name,
                    click_share = excluded.click_share,
                    conversion_share = excluded.conversion_share,
                    data_source_type = excluded.data_source_type,
                    data_source_id = excluded.data_source_id",
                params![
                    client_id,
                    &row.search_term,
                    &row.reporting_date,
                    &row.department,
                    row.search_frequency_rank,
                    &row.clicked_asin,
                    &row.clicked_item_name,
                    row.click_share,
                    row.conversion_share,
                    source_id
                ],
            )
            .map_err(|error| map_sqlite_error(db_path, &error))?;
        outcome.record(existed);
    }

    transaction
        .commit()
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    Ok(outcome)
}

pub fn save_inventory(
    connection: &mut Connection,
    db_path: &Path,
    client_id: &str,
    source_id: &str,
    rows: &[InventoryRow],
) -> IngestResult<SaveOutcome> {
    let mut outcome = SaveOutcome::default();
    let transaction = connection
        .transaction()
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    for row in rows {
        let existed = row_exists(
            &transaction,
            db_path,
            "SELECT 1 FROM inventory_snapshots
             WHERE client_id = ?1 AND sku = ?2 AND condition = ?3 AND snapshot_date = ?4",
            params![client_id, &row.sku, &row.condition, &row.snapshot_date],
        )?;
        transaction
            .execute(
                "INSERT INTO inventory_snapshots (
                    client_id, sku, condition, snapshot_date, fnsku, asin, product_name,
                    your_price, afn_fulfillable_quantity, afn_inbound_shipped_quantity,
                    data_source_type, data_source_id
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 'manual_upload', ?11)
                 ON CONFLICT (client_id, sku, condition, snapshot_date) DO UPDATE SET
                    fnsku = excluded.fnsku,
                    asin = excluded.asin,
                    product_name = excluded.product_name,
                    your_price = excluded.your_price,
                    afn_fulfillable_quantity = excluded.afn_fulfillable_quantity,
                    afn_inbound_shipped_quantity = excluded.afn_inbound_shipped_quantity,
                    data_source_type = excluded.data_source_type,
                    data_source_id = excluded.data_source_id",
                params![
                    client_id,
                    &row.sku,
                    &row.condition,
                    &row.snapshot_date,
                    &row.fnsku,
                    &row.asin,
                    &row.product_name,
                    row.your_price,
                    row.afn_fulfillable_quantity,
                    row.afn_inbound_shipped_quantity,
                    source_id
                ],
            )
            .map_err(|error| map_sqlite_error(db_path, &error))?;
        outcome.record(existed);
    }

    transaction
        .commit()
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    Ok(outcome)
}

/// Chunked advertising upsert, shared by the flat CSV and the bulk workbook
/// paths.
pub fn save_advertising(
    connection: &mut Connection,
    db_path: &Path,
    client_id: &str,
    source_id: &str,
    rows: &[AdvertisingRow],
) -> IngestResult<SaveOutcome> {
    let mut outcome = SaveOutcome::default();

    for chunk in rows.chunks(ADVERTISING_CHUNK_SIZE) {
        let transaction = connection
            .transaction()
            .map_err(|error| map_sqlite_error(db_path, &error))?;

        for row in chunk {
            let existed = row_exists(
                &transaction,
                db_path,
                "SELECT 1 FROM advertising_metrics
                 WHERE client_id = ?1 AND report_date = ?2 AND campaign_id = ?3
                   AND ad_group_id = ?4 AND keyword_id = ?5",
                params![
                    client_id,
                    &row.report_date,
                    &row.campaign_id,
                    &row.ad_group_id,
                    &row.keyword_id
                ],
            )?;
            transaction
                .execute(
                    "INSERT INTO advertising_metrics (
                        client_id, report_date, campaign_id, ad_group_id, keyword_id,
                        campaign_name, ad_group_name, keyword_text, match_type, campaign_type,
                        impressions, clicks, spend, sales, orders, units,
                        acos, roas, ctr, cpc, conversion_rate,
                        data_source_type, data_source_id
                     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                               ?15, ?16, ?17, ?18, ?19, ?20, ?21, 'manual_upload', ?22)
                     ON CONFLICT (client_id, report_date, campaign_id, ad_group_id, keyword_id)
                     DO UPDATE SET
                        campaign_name = excluded.campaign_name,
                        ad_group_name = excluded.ad_group_name,
                        keyword_text = excluded.keyword_text,
                        match_type = excluded.match_type,
                        campaign_type = excluded.campaign_type,
                        impressions = excluded.impressions,
                        clicks = excluded.clicks,
                        spend = excluded.spend,
                        sales = excluded.sales,
                        orders = excluded.orders,
                        units = excluded.units,
                        acos = excluded.acos,
                        roas = excluded.roas,
                        ctr = excluded.ctr,
                        cpc = excluded.cpc,
                        conversion_rate = excluded.conversion_rate,
                        data_source_type = excluded.data_source_type,
                        data_source_id = excluded.data_source_id",
                    params![
                        client_id,
                        &row.report_date,
                        &row.campaign_id,
                        &row.ad_group_id,
                        &row.keyword_id,
                        &row.campaign_name,
                        &row.ad_group_name,
                        &row.keyword_text,
                        &row.match_type,
                        &row.campaign_type,
                        row.impressions,
                        row.clicks,
                        row.spend,
                        row.sales,
                        row.orders,
                        row.units,
                        row.acos,
                        row.roas,
                        row.ctr,
                        row.cpc,
                        row.conversion_rate,
                        source_id
                    ],
                )
                .map_err(|error| map_sqlite_error(db_path, &error))?;
            outcome.record(existed);
        }

        transaction
            .commit()
            .map_err(|error| map_sqlite_error(db_path, &error))?;
    }

    Ok(outcome)
}

/// Best-effort SKU-to-campaign write-back from bulk workbook rows that carry
/// a SKU. A failure here is logged and swallowed; the advertising metrics
/// themselves are already committed.
pub fn record_sku_campaigns_from_bulk(
    connection: &mut Connection,
    db_path: &Path,
    client_id: &str,
    source_id: &str,
    rows: &[AdvertisingRow],
) {
    let mappings: Vec<SkuCampaignRow> = rows
        .iter()
        .filter(|row| !row.sku.is_empty() && !row.campaign_id.is_empty())
        .map(|row| SkuCampaignRow {
            sku: row.sku.clone(),
            campaign_id: row.campaign_id.clone(),
            campaign_name: row.campaign_name.clone(),
            campaign_type: row.campaign_type.clone(),
            targeting_type: if row.keyword_text.is_empty() {
                "manual".to_string()
            } else {
                "keyword".to_string()
            },
            state: String::new(),
        })
        .collect();

    if mappings.is_empty() {
        return;
    }
    if let Err(error) = save_sku_campaigns(connection, db_path, client_id, source_id, &mappings) {
        warn!(
            client_id,
            source_id,
            code = error.code.as_str(),
            "sku-campaign write-back from bulk workbook failed"
        );
    }
}

pub fn save_sku_campaigns(
    connection: &mut Connection,
    db_path: &Path,
    client_id: &str,
    source_id: &str,
    rows: &[SkuCampaignRow],
) -> IngestResult<SaveOutcome> {
    let mut outcome = SaveOutcome::default();
    let transaction = connection
        .transaction()
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    for row in rows {
        let existed = row_exists(
            &transaction,
            db_path,
            "SELECT 1 FROM sku_campaign_mappings
             WHERE client_id = ?1 AND sku = ?2 AND campaign_id = ?3",
            params![client_id, &row.sku, &row.campaign_id],
        )?;
        transaction
            .execute(
                "INSERT INTO sku_campaign_mappings (
                    client_id, sku, campaign_id, campaign_name, campaign_type,
                    targeting_type, state, data_source_type, data_source_id
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'manual_upload', ?8)
                 ON CONFLICT (client_id, sku, campaign_id) DO UPDATE SET
                    campaign_name = excluded.campaign_name,
                    campaign_type = excluded.campaign_type,
                    targeting_type = excluded.targeting_type,
                    state = excluded.state,
                    data_source_type = excluded.data_source_type,
                    data_source_id = excluded.data_source_id",
                params![
                    client_id,
                    &row.sku,
                    &row.campaign_id,
                    &row.campaign_name,
                    &row.campaign_type,
                    &row.targeting_type,
                    &row.state,
                    source_id
                ],
            )
            .map_err(|error| map_sqlite_error(db_path, &error))?;
        outcome.record(existed);
    }

    transaction
        .commit()
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    Ok(outcome)
}

pub fn save_parent_child(
    connection: &mut Connection,
    db_path: &Path,
    client_id: &str,
    source_id: &str,
    rows: &[ParentChildRow],
) -> IngestResult<SaveOutcome> {
    let mut outcome = SaveOutcome::default();
    let transaction = connection
        .transaction()
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    for row in rows {
        let attributes_json = serde_json::to_string(&row.variation_attributes)
            .map_err(|error| crate::IngestError::internal_serialization(&error.to_string()))?;
        let existed = row_exists(
            &transaction,
            db_path,
            "SELECT 1 FROM parent_child_mappings
             WHERE client_id = ?1 AND parent_asin = ?2 AND child_asin = ?3",
            params![client_id, &row.parent_asin, &row.child_asin],
        )?;
        transaction
            .execute(
                "INSERT INTO parent_child_mappings (
                    client_id, parent_asin, child_asin, child_sku, title,
                    variation_attributes, data_source_type, data_source_id
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'manual_upload', ?7)
                 ON CONFLICT (client_id, parent_asin, child_asin) DO UPDATE SET
                    child_sku = excluded.child_sku,
                    title = excluded.title,
                    variation_attributes = excluded.variation_attributes,
                    data_source_type = excluded.data_source_type,
                    data_source_id = excluded.data_source_id",
                params![
                    client_id,
                    &row.parent_asin,
                    &row.child_asin,
                    &row.child_sku,
                    &row.title,
                    attributes_json,
                    source_id
                ],
            )
            .map_err(|error| map_sqlite_error(db_path, &error))?;
        outcome.record(existed);
    }

    transaction
        .commit()
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    Ok(outcome)
}

pub fn save_restocking(
    connection: &mut Connection,
    db_path: &Path,
    client_id: &str,
    source_id: &str,
    rows: &[RestockingRow],
) -> IngestResult<SaveOutcome> {
    let mut outcome = SaveOutcome::default();
    let transaction = connection
        .transaction()
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    for row in rows {
        let existed = row_exists(
            &transaction,
            db_path,
            "SELECT 1 FROM restocking_limits
             WHERE client_id = ?1 AND storage_type = ?2 AND snapshot_date = ?3",
            params![client_id, &row.storage_type, &row.snapshot_date],
        )?;
        transaction
            .execute(
                "INSERT INTO restocking_limits (
                    client_id, storage_type, snapshot_date, storage_limit, storage_used,
                    utilization_percentage, data_source_type, data_source_id
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'manual_upload', ?7)
                 ON CONFLICT (client_id, storage_type, snapshot_date) DO UPDATE SET
                    storage_limit = excluded.storage_limit,
                    storage_used = excluded.storage_used,
                    utilization_percentage = excluded.utilization_percentage,
                    data_source_type = excluded.data_source_type,
                    data_source_id = excluded.data_source_id",
                params![
                    client_id,
                    &row.storage_type,
                    &row.snapshot_date,
                    row.storage_limit,
                    row.storage_used,
                    row.utilization_percentage,
                    source_id
                ],
            )
            .map_err(|error| map_sqlite_error(db_path, &error))?;
        outcome.record(existed);
    }

    transaction
        .commit()
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    Ok(outcome)
}

pub fn save_idq_scores(
    connection: &mut Connection,
    db_path: &Path,
    client_id: &str,
    source_id: &str,
    rows: &[IdqRow],
) -> IngestResult<SaveOutcome> {
    let mut outcome = SaveOutcome::default();
    let transaction = connection
        .transaction()
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    for row in rows {
        let existed = row_exists(
            &transaction,
            db_path,
            "SELECT 1 FROM idq_scores
             WHERE client_id = ?1 AND sku = ?2 AND snapshot_date = ?3",
            params![client_id, &row.sku, &row.snapshot_date],
        )?;
        transaction
            .execute(
                "INSERT INTO idq_scores (
                    client_id, sku, snapshot_date, asin, product_name, idq_score,
                    aged_90_plus_units, stranded_units, is_aged, is_stranded,
                    recommended_action, data_source_type, data_source_id
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 'manual_upload', ?12)
                 ON CONFLICT (client_id, sku, snapshot_date) DO UPDATE SET
                    asin = excluded.asin,
                    product_name = excluded.product_name,
                    idq_score = excluded.idq_score,
                    aged_90_plus_units = excluded.aged_90_plus_units,
                    stranded_units = excluded.stranded_units,
                    is_aged = excluded.is_aged,
                    is_stranded = excluded.is_stranded,
                    recommended_action = excluded.recommended_action,
                    data_source_type = excluded.data_source_type,
                    data_source_id = excluded.data_source_id",
                params![
                    client_id,
                    &row.sku,
                    &row.snapshot_date,
                    &row.asin,
                    &row.product_name,
                    row.idq_score,
                    row.aged_90_plus_units,
                    row.stranded_units,
                    row.is_aged,
                    row.is_stranded,
                    &row.recommended_action,
                    source_id
                ],
            )
            .map_err(|error| map_sqlite_error(db_path, &error))?;
        outcome.record(existed);
    }

    transaction
        .commit()
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    Ok(outcome)
}

pub fn save_sku_rankings(
    connection: &mut Connection,
    db_path: &Path,
    client_id: &str,
    source_id: &str,
    rows: &[SkuRankingRow],
) -> IngestResult<SaveOutcome> {
    let mut outcome = SaveOutcome::default();
    let transaction = connection
        .transaction()
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    for row in rows {
        let existed = row_exists(
            &transaction,
            db_path,
            "SELECT 1 FROM sku_rankings
             WHERE client_id = ?1 AND asin = ?2 AND snapshot_date = ?3",
            params![client_id, &row.asin, &row.snapshot_date],
        )?;
        transaction
            .execute(
                "INSERT INTO sku_rankings (
                    client_id, asin, snapshot_date, sku, product_name, category,
                    best_seller_rank, rating, review_count, buy_box_seller,
                    buy_box_is_amazon, data_source_type, data_source_id
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 'manual_upload', ?12)
                 ON CONFLICT (client_id, asin, snapshot_date) DO UPDATE SET
                    sku = excluded.sku,
                    product_name = excluded.product_name,
                    category = excluded.category,
                    best_seller_rank = excluded.best_seller_rank,
                    rating = excluded.rating,
                    review_count = excluded.review_count,
                    buy_box_seller = excluded.buy_box_seller,
                    buy_box_is_amazon = excluded.buy_box_is_amazon,
                    data_source_type = excluded.data_source_type,
                    data_source_id = excluded.data_source_id",
                params![
                    client_id,
                    &row.asin,
                    &row.snapshot_date,
                    &row.sku,
                    &row.product_name,
                    &row.category,
                    row.best_seller_rank,
                    row.rating,
                    row.review_count,
                    &row.buy_box_seller,
                    row.buy_box_is_amazon,
                    source_id
                ],
            )
            .map_err(|error| map_sqlite_error(db_path, &error))?;
        outcome.record(existed);
    }

    transaction
        .commit()
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    Ok(outcome)
}

fn row_exists(
    connection: &Connection,
    db_path: &Path,
    sql: &str,
    parameters: impl rusqlite::Params,
) -> IngestResult<bool> {
    use rusqlite::OptionalExtension;

    connection
        .query_row(sql, parameters, |_| Ok(()))
        .optional()
        .map(|found| found.is_some())
        .map_err(|error| map_sqlite_error(db_path, &error))
}
