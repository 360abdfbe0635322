//! Multi-sheet advertising bulk workbook (.xlsx/.xls). The payload arrives
//! either as raw binary, bare base64, or a base64 data URL; sheets are
//! classified by name and every campaign-shaped sheet is attempted, so an
//! unrecognized tab degrades to a best-effort generic parse instead of a
//! rejection.

use std::collections::HashMap;
use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use calamine::{Data, Reader, open_workbook_auto_from_rs};

use crate::coerce::{parse_currency, parse_float, parse_int};
use crate::columns::ColumnMap;
use crate::parsers::advertising::AdvertisingRow;
use crate::parsers::{DateRange, ParseError, ParseMetadata, ParseResult, today_iso};

const COLUMN_VARIANTS: &[(&str, &[&str])] = &[
    ("entity", &["entity"]),
    ("campaign_id", &["campaign id"]),
    ("campaign_name", &["campaign name"]),
    ("ad_group_id", &["ad group id"]),
    ("ad_group_name", &["ad group name"]),
    ("keyword_id", &["keyword id", "product targeting id"]),
    (
        "keyword_text",
        &["keyword text", "product targeting expression", "customer search term"],
    ),
    ("match_type", &["match type"]),
    ("sku", &["sku"]),
    ("impressions", &["impressions"]),
    ("clicks", &["clicks"]),
    ("spend", &["spend", "cost"]),
    ("sales", &["sales"]),
    ("orders", &["orders"]),
    ("units", &["units"]),
    ("acos", &["acos"]),
    ("ctr", &["ctr", "click-through"]),
    ("conversion_rate", &["conversion rate"]),
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum SheetKind {
    Campaign(String),
    SearchTermReport(String),
}

pub fn parse(content: &[u8], filename: Option<&str>) -> ParseResult<AdvertisingRow> {
    let (range_start, range_end) = filename
        .and_then(extract_filename_date_range)
        .unwrap_or_else(|| {
            let today = today_iso();
            (today.clone(), today)
        });
    let date_range = Some(DateRange {
        start: range_start,
        end: range_end.clone(),
    });

    let bytes = match decode_workbook_bytes(content) {
        Ok(bytes) => bytes,
        Err(detail) => {
            return ParseResult {
                data: Vec::new(),
                errors: vec![ParseError::for_file(&detail)],
                metadata: ParseMetadata::from_counts(0, 0, date_range),
            };
        }
    };

    // Auto-detected container, so legacy .xls books open alongside .xlsx.
    let mut workbook = match open_workbook_auto_from_rs(Cursor::new(bytes)) {
        Ok(workbook) => workbook,
        Err(error) => {
            return ParseResult {
                data: Vec::new(),
                errors: vec![ParseError::for_file(&format!(
                    "Bulk workbook could not be opened: {error}"
                ))],
                metadata: ParseMetadata::from_counts(0, 0, date_range),
            };
        }
    };

    let mut data = Vec::new();
    let mut errors = Vec::new();
    let mut total_rows = 0_i64;

    let sheet_names = workbook.sheet_names().to_vec();
    for sheet_name in &sheet_names {
        let range = match workbook.worksheet_range(sheet_name) {
            Ok(range) => range,
            Err(error) => {
                errors.push(ParseError::for_file(&format!(
                    "Sheet `{sheet_name}` could not be read: {error}"
                )));
                continue;
            }
        };

        let kind = classify_sheet(sheet_name);
        let mut rows = range.rows();
        let Some(header_row) = rows.next() else {
            continue;
        };
        let headers = header_row.iter().map(cell_to_string).collect::<Vec<String>>();
        let columns = ColumnMap::resolve(&headers, COLUMN_VARIANTS);

        for cells in rows {
            total_rows += 1;
            let fields = cells.iter().map(cell_to_string).collect::<Vec<String>>();

            let impressions_raw = columns.get(&fields, "impressions");
            let campaign_id_raw = columns.get(&fields, "campaign_id");
            // Section-header rows inside a sheet carry neither counter nor
            // campaign id; they are not data and are not worth an error.
            if impressions_raw.is_empty() && campaign_id_raw.is_empty() {
                continue;
            }

            if let Some(row) = build_row(&columns, &fields, &kind, &range_end) {
                data.push(row);
            }
        }
    }

    let parsed_rows = data.len() as i64;
    ParseResult {
        data,
        errors,
        metadata: ParseMetadata::from_counts(total_rows, parsed_rows, date_range),
    }
}

fn build_row(
    columns: &ColumnMap,
    fields: &[String],
    kind: &SheetKind,
    report_date: &str,
) -> Option<AdvertisingRow> {
    let campaign_name = columns.get(fields, "campaign_name");
    let campaign_id = {
        let raw = columns.get(fields, "campaign_id");
        if raw.is_empty() { campaign_name.clone() } else { raw }
    };
    if campaign_id.is_empty() {
        return None;
    }

    let entity = columns.get(fields, "entity").to_lowercase();
    let keyword_level = matches!(entity.as_str(), "keyword" | "product targeting")
        || matches!(kind, SheetKind::SearchTermReport(_));
    let ad_group_level = keyword_level || matches!(entity.as_str(), "ad group" | "ad") || entity.is_empty();

    let campaign_type = match kind {
        SheetKind::Campaign(campaign_type) | SheetKind::SearchTermReport(campaign_type) => {
            campaign_type.clone()
        }
    };

    let mut row = AdvertisingRow {
        report_date: report_date.to_string(),
        campaign_id,
        campaign_name,
        ad_group_id: if ad_group_level {
            columns.get(fields, "ad_group_id")
        } else {
            String::new()
        },
        ad_group_name: if ad_group_level {
            columns.get(fields, "ad_group_name")
        } else {
            String::new()
        },
        keyword_id: if keyword_level {
            columns.get(fields, "keyword_id")
        } else {
            String::new()
        },
        keyword_text: if keyword_level {
            columns.get(fields, "keyword_text")
        } else {
            String::new()
        },
        match_type: if keyword_level {
            columns.get(fields, "match_type")
        } else {
            String::new()
        },
        campaign_type,
        sku: columns.get(fields, "sku"),
        impressions: parse_int(&columns.get(fields, "impressions")),
        clicks: parse_int(&columns.get(fields, "clicks")),
        spend: parse_currency(&columns.get(fields, "spend")),
        sales: parse_currency(&columns.get(fields, "sales")),
        orders: parse_int(&columns.get(fields, "orders")),
        units: parse_int(&columns.get(fields, "units")),
        acos: 0.0,
        roas: 0.0,
        ctr: 0.0,
        cpc: 0.0,
        conversion_rate: 0.0,
    };
    row.recompute_derived_metrics();

    // Percentage cells present in the sheet win over computed values at this
    // stage; aggregation recomputes everything from the summed counters.
    let acos_raw = columns.get(fields, "acos");
    if !acos_raw.is_empty() {
        row.acos = normalize_percentage(parse_float(&acos_raw));
    }
    let ctr_raw = columns.get(fields, "ctr");
    if !ctr_raw.is_empty() {
        row.ctr = normalize_percentage(parse_float(&ctr_raw));
    }
    let conversion_raw = columns.get(fields, "conversion_rate");
    if !conversion_raw.is_empty() {
        row.conversion_rate = normalize_percentage(parse_float(&conversion_raw));
    }

    Some(row)
}

/// Merges rows sharing the full composite key, summing the raw counters and
/// recomputing every derived ratio afterwards; input ratios are never
/// carried across the merge.
pub fn aggregate_rows(rows: Vec<AdvertisingRow>) -> Vec<AdvertisingRow> {
    let mut positions: HashMap<(String, String, String, String), usize> = HashMap::new();
    let mut aggregated: Vec<AdvertisingRow> = Vec::new();

    for row in rows {
        let key = (
            row.report_date.clone(),
            row.campaign_id.clone(),
            row.ad_group_id.clone(),
            row.keyword_id.clone(),
        );
        match positions.get(&key) {
            Some(index) => {
                let existing = &mut aggregated[*index];
                existing.impressions += row.impressions;
                existing.clicks += row.clicks;
                existing.spend += row.spend;
                existing.sales += row.sales;
                existing.orders += row.orders;
                existing.units += row.units;
                if existing.sku.is_empty() && !row.sku.is_empty() {
                    existing.sku = row.sku;
                }
            }
            None => {
                positions.insert(key, aggregated.len());
                aggregated.push(row);
            }
        }
    }

    for row in &mut aggregated {
        row.recompute_derived_metrics();
    }

    aggregated
}

/// A percentage cell may arrive as a fraction (0.25) or a whole percentage
/// (25); values below 1 are scaled up, everything else passes through.
pub fn normalize_percentage(value: f64) -> f64 {
    if value > 0.0 && value < 1.0 {
        return value * 100.0;
    }
    value
}

/// Finds a `YYYYMMDD-YYYYMMDD` span in the filename.
pub fn extract_filename_date_range(filename: &str) -> Option<(String, String)> {
    let bytes = filename.as_bytes();
    if bytes.len() < 17 {
        return None;
    }

    for start in 0..=bytes.len() - 17 {
        let window = &bytes[start..start + 17];
        if window[8] != b'-' {
            continue;
        }
        if !window[..8].iter().all(u8::is_ascii_digit)
            || !window[9..].iter().all(u8::is_ascii_digit)
        {
            continue;
        }
        // Digit boundaries: reject longer runs like 123456789-...
        if start > 0 && bytes[start - 1].is_ascii_digit() {
            continue;
        }
        if start + 17 < bytes.len() && bytes[start + 17].is_ascii_digit() {
            continue;
        }

        let range_start = compact_to_iso(&filename[start..start + 8])?;
        let range_end = compact_to_iso(&filename[start + 9..start + 17])?;
        return Some((range_start, range_end));
    }

    None
}

fn compact_to_iso(compact: &str) -> Option<String> {
    let iso = format!("{}-{}-{}", &compact[..4], &compact[4..6], &compact[6..8]);
    if crate::coerce::looks_like_iso_date(&iso) {
        Some(iso)
    } else {
        None
    }
}

fn classify_sheet(sheet_name: &str) -> SheetKind {
    let name = sheet_name.to_lowercase();
    let campaign_type = if name.contains("display") {
        "SD"
    } else if name.contains("brand") || name.contains("sb") {
        "SB"
    } else {
        "SP"
    };

    if name.contains("search term") {
        return SheetKind::SearchTermReport(campaign_type.to_string());
    }
    SheetKind::Campaign(campaign_type.to_string())
}

fn decode_workbook_bytes(content: &[u8]) -> Result<Vec<u8>, String> {
    // Raw xlsx (zip) or legacy xls (OLE2) bytes pass straight through.
    if content.starts_with(b"PK") || content.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]) {
        return Ok(content.to_vec());
    }

    let text = std::str::from_utf8(content)
        .map_err(|_| "Bulk payload is neither a workbook nor base64 text.".to_string())?;
    let trimmed = text.trim();

    let encoded = match trimmed.split_once(";base64,") {
        Some((prefix, payload)) if prefix.starts_with("data:") => payload,
        _ => trimmed,
    };

    let compact = encoded
        .chars()
        .filter(|character| !character.is_whitespace())
        .collect::<String>();
    BASE64_STANDARD
        .decode(compact.as_bytes())
        .map_err(|error| format!("Bulk payload is not valid base64: {error}"))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(value) => value.trim().to_string(),
        Data::Empty => String::new(),
        Data::Float(value) if value.fract() == 0.0 => format!("{value:.0}"),
        other => format!("{other}"),
    }
}
