//! Header-to-column resolution for flexible-schema exports.
//!
//! Vendor exports rarely agree on header names or column order, so each
//! flexible parser declares a table of semantic keys and the lowercase
//! substrings that identify them. The table is compiled into a `ColumnMap`
//! once per parse call; nothing is retained across calls.

use std::collections::HashMap;

use crate::coerce::clean_string;

/// A semantic key's resolved position in the header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnBinding {
    Bound(usize),
    Unbound,
}

#[derive(Debug, Clone)]
pub struct ColumnMap {
    bindings: HashMap<String, usize>,
}

impl ColumnMap {
    /// Binds each semantic key to the first header cell containing one of its
    /// variants (case-insensitive substring). First occurrence wins: once a
    /// key is bound, later columns with a matching name are ignored, so
    /// header order determines precedence. That policy is intentional and
    /// load-bearing; change it only together with the tests below.
    pub fn resolve(headers: &[String], variants: &[(&str, &[&str])]) -> Self {
        let mut bindings: HashMap<String, usize> = HashMap::new();

        for (index, header) in headers.iter().enumerate() {
            let normalized = header.trim().to_lowercase();
            if normalized.is_empty() {
                continue;
            }

            for (key, accepted) in variants {
                if bindings.contains_key(*key) {
                    continue;
                }
                if accepted.iter().any(|variant| normalized.contains(variant)) {
                    bindings.insert((*key).to_string(), index);
                }
            }
        }

        Self { bindings }
    }

    pub fn binding(&self, key: &str) -> ColumnBinding {
        match self.bindings.get(key) {
            Some(index) => ColumnBinding::Bound(*index),
            None => ColumnBinding::Unbound,
        }
    }

    pub fn is_bound(&self, key: &str) -> bool {
        self.bindings.contains_key(key)
    }

    /// Returns the cleaned cell for `key`, or `""` when the key never bound
    /// or the row is short.
    pub fn get(&self, row: &[String], key: &str) -> String {
        match self.binding(key) {
            ColumnBinding::Bound(index) => row.get(index).map(|cell| clean_string(cell)).unwrap_or_default(),
            ColumnBinding::Unbound => String::new(),
        }
    }

    /// Header indexes not claimed by any semantic key, for parsers that
    /// sweep leftover columns (variation attributes).
    pub fn unclaimed_indexes(&self, headers: &[String]) -> Vec<usize> {
        (0..headers.len())
            .filter(|index| !self.bindings.values().any(|bound| bound == index))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    const VARIANTS: &[(&str, &[&str])] = &[
        ("sku", &["sku", "seller sku"]),
        ("spend", &["spend", "cost"]),
    ];

    #[test]
    fn binds_by_case_insensitive_substring() {
        let map = ColumnMap::resolve(&headers(&["Seller SKU", "Total Spend"]), VARIANTS);
        assert_eq!(map.binding("sku"), ColumnBinding::Bound(0));
        assert_eq!(map.binding("spend"), ColumnBinding::Bound(1));
    }

    #[test]
    fn first_matching_column_wins() {
        let map = ColumnMap::resolve(&headers(&["Spend", "Ad Spend (extra)"]), VARIANTS);
        assert_eq!(map.binding("spend"), ColumnBinding::Bound(0));
    }

    #[test]
    fn unmatched_key_stays_unbound() {
        let map = ColumnMap::resolve(&headers(&["Campaign Name"]), VARIANTS);
        assert_eq!(map.binding("sku"), ColumnBinding::Unbound);
        assert!(!map.is_bound("sku"));
    }

    #[test]
    fn get_returns_empty_for_unbound_key_or_short_row() {
        let map = ColumnMap::resolve(&headers(&["SKU", "Spend"]), VARIANTS);
        let row = vec!["ABC-1".to_string()];
        assert_eq!(map.get(&row, "sku"), "ABC-1");
        assert_eq!(map.get(&row, "spend"), "");
        assert_eq!(map.get(&row, "unknown"), "");
    }

    #[test]
    fn get_cleans_cell_values() {
        let map = ColumnMap::resolve(&headers(&["SKU"]), VARIANTS);
        let row = vec!["  \"ABC-1\" ".to_string()];
        assert_eq!(map.get(&row, "sku"), "ABC-1");
    }

    #[test]
    fn unclaimed_indexes_skip_bound_columns() {
        let map = ColumnMap::resolve(&headers(&["SKU", "Color", "Spend", "Size"]), VARIANTS);
        assert_eq!(map.unclaimed_indexes(&headers(&["SKU", "Color", "Spend", "Size"])), vec![1, 3]);
    }
}
