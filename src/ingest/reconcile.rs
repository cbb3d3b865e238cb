// src/ingest/reconcile.rs

use std::collections::HashSet;

use tracing::debug;

use crate::table::Table;

/// Metadata fields that recur across most dimension tables with table-local
/// meaning (display ordering, hierarchy depth, picker visibility). Left
/// unrenamed, each successive join would silently clobber the previous
/// table's values.
pub const SHARED_METADATA_COLUMNS: &[&str] = &["display_level", "selectable", "sort_sequence"];

/// Prefix shared metadata columns with the owning table's name before it is
/// joined in, e.g. `display_level` → `industry_display_level`.
pub fn prefix_shared_columns(table: &mut Table, table_name: &str) {
    for column in SHARED_METADATA_COLUMNS {
        if table.rename_column(column, &format!("{table_name}_{column}")) {
            debug!(table = table_name, column, "renamed shared metadata column");
        }
    }
}

/// Drop key-table columns that also appear in the observation table, so the
/// observation side wins the final merge. Metadata attached directly to an
/// observation is more authoritative than dimension-table metadata. The
/// series identifier is exempt — it is the join key. Returns the dropped
/// names for diagnostics.
pub fn drop_observation_collisions(
    key_table: &mut Table,
    observations: &Table,
    series_column: &str,
) -> Vec<String> {
    let observed: HashSet<&String> = observations.headers.iter().collect();
    let colliding: HashSet<String> = key_table
        .headers
        .iter()
        .filter(|name| name.as_str() != series_column && observed.contains(name))
        .cloned()
        .collect();
    if !colliding.is_empty() {
        debug!(columns = ?colliding, "dropping key-table columns shadowed by observations");
        key_table.drop_columns(&colliding);
    }
    let mut dropped: Vec<String> = colliding.into_iter().collect();
    dropped.sort();
    dropped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    fn table(headers: &[&str]) -> Table {
        Table {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: vec![headers.iter().map(|_| Value::Str("x".into())).collect()],
        }
    }

    #[test]
    fn shared_columns_get_table_prefix() {
        let mut t = table(&["industry_code", "industry_name", "display_level", "selectable"]);
        prefix_shared_columns(&mut t, "industry");
        assert_eq!(
            t.headers,
            vec![
                "industry_code",
                "industry_name",
                "industry_display_level",
                "industry_selectable"
            ]
        );
    }

    #[test]
    fn rename_is_a_noop_without_shared_columns() {
        let mut t = table(&["sector_code", "sector_name"]);
        prefix_shared_columns(&mut t, "sector");
        assert_eq!(t.headers, vec!["sector_code", "sector_name"]);
    }

    #[test]
    fn observation_columns_win_collisions() {
        let mut key = table(&["series_id", "footnote_codes", "industry_name"]);
        let obs = table(&["series_id", "year", "period", "value", "footnote_codes"]);
        let dropped = drop_observation_collisions(&mut key, &obs, "series_id");
        assert_eq!(dropped, vec!["footnote_codes"]);
        assert_eq!(key.headers, vec!["series_id", "industry_name"]);
    }

    #[test]
    fn series_identifier_is_never_dropped() {
        let mut key = table(&["series_id"]);
        let obs = table(&["series_id", "value"]);
        let dropped = drop_observation_collisions(&mut key, &obs, "series_id");
        assert!(dropped.is_empty());
        assert_eq!(key.headers, vec!["series_id"]);
    }
}
