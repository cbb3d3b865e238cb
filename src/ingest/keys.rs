// src/ingest/keys.rs

use crate::catalog::SourceSpec;

/// Join key(s) for an auxiliary table against the accumulating key table.
/// Defaults to `{table}_code`; sources with irregular naming or compound
/// keys declare overrides in the catalog. The key is a declared property of
/// the (source, table) pair — the table's actual columns are only checked
/// later, at join time.
pub fn resolve_key(spec: &SourceSpec, table_name: &str) -> Vec<String> {
    for (table, columns) in spec.key_overrides {
        if *table == table_name {
            return columns.iter().map(|c| c.to_string()).collect();
        }
    }
    vec![format!("{table_name}_code")]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    #[test]
    fn default_key_is_table_name_code() {
        let spec = catalog::resolve("ln").unwrap();
        assert_eq!(resolve_key(spec, "lfst"), vec!["lfst_code"]);
    }

    #[test]
    fn irregular_naming_override() {
        let spec = catalog::resolve("ce").unwrap();
        assert_eq!(resolve_key(spec, "datatype"), vec!["data_type_code"]);
        // other tables in the same source keep the default
        assert_eq!(resolve_key(spec, "industry"), vec!["industry_code"]);
    }

    #[test]
    fn compound_key_override() {
        let spec = catalog::resolve("wp").unwrap();
        assert_eq!(resolve_key(spec, "item"), vec!["group_code", "item_code"]);
    }
}
