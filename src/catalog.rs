// src/catalog.rs

use serde::Serialize;

use crate::error::IngestError;

/// Declared observation cadence of a data source. Governs how period codes
/// become calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Monthly,
    Quarterly,
}

/// Static description of one archive data source: which remote files exist,
/// how observations are dated, and which tables need non-default join keys.
/// The catalog is the single source of truth — adding a source means adding
/// an entry here, never branching elsewhere.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSpec {
    pub id: &'static str,
    /// Archive folder, which doubles as the file-name prefix
    /// (`{folder}/{folder}.{file}`).
    pub folder: &'static str,
    /// The dimension table holding one row per series identifier. Required;
    /// every auxiliary table is folded into it.
    pub key_table: &'static str,
    /// Main observation file name (relative to the folder prefix).
    pub main_file: &'static str,
    /// Remaining dimension tables, folded in this order.
    pub aux_tables: &'static [&'static str],
    pub frequency: Frequency,
    /// Declared join-key exceptions: (table, key columns). Tables not listed
    /// here key on `{table}_code`.
    pub key_overrides: &'static [(&'static str, &'static [&'static str])],
}

static SOURCES: &[SourceSpec] = &[
    SourceSpec {
        id: "pr",
        folder: "pr",
        key_table: "series",
        main_file: "data.1.AllData",
        aux_tables: &["class", "measure", "sector", "duration"],
        frequency: Frequency::Quarterly,
        key_overrides: &[],
    },
    SourceSpec {
        id: "ce",
        folder: "ce",
        key_table: "series",
        main_file: "data.1.AllData",
        aux_tables: &["supersector", "industry", "datatype"],
        frequency: Frequency::Monthly,
        // the archive names the datatype key column irregularly
        key_overrides: &[("datatype", &["data_type_code"])],
    },
    SourceSpec {
        id: "ln",
        folder: "ln",
        key_table: "series",
        main_file: "data.1.AllData",
        aux_tables: &["lfst", "periodicity", "sexs", "ages"],
        frequency: Frequency::Monthly,
        key_overrides: &[],
    },
    SourceSpec {
        id: "jt",
        folder: "jt",
        key_table: "series",
        main_file: "data.1.AllData",
        aux_tables: &["dataelement", "industry", "state", "ratelevel"],
        frequency: Frequency::Monthly,
        // rate/level codes repeat under each data element, so the pair is
        // the only unambiguous key
        key_overrides: &[("ratelevel", &["dataelement_code", "ratelevel_code"])],
    },
    SourceSpec {
        id: "wp",
        folder: "wp",
        key_table: "series",
        main_file: "data.1.AllData",
        aux_tables: &["group", "item"],
        frequency: Frequency::Monthly,
        // item codes are only unique within their commodity group
        key_overrides: &[("item", &["group_code", "item_code"])],
    },
];

/// Look up a data source by its mnemonic. Pure lookup, no I/O.
pub fn resolve(source_id: &str) -> Result<&'static SourceSpec, IngestError> {
    SOURCES
        .iter()
        .find(|spec| spec.id == source_id)
        .ok_or_else(|| IngestError::UnknownSource {
            source_id: source_id.to_string(),
        })
}

/// All declared source mnemonics, in catalog order.
pub fn source_ids() -> Vec<&'static str> {
    SOURCES.iter().map(|spec| spec.id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_declared_sources() {
        let spec = resolve("ce").unwrap();
        assert_eq!(spec.folder, "ce");
        assert_eq!(spec.key_table, "series");
        assert_eq!(spec.frequency, Frequency::Monthly);
    }

    #[test]
    fn unknown_source_is_an_error() {
        let err = resolve("nope").unwrap_err();
        assert!(matches!(
            err,
            IngestError::UnknownSource { ref source_id } if source_id == "nope"
        ));
    }

    #[test]
    fn every_source_declares_a_key_table_and_main_file() {
        for id in source_ids() {
            let spec = resolve(id).unwrap();
            assert!(!spec.key_table.is_empty());
            assert!(!spec.main_file.is_empty());
            // overrides must refer to declared auxiliary tables
            for (table, columns) in spec.key_overrides {
                assert!(spec.aux_tables.contains(table), "{id}: stray override {table}");
                assert!(!columns.is_empty());
            }
        }
    }
}
