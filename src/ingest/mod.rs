// src/ingest/mod.rs

pub mod dates;
pub mod keys;
pub mod reconcile;

use std::collections::HashMap;

use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::catalog::{self, SourceSpec};
use crate::error::{IngestError, TransportError};
use crate::fetch::{self, HttpSource, TableSource};
use crate::table::{self, Table, Value};

pub const SERIES_COLUMN: &str = "series_id";
pub const YEAR_COLUMN: &str = "year";
pub const PERIOD_COLUMN: &str = "period";
pub const VALUE_COLUMN: &str = "value";
pub const DATE_COLUMN: &str = "date";

/// Auxiliary tables are fetched a few at a time; they are still folded into
/// the key table in catalog order, so output is deterministic.
const MAX_AUX_CONCURRENCY: usize = 3;

/// Non-fatal degradations accumulated over one ingestion call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub skipped_tables: Vec<SkippedTable>,
    pub unparseable_values: usize,
    pub unparseable_dates: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedTable {
    pub table: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The declared join key was absent from the fetched table or from the
    /// accumulating key table.
    JoinKeyMissing { key_columns: Vec<String> },
    /// The table could not be retrieved or parsed.
    FetchFailed { message: String },
}

/// Final output: the date-indexed merged table plus the diagnostics record.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedResult {
    pub table: Table,
    pub diagnostics: Diagnostics,
}

/// Ingest one data source from the public archive. The identity token is
/// forwarded to the transport layer unchanged.
pub async fn ingest(source_id: &str, identity_token: &str) -> Result<MergedResult, IngestError> {
    let http = HttpSource::new(identity_token);
    ingest_from(&http, &fetch::archive_root(), source_id).await
}

/// Ingest one data source through an arbitrary [`TableSource`].
///
/// Sequence: resolve the source, fetch its key table (fatal on failure),
/// fold in each auxiliary table (non-fatal on failure), fetch and date the
/// observation file (fatal on failure), then left-join observations with the
/// accumulated key table. Observation rows are never dropped or duplicated.
#[instrument(level = "info", skip(source, archive_root))]
pub async fn ingest_from<S: TableSource>(
    source: &S,
    archive_root: &Url,
    source_id: &str,
) -> Result<MergedResult, IngestError> {
    let spec = catalog::resolve(source_id)?;
    let mut diagnostics = Diagnostics::default();

    // ── key table: required, one row per series identifier ───────────
    let mut key_table = fetch_required(source, archive_root, spec, spec.key_table).await?;
    require_series_column(spec, spec.key_table, &key_table)?;
    normalize_series_ids(&mut key_table);
    info!(rows = key_table.rows.len(), "fetched key table");

    // ── auxiliary tables: fetched concurrently, folded in order ──────
    let fetched = fetch_auxiliaries(source, archive_root, spec).await;
    for &table_name in spec.aux_tables {
        let Some(result) = fetched.get(table_name) else {
            continue;
        };
        let mut aux = match result {
            Ok(table) => table.clone(),
            Err(e) => {
                warn!(table = table_name, error = %e, "auxiliary table unavailable; skipping");
                diagnostics.skipped_tables.push(SkippedTable {
                    table: table_name.to_string(),
                    reason: SkipReason::FetchFailed {
                        message: e.to_string(),
                    },
                });
                continue;
            }
        };

        reconcile::prefix_shared_columns(&mut aux, table_name);
        let key_columns = keys::resolve_key(spec, table_name);
        match table::left_join(&key_table, &aux, &key_columns) {
            Ok(joined) => {
                debug!(table = table_name, key = ?key_columns, "merged auxiliary table");
                key_table = joined;
            }
            Err(e) => {
                warn!(table = table_name, error = %e, "join key missing; skipping table");
                diagnostics.skipped_tables.push(SkippedTable {
                    table: table_name.to_string(),
                    reason: SkipReason::JoinKeyMissing {
                        key_columns,
                    },
                });
            }
        }
    }

    // ── observations: required, then typed and dated ─────────────────
    let mut observations = fetch_required(source, archive_root, spec, spec.main_file).await?;
    require_series_column(spec, spec.main_file, &observations)?;
    normalize_series_ids(&mut observations);
    diagnostics.unparseable_values = coerce_values(&mut observations);
    diagnostics.unparseable_dates = dates::derive_dates(&mut observations, spec.frequency);
    info!(
        rows = observations.rows.len(),
        bad_values = diagnostics.unparseable_values,
        bad_dates = diagnostics.unparseable_dates,
        "fetched observations"
    );

    // ── final merge: observation columns win collisions ──────────────
    reconcile::drop_observation_collisions(&mut key_table, &observations, SERIES_COLUMN);
    let merged = table::left_join(&observations, &key_table, &[SERIES_COLUMN.to_string()])
        .map_err(|e| malformed(spec, spec.key_table, e.to_string()))?;

    info!(
        rows = merged.rows.len(),
        columns = merged.headers.len(),
        skipped = diagnostics.skipped_tables.len(),
        "merge complete"
    );
    Ok(MergedResult {
        table: merged,
        diagnostics,
    })
}

async fn fetch_required<S: TableSource>(
    source: &S,
    archive_root: &Url,
    spec: &SourceSpec,
    file: &str,
) -> Result<Table, IngestError> {
    let url = table_url_for(archive_root, spec, file)
        .map_err(|e| required_error(spec, file, e))?;
    source
        .fetch_table(&url)
        .await
        .map_err(|e| required_error(spec, file, e))
}

/// Fetch every auxiliary table, at most [`MAX_AUX_CONCURRENCY`] in flight.
async fn fetch_auxiliaries<S: TableSource>(
    source: &S,
    archive_root: &Url,
    spec: &SourceSpec,
) -> HashMap<&'static str, Result<Table, TransportError>> {
    let mut fetched = HashMap::with_capacity(spec.aux_tables.len());
    let mut in_flight = FuturesUnordered::new();

    for &table_name in spec.aux_tables {
        match table_url_for(archive_root, spec, table_name) {
            Ok(url) => {
                in_flight.push(async move { (table_name, source.fetch_table(&url).await) })
            }
            Err(e) => {
                fetched.insert(table_name, Err(e));
                continue;
            }
        }
        if in_flight.len() >= MAX_AUX_CONCURRENCY {
            if let Some((name, result)) = in_flight.next().await {
                fetched.insert(name, result);
            }
        }
    }
    while let Some((name, result)) = in_flight.next().await {
        fetched.insert(name, result);
    }
    fetched
}

fn table_url_for(
    archive_root: &Url,
    spec: &SourceSpec,
    file: &str,
) -> Result<Url, TransportError> {
    fetch::table_url(archive_root, spec.folder, file)
}

fn required_error(spec: &SourceSpec, table: &str, source: TransportError) -> IngestError {
    IngestError::RequiredTable {
        source_id: spec.id.to_string(),
        table: table.to_string(),
        source,
    }
}

fn malformed(spec: &SourceSpec, table: &str, message: String) -> IngestError {
    required_error(
        spec,
        table,
        TransportError::Malformed {
            url: format!("{}.{}", spec.folder, table),
            message,
        },
    )
}

fn require_series_column(
    spec: &SourceSpec,
    table_name: &str,
    table: &Table,
) -> Result<(), IngestError> {
    if table.column_index(SERIES_COLUMN).is_some() {
        Ok(())
    } else {
        Err(malformed(
            spec,
            table_name,
            format!("missing `{SERIES_COLUMN}` column"),
        ))
    }
}

/// The archive space-pads series identifiers; strip all embedded whitespace
/// so key-table and observation identifiers compare equal.
fn normalize_series_ids(table: &mut Table) {
    table.map_column(SERIES_COLUMN, |s| {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    });
}

/// Coerce the observation value column to numeric. Unparseable entries become
/// null and are counted, never fatal.
fn coerce_values(table: &mut Table) -> usize {
    let Some(idx) = table.column_index(VALUE_COLUMN) else {
        return 0;
    };
    let mut failures = 0usize;
    for row in &mut table.rows {
        let Some(cell) = row.get_mut(idx) else {
            continue;
        };
        let parsed = cell.as_str().and_then(|s| s.trim().parse::<f64>().ok());
        *cell = match parsed {
            Some(v) => Value::Num(v),
            None => {
                failures += 1;
                Value::Null
            }
        };
    }
    failures
}
