// src/error.rs

use thiserror::Error;

/// Failures raised by the transport collaborator while retrieving and
/// parsing one remote flat file.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("invalid table URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("malformed table from {url}: {message}")]
    Malformed { url: String, message: String },
}

/// Fatal ingestion failures. Per-table and per-row degradations are not
/// errors; they accumulate in [`crate::ingest::Diagnostics`] instead.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unknown data source `{source_id}`")]
    UnknownSource { source_id: String },

    #[error("required table `{table}` for source `{source_id}` could not be retrieved")]
    RequiredTable {
        source_id: String,
        table: String,
        #[source]
        source: TransportError,
    },
}
