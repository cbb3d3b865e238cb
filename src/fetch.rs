// src/fetch.rs

use std::future::Future;
use std::time::Duration;

use reqwest::header::USER_AGENT;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::error::TransportError;
use crate::table::Table;

/// Root of the public flat-file archive. Override with
/// `BLSPULL_ARCHIVE_ROOT` (useful for mirrors and test servers).
pub const DEFAULT_ARCHIVE_ROOT: &str = "https://download.bls.gov/pub/time.series/";

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

const TABLE_DELIMITER: u8 = b'\t';

/// Anything that can produce a parsed flat-file table for a URL. Production
/// uses [`HttpSource`]; tests substitute an in-memory fixture.
pub trait TableSource {
    fn fetch_table(
        &self,
        url: &Url,
    ) -> impl Future<Output = Result<Table, TransportError>> + Send;
}

/// HTTP transport. Owns the request timeout and attaches the caller's
/// identity token as the User-Agent header on every request — the archive
/// rejects anonymous clients. The token is passed through verbatim.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    identity_token: String,
}

impl HttpSource {
    pub fn new(identity_token: &str) -> Self {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "client builder failed; using default client");
                Client::new()
            });
        Self::with_client(client, identity_token)
    }

    pub fn with_client(client: Client, identity_token: &str) -> Self {
        Self {
            client,
            identity_token: identity_token.to_string(),
        }
    }
}

impl TableSource for HttpSource {
    async fn fetch_table(&self, url: &Url) -> Result<Table, TransportError> {
        debug!(%url, "fetching table");
        let text = self
            .client
            .get(url.clone())
            .header(USER_AGENT, self.identity_token.as_str())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Table::from_delimited(&text, TABLE_DELIMITER).map_err(|e| TransportError::Malformed {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

/// Build a table URL per the archive's `{root}/{folder}/{folder}.{file}`
/// convention. The root must end with a trailing slash.
pub fn table_url(archive_root: &Url, folder: &str, file: &str) -> Result<Url, TransportError> {
    Ok(archive_root.join(&format!("{folder}/{folder}.{file}"))?)
}

/// The configured archive root: `BLSPULL_ARCHIVE_ROOT` when set and valid,
/// the public archive otherwise.
pub fn archive_root() -> Url {
    let fallback =
        || Url::parse(DEFAULT_ARCHIVE_ROOT).expect("default archive root is a valid URL");
    match std::env::var("BLSPULL_ARCHIVE_ROOT") {
        Ok(raw) => Url::parse(&raw).unwrap_or_else(|e| {
            warn!(root = %raw, error = %e, "ignoring invalid BLSPULL_ARCHIVE_ROOT");
            fallback()
        }),
        Err(_) => fallback(),
    }
}
