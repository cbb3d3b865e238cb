use anyhow::{Context, Result};
use blspull::ingest;
use std::{env, fs::File, io, process};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env_filter).init();

    // ─── 2) parse args ───────────────────────────────────────────────
    let mut args = env::args().skip(1);
    let Some(source_id) = args.next() else {
        eprintln!("usage: blspull <source_id> [output.csv]");
        eprintln!("set BLSPULL_CONTACT to identify yourself to the archive");
        process::exit(2);
    };
    let output = args.next();
    let contact = env::var("BLSPULL_CONTACT")
        .unwrap_or_else(|_| "blspull/0.1 (no contact configured)".to_string());

    // ─── 3) ingest ───────────────────────────────────────────────────
    info!(%source_id, "ingesting");
    let result = ingest::ingest(&source_id, &contact).await?;
    info!(
        rows = result.table.rows.len(),
        columns = result.table.headers.len(),
        "ingestion complete"
    );

    // ─── 4) write merged table + diagnostics ─────────────────────────
    match output {
        Some(path) => {
            let file =
                File::create(&path).with_context(|| format!("creating output file {path}"))?;
            result.table.write_csv(file)?;
            info!(path = %path, "wrote merged table");
        }
        None => result.table.write_csv(io::stdout().lock())?,
    }
    eprintln!("{}", serde_json::to_string_pretty(&result.diagnostics)?);

    Ok(())
}
