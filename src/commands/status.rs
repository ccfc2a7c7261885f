use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::inventory::INVENTORY_MANIFEST_NAME;
use crate::model::{DocumentInventoryManifest, IngestRunManifest};
use crate::util::read_json;

const STORE_TABLES: [&str; 6] = [
    "entities",
    "statement_values",
    "findings",
    "features",
    "text_chunks",
    "metadata",
];

pub fn run(args: StatusArgs) -> Result<()> {
    let manifest_dir = args.output_dir.join("manifests");
    let inventory_path = manifest_dir.join(INVENTORY_MANIFEST_NAME);
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| args.output_dir.join("finrep.sqlite"));

    info!(output_dir = %args.output_dir.display(), "status requested");

    match latest_run_manifest(&manifest_dir)? {
        Some(path) => {
            let manifest: IngestRunManifest = read_json(&path)?;
            info!(
                path = %path.display(),
                run_id = %manifest.run_id,
                status = %manifest.status,
                started_at = %manifest.started_at,
                updated_at = %manifest.updated_at,
                failure_reason = %manifest.failure_reason.unwrap_or_default(),
                documents = manifest.counts.document_count,
                processed = manifest.counts.processed_document_count,
                skipped = manifest.counts.skipped_document_count,
                values = manifest.counts.consolidated_value_count,
                unmapped = manifest.counts.unmapped_observation_count,
                findings = manifest.counts.finding_count,
                high_severity = manifest.counts.high_severity_finding_count,
                chunks = manifest.counts.text_chunk_count,
                warnings = manifest.warnings.len(),
                "loaded latest ingest run manifest"
            );
        }
        None => warn!(path = %manifest_dir.display(), "no ingest run manifest found"),
    }

    if inventory_path.exists() {
        let inventory: DocumentInventoryManifest = read_json(&inventory_path)?;
        info!(
            generated_at = %inventory.generated_at,
            source = %inventory.source_directory,
            document_count = inventory.document_count,
            "loaded inventory manifest"
        );
    } else {
        warn!(path = %inventory_path.display(), "inventory manifest missing");
    }

    if db_path.exists() {
        let conn = Connection::open(&db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        for table in STORE_TABLES {
            match query_count(&conn, &format!("SELECT COUNT(*) FROM {table}")) {
                Ok(rows) => info!(table, rows, "database table"),
                Err(err) => warn!(table, error = %err, "database table unreadable"),
            }
        }
    } else {
        warn!(path = %db_path.display(), "database file missing");
    }

    Ok(())
}

/// Run manifests carry a sortable UTC stamp in their name, so the
/// lexicographically greatest one is the newest.
fn latest_run_manifest(manifest_dir: &Path) -> Result<Option<PathBuf>> {
    if !manifest_dir.is_dir() {
        return Ok(None);
    }

    let entries = fs::read_dir(manifest_dir)
        .with_context(|| format!("failed to read {}", manifest_dir.display()))?;

    let mut latest: Option<PathBuf> = None;
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to read entry in {}", manifest_dir.display()))?
            .path();
        let is_run_manifest = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("ingest_run_") && name.ends_with(".json"));
        if is_run_manifest && latest.as_ref().is_none_or(|current| path > *current) {
            latest = Some(path);
        }
    }

    Ok(latest)
}

fn query_count(conn: &Connection, sql: &str) -> Result<i64> {
    let count = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}
