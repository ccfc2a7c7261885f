use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::InventoryArgs;
use crate::commands::ingest::FilenameMetadataParser;
use crate::model::{DocumentEntry, DocumentInventoryManifest};
use crate::util::{now_utc_string, sha256_file, write_json_pretty};

pub const INVENTORY_MANIFEST_NAME: &str = "document_inventory.json";

pub fn run(args: InventoryArgs) -> Result<()> {
    let manifest = build_manifest(&args.input_dir, args.default_year)?;
    if manifest.documents.is_empty() {
        warn!(source = %manifest.source_directory, "no eligible documents found");
    }

    if args.dry_run {
        info!(
            document_count = manifest.document_count,
            source = %manifest.source_directory,
            "inventory dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args.manifest_path.unwrap_or_else(|| {
        args.output_dir
            .join("manifests")
            .join(INVENTORY_MANIFEST_NAME)
    });

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote inventory manifest");
    info!(document_count = manifest.document_count, "inventory completed");

    Ok(())
}

pub fn build_manifest(input_dir: &Path, default_year: i32) -> Result<DocumentInventoryManifest> {
    let metadata = FilenameMetadataParser::new(default_year)?;
    let paths = discover_documents(input_dir)?;

    let mut documents = Vec::with_capacity(paths.len());
    for path in &paths {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .with_context(|| format!("document path has no filename: {}", path.display()))?;
        let (entity, year) = metadata.parse(path);

        documents.push(DocumentEntry {
            filename,
            entity,
            year,
            sha256: sha256_file(path)?,
        });
    }

    Ok(DocumentInventoryManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        source_directory: input_dir.display().to_string(),
        document_count: documents.len(),
        documents,
    })
}

/// Every `*.pdf` (any case) directly inside `input_dir`, sorted by path.
pub fn discover_documents(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();

    let entries = fs::read_dir(input_dir)
        .with_context(|| format!("failed to read {}", input_dir.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", input_dir.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            documents.push(path);
        }
    }

    documents.sort();
    Ok(documents)
}
