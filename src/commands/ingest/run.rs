use super::*;

pub fn run(args: IngestArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let input_dir = args.input_dir.clone();
    let output_dir = args.output_dir.clone();
    let manifest_dir = output_dir.join("manifests");
    ensure_directory(&manifest_dir)?;

    let ingest_manifest_path = args.ingest_manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!(
            "ingest_run_{}.json",
            utc_compact_string(started_ts)
        ))
    });
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| output_dir.join("finrep.sqlite"));
    let entity_map_path = args
        .entity_map_path
        .clone()
        .unwrap_or_else(|| output_dir.join("entity_map.json"));

    let config = PipelineConfig::from_args(&args);
    let strategy_order = config
        .strategies
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<&str>>()
        .join(",");
    info!(
        input_dir = %input_dir.display(),
        output_dir = %output_dir.display(),
        run_id = %run_id,
        strategies = %strategy_order,
        "starting ingest"
    );

    let tool_versions = collect_tool_versions();
    let mut warnings = missing_tool_warnings(&tool_versions, &config.strategies);

    let source_hashes = if input_dir.is_dir() {
        let inventory_manifest = inventory::build_manifest(&input_dir, config.default_year)?;
        let inventory_path = manifest_dir.join(inventory::INVENTORY_MANIFEST_NAME);
        write_json_pretty(&inventory_path, &inventory_manifest)?;
        info!(
            path = %inventory_path.display(),
            document_count = inventory_manifest.document_count,
            "refreshed inventory manifest"
        );
        inventory_manifest.documents
    } else {
        warn!(input_dir = %input_dir.display(), "input directory does not exist");
        Vec::new()
    };
    let document_paths = source_hashes
        .iter()
        .map(|entry| input_dir.join(&entry.filename))
        .collect::<Vec<PathBuf>>();

    let mut manifest = IngestRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        db_schema_version: DB_SCHEMA_VERSION.to_string(),
        status: "running".to_string(),
        started_at,
        updated_at: now_utc_string(),
        failure_reason: None,
        command: render_ingest_command(&args),
        tool_versions,
        paths: IngestPaths {
            input_dir: input_dir.display().to_string(),
            output_dir: output_dir.display().to_string(),
            manifest_dir: manifest_dir.display().to_string(),
            db_path: db_path.display().to_string(),
            entity_map_path: entity_map_path.display().to_string(),
        },
        counts: IngestCounts {
            document_count: document_paths.len(),
            ..IngestCounts::default()
        },
        source_hashes,
        documents: Vec::new(),
        warnings: Vec::new(),
    };

    let registry = EntityRegistry::load(&entity_map_path)?;
    let engine = ExtractionEngine::new(&config)?;
    let orchestrator = Orchestrator::new(&config)?;
    let mut state = BatchState::new(registry);

    let mut report = |percent: u8, message: &str| info!(percent, "{message}");
    let outcome = run_batch(
        &input_dir,
        &document_paths,
        &engine,
        &mut state,
        &mut |path: &Path| orchestrator.extract(path),
        &mut report,
    );

    let output = match outcome {
        Ok(output) => output,
        Err(failure) => {
            manifest.status = "failed".to_string();
            manifest.failure_reason = Some(failure.to_string());
            manifest.updated_at = now_utc_string();
            manifest.warnings = warnings;
            write_json_pretty(&ingest_manifest_path, &manifest)?;
            info!(path = %ingest_manifest_path.display(), "wrote failed ingest run manifest");
            return Err(anyhow::Error::new(failure).context("ingest run failed"));
        }
    };

    for document in output.documents.iter().filter(|document| document.skipped) {
        warnings.push(format!(
            "{}: no extraction strategy produced text; document skipped",
            document.filename
        ));
    }

    let targets = OutputTargets {
        artifacts: ArtifactPaths::under(&output_dir),
        entity_map: entity_map_path.clone(),
        db_path: db_path.clone(),
        emit_unmapped: config.emit_unmapped,
    };
    let written = persist_batch(&targets, &output, &state, &mut report)?;

    manifest.status = "completed".to_string();
    manifest.updated_at = now_utc_string();
    manifest.counts = output.counts.clone();
    manifest.documents = output.documents.clone();
    manifest.warnings = warnings;
    write_json_pretty(&ingest_manifest_path, &manifest)?;

    info!(path = %ingest_manifest_path.display(), "wrote ingest run manifest");
    info!(
        documents = output.counts.processed_document_count,
        skipped = output.counts.skipped_document_count,
        values = output.counts.consolidated_value_count,
        findings = output.counts.finding_count,
        chunks = output.counts.text_chunk_count,
        artifacts = written.len(),
        "ingest completed"
    );

    Ok(())
}

fn missing_tool_warnings(tools: &ToolVersions, strategies: &[StrategyKind]) -> Vec<String> {
    let mut required = BTreeSet::new();
    for kind in strategies {
        match kind {
            StrategyKind::Layout | StrategyKind::Raw => {
                required.insert("pdftotext");
            }
            StrategyKind::Ocr => {
                required.extend(["pdfinfo", "pdftoppm", "tesseract"]);
            }
        }
    }

    let available = HashMap::from([
        ("pdftotext", tools.pdftotext.is_some()),
        ("pdfinfo", tools.pdfinfo.is_some()),
        ("pdftoppm", tools.pdftoppm.is_some()),
        ("tesseract", tools.tesseract.is_some()),
    ]);

    required
        .into_iter()
        .filter(|tool| !available.get(tool).copied().unwrap_or(false))
        .map(|tool| {
            warn!(tool, "external tool not found; dependent strategies will fail");
            format!("{tool} not found on PATH")
        })
        .collect()
}

fn render_ingest_command(args: &IngestArgs) -> String {
    let mut command = vec![
        "finrep".to_string(),
        "ingest".to_string(),
        "--input-dir".to_string(),
        args.input_dir.display().to_string(),
        "--output-dir".to_string(),
        args.output_dir.display().to_string(),
    ];

    if let Some(path) = &args.ingest_manifest_path {
        command.push("--ingest-manifest-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.db_path {
        command.push("--db-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.entity_map_path {
        command.push("--entity-map-path".to_string());
        command.push(path.display().to_string());
    }
    for kind in &args.strategies {
        command.push("--strategy".to_string());
        command.push(kind.as_str().to_string());
    }
    command.push("--default-year".to_string());
    command.push(args.default_year.to_string());
    command.push("--tolerance".to_string());
    command.push(args.tolerance.to_string());
    command.push("--fuzzy-threshold".to_string());
    command.push(args.fuzzy_threshold.to_string());
    command.push("--scale-window".to_string());
    command.push(args.scale_window.to_string());
    if args.strategies.is_empty() || args.strategies.contains(&StrategyKind::Ocr) {
        command.push("--ocr-lang".to_string());
        command.push(args.ocr_lang.clone());
        command.push("--ocr-max-pages".to_string());
        command.push(args.ocr_max_pages.to_string());
    }
    if args.emit_unmapped {
        command.push("--emit-unmapped".to_string());
    }

    command.join(" ")
}
