use super::*;

/// Immutable knobs for one run, folded from the command line.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub strategies: Vec<StrategyKind>,
    pub ocr_lang: String,
    pub ocr_max_pages: usize,
    pub default_year: i32,
    pub tolerance: f64,
    pub fuzzy_threshold: f64,
    pub scale_window: usize,
    pub emit_unmapped: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strategies: StrategyKind::DEFAULT_ORDER.to_vec(),
            ocr_lang: "eng".to_string(),
            ocr_max_pages: 20,
            default_year: 2023,
            tolerance: 0.01,
            fuzzy_threshold: 0.85,
            scale_window: 500,
            emit_unmapped: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_args(args: &IngestArgs) -> Self {
        let mut strategies = Vec::new();
        for kind in &args.strategies {
            if !strategies.contains(kind) {
                strategies.push(*kind);
            }
        }
        if strategies.is_empty() {
            strategies = StrategyKind::DEFAULT_ORDER.to_vec();
        }

        Self {
            strategies,
            ocr_lang: args.ocr_lang.clone(),
            ocr_max_pages: args.ocr_max_pages,
            default_year: args.default_year,
            tolerance: args.tolerance,
            fuzzy_threshold: args.fuzzy_threshold,
            scale_window: args.scale_window,
            emit_unmapped: args.emit_unmapped,
        }
    }
}

/// The stateless per-document stages, compiled once per run.
#[derive(Debug)]
pub struct ExtractionEngine {
    pub tables: TableExtractor,
    pub patterns: PatternExtractor,
    pub mapper: FieldMapper,
    pub chunker: TextChunker,
    pub checker: ConsistencyChecker,
}

impl ExtractionEngine {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            tables: TableExtractor::new(),
            patterns: PatternExtractor::new(config.scale_window)?,
            mapper: FieldMapper::new(config.fuzzy_threshold)?,
            chunker: TextChunker::new()?,
            checker: ConsistencyChecker::new(config.tolerance),
        })
    }
}

/// State shared across every document of a batch. Only the batch driver
/// writes to it.
#[derive(Debug, Default)]
pub struct BatchState {
    pub registry: EntityRegistry,
    pub consolidator: Consolidator,
}

impl BatchState {
    pub fn new(registry: EntityRegistry) -> Self {
        Self {
            registry,
            consolidator: Consolidator::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteChunk {
    pub entity_id: String,
    pub chunk: TextChunk,
}

#[derive(Debug)]
pub struct PipelineOutput {
    pub statements: StatementSet,
    pub findings: Vec<Finding>,
    pub features: Vec<FeatureRow>,
    pub notes: Vec<NoteChunk>,
    pub unmapped: Vec<FieldObservation>,
    pub documents: Vec<DocumentRunSummary>,
    pub counts: IngestCounts,
}

#[derive(Debug, Default)]
struct DocumentYield {
    table_observations: usize,
    pattern_observations: usize,
    accepted: usize,
}

/// Maps and consolidates one document's observations, returning what it
/// contributed.
fn process_document(
    extraction: &DocumentExtraction,
    engine: &ExtractionEngine,
    state: &mut BatchState,
    notes: &mut Vec<NoteChunk>,
    unmapped: &mut Vec<FieldObservation>,
) -> DocumentYield {
    let document = &extraction.document;
    let table_observations =
        engine
            .tables
            .extract_tables(&extraction.tables, &document.entity, document.year);
    let pattern_observations =
        engine
            .patterns
            .extract_patterns(&extraction.text, &document.entity, document.year);

    let mut result = DocumentYield {
        table_observations: table_observations.len(),
        pattern_observations: pattern_observations.len(),
        accepted: 0,
    };

    for observation in table_observations.into_iter().chain(pattern_observations) {
        let observation = match observation.canonical_field {
            Some(_) => observation,
            None => match engine.mapper.map(&observation.raw_label, observation.statement) {
                Some(field) => observation.with_field(field),
                None => {
                    debug!(
                        entity = %observation.entity,
                        year = observation.year,
                        statement = observation.statement.as_str(),
                        label = %observation.raw_label,
                        "unmapped label dropped"
                    );
                    unmapped.push(observation);
                    continue;
                }
            },
        };

        if state.consolidator.offer(&observation, &mut state.registry) {
            result.accepted += 1;
        }
    }

    let entity_id = state.registry.resolve(&document.entity);
    notes.extend(
        engine
            .chunker
            .chunk(&extraction.text, &document.entity, document.year)
            .into_iter()
            .map(|chunk| NoteChunk {
                entity_id: entity_id.clone(),
                chunk,
            }),
    );

    result
}

/// Drives the whole batch: per-document extraction through consolidation,
/// then statements, consistency checks and ratios.
pub fn run_batch(
    source_dir: &Path,
    paths: &[PathBuf],
    engine: &ExtractionEngine,
    state: &mut BatchState,
    extract: &mut dyn FnMut(&Path) -> DocumentExtraction,
    progress: &mut dyn FnMut(u8, &str),
) -> Result<PipelineOutput, BatchFailure> {
    progress(5, "Initializing pipeline");
    if paths.is_empty() {
        return Err(BatchFailure::NoEligibleInput {
            dir: source_dir.display().to_string(),
        });
    }

    progress(10, "Starting document processing");
    progress(15, &format!("Processing {} documents", paths.len()));

    let mut counts = IngestCounts {
        document_count: paths.len(),
        ..IngestCounts::default()
    };
    let mut notes = Vec::new();
    let mut unmapped = Vec::new();
    let mut documents = Vec::with_capacity(paths.len());

    for (index, path) in paths.iter().enumerate() {
        let percent = 15 + (index * 30 / paths.len()) as u8;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        progress(percent, &format!("Processing {filename}"));

        let extraction = extract(path);
        if extraction.is_empty() {
            counts.skipped_document_count += 1;
            documents.push(extraction.summary(0));
            continue;
        }

        let produced = process_document(&extraction, engine, state, &mut notes, &mut unmapped);
        counts.processed_document_count += 1;
        counts.table_count += extraction.tables.len();
        counts.table_observation_count += produced.table_observations;
        counts.pattern_observation_count += produced.pattern_observations;

        info!(
            path = %path.display(),
            entity = %extraction.document.entity,
            year = extraction.document.year,
            strategy = extraction.strategy.map(StrategyKind::as_str).unwrap_or("none"),
            tables = extraction.tables.len(),
            observations = produced.accepted,
            "processed document"
        );
        documents.push(extraction.summary(produced.accepted));
    }

    if counts.processed_document_count == 0 {
        return Err(BatchFailure::NoDataExtracted {
            attempted: paths.len(),
        });
    }

    progress(50, "Normalizing and structuring data");
    let consolidated = state.consolidator.values();
    let statements = build_statements(&consolidated);

    progress(65, "Running consistency checks");
    let findings = engine.checker.check(&statements);

    progress(75, "Calculating financial features and ratios");
    let features = feature_table(&statements);

    progress(85, "Summarizing batch results");
    if !unmapped.is_empty() {
        info!(count = unmapped.len(), "labels left unmapped");
    }

    counts.unmapped_observation_count = unmapped.len();
    counts.consolidated_value_count = consolidated.len();
    counts.overridden_value_count = state.consolidator.overridden_count();
    counts.income_rows = statements.income.len();
    counts.balance_rows = statements.balance.len();
    counts.cashflow_rows = statements.cashflow.len();
    counts.feature_rows = features.len();
    counts.finding_count = findings.len();
    counts.high_severity_finding_count = findings
        .iter()
        .filter(|finding| finding.severity == Severity::High)
        .count();
    counts.text_chunk_count = notes.len();
    counts.entity_count = state.registry.len();

    Ok(PipelineOutput {
        statements,
        findings,
        features,
        notes,
        unmapped,
        documents,
        counts,
    })
}
