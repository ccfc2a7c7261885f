use super::*;

#[derive(Debug, Clone)]
pub struct StrategyAttempt {
    pub strategy: StrategyKind,
    pub outcome: &'static str,
    pub detail: Option<String>,
}

impl StrategyAttempt {
    pub fn to_record(&self) -> StrategyAttemptRecord {
        StrategyAttemptRecord {
            strategy: self.strategy.as_str().to_string(),
            outcome: self.outcome.to_string(),
            detail: self.detail.clone(),
        }
    }
}

/// Everything one document produced: the joined text, any grids, the
/// strategy that supplied them, and the trail of attempts.
#[derive(Debug, Clone)]
pub struct DocumentExtraction {
    pub document: Document,
    pub text: String,
    pub tables: Vec<RawGrid>,
    pub strategy: Option<StrategyKind>,
    pub attempts: Vec<StrategyAttempt>,
}

impl DocumentExtraction {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.tables.is_empty()
    }

    pub fn summary(&self, observation_count: usize) -> DocumentRunSummary {
        DocumentRunSummary {
            filename: self.document.filename(),
            entity: self.document.entity.clone(),
            year: self.document.year,
            page_count: self.document.page_count,
            strategy: self.strategy.map(|kind| kind.as_str().to_string()),
            attempts: self.attempts.iter().map(StrategyAttempt::to_record).collect(),
            table_count: self.tables.len(),
            observation_count,
            skipped: self.is_empty(),
        }
    }
}

/// Tries `order` front to back and stops at the first strategy that yields
/// text. Grids are only ever taken from that strategy.
pub fn extract_with_fallback(
    path: &Path,
    metadata: &FilenameMetadataParser,
    order: &[StrategyKind],
    mut attempt: impl FnMut(StrategyKind) -> StrategyOutcome,
) -> DocumentExtraction {
    let (entity, year) = metadata.parse(path);
    let mut extraction = DocumentExtraction {
        document: Document {
            path: path.to_path_buf(),
            entity,
            year,
            page_count: 0,
        },
        text: String::new(),
        tables: Vec::new(),
        strategy: None,
        attempts: Vec::new(),
    };

    for (position, kind) in order.iter().copied().enumerate() {
        if position > 0 {
            info!(
                path = %path.display(),
                strategy = kind.as_str(),
                "falling back to next extraction strategy"
            );
        }

        let outcome = attempt(kind);
        let label = outcome.label();
        match outcome {
            StrategyOutcome::Extracted(raw) => {
                extraction.attempts.push(StrategyAttempt {
                    strategy: kind,
                    outcome: label,
                    detail: None,
                });
                extraction.document.page_count = raw.page_count;
                extraction.text = raw.text();
                if kind.yields_grids() {
                    extraction.tables = raw.tables;
                }
                extraction.strategy = Some(kind);
                return extraction;
            }
            StrategyOutcome::Empty => {
                debug!(
                    path = %path.display(),
                    strategy = kind.as_str(),
                    "extraction strategy yielded no text"
                );
                extraction.attempts.push(StrategyAttempt {
                    strategy: kind,
                    outcome: label,
                    detail: None,
                });
            }
            StrategyOutcome::Failed(err) => {
                warn!(
                    path = %path.display(),
                    strategy = kind.as_str(),
                    error = %err,
                    "extraction strategy failed"
                );
                extraction.attempts.push(StrategyAttempt {
                    strategy: kind,
                    outcome: label,
                    detail: Some(format!("{err:#}")),
                });
            }
        }
    }

    warn!(
        path = %path.display(),
        attempts = extraction.attempts.len(),
        "no extraction strategy produced text; document will be skipped"
    );
    extraction
}

/// Binds the strategy list to the real poppler/tesseract backends.
#[derive(Debug)]
pub struct Orchestrator<'a> {
    config: &'a PipelineConfig,
    metadata: FilenameMetadataParser,
    detector: LayoutTableDetector,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a PipelineConfig) -> Result<Self> {
        Ok(Self {
            config,
            metadata: FilenameMetadataParser::new(config.default_year)?,
            detector: LayoutTableDetector::new()?,
        })
    }

    pub fn extract(&self, path: &Path) -> DocumentExtraction {
        extract_with_fallback(path, &self.metadata, &self.config.strategies, |kind| {
            attempt_strategy(kind, path, self.config, &self.detector)
        })
    }
}
