use super::*;

/// One raw cell grid as recovered from a document page, row-major.
pub type RawGrid = Vec<Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum StatementKind {
    Income,
    Balance,
    Cashflow,
    Unknown,
}

impl StatementKind {
    pub const CANONICAL: [StatementKind; 3] = [
        StatementKind::Income,
        StatementKind::Balance,
        StatementKind::Cashflow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StatementKind::Income => "income",
            StatementKind::Balance => "balance",
            StatementKind::Cashflow => "cashflow",
            StatementKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SourceStrategy {
    StructuredTable,
    PatternText,
}

impl SourceStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceStrategy::StructuredTable => "structured_table",
            SourceStrategy::PatternText => "pattern_text",
        }
    }

    /// Higher wins during consolidation.
    pub fn rank(self) -> u8 {
        match self {
            SourceStrategy::StructuredTable => 2,
            SourceStrategy::PatternText => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub entity: String,
    pub year: i32,
    pub page_count: usize,
}

impl Document {
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// A single (label, value) observation from one extractor, before and after
/// canonical mapping. Never mutated once the mapper has resolved it.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldObservation {
    pub entity: String,
    pub year: i32,
    pub statement: StatementKind,
    pub raw_label: String,
    pub canonical_field: Option<&'static str>,
    pub value: Option<f64>,
    pub source: SourceStrategy,
    pub provenance_rank: u8,
}

impl FieldObservation {
    pub fn new(
        entity: &str,
        year: i32,
        statement: StatementKind,
        raw_label: &str,
        value: Option<f64>,
        source: SourceStrategy,
    ) -> Self {
        Self {
            entity: entity.to_string(),
            year,
            statement,
            raw_label: raw_label.to_string(),
            canonical_field: None,
            value,
            source,
            provenance_rank: source.rank(),
        }
    }

    pub fn with_field(mut self, field: &'static str) -> Self {
        self.canonical_field = Some(field);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextChunk {
    pub entity: String,
    pub year: i32,
    pub section: String,
    pub chunk_id: String,
    pub text: String,
    pub length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub entity_id: String,
    pub year: i32,
    pub rule: QaRule,
    pub severity: Severity,
    pub details: String,
    pub timestamp: String,
}

impl Finding {
    pub const STATUS_FAIL: &'static str = "FAIL";

    pub fn rule_id(&self) -> &'static str {
        self.rule.id()
    }

    pub fn rule_name(&self) -> &'static str {
        self.rule.name()
    }
}

/// Run-wide failures that leave nothing to persist.
#[derive(Debug, thiserror::Error)]
pub enum BatchFailure {
    #[error("no eligible documents found in {dir}")]
    NoEligibleInput { dir: String },
    #[error("no text or tables could be extracted from any of {attempted} documents")]
    NoDataExtracted { attempted: usize },
}
