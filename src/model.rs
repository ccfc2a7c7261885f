use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub filename: String,
    pub entity: String,
    pub year: i32,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub document_count: usize,
    pub documents: Vec<DocumentEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolVersions {
    pub pdftotext: Option<String>,
    pub pdfinfo: Option<String>,
    pub pdftoppm: Option<String>,
    pub tesseract: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestPaths {
    pub input_dir: String,
    pub output_dir: String,
    pub manifest_dir: String,
    pub db_path: String,
    pub entity_map_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestCounts {
    pub document_count: usize,
    pub processed_document_count: usize,
    pub skipped_document_count: usize,
    pub table_count: usize,
    pub table_observation_count: usize,
    pub pattern_observation_count: usize,
    pub unmapped_observation_count: usize,
    pub consolidated_value_count: usize,
    pub overridden_value_count: usize,
    pub income_rows: usize,
    pub balance_rows: usize,
    pub cashflow_rows: usize,
    pub feature_rows: usize,
    pub finding_count: usize,
    pub high_severity_finding_count: usize,
    pub text_chunk_count: usize,
    pub entity_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyAttemptRecord {
    pub strategy: String,
    pub outcome: String,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRunSummary {
    pub filename: String,
    pub entity: String,
    pub year: i32,
    pub page_count: usize,
    pub strategy: Option<String>,
    pub attempts: Vec<StrategyAttemptRecord>,
    pub table_count: usize,
    pub observation_count: usize,
    pub skipped: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub db_schema_version: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub failure_reason: Option<String>,
    pub command: String,
    pub tool_versions: ToolVersions,
    pub paths: IngestPaths,
    pub counts: IngestCounts,
    pub source_hashes: Vec<DocumentEntry>,
    pub documents: Vec<DocumentRunSummary>,
    pub warnings: Vec<String>,
}
