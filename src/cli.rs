use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "finrep",
    version,
    about = "Annual-report extraction and financial statement normalization"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Inventory(InventoryArgs),
    Ingest(IngestArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[arg(long, default_value = "data/pdfs")]
    pub input_dir: PathBuf,

    #[arg(long, default_value = "data/output")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = 2023)]
    pub default_year: i32,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    #[arg(long, default_value = "data/pdfs")]
    pub input_dir: PathBuf,

    #[arg(long, default_value = "data/output")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub ingest_manifest_path: Option<PathBuf>,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub entity_map_path: Option<PathBuf>,

    /// Extraction strategies in priority order; later ones run only when
    /// earlier ones fail or yield no text.
    #[arg(long = "strategy", value_enum)]
    pub strategies: Vec<StrategyKind>,

    #[arg(long, default_value = "eng")]
    pub ocr_lang: String,

    #[arg(long, default_value_t = 20)]
    pub ocr_max_pages: usize,

    #[arg(long, default_value_t = 2023)]
    pub default_year: i32,

    #[arg(long, default_value_t = 0.01)]
    pub tolerance: f64,

    #[arg(long, default_value_t = 0.85)]
    pub fuzzy_threshold: f64,

    #[arg(long, default_value_t = 500)]
    pub scale_window: usize,

    #[arg(long, default_value_t = false)]
    pub emit_unmapped: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, ValueEnum)]
pub enum StrategyKind {
    Layout,
    Ocr,
    Raw,
}

impl StrategyKind {
    pub const DEFAULT_ORDER: [StrategyKind; 3] =
        [StrategyKind::Layout, StrategyKind::Ocr, StrategyKind::Raw];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Layout => "layout",
            Self::Ocr => "ocr",
            Self::Raw => "raw",
        }
    }

    /// Only the layout-preserving text layer keeps enough column alignment
    /// to recover cell grids.
    pub fn yields_grids(self) -> bool {
        matches!(self, Self::Layout)
    }
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = "data/output")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}
