use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use regex::Regex;
use rusqlite::{Connection, params};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cli::{IngestArgs, StrategyKind};
use crate::commands::inventory;
use crate::model::{
    DocumentRunSummary, IngestCounts, IngestPaths, IngestRunManifest, StrategyAttemptRecord,
    ToolVersions,
};
use crate::util::{
    ensure_directory, now_utc_string, read_json, sha256_hex, utc_compact_string, write_csv,
    write_json_pretty,
};

const DB_SCHEMA_VERSION: &str = "0.1.0";

mod chunks;
mod classify;
mod consolidate;
mod features;
mod fields;
mod filename_meta;
mod mapper;
mod numeric;
mod orchestrator;
mod pattern_extract;
mod persist;
mod pipeline;
mod qa_checks;
mod registry;
mod run;
mod statements;
mod strategies;
mod table_extract;
#[cfg(test)]
mod tests;
mod types;

pub use filename_meta::FilenameMetadataParser;
pub use run::run;

use chunks::*;
use classify::*;
use consolidate::*;
use features::*;
use fields::*;
use mapper::*;
use numeric::*;
use orchestrator::*;
use pattern_extract::*;
use persist::*;
use pipeline::*;
use qa_checks::*;
use registry::*;
use statements::*;
use strategies::*;
use table_extract::*;
use types::*;
