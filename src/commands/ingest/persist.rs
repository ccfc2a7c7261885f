use super::*;

pub const FINDINGS_HEADER: [&str; 8] = [
    "entity_id",
    "year",
    "rule_id",
    "rule_name",
    "status",
    "severity",
    "details",
    "timestamp",
];
pub const NOTES_HEADER: [&str; 6] = ["entity_id", "year", "section", "chunk_id", "text", "length"];
pub const UNMAPPED_HEADER: [&str; 6] = ["entity", "year", "statement", "raw_label", "value", "source"];

/// Where each artifact of a run lands.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub income: PathBuf,
    pub balance: PathBuf,
    pub cashflow: PathBuf,
    pub findings: PathBuf,
    pub features: PathBuf,
    pub notes: PathBuf,
    pub unmapped: PathBuf,
}

impl ArtifactPaths {
    pub fn under(output_dir: &Path) -> Self {
        Self {
            income: output_dir.join("income.csv"),
            balance: output_dir.join("balance.csv"),
            cashflow: output_dir.join("cashflow.csv"),
            findings: output_dir.join("qa_findings.csv"),
            features: output_dir.join("features.csv"),
            notes: output_dir.join("notes.csv"),
            unmapped: output_dir.join("unmapped_labels.csv"),
        }
    }

    fn statement(&self, kind: StatementKind) -> Option<&Path> {
        match kind {
            StatementKind::Income => Some(&self.income),
            StatementKind::Balance => Some(&self.balance),
            StatementKind::Cashflow => Some(&self.cashflow),
            StatementKind::Unknown => None,
        }
    }
}

/// Empty cell for null.
pub fn format_value(value: Option<f64>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

pub fn statement_rows(table: &StatementTable) -> Vec<Vec<String>> {
    table
        .rows()
        .map(|(entity_id, year, values)| {
            let mut row = Vec::with_capacity(values.len() + 2);
            row.push(entity_id.to_string());
            row.push(year.to_string());
            row.extend(values.iter().copied().map(format_value));
            row
        })
        .collect()
}

pub fn write_statement_csv(path: &Path, table: &StatementTable) -> Result<()> {
    let mut header = vec!["entity_id", "year"];
    header.extend(table.columns().iter().copied());
    write_csv(path, &header, &statement_rows(table))
}

pub fn write_findings_csv(path: &Path, findings: &[Finding]) -> Result<()> {
    let rows = findings
        .iter()
        .map(|finding| {
            vec![
                finding.entity_id.clone(),
                finding.year.to_string(),
                finding.rule_id().to_string(),
                finding.rule_name().to_string(),
                Finding::STATUS_FAIL.to_string(),
                finding.severity.as_str().to_string(),
                finding.details.clone(),
                finding.timestamp.clone(),
            ]
        })
        .collect::<Vec<Vec<String>>>();
    write_csv(path, &FINDINGS_HEADER, &rows)
}

pub fn write_features_csv(path: &Path, features: &[FeatureRow]) -> Result<()> {
    let mut header = vec!["entity_id", "year"];
    header.extend(RATIO_COLUMNS);

    let rows = features
        .iter()
        .map(|feature| {
            let mut row = vec![feature.entity_id.clone(), feature.year.to_string()];
            row.extend(feature.values.iter().copied().map(format_value));
            row
        })
        .collect::<Vec<Vec<String>>>();
    write_csv(path, &header, &rows)
}

pub fn write_notes_csv(path: &Path, notes: &[NoteChunk]) -> Result<()> {
    let rows = notes
        .iter()
        .map(|note| {
            vec![
                note.entity_id.clone(),
                note.chunk.year.to_string(),
                note.chunk.section.clone(),
                note.chunk.chunk_id.clone(),
                note.chunk.text.clone(),
                note.chunk.length.to_string(),
            ]
        })
        .collect::<Vec<Vec<String>>>();
    write_csv(path, &NOTES_HEADER, &rows)
}

pub fn write_unmapped_csv(path: &Path, unmapped: &[FieldObservation]) -> Result<()> {
    let rows = unmapped
        .iter()
        .map(|observation| {
            vec![
                observation.entity.clone(),
                observation.year.to_string(),
                observation.statement.as_str().to_string(),
                observation.raw_label.clone(),
                format_value(observation.value),
                observation.source.as_str().to_string(),
            ]
        })
        .collect::<Vec<Vec<String>>>();
    write_csv(path, &UNMAPPED_HEADER, &rows)
}

pub fn write_csv_artifacts(
    paths: &ArtifactPaths,
    output: &PipelineOutput,
    emit_unmapped: bool,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    for table in output.statements.tables() {
        let Some(path) = paths.statement(table.kind()) else {
            continue;
        };
        write_statement_csv(path, table)?;
        info!(path = %path.display(), rows = table.len(), "wrote statement table");
        written.push(path.to_path_buf());
    }

    write_findings_csv(&paths.findings, &output.findings)?;
    written.push(paths.findings.clone());
    write_features_csv(&paths.features, &output.features)?;
    written.push(paths.features.clone());
    write_notes_csv(&paths.notes, &output.notes)?;
    written.push(paths.notes.clone());

    if emit_unmapped {
        write_unmapped_csv(&paths.unmapped, &output.unmapped)?;
        info!(
            path = %paths.unmapped.display(),
            rows = output.unmapped.len(),
            "wrote unmapped labels"
        );
        written.push(paths.unmapped.clone());
    }

    Ok(written)
}

/// Where a finished batch is written.
#[derive(Debug, Clone)]
pub struct OutputTargets {
    pub artifacts: ArtifactPaths,
    pub entity_map: PathBuf,
    pub db_path: PathBuf,
    pub emit_unmapped: bool,
}

/// Writes every artifact of a finished batch, reporting the persistence and
/// completion milestones through `progress`.
pub fn persist_batch(
    targets: &OutputTargets,
    output: &PipelineOutput,
    state: &BatchState,
    progress: &mut dyn FnMut(u8, &str),
) -> Result<Vec<PathBuf>> {
    progress(95, "Saving output files");
    let mut written = write_csv_artifacts(&targets.artifacts, output, targets.emit_unmapped)?;

    state.registry.save(&targets.entity_map)?;
    info!(
        path = %targets.entity_map.display(),
        entities = state.registry.len(),
        "wrote entity map"
    );
    written.push(targets.entity_map.clone());

    let mut connection = open_store(&targets.db_path)?;
    write_store(&mut connection, output, &state.registry, &state.consolidator)?;
    info!(path = %targets.db_path.display(), "updated sqlite store");
    written.push(targets.db_path.clone());

    progress(100, "Pipeline completed");
    Ok(written)
}

pub fn open_store(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        ensure_directory(parent)?;
    }

    let connection = Connection::open(db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;
    Ok(connection)
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

fn ensure_schema(connection: &Connection) -> Result<()> {
    connection.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS entities (
          entity_id TEXT PRIMARY KEY,
          name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS statement_values (
          entity_id TEXT NOT NULL,
          year INTEGER NOT NULL,
          statement TEXT NOT NULL,
          field TEXT NOT NULL,
          value REAL NOT NULL,
          source TEXT NOT NULL,
          PRIMARY KEY (entity_id, year, statement, field)
        );

        CREATE TABLE IF NOT EXISTS findings (
          entity_id TEXT NOT NULL,
          year INTEGER NOT NULL,
          rule_id TEXT NOT NULL,
          rule_name TEXT NOT NULL,
          status TEXT NOT NULL,
          severity TEXT NOT NULL,
          details TEXT NOT NULL,
          timestamp TEXT NOT NULL,
          PRIMARY KEY (entity_id, year, rule_id)
        );

        CREATE TABLE IF NOT EXISTS features (
          entity_id TEXT NOT NULL,
          year INTEGER NOT NULL,
          name TEXT NOT NULL,
          value REAL,
          PRIMARY KEY (entity_id, year, name)
        );

        CREATE TABLE IF NOT EXISTS text_chunks (
          chunk_id TEXT PRIMARY KEY,
          entity_id TEXT NOT NULL,
          year INTEGER NOT NULL,
          section TEXT NOT NULL,
          text TEXT NOT NULL,
          length INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_statement_values_entity_year
          ON statement_values(entity_id, year);
        CREATE INDEX IF NOT EXISTS idx_text_chunks_entity_year
          ON text_chunks(entity_id, year);
        ",
    )?;

    connection
        .execute(
            "
            CREATE VIRTUAL TABLE IF NOT EXISTS text_chunks_fts
            USING fts5(chunk_id, entity_id, section, text, content='text_chunks', content_rowid='rowid')
            ",
            [],
        )
        .context("failed to initialize FTS5 table text_chunks_fts")?;

    let now = now_utc_string();
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [now],
    )?;

    Ok(())
}

/// Mirrors one run into the store. Rows sharing a key with this run are
/// replaced; findings for every `(entity_id, year)` in the run are rewritten.
pub fn write_store(
    connection: &mut Connection,
    output: &PipelineOutput,
    registry: &EntityRegistry,
    consolidator: &Consolidator,
) -> Result<()> {
    let tx = connection.transaction()?;

    {
        let mut statement = tx.prepare(
            "
            INSERT INTO entities(entity_id, name) VALUES(?1, ?2)
            ON CONFLICT(entity_id) DO UPDATE SET name=excluded.name
            ",
        )?;
        for (name, entity_id) in registry.entries() {
            statement.execute(params![entity_id, name])?;
        }
    }

    {
        let mut statement = tx.prepare(
            "
            INSERT INTO statement_values(entity_id, year, statement, field, value, source)
            VALUES(?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(entity_id, year, statement, field) DO UPDATE SET
              value=excluded.value,
              source=excluded.source
            ",
        )?;
        for (key, value) in consolidator.values() {
            let source = consolidator
                .source_of(&key)
                .map(SourceStrategy::as_str)
                .unwrap_or("unknown");
            statement.execute(params![
                &key.entity_id,
                key.year,
                key.statement.as_str(),
                key.field,
                value,
                source
            ])?;
        }
    }

    {
        let mut clear = tx.prepare("DELETE FROM findings WHERE entity_id = ?1 AND year = ?2")?;
        for (entity_id, year) in output.statements.entity_years() {
            clear.execute(params![entity_id, year])?;
        }

        let mut statement = tx.prepare(
            "
            INSERT INTO findings(entity_id, year, rule_id, rule_name, status, severity, details, timestamp)
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(entity_id, year, rule_id) DO UPDATE SET
              rule_name=excluded.rule_name,
              status=excluded.status,
              severity=excluded.severity,
              details=excluded.details,
              timestamp=excluded.timestamp
            ",
        )?;
        for finding in &output.findings {
            statement.execute(params![
                &finding.entity_id,
                finding.year,
                finding.rule_id(),
                finding.rule_name(),
                Finding::STATUS_FAIL,
                finding.severity.as_str(),
                &finding.details,
                &finding.timestamp
            ])?;
        }
    }

    {
        let mut statement = tx.prepare(
            "
            INSERT INTO features(entity_id, year, name, value) VALUES(?1, ?2, ?3, ?4)
            ON CONFLICT(entity_id, year, name) DO UPDATE SET value=excluded.value
            ",
        )?;
        for feature in &output.features {
            for (name, value) in RATIO_COLUMNS.iter().zip(feature.values) {
                statement.execute(params![&feature.entity_id, feature.year, name, value])?;
            }
        }
    }

    {
        let mut statement = tx.prepare(
            "
            INSERT INTO text_chunks(chunk_id, entity_id, year, section, text, length)
            VALUES(?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(chunk_id) DO UPDATE SET
              entity_id=excluded.entity_id,
              year=excluded.year,
              section=excluded.section,
              text=excluded.text,
              length=excluded.length
            ",
        )?;
        for note in &output.notes {
            statement.execute(params![
                &note.chunk.chunk_id,
                &note.entity_id,
                note.chunk.year,
                &note.chunk.section,
                &note.chunk.text,
                note.chunk.length as i64
            ])?;
        }
    }

    tx.commit()?;
    sync_fts_index(connection)?;
    Ok(())
}

fn sync_fts_index(connection: &Connection) -> Result<()> {
    connection
        .execute(
            "INSERT INTO text_chunks_fts(text_chunks_fts) VALUES('rebuild')",
            [],
        )
        .context("failed to rebuild FTS index")?;
    Ok(())
}
