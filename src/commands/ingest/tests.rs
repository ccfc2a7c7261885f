use std::cell::Cell;

use super::*;

fn grid(rows: &[&[&str]]) -> RawGrid {
    rows.iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect()
}

fn key(entity_id: &str, year: i32, statement: StatementKind, field: &'static str) -> CanonicalKey {
    CanonicalKey {
        entity_id: entity_id.to_string(),
        year,
        statement,
        field,
    }
}

fn statements_from(values: &[(i32, StatementKind, &'static str, f64)]) -> StatementSet {
    let consolidated = values
        .iter()
        .map(|(year, statement, field, value)| {
            (key("ent-test", *year, *statement, *field), *value)
        })
        .collect::<BTreeMap<CanonicalKey, f64>>();
    build_statements(&consolidated)
}

fn rule_count(findings: &[Finding], rule_id: &str) -> usize {
    findings
        .iter()
        .filter(|finding| finding.rule_id() == rule_id)
        .count()
}

fn observation(value: f64, source: SourceStrategy) -> FieldObservation {
    FieldObservation::new("Acme", 2023, StatementKind::Income, "Revenue", Some(value), source)
        .with_field("revenue")
}

fn pattern_values(text: &str, statement: StatementKind) -> BTreeMap<&'static str, f64> {
    PatternExtractor::new(500)
        .expect("patterns")
        .extract_patterns(text, "Acme", 2023)
        .into_iter()
        .filter(|observation| observation.statement == statement)
        .filter_map(|observation| Some((observation.canonical_field?, observation.value?)))
        .collect()
}

fn extracted(pages: &[&str], tables: Vec<RawGrid>) -> StrategyOutcome {
    StrategyOutcome::Extracted(RawExtraction {
        pages: pages.iter().map(|page| page.to_string()).collect(),
        tables,
        page_count: pages.len(),
    })
}

#[test]
fn clean_numeric_reads_accounting_negatives() {
    assert_eq!(clean_numeric("(1,234.5)"), Some(-1234.5));
    assert_eq!(clean_numeric("$ (1,234.5)"), Some(-1234.5));
    assert_eq!(clean_numeric("\u{2212}45"), Some(-45.0));
    assert_eq!(clean_numeric("€1,000,000"), Some(1_000_000.0));
    assert_eq!(clean_numeric("12.5%"), Some(12.5));
}

#[test]
fn clean_numeric_maps_sentinels_and_noise_to_none() {
    for raw in ["n/a", "N/A", "—", "–", "-", "nil", "none", "", "   ", "abc"] {
        assert_eq!(clean_numeric(raw), None, "{raw:?}");
    }
}

#[test]
fn detect_scale_prefers_largest_nearby_unit() {
    let text = "Figures in thousands unless stated. Revenue 10";
    let start = text.find("Revenue").expect("label present");
    assert_eq!(detect_scale(text, start, text.len(), 500), 1_000.0);
    assert_eq!(detect_scale("Revenue 10", 0, 10, 500), 1.0);
    assert_eq!(
        detect_scale("in millions, or billions", 0, 2, 500),
        1_000_000_000.0
    );

    let far = format!("in millions{}Revenue 10", " ".repeat(40));
    let start = far.find("Revenue").expect("label present");
    assert_eq!(detect_scale(&far, start, far.len(), 5), 1.0);
}

#[test]
fn mapper_resolves_exact_synonyms() {
    let mapper = FieldMapper::new(0.85).expect("mapper");

    assert_eq!(mapper.map("Total Revenue", StatementKind::Income), Some("revenue"));
    assert_eq!(
        mapper.map("  NET   income (Note 4) ", StatementKind::Income),
        Some("net_income")
    );
    assert_eq!(mapper.map("Total assets", StatementKind::Balance), Some("total_assets"));
    assert_eq!(
        mapper.map("Net cash from operating activities", StatementKind::Cashflow),
        Some("cfo")
    );
    assert_eq!(mapper.map("Total Revenue", StatementKind::Unknown), None);
}

#[test]
fn mapper_round_trips_every_catalog_synonym() {
    let mapper = FieldMapper::new(0.85).expect("mapper");

    for kind in StatementKind::CANONICAL {
        for field in fields_for(kind) {
            for synonym in field.synonyms {
                assert_eq!(
                    mapper.map(synonym, kind),
                    Some(field.name),
                    "{} synonym {synonym:?}",
                    kind.as_str()
                );
            }
        }
    }
}

#[test]
fn mapper_prefers_longest_embedded_synonym() {
    let mapper = FieldMapper::new(0.85).expect("mapper");

    assert_eq!(
        mapper.map("Non-current assets, net", StatementKind::Balance),
        Some("total_noncurrent_assets")
    );
    assert_eq!(
        mapper.map("Cost of sales and services", StatementKind::Income),
        Some("cost_of_goods_sold")
    );
    assert_eq!(
        mapper.map("Diluted earnings per share (cents)", StatementKind::Income),
        Some("eps_diluted")
    );
}

#[test]
fn mapper_falls_back_to_fuzzy_similarity() {
    let mapper = FieldMapper::new(0.85).expect("mapper");

    match mapper.resolve("Revenu", StatementKind::Income) {
        Some(FieldMatch::Fuzzy { field, score }) => {
            assert_eq!(field, "revenue");
            assert!(score >= 0.85);
        }
        other => panic!("expected fuzzy match, got {other:?}"),
    }

    assert_eq!(mapper.map("Employee headcount", StatementKind::Income), None);
}

#[test]
fn similarity_ratio_counts_matching_blocks() {
    assert_eq!(similarity_ratio("abc", "abc"), 1.0);
    assert_eq!(similarity_ratio("abcd", "bcde"), 0.75);
    assert_eq!(similarity_ratio("", ""), 1.0);
    assert_eq!(similarity_ratio("abc", "xyz"), 0.0);
}

#[test]
fn classifier_uses_fixed_vocabulary_order() {
    assert_eq!(
        classify_statement("Consolidated Statement of Cash Flows"),
        StatementKind::Cashflow
    );
    assert_eq!(
        classify_statement("Balance sheet items affecting net income"),
        StatementKind::Balance
    );
    assert_eq!(
        classify_statement("Cash flow impact on total assets"),
        StatementKind::Cashflow
    );
    assert_eq!(classify_statement("Total Revenue"), StatementKind::Income);
}

#[test]
fn classifier_secondary_heuristic_and_unknown() {
    assert_eq!(classify_statement("Equity and liabilities"), StatementKind::Balance);
    assert_eq!(classify_statement("Revenue net of returns"), StatementKind::Income);
    assert_eq!(classify_statement("Chairman's letter"), StatementKind::Unknown);
}

#[test]
fn filename_metadata_follows_pattern_order() {
    let parser = FilenameMetadataParser::new(2019).expect("parser");

    assert_eq!(
        parser.parse(Path::new("data/pdfs/Acme_2023_annual.pdf")),
        ("Acme".to_string(), 2023)
    );
    assert_eq!(
        parser.parse(Path::new("globex-2021.pdf")),
        ("Globex".to_string(), 2021)
    );
    assert_eq!(
        parser.parse(Path::new("big-corp_10k_2022.pdf")),
        ("Big Corp".to_string(), 2022)
    );
    assert_eq!(
        parser.parse(Path::new("Initech_annual_report.pdf")),
        ("Initech".to_string(), 2019)
    );
}

#[test]
fn table_extractor_assigns_successive_years_to_columns() {
    let table = grid(&[
        &["Income Statement", "2023", "2024"],
        &["Total Revenue", "1,000,000", "1,200,000"],
    ]);

    let observations = TableExtractor::new().extract_table(&table, "Acme", 2023);
    let revenue = observations
        .iter()
        .filter(|observation| observation.raw_label == "Total Revenue")
        .collect::<Vec<&FieldObservation>>();

    assert_eq!(revenue.len(), 2);
    assert_eq!((revenue[0].year, revenue[0].value), (2023, Some(1_000_000.0)));
    assert_eq!((revenue[1].year, revenue[1].value), (2024, Some(1_200_000.0)));
    for observation in &revenue {
        assert_eq!(observation.entity, "Acme");
        assert_eq!(observation.statement, StatementKind::Income);
        assert_eq!(observation.source, SourceStrategy::StructuredTable);
        assert_eq!(observation.canonical_field, None);
    }
}

#[test]
fn table_extractor_single_value_rows_keep_base_year() {
    let table = grid(&[&["Balance Sheet", ""], &["Total assets", "$ 5,000"]]);

    let observations = TableExtractor::new().extract_table(&table, "Acme", 2023);
    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].year, 2023);
    assert_eq!(observations[0].statement, StatementKind::Balance);
    assert_eq!(observations[0].value, Some(5_000.0));
}

#[test]
fn table_extractor_rejects_small_or_non_financial_tables() {
    let extractor = TableExtractor::new();

    let single_row = grid(&[&["Total Revenue", "1,000"]]);
    assert!(extractor.extract_table(&single_row, "Acme", 2023).is_empty());

    let unrelated = grid(&[&["Alpha", "Beta"], &["Gamma", "Delta"]]);
    assert!(!is_financial_table("alpha beta gamma delta"));
    assert!(extractor.extract_table(&unrelated, "Acme", 2023).is_empty());

    let numeric_only = grid(&[&["Total", "12"], &["Other", "7"]]);
    let observations = extractor.extract_table(&numeric_only, "Acme", 2023);
    assert!(
        observations
            .iter()
            .all(|observation| observation.statement == StatementKind::Income)
    );
    assert_eq!(observations.len(), 2);
}

#[test]
fn layout_detector_recovers_aligned_grid_with_header() {
    let detector = LayoutTableDetector::new().expect("detector");
    let page = "Consolidated Income Statement\n\n\
                Revenue            1,000      900\n\
                Cost of sales      (400)     (350)\n\
                Net income           250      200\n\n\
                Some narrative text here.\n";

    let grids = detector.detect(page);
    assert_eq!(grids.len(), 1);
    assert_eq!(grids[0].len(), 4);
    assert_eq!(grids[0][0], vec!["Consolidated Income Statement".to_string()]);
    assert_eq!(
        grids[0][1],
        vec!["Revenue".to_string(), "1,000".to_string(), "900".to_string()]
    );
}

#[test]
fn pattern_extractor_applies_scale_words() {
    let extractor = PatternExtractor::new(500).expect("patterns");
    let observations = extractor.extract_patterns("Net income $5 million", "Acme", 2023);

    let net_income = observations
        .iter()
        .find(|observation| {
            observation.statement == StatementKind::Income
                && observation.canonical_field == Some("net_income")
        })
        .expect("net income observation");
    assert_eq!(net_income.value, Some(5_000_000.0));
    assert_eq!(net_income.source, SourceStrategy::PatternText);
    assert_eq!(net_income.year, 2023);
}

#[test]
fn pattern_extractor_keeps_first_match_per_field() {
    let extractor = PatternExtractor::new(500).expect("patterns");
    let text = "Total revenue 120\nLater restated: total revenue 999";

    let revenue = extractor
        .extract_patterns(text, "Acme", 2023)
        .into_iter()
        .filter(|observation| observation.canonical_field == Some("revenue"))
        .collect::<Vec<FieldObservation>>();
    assert_eq!(revenue.len(), 1);
    assert_eq!(revenue[0].value, Some(120.0));
}

#[test]
fn pattern_extractor_credits_the_longer_synonym() {
    let balance = pattern_values("Common stock 100\nInventory 50", StatementKind::Balance);
    assert_eq!(balance.get("share_capital"), Some(&100.0));
    assert_eq!(balance.get("inventory"), Some(&50.0));

    let income = pattern_values("Cost of sales 400\nRevenue 1,000", StatementKind::Income);
    assert_eq!(income.get("cost_of_goods_sold"), Some(&400.0));
    assert_eq!(income.get("revenue"), Some(&1_000.0));
}

#[test]
fn pattern_extractor_skips_annotations_between_label_and_value() {
    let income = |text: &str| pattern_values(text, StatementKind::Income);

    assert_eq!(income("Revenue (in millions) 5").get("revenue"), Some(&5_000_000.0));
    assert_eq!(income("Net income (Note 4) 120").get("net_income"), Some(&120.0));
    assert_eq!(income("Revenue (2023) 1,000").get("revenue"), Some(&1_000.0));
    assert_eq!(income("Net income (1,234)").get("net_income"), Some(&-1_234.0));
    assert_eq!(
        income("Net income - $5 million").get("net_income"),
        Some(&5_000_000.0)
    );
    assert_eq!(income("Net income -42").get("net_income"), Some(&-42.0));
}

#[test]
fn consolidation_prefers_structured_table_in_either_order() {
    let table = observation(1_000.0, SourceStrategy::StructuredTable);
    let pattern = observation(900.0, SourceStrategy::PatternText);

    for ordered in [
        vec![table.clone(), pattern.clone()],
        vec![pattern.clone(), table.clone()],
    ] {
        let mut registry = EntityRegistry::default();
        let consolidated = consolidate(&ordered, &mut registry);
        let entity_id = registry.get("Acme").expect("entity id").to_string();

        assert_eq!(consolidated.len(), 1);
        assert_eq!(
            consolidated.get(&key(&entity_id, 2023, StatementKind::Income, "revenue")),
            Some(&1_000.0)
        );
    }
}

#[test]
fn consolidation_is_first_write_wins_among_equal_ranks() {
    let mut registry = EntityRegistry::default();
    let mut consolidator = Consolidator::new();

    assert!(consolidator.offer(&observation(1.0, SourceStrategy::PatternText), &mut registry));
    assert!(!consolidator.offer(&observation(2.0, SourceStrategy::PatternText), &mut registry));
    assert!(consolidator.offer(
        &observation(3.0, SourceStrategy::StructuredTable),
        &mut registry
    ));
    assert!(!consolidator.offer(
        &observation(4.0, SourceStrategy::StructuredTable),
        &mut registry
    ));

    assert_eq!(consolidator.overridden_count(), 1);
    assert_eq!(consolidator.values().values().copied().collect::<Vec<f64>>(), vec![3.0]);
}

#[test]
fn consolidation_skips_unmapped_and_unknown_observations() {
    let mut registry = EntityRegistry::default();
    let unmapped = FieldObservation::new(
        "Acme",
        2023,
        StatementKind::Income,
        "Mystery",
        Some(1.0),
        SourceStrategy::StructuredTable,
    );
    let unknown = FieldObservation::new(
        "Acme",
        2023,
        StatementKind::Unknown,
        "Revenue",
        Some(1.0),
        SourceStrategy::StructuredTable,
    )
    .with_field("revenue");
    let valueless = FieldObservation::new(
        "Acme",
        2023,
        StatementKind::Income,
        "Revenue",
        None,
        SourceStrategy::StructuredTable,
    )
    .with_field("revenue");

    assert!(consolidate(&[unmapped, unknown, valueless], &mut registry).is_empty());
}

#[test]
fn consolidation_is_idempotent() {
    let observations = vec![
        observation(5.0, SourceStrategy::PatternText),
        FieldObservation::new(
            "Globex",
            2022,
            StatementKind::Balance,
            "Total assets",
            Some(10.0),
            SourceStrategy::StructuredTable,
        )
        .with_field("total_assets"),
        observation(7.0, SourceStrategy::StructuredTable),
    ];

    let mut registry = EntityRegistry::default();
    let first = consolidate(&observations, &mut registry);
    let second = consolidate(&observations, &mut registry);
    assert_eq!(first, second);

    let mut fresh = EntityRegistry::default();
    assert_eq!(first, consolidate(&observations, &mut fresh));
}

#[test]
fn statement_tables_keep_every_column() {
    let statements = statements_from(&[(2023, StatementKind::Balance, "total_assets", 10.0)]);

    assert_eq!(statements.balance.columns(), field_names(StatementKind::Balance).as_slice());
    assert_eq!(statements.income.columns(), field_names(StatementKind::Income).as_slice());
    assert_eq!(statements.income.len(), 0);
    assert_eq!(statements.balance.len(), 1);

    let rows = statement_rows(&statements.balance);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].len(), statements.balance.columns().len() + 2);
    assert_eq!(&rows[0][..2], &["ent-test".to_string(), "2023".to_string()]);

    let populated = rows[0].iter().skip(2).filter(|cell| !cell.is_empty()).count();
    assert_eq!(populated, 1);
    assert_eq!(statements.balance.get("ent-test", 2023, "total_assets"), Some(10.0));
    assert_eq!(statements.balance.get("ent-test", 2023, "inventory"), None);
}

#[test]
fn balance_equation_holds_for_balanced_sheet() {
    let statements = statements_from(&[
        (2023, StatementKind::Balance, "total_assets", 1_000.0),
        (2023, StatementKind::Balance, "total_liabilities", 600.0),
        (2023, StatementKind::Balance, "total_equity", 400.0),
    ]);

    let findings = ConsistencyChecker::new(0.01).check(&statements);
    assert_eq!(rule_count(&findings, "BS001"), 0);
}

#[test]
fn balance_equation_flags_perturbed_assets_once() {
    let statements = statements_from(&[
        (2023, StatementKind::Balance, "total_assets", 1_020.0),
        (2023, StatementKind::Balance, "total_liabilities", 600.0),
        (2023, StatementKind::Balance, "total_equity", 400.0),
    ]);

    let findings = ConsistencyChecker::new(0.01).check(&statements);
    let balance = findings
        .iter()
        .filter(|finding| finding.rule_id() == "BS001")
        .collect::<Vec<&Finding>>();

    assert_eq!(balance.len(), 1);
    assert_eq!(balance[0].severity, Severity::High);
    assert_eq!(balance[0].rule_name(), "Assets = Liabilities + Equity");
    assert_eq!(balance[0].entity_id, "ent-test");
    assert_eq!(balance[0].year, 2023);
}

#[test]
fn prior_year_rules_skip_when_prior_is_missing() {
    let lone_year = statements_from(&[
        (2024, StatementKind::Income, "revenue", 50.0),
        (2024, StatementKind::Income, "net_income", 10.0),
        (2024, StatementKind::Balance, "retained_earnings", 500.0),
    ]);
    let findings = ConsistencyChecker::new(0.01).check(&lone_year);
    assert_eq!(rule_count(&findings, "IS002"), 0);
    assert_eq!(rule_count(&findings, "IS001"), 0);

    let two_years = statements_from(&[
        (2023, StatementKind::Income, "revenue", 100.0),
        (2024, StatementKind::Income, "revenue", 50.0),
    ]);
    let findings = ConsistencyChecker::new(0.01).check(&two_years);
    let declines = findings
        .iter()
        .filter(|finding| finding.rule_id() == "IS002")
        .collect::<Vec<&Finding>>();
    assert_eq!(declines.len(), 1);
    assert_eq!(declines[0].year, 2024);
}

#[test]
fn cash_rules_and_catalog_order() {
    let statements = statements_from(&[
        (2023, StatementKind::Income, "net_income", 100.0),
        (2023, StatementKind::Cashflow, "cfo", -20.0),
        (2023, StatementKind::Cashflow, "net_change_in_cash", -5.0),
    ]);

    let findings = ConsistencyChecker::new(0.01).check(&statements);
    let ids = findings
        .iter()
        .map(|finding| finding.rule_id())
        .collect::<Vec<&str>>();
    assert_eq!(ids, vec!["CF002", "CF003", "CF004"]);
    assert!(findings.iter().all(|finding| finding.timestamp.ends_with('Z')));
}

#[test]
fn missing_key_data_is_low_severity() {
    let statements = statements_from(&[(2023, StatementKind::Balance, "inventory", 3.0)]);

    let findings = ConsistencyChecker::new(0.01).check(&statements);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].rule_id(), "MISC001");
    assert_eq!(findings[0].severity, Severity::Low);
}

#[test]
fn ratios_never_divide_by_zero() {
    assert_eq!(ratio(Some(1.0), Some(0.0)), None);
    assert_eq!(ratio(None, Some(2.0)), None);
    assert_eq!(ratio(Some(2.0), None), None);
    assert_eq!(ratio(Some(1.0), Some(4.0)), Some(0.25));

    let statements = statements_from(&[
        (2023, StatementKind::Balance, "total_current_assets", 200.0),
        (2023, StatementKind::Balance, "total_current_liabilities", 0.0),
        (2024, StatementKind::Balance, "total_current_assets", 200.0),
        (2024, StatementKind::Balance, "total_current_liabilities", 100.0),
        (2024, StatementKind::Balance, "accounts_receivable", 50.0),
        (2024, StatementKind::Income, "revenue", 365.0),
    ]);

    let features = feature_table(&statements);
    assert_eq!(features.len(), 2);
    assert_eq!(features[0].get("current_ratio"), None);
    assert_eq!(features[1].get("current_ratio"), Some(2.0));
    assert_eq!(features[1].get("quick_ratio"), None);
    assert_eq!(features[1].get("receivable_days"), Some(50.0));
}

#[test]
fn chunker_splits_anchored_sections_and_general_paragraphs() {
    let chunker = TextChunker::new().expect("chunker");

    let anchored = "Risk Factors\nCompetition may intensify next year.";
    let chunks = chunker.chunk(anchored, "Acme", 2023);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].section, "Risk Factors");
    assert_eq!(chunks[0].chunk_id, "Acme_2023_0_0");
    assert_eq!(chunks[0].length, anchored.chars().count());

    let long_paragraph = "word ".repeat(30);
    let general = format!("Short intro.\n\n{}", long_paragraph.trim());
    let chunks = chunker.chunk(&general, "Acme", 2023);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].section, "General");
    assert_eq!(chunks[0].chunk_id, "Acme_2023_general_1");

    assert!(chunker.chunk("   ", "Acme", 2023).is_empty());
}

#[test]
fn orchestrator_falls_back_until_text_appears() {
    let metadata = FilenameMetadataParser::new(2023).expect("metadata");
    let table = grid(&[&["Revenue", "1"], &["Net income", "2"]]);

    let extraction = extract_with_fallback(
        Path::new("Acme_2023_annual.pdf"),
        &metadata,
        &StrategyKind::DEFAULT_ORDER,
        |kind| match kind {
            StrategyKind::Layout => StrategyOutcome::Failed(anyhow::anyhow!("pdftotext missing")),
            StrategyKind::Ocr => StrategyOutcome::Empty,
            StrategyKind::Raw => extracted(&["Revenue 1"], vec![table.clone()]),
        },
    );

    assert_eq!(extraction.strategy, Some(StrategyKind::Raw));
    assert_eq!(
        extraction
            .attempts
            .iter()
            .map(|attempt| attempt.outcome)
            .collect::<Vec<&str>>(),
        vec!["failed", "empty", "extracted"]
    );
    assert!(extraction.attempts[0].detail.is_some());
    assert!(extraction.tables.is_empty());
    assert_eq!(extraction.text, "Revenue 1");
    assert_eq!(extraction.document.entity, "Acme");
}

#[test]
fn orchestrator_stops_at_first_success_and_skips_when_all_fail() {
    let metadata = FilenameMetadataParser::new(2023).expect("metadata");
    let calls = Cell::new(0);

    let extraction = extract_with_fallback(
        Path::new("Acme_2023_annual.pdf"),
        &metadata,
        &StrategyKind::DEFAULT_ORDER,
        |_| {
            calls.set(calls.get() + 1);
            extracted(&["page one", "page two"], vec![grid(&[&["a", "1"], &["b", "2"]])])
        },
    );
    assert_eq!(calls.get(), 1);
    assert_eq!(extraction.strategy, Some(StrategyKind::Layout));
    assert_eq!(extraction.tables.len(), 1);
    assert_eq!(extraction.document.page_count, 2);
    assert_eq!(extraction.text, "page one\n\npage two");

    let failed = extract_with_fallback(
        Path::new("Acme_2023_annual.pdf"),
        &metadata,
        &StrategyKind::DEFAULT_ORDER,
        |_| StrategyOutcome::Failed(anyhow::anyhow!("unreadable")),
    );
    assert!(failed.is_empty());
    assert_eq!(failed.strategy, None);
    assert!(failed.summary(0).skipped);
}

#[test]
fn batch_extracts_multi_year_table_end_to_end() {
    let config = PipelineConfig::default();
    let engine = ExtractionEngine::new(&config).expect("engine");
    let metadata = FilenameMetadataParser::new(config.default_year).expect("metadata");
    let mut state = BatchState::default();
    let table = grid(&[
        &["Income Statement", "2023", "2024"],
        &["Total Revenue", "1,000,000", "1,200,000"],
    ]);
    let paths = vec![PathBuf::from("Acme_2023_annual.pdf")];
    let mut percents = Vec::new();

    let output = run_batch(
        Path::new("data/pdfs"),
        &paths,
        &engine,
        &mut state,
        &mut |path: &Path| {
            extract_with_fallback(path, &metadata, &[StrategyKind::Layout], |_| {
                extracted(
                    &["Acme Annual Report 2023", "Income Statement"],
                    vec![table.clone()],
                )
            })
        },
        &mut |percent: u8, _: &str| percents.push(percent),
    )
    .expect("batch succeeds");

    let entity_id = state.registry.get("Acme").expect("entity registered").to_string();
    assert_eq!(
        output.statements.income.get(&entity_id, 2023, "revenue"),
        Some(1_000_000.0)
    );
    assert_eq!(
        output.statements.income.get(&entity_id, 2024, "revenue"),
        Some(1_200_000.0)
    );
    for year in [2023, 2024] {
        assert_eq!(
            state
                .consolidator
                .source_of(&key(&entity_id, year, StatementKind::Income, "revenue")),
            Some(SourceStrategy::StructuredTable)
        );
    }

    assert_eq!(output.counts.processed_document_count, 1);
    assert_eq!(output.documents[0].strategy.as_deref(), Some("layout"));
    assert_eq!(percents.first(), Some(&5));
    assert_eq!(percents.last(), Some(&85));
    assert!(percents.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn batch_reports_every_milestone_through_persistence() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = PipelineConfig::default();
    let engine = ExtractionEngine::new(&config).expect("engine");
    let metadata = FilenameMetadataParser::new(config.default_year).expect("metadata");
    let mut state = BatchState::default();
    let paths = vec![PathBuf::from("Acme_2023_annual.pdf")];
    let mut milestones = Vec::new();
    let mut record = |percent: u8, message: &str| milestones.push((percent, message.to_string()));

    let output = run_batch(
        Path::new("data/pdfs"),
        &paths,
        &engine,
        &mut state,
        &mut |path: &Path| {
            extract_with_fallback(path, &metadata, &[StrategyKind::Raw], |_| {
                extracted(&["Net income $5 million"], Vec::new())
            })
        },
        &mut record,
    )
    .expect("batch succeeds");

    let targets = OutputTargets {
        artifacts: ArtifactPaths::under(dir.path()),
        entity_map: dir.path().join("entity_map.json"),
        db_path: dir.path().join("finrep.sqlite"),
        emit_unmapped: true,
    };
    let written = persist_batch(&targets, &output, &state, &mut record).expect("persist");

    let percents = milestones
        .iter()
        .map(|(percent, _)| *percent)
        .collect::<Vec<u8>>();
    assert_eq!(percents, vec![5, 10, 15, 15, 50, 65, 75, 85, 95, 100]);
    assert_eq!(milestones[8].1, "Saving output files");
    assert_eq!(milestones[9].1, "Pipeline completed");

    assert_eq!(written.len(), 9);
    assert!(written.iter().all(|path| path.exists()));
    assert!(written.contains(&targets.artifacts.unmapped));
}

#[test]
fn batch_uses_pattern_text_when_no_tables_exist() {
    let config = PipelineConfig::default();
    let engine = ExtractionEngine::new(&config).expect("engine");
    let metadata = FilenameMetadataParser::new(config.default_year).expect("metadata");
    let mut state = BatchState::default();
    let paths = vec![PathBuf::from("Acme_2023_annual.pdf")];

    let output = run_batch(
        Path::new("data/pdfs"),
        &paths,
        &engine,
        &mut state,
        &mut |path: &Path| {
            extract_with_fallback(path, &metadata, &[StrategyKind::Raw], |_| {
                extracted(&["Net income $5 million"], Vec::new())
            })
        },
        &mut |_: u8, _: &str| {},
    )
    .expect("batch succeeds");

    let entity_id = state.registry.get("Acme").expect("entity registered").to_string();
    assert_eq!(
        output.statements.income.get(&entity_id, 2023, "net_income"),
        Some(5_000_000.0)
    );
    assert_eq!(output.counts.table_count, 0);
}

#[test]
fn batch_reports_typed_failures() {
    let config = PipelineConfig::default();
    let engine = ExtractionEngine::new(&config).expect("engine");
    let metadata = FilenameMetadataParser::new(config.default_year).expect("metadata");

    let mut state = BatchState::default();
    let empty = run_batch(
        Path::new("data/pdfs"),
        &[],
        &engine,
        &mut state,
        &mut |path: &Path| {
            extract_with_fallback(path, &metadata, &[], |_| StrategyOutcome::Empty)
        },
        &mut |_: u8, _: &str| {},
    );
    assert!(matches!(empty, Err(BatchFailure::NoEligibleInput { .. })));

    let paths = vec![PathBuf::from("a_2023.pdf"), PathBuf::from("b_2023.pdf")];
    let nothing = run_batch(
        Path::new("data/pdfs"),
        &paths,
        &engine,
        &mut state,
        &mut |path: &Path| {
            extract_with_fallback(path, &metadata, &StrategyKind::DEFAULT_ORDER, |_| {
                StrategyOutcome::Empty
            })
        },
        &mut |_: u8, _: &str| {},
    );
    match nothing {
        Err(failure @ BatchFailure::NoDataExtracted { attempted: 2 }) => {
            assert!(failure.to_string().contains("2 documents"));
        }
        other => panic!("expected NoDataExtracted, got {other:?}"),
    }
}

#[test]
fn registry_ids_are_stable_across_reloads() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("entity_map.json");

    let mut registry = EntityRegistry::load(&path).expect("empty load");
    assert_eq!(registry.len(), 0);
    let acme = registry.resolve("Acme");
    assert!(acme.starts_with("ent-"));
    assert_eq!(acme.len(), "ent-".len() + 12);
    assert_eq!(registry.resolve("Acme"), acme);
    let globex = registry.resolve("Globex");
    assert_ne!(acme, globex);
    registry.save(&path).expect("save");

    let mut reloaded = EntityRegistry::load(&path).expect("reload");
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.resolve("Acme"), acme);
    assert_eq!(reloaded.get("Globex"), Some(globex.as_str()));
}

#[test]
fn registry_lengthens_colliding_ids() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("entity_map.json");
    let digest = crate::util::sha256_hex("Acme");
    let squatted = format!("ent-{}", &digest[..12]);
    fs::write(&path, format!("{{\"Other\": \"{squatted}\"}}")).expect("seed map");

    let mut registry = EntityRegistry::load(&path).expect("load");
    let acme = registry.resolve("Acme");
    assert_eq!(acme, format!("ent-{}", &digest[..16]));
    assert_eq!(registry.get("Other"), Some(squatted.as_str()));
}

#[test]
fn csv_writers_leave_nulls_empty() {
    assert_eq!(format_value(None), "");
    assert_eq!(format_value(Some(1_000_000.0)), "1000000");
    assert_eq!(format_value(Some(-1234.5)), "-1234.5");

    let dir = tempfile::tempdir().expect("tempdir");
    let findings = vec![Finding {
        entity_id: "ent-test".to_string(),
        year: 2023,
        rule: QaRule::NegativeEquity,
        severity: QaRule::NegativeEquity.severity(),
        details: "Total equity is negative: -5.".to_string(),
        timestamp: "2024-01-01T00:00:00Z".to_string(),
    }];
    let path = dir.path().join("qa_findings.csv");
    write_findings_csv(&path, &findings).expect("write findings");

    let written = fs::read_to_string(&path).expect("read back");
    assert_eq!(
        written,
        "entity_id,year,rule_id,rule_name,status,severity,details,timestamp\n\
         ent-test,2023,BS004,Negative Shareholders Equity,FAIL,high,Total equity is negative: -5.,2024-01-01T00:00:00Z\n"
    );
}

#[test]
fn store_replaces_rows_on_rerun() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("finrep.sqlite");
    let config = PipelineConfig::default();
    let engine = ExtractionEngine::new(&config).expect("engine");
    let metadata = FilenameMetadataParser::new(config.default_year).expect("metadata");
    let paths = vec![PathBuf::from("Acme_2023_annual.pdf")];
    let text = "Risk Factors\nCompetition may intensify next year.\n\nNet income $5 million";

    for _ in 0..2 {
        let mut state = BatchState::default();
        let output = run_batch(
            Path::new("data/pdfs"),
            &paths,
            &engine,
            &mut state,
            &mut |path: &Path| {
                extract_with_fallback(path, &metadata, &[StrategyKind::Raw], |_| {
                    extracted(&[text], Vec::new())
                })
            },
            &mut |_: u8, _: &str| {},
        )
        .expect("batch succeeds");

        let mut connection = open_store(&db_path).expect("open store");
        write_store(&mut connection, &output, &state.registry, &state.consolidator)
            .expect("write store");
    }

    let connection = Connection::open(&db_path).expect("reopen");
    let count = |sql: &str| -> i64 {
        connection
            .query_row(sql, [], |row| row.get(0))
            .expect("count")
    };
    assert_eq!(count("SELECT COUNT(*) FROM entities"), 1);
    assert_eq!(
        count("SELECT COUNT(*) FROM statement_values WHERE field = 'net_income'"),
        2
    );
    assert_eq!(count("SELECT COUNT(*) FROM text_chunks"), 1);
    assert_eq!(
        count("SELECT COUNT(*) FROM text_chunks_fts WHERE text_chunks_fts MATCH 'competition'"),
        1
    );
}
