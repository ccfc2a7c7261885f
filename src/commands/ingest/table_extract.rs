use super::*;

const FINANCIAL_KEYWORDS: [&str; 30] = [
    "revenue",
    "sales",
    "income",
    "profit",
    "loss",
    "assets",
    "liabilities",
    "equity",
    "cash",
    "expenses",
    "cost",
    "margin",
    "earnings",
    "ebit",
    "ebitda",
    "balance sheet",
    "income statement",
    "cash flow",
    "statement of operations",
    "consolidated",
    "financial",
    "statement",
    "annual report",
    "fiscal year",
    "net",
    "total",
    "operating",
    "gross",
    "debt",
    "depreciation",
];

const CURRENCY_INDICATORS: [&str; 11] = [
    "$", "€", "£", "¥", "thousand", "million", "billion", "usd", "eur", "gbp", "jpy",
];

/// Turns raw cell grids into unmapped structured-table observations.
#[derive(Debug, Default)]
pub struct TableExtractor;

impl TableExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract_tables(&self, tables: &[RawGrid], entity: &str, year: i32) -> Vec<FieldObservation> {
        let mut observations = Vec::new();
        for grid in tables {
            observations.extend(self.extract_table(grid, entity, year));
        }
        observations
    }

    pub fn extract_table(&self, grid: &RawGrid, entity: &str, year: i32) -> Vec<FieldObservation> {
        let rows = grid
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.trim())
                    .filter(|cell| !cell.is_empty())
                    .collect::<Vec<&str>>()
            })
            .filter(|row| !row.is_empty())
            .collect::<Vec<Vec<&str>>>();

        if rows.len() < 2 {
            return Vec::new();
        }

        let full_text = rows
            .iter()
            .map(|row| row.join(" "))
            .collect::<Vec<String>>()
            .join(" ");
        if !is_financial_table(&full_text) {
            return Vec::new();
        }

        let Some(statement) = table_statement_kind(&rows, &full_text) else {
            return Vec::new();
        };

        let mut observations = Vec::new();
        for row in rows.iter().filter(|row| row.len() >= 2) {
            let label = row[0];
            let values = &row[1..];
            let multi_year = values.len() > 1;

            for (offset, cell) in values.iter().enumerate() {
                let Some(value) = clean_numeric(cell) else {
                    continue;
                };
                let value_year = if multi_year { year + offset as i32 } else { year };
                observations.push(FieldObservation::new(
                    entity,
                    value_year,
                    statement,
                    label,
                    Some(value),
                    SourceStrategy::StructuredTable,
                ));
            }
        }

        observations
    }
}

/// Deliberately permissive: one financial-sounding token is enough.
pub fn is_financial_table(table_text: &str) -> bool {
    let text = table_text.to_lowercase();
    FINANCIAL_KEYWORDS.iter().any(|keyword| text.contains(keyword))
        || CURRENCY_INDICATORS
            .iter()
            .any(|indicator| text.contains(indicator))
}

/// Header row first, then the whole table; a table with any numeric cell
/// but no recognizable vocabulary is treated as an income statement.
fn table_statement_kind(rows: &[Vec<&str>], full_text: &str) -> Option<StatementKind> {
    let header_text = rows[0].join(" ");
    let from_header = classify_statement(&header_text);
    if from_header != StatementKind::Unknown {
        return Some(from_header);
    }

    let from_table = classify_statement(full_text);
    if from_table != StatementKind::Unknown {
        return Some(from_table);
    }

    rows.iter()
        .flatten()
        .any(|cell| looks_numeric(cell))
        .then_some(StatementKind::Income)
}
