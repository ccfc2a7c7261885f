use super::*;

/// One canonical statement: rows keyed by `(entity_id, year)`, columns fixed
/// to the field catalog for its kind.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementTable {
    kind: StatementKind,
    columns: Vec<&'static str>,
    rows: BTreeMap<(String, i32), Vec<Option<f64>>>,
}

#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    columns: &'a [&'static str],
    values: &'a [Option<f64>],
}

impl<'a> RowRef<'a> {
    pub fn get(&self, field: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|column| *column == field)
            .and_then(|index| self.values[index])
    }
}

impl StatementTable {
    pub fn new(kind: StatementKind) -> Self {
        Self {
            kind,
            columns: field_names(kind),
            rows: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn set(&mut self, entity_id: &str, year: i32, field: &str, value: f64) -> bool {
        let Some(index) = self.columns.iter().position(|column| *column == field) else {
            return false;
        };
        let width = self.columns.len();
        let row = self
            .rows
            .entry((entity_id.to_string(), year))
            .or_insert_with(|| vec![None; width]);
        row[index] = Some(value);
        true
    }

    pub fn row(&self, entity_id: &str, year: i32) -> Option<RowRef<'_>> {
        self.rows
            .get(&(entity_id.to_string(), year))
            .map(|values| RowRef {
                columns: &self.columns,
                values,
            })
    }

    pub fn get(&self, entity_id: &str, year: i32, field: &str) -> Option<f64> {
        self.row(entity_id, year).and_then(|row| row.get(field))
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, i32, &[Option<f64>])> {
        self.rows
            .iter()
            .map(|((entity_id, year), values)| (entity_id.as_str(), *year, values.as_slice()))
    }

    pub fn keys(&self) -> impl Iterator<Item = (&str, i32)> {
        self.rows
            .keys()
            .map(|(entity_id, year)| (entity_id.as_str(), *year))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatementSet {
    pub income: StatementTable,
    pub balance: StatementTable,
    pub cashflow: StatementTable,
}

impl StatementSet {
    pub fn tables(&self) -> [&StatementTable; 3] {
        [&self.income, &self.balance, &self.cashflow]
    }

    /// Every `(entity_id, year)` present in at least one statement.
    pub fn entity_years(&self) -> BTreeSet<(String, i32)> {
        self.tables()
            .iter()
            .flat_map(|table| table.keys())
            .map(|(entity_id, year)| (entity_id.to_string(), year))
            .collect()
    }
}

pub fn build_statements(consolidated: &BTreeMap<CanonicalKey, f64>) -> StatementSet {
    let mut set = StatementSet {
        income: StatementTable::new(StatementKind::Income),
        balance: StatementTable::new(StatementKind::Balance),
        cashflow: StatementTable::new(StatementKind::Cashflow),
    };

    for (key, value) in consolidated {
        let table = match key.statement {
            StatementKind::Income => &mut set.income,
            StatementKind::Balance => &mut set.balance,
            StatementKind::Cashflow => &mut set.cashflow,
            StatementKind::Unknown => continue,
        };
        table.set(&key.entity_id, key.year, key.field, *value);
    }

    set
}
