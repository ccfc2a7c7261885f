use super::*;

pub const RATIO_COLUMNS: [&str; 12] = [
    "current_ratio",
    "quick_ratio",
    "debt_to_equity",
    "interest_coverage",
    "gross_margin",
    "operating_margin",
    "net_margin",
    "roa",
    "roe",
    "cfo_to_net_income",
    "inventory_turnover",
    "receivable_days",
];

const DAYS_PER_YEAR: f64 = 365.0;

/// `numerator / denominator`, or `None` when an operand is missing, the
/// denominator is zero, or the quotient is not finite.
pub fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let (numerator, denominator) = (numerator?, denominator?);
    if denominator == 0.0 {
        return None;
    }
    Some(numerator / denominator).filter(|value| value.is_finite())
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub entity_id: String,
    pub year: i32,
    pub values: [Option<f64>; RATIO_COLUMNS.len()],
}

impl FeatureRow {
    #[cfg(test)]
    pub fn get(&self, column: &str) -> Option<f64> {
        RATIO_COLUMNS
            .iter()
            .position(|name| *name == column)
            .and_then(|index| self.values[index])
    }
}

/// Ratios for one `(entity_id, year)`, in `RATIO_COLUMNS` order.
pub fn compute_ratios(
    income: Option<RowRef<'_>>,
    balance: Option<RowRef<'_>>,
    cashflow: Option<RowRef<'_>>,
) -> [Option<f64>; RATIO_COLUMNS.len()] {
    let is = |field: &str| income.and_then(|row| row.get(field));
    let bs = |field: &str| balance.and_then(|row| row.get(field));
    let cf = |field: &str| cashflow.and_then(|row| row.get(field));

    let revenue = is("revenue");
    let net_income = is("net_income").or_else(|| cf("net_income"));
    let current_liabilities = bs("total_current_liabilities");
    let total_equity = bs("total_equity");
    let receivables = bs("accounts_receivable");

    let quick_assets = bs("cash_and_equivalents")
        .zip(receivables)
        .map(|(cash, receivables)| cash + receivables);

    [
        ratio(bs("total_current_assets"), current_liabilities),
        ratio(quick_assets, current_liabilities),
        ratio(bs("total_liabilities"), total_equity),
        ratio(is("operating_income"), is("interest_expense")),
        ratio(is("gross_profit"), revenue),
        ratio(is("operating_income"), revenue),
        ratio(net_income, revenue),
        ratio(net_income, bs("total_assets")),
        ratio(net_income, total_equity),
        ratio(cf("cfo"), net_income),
        ratio(is("cost_of_goods_sold"), bs("inventory")),
        ratio(receivables.map(|value| value * DAYS_PER_YEAR), revenue),
    ]
}

pub fn feature_table(statements: &StatementSet) -> Vec<FeatureRow> {
    statements
        .entity_years()
        .into_iter()
        .map(|(entity_id, year)| {
            let values = compute_ratios(
                statements.income.row(&entity_id, year),
                statements.balance.row(&entity_id, year),
                statements.cashflow.row(&entity_id, year),
            );
            FeatureRow {
                entity_id,
                year,
                values,
            }
        })
        .collect()
}
