use super::*;

const RETAINED_EARNINGS_BAND: f64 = 0.10;
const EARNINGS_QUALITY_FLOOR: f64 = 0.8;
const REVENUE_DROP_LIMIT: f64 = -0.2;
const MIN_CURRENT_RATIO: f64 = 1.0;
const MIN_INTEREST_COVERAGE: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum QaRule {
    BalanceEquation,
    RetainedEarningsRollForward,
    CashReconciliation,
    EarningsQuality,
    RevenueDecline,
    DebtWithoutRevenueGrowth,
    NegativeCashDespiteProfit,
    LowLiquidity,
    LowInterestCoverage,
    NegativeEquity,
    NegativeOperatingCashFlow,
    MissingKeyData,
}

impl QaRule {
    pub const CATALOG: [QaRule; 12] = [
        QaRule::BalanceEquation,
        QaRule::RetainedEarningsRollForward,
        QaRule::CashReconciliation,
        QaRule::EarningsQuality,
        QaRule::RevenueDecline,
        QaRule::DebtWithoutRevenueGrowth,
        QaRule::NegativeCashDespiteProfit,
        QaRule::LowLiquidity,
        QaRule::LowInterestCoverage,
        QaRule::NegativeEquity,
        QaRule::NegativeOperatingCashFlow,
        QaRule::MissingKeyData,
    ];

    pub fn id(self) -> &'static str {
        match self {
            QaRule::BalanceEquation => "BS001",
            QaRule::RetainedEarningsRollForward => "IS001",
            QaRule::CashReconciliation => "CF001",
            QaRule::EarningsQuality => "CF002",
            QaRule::RevenueDecline => "IS002",
            QaRule::DebtWithoutRevenueGrowth => "BS002",
            QaRule::NegativeCashDespiteProfit => "CF003",
            QaRule::LowLiquidity => "BS003",
            QaRule::LowInterestCoverage => "IS003",
            QaRule::NegativeEquity => "BS004",
            QaRule::NegativeOperatingCashFlow => "CF004",
            QaRule::MissingKeyData => "MISC001",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            QaRule::BalanceEquation => "Assets = Liabilities + Equity",
            QaRule::RetainedEarningsRollForward => "Net Income vs Retained Earnings",
            QaRule::CashReconciliation => "Cash Flow Reconciliation",
            QaRule::EarningsQuality => "Operating Cash Flow vs Net Income",
            QaRule::RevenueDecline => "Significant YoY Revenue Drop",
            QaRule::DebtWithoutRevenueGrowth => "Increasing Debt vs Revenue Growth",
            QaRule::NegativeCashDespiteProfit => "Negative Cash Flow Despite Profit",
            QaRule::LowLiquidity => "Low Liquidity Ratio",
            QaRule::LowInterestCoverage => "Low Interest Coverage Ratio",
            QaRule::NegativeEquity => "Negative Shareholders Equity",
            QaRule::NegativeOperatingCashFlow => "Negative Operating Cash Flow",
            QaRule::MissingKeyData => "Missing Key Financial Data",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            QaRule::BalanceEquation
            | QaRule::RevenueDecline
            | QaRule::NegativeCashDespiteProfit
            | QaRule::NegativeEquity => Severity::High,
            QaRule::MissingKeyData => Severity::Low,
            _ => Severity::Medium,
        }
    }
}

/// Current- and prior-year views of one entity across the three statements.
struct YearView<'a> {
    statements: &'a StatementSet,
    entity_id: &'a str,
    year: i32,
}

impl YearView<'_> {
    fn is(&self, field: &str) -> Option<f64> {
        self.statements.income.get(self.entity_id, self.year, field)
    }

    fn bs(&self, field: &str) -> Option<f64> {
        self.statements.balance.get(self.entity_id, self.year, field)
    }

    fn cf(&self, field: &str) -> Option<f64> {
        self.statements.cashflow.get(self.entity_id, self.year, field)
    }

    fn prior_is(&self, field: &str) -> Option<f64> {
        self.statements.income.get(self.entity_id, self.year - 1, field)
    }

    fn prior_bs(&self, field: &str) -> Option<f64> {
        self.statements.balance.get(self.entity_id, self.year - 1, field)
    }
}

/// Runs the rule catalog over finished statements. Rules whose operands
/// (including prior-year ones) are absent are skipped without a finding.
#[derive(Debug, Clone, Copy)]
pub struct ConsistencyChecker {
    tolerance: f64,
}

impl ConsistencyChecker {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn check(&self, statements: &StatementSet) -> Vec<Finding> {
        let timestamp = now_utc_string();
        let mut findings = Vec::new();

        for (entity_id, year) in statements.entity_years() {
            let view = YearView {
                statements,
                entity_id: &entity_id,
                year,
            };

            for rule in QaRule::CATALOG {
                let Some(details) = self.evaluate(rule, &view) else {
                    continue;
                };

                let severity = rule.severity();
                if severity == Severity::High {
                    warn!(
                        entity_id = %entity_id,
                        year,
                        rule_id = rule.id(),
                        details = %details,
                        "high severity consistency finding"
                    );
                }

                findings.push(Finding {
                    entity_id: entity_id.clone(),
                    year,
                    rule,
                    severity,
                    details,
                    timestamp: timestamp.clone(),
                });
            }
        }

        info!(findings = findings.len(), "consistency checks completed");
        findings
    }

    /// `Some(details)` on violation.
    fn evaluate(&self, rule: QaRule, view: &YearView<'_>) -> Option<String> {
        let tol = self.tolerance;
        match rule {
            QaRule::BalanceEquation => {
                let assets = view.bs("total_assets")?;
                let liabilities = view.bs("total_liabilities")?;
                let equity = view.bs("total_equity")?;
                let gap = (assets - (liabilities + equity)).abs();
                (assets != 0.0 && gap > (assets * tol).abs()).then(|| {
                    format!(
                        "Assets != Liabilities + Equity: assets {assets}, liabilities {liabilities}, equity {equity}."
                    )
                })
            }
            QaRule::RetainedEarningsRollForward => {
                let net_income = view.is("net_income")?;
                let retained = view.bs("retained_earnings")?;
                let prior_retained = view.prior_bs("retained_earnings")?;
                let expected = prior_retained + net_income;
                (net_income != 0.0
                    && (retained - expected).abs() > (net_income * RETAINED_EARNINGS_BAND).abs())
                .then(|| {
                    format!(
                        "Net income may not tie to retained earnings change (could be due to dividends): expected {expected}, reported {retained}."
                    )
                })
            }
            QaRule::CashReconciliation => {
                let net_change = view.cf("net_change_in_cash")?;
                let cash = view.bs("cash_and_equivalents")?;
                let prior_cash = view.prior_bs("cash_and_equivalents")?;
                let balance_change = cash - prior_cash;
                (cash != 0.0 && (balance_change - net_change).abs() > (cash * tol).abs()).then(|| {
                    format!(
                        "Cash flow statement may not reconcile with balance sheet: balance change {balance_change}, reported net change {net_change}."
                    )
                })
            }
            QaRule::EarningsQuality => {
                let net_income = view.is("net_income")?;
                let cfo = view.cf("cfo")?;
                (net_income > 0.0 && cfo < net_income * EARNINGS_QUALITY_FLOOR).then(|| {
                    format!(
                        "Operating cash flow {cfo} is significantly lower than net income {net_income}."
                    )
                })
            }
            QaRule::RevenueDecline => {
                let revenue = view.is("revenue")?;
                let prior_revenue = view.prior_is("revenue")?;
                let change = ratio(Some(revenue - prior_revenue), Some(prior_revenue))?;
                (prior_revenue > 0.0 && change < REVENUE_DROP_LIMIT).then(|| {
                    format!(
                        "Significant revenue decline of {:.1}% year over year.",
                        change * 100.0
                    )
                })
            }
            QaRule::DebtWithoutRevenueGrowth => {
                let debt = view.bs("long_term_debt")?;
                let prior_debt = view.prior_bs("long_term_debt")?;
                let revenue = view.is("revenue")?;
                let prior_revenue = view.prior_is("revenue")?;
                (debt > prior_debt && revenue <= prior_revenue).then(|| {
                    format!(
                        "Long-term debt rose from {prior_debt} to {debt} while revenue did not grow."
                    )
                })
            }
            QaRule::NegativeCashDespiteProfit => {
                let net_income = view.is("net_income")?;
                let net_change = view.cf("net_change_in_cash")?;
                (net_income > 0.0 && net_change < 0.0).then(|| {
                    format!(
                        "Reported net profit {net_income} but net change in cash was {net_change}."
                    )
                })
            }
            QaRule::LowLiquidity => {
                let current = ratio(
                    view.bs("total_current_assets"),
                    view.bs("total_current_liabilities"),
                )?;
                (current < MIN_CURRENT_RATIO)
                    .then(|| format!("Current ratio {current:.2} is below {MIN_CURRENT_RATIO}."))
            }
            QaRule::LowInterestCoverage => {
                let coverage = ratio(view.is("operating_income"), view.is("interest_expense"))?;
                (coverage < MIN_INTEREST_COVERAGE).then(|| {
                    format!("Interest coverage {coverage:.2} is below {MIN_INTEREST_COVERAGE}.")
                })
            }
            QaRule::NegativeEquity => {
                let equity = view.bs("total_equity")?;
                (equity < 0.0).then(|| format!("Total equity is negative: {equity}."))
            }
            QaRule::NegativeOperatingCashFlow => {
                let cfo = view.cf("cfo")?;
                (cfo < 0.0).then(|| format!("Operating cash flow is negative: {cfo}."))
            }
            QaRule::MissingKeyData => {
                let missing = view.is("revenue").is_none()
                    && view.is("net_income").is_none()
                    && view.bs("total_assets").is_none();
                missing.then(|| {
                    "None of revenue, net income or total assets were extracted.".to_string()
                })
            }
        }
    }
}
