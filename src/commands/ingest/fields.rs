use super::*;

#[derive(Debug, Clone, Copy)]
pub struct CanonicalField {
    pub name: &'static str,
    pub synonyms: &'static [&'static str],
}

const fn field(name: &'static str, synonyms: &'static [&'static str]) -> CanonicalField {
    CanonicalField { name, synonyms }
}

// Declaration order is the output column order. Label matching prefers the
// longest synonym and only falls back to this order between equal lengths.
pub const INCOME_FIELDS: &[CanonicalField] = &[
    field(
        "revenue",
        &[
            "revenue",
            "sales",
            "turnover",
            "net sales",
            "total revenue",
            "operating revenue",
            "net interest income",
            "total sales",
            "gross sales",
            "sales revenue",
            "operating sales",
        ],
    ),
    field(
        "cost_of_goods_sold",
        &[
            "cost of revenue",
            "cost of sales",
            "cost of goods sold",
            "cogs",
            "cost of products sold",
            "direct costs",
            "product costs",
            "manufacturing costs",
        ],
    ),
    field("gross_profit", &["gross profit", "gross income", "gross margin"]),
    field(
        "operating_expenses",
        &[
            "operating expenses",
            "operating costs",
            "total operating expenses",
            "selling general administrative",
            "sg&a",
            "sga",
            "administrative expenses",
        ],
    ),
    field(
        "operating_income",
        &[
            "operating income",
            "operating profit",
            "ebit",
            "earnings before interest and taxes",
            "income from operations",
            "operating earnings",
        ],
    ),
    field(
        "interest_expense",
        &[
            "interest expense",
            "interest paid",
            "financial costs",
            "interest and similar charges",
            "borrowing costs",
            "finance costs",
        ],
    ),
    field(
        "pretax_income",
        &[
            "pretax income",
            "pretax earnings",
            "income before tax",
            "income before income taxes",
            "earnings before tax",
            "profit before tax",
            "pbt",
        ],
    ),
    field(
        "income_tax",
        &[
            "tax expense",
            "income tax",
            "income tax expense",
            "provision for taxes",
            "tax provision",
            "current tax",
            "deferred tax",
        ],
    ),
    field(
        "net_income",
        &[
            "net income",
            "net profit",
            "net earnings",
            "profit after tax",
            "pat",
            "profit for the period",
            "profit for the year",
            "profit attributable",
            "comprehensive income",
        ],
    ),
    field(
        "eps_basic",
        &["basic earnings per share", "basic eps", "eps basic", "earnings per share"],
    ),
    field(
        "eps_diluted",
        &["diluted eps", "diluted earnings per share", "eps diluted"],
    ),
];

pub const BALANCE_FIELDS: &[CanonicalField] = &[
    field(
        "cash_and_equivalents",
        &[
            "cash and cash equivalents",
            "cash and equivalents",
            "cash and short term investments",
            "cash at bank",
            "bank balances",
            "cash",
        ],
    ),
    field(
        "accounts_receivable",
        &[
            "accounts receivable",
            "trade receivables",
            "trade debtors",
            "customer receivables",
            "amounts receivable",
            "receivables",
            "debtors",
        ],
    ),
    field(
        "inventory",
        &["inventory", "inventories", "stock", "finished goods", "raw materials"],
    ),
    field(
        "other_current_assets",
        &["other current assets", "prepaid expenses", "other receivables"],
    ),
    field(
        "total_current_assets",
        &["total current assets", "current assets"],
    ),
    field(
        "ppe",
        &[
            "property plant and equipment",
            "property plant equipment",
            "plant and equipment",
            "ppe",
            "fixed assets",
            "tangible assets",
            "buildings and equipment",
        ],
    ),
    field(
        "intangible_assets",
        &[
            "goodwill and intangible assets",
            "intangible assets",
            "goodwill",
            "intellectual property",
            "patents",
            "trademarks",
        ],
    ),
    field(
        "total_noncurrent_assets",
        &[
            "total non current assets",
            "total noncurrent assets",
            "non current assets",
            "noncurrent assets",
        ],
    ),
    field("total_assets", &["total assets", "assets"]),
    field(
        "accounts_payable",
        &[
            "accounts payable",
            "trade payables",
            "trade creditors",
            "amounts payable",
            "supplier payables",
            "payables",
            "creditors",
        ],
    ),
    field(
        "short_term_debt",
        &[
            "short term debt",
            "short term borrowings",
            "short term loans",
            "current debt",
            "current borrowings",
            "current portion of debt",
        ],
    ),
    field(
        "other_current_liabilities",
        &[
            "other current liabilities",
            "accrued expenses",
            "accrued liabilities",
            "other payables",
            "provisions",
        ],
    ),
    field(
        "total_current_liabilities",
        &["total current liabilities", "current liabilities"],
    ),
    field(
        "total_noncurrent_liabilities",
        &[
            "total non current liabilities",
            "total noncurrent liabilities",
        ],
    ),
    field(
        "long_term_debt",
        &[
            "long term debt",
            "long term borrowings",
            "long term liabilities",
            "non current liabilities",
            "bonds payable",
            "notes payable",
        ],
    ),
    field("total_liabilities", &["total liabilities", "liabilities"]),
    field(
        "share_capital",
        &[
            "share capital",
            "common stock",
            "capital stock",
            "additional paid in capital",
            "ordinary shares",
            "equity shares",
        ],
    ),
    field(
        "retained_earnings",
        &[
            "retained earnings",
            "retained profit",
            "accumulated earnings",
            "accumulated profit",
            "profit reserves",
            "reserves",
        ],
    ),
    field(
        "other_equity",
        &[
            "accumulated other comprehensive income",
            "other equity",
            "other reserves",
            "translation reserves",
            "revaluation reserves",
        ],
    ),
    field(
        "total_equity",
        &[
            "total equity",
            "shareholders equity",
            "stockholders equity",
            "owners equity",
            "shareholders funds",
            "net worth",
            "equity",
        ],
    ),
];

pub const CASHFLOW_FIELDS: &[CanonicalField] = &[
    field(
        "net_income",
        &["net income", "net profit", "net earnings", "profit for the period"],
    ),
    field(
        "depreciation_amortization",
        &[
            "depreciation and amortization",
            "depreciation and amortisation",
            "depreciation expense",
            "depreciation",
            "amortization",
            "amortisation",
        ],
    ),
    field(
        "working_capital_changes",
        &[
            "changes in working capital",
            "change in working capital",
            "working capital changes",
            "working capital adjustments",
            "changes in operating assets",
        ],
    ),
    field(
        "cfo",
        &[
            "net cash from operating activities",
            "cash from operating activities",
            "cash generated from operations",
            "net cash from operations",
            "operating cash flow",
            "cfo",
        ],
    ),
    field(
        "capex",
        &[
            "capital expenditures",
            "capital expenditure",
            "capex",
            "purchase of ppe",
            "purchase of property plant and equipment",
            "additions to property plant equipment",
            "capital investments",
        ],
    ),
    field(
        "acquisitions",
        &["business acquisitions", "acquisitions", "purchase of subsidiaries"],
    ),
    field(
        "other_investing",
        &["other investing activities", "other investment activities"],
    ),
    field(
        "cfi",
        &[
            "net cash from investing activities",
            "cash from investing activities",
            "cash used in investing activities",
            "net cash from investing",
            "cash used in investing",
            "investing cash flow",
            "cfi",
        ],
    ),
    field(
        "debt_repaid",
        &[
            "repayment of debt",
            "repayments of borrowings",
            "debt repayments",
            "debt repaid",
            "debt payments",
            "loan repayments",
        ],
    ),
    field(
        "debt_issued",
        &[
            "proceeds from debt",
            "proceeds from borrowings",
            "debt issued",
            "borrowings received",
            "loans received",
        ],
    ),
    field(
        "dividends_paid",
        &["dividends paid", "dividend payments", "distributions"],
    ),
    field(
        "share_buybacks",
        &[
            "share buybacks",
            "share repurchases",
            "repurchase of common stock",
            "treasury stock purchases",
        ],
    ),
    field(
        "other_financing",
        &["other financing activities", "other finance activities"],
    ),
    field(
        "cff",
        &[
            "net cash from financing activities",
            "cash from financing activities",
            "cash used in financing activities",
            "net cash from financing",
            "cash used in financing",
            "financing cash flow",
            "cff",
        ],
    ),
    field(
        "net_change_in_cash",
        &[
            "net change in cash",
            "net increase in cash",
            "net decrease in cash",
            "increase decrease in cash",
            "change in cash",
            "net cash flow",
        ],
    ),
    field(
        "ending_cash_balance",
        &[
            "ending cash balance",
            "closing cash balance",
            "cash at end of period",
            "cash at end of year",
            "cash at period end",
        ],
    ),
];

pub fn fields_for(kind: StatementKind) -> &'static [CanonicalField] {
    match kind {
        StatementKind::Income => INCOME_FIELDS,
        StatementKind::Balance => BALANCE_FIELDS,
        StatementKind::Cashflow => CASHFLOW_FIELDS,
        StatementKind::Unknown => &[],
    }
}

pub fn field_names(kind: StatementKind) -> Vec<&'static str> {
    fields_for(kind).iter().map(|field| field.name).collect()
}
