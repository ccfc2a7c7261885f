use super::*;

const CASHFLOW_KEYWORDS: [&str; 7] = [
    "cash flow",
    "cash flows",
    "statement of cash flows",
    "operating activities",
    "investing activities",
    "financing activities",
    "cash and cash equivalents at",
];

const BALANCE_KEYWORDS: [&str; 11] = [
    "balance sheet",
    "statement of financial position",
    "total assets",
    "total liabilities",
    "current assets",
    "non-current assets",
    "current liabilities",
    "stockholders equity",
    "shareholders equity",
    "shareholders' equity",
    "total equity",
];

const INCOME_KEYWORDS: [&str; 14] = [
    "income statement",
    "statement of operations",
    "statement of earnings",
    "statement of profit or loss",
    "profit and loss",
    "net income",
    "operating income",
    "gross profit",
    "ebitda",
    "total revenue",
    "net sales",
    "cost of sales",
    "earnings per share",
    "profit for the year",
];

/// Assigns a statement kind to a snippet of table or page text.
///
/// Phrase vocabularies are tried in a fixed order (cash flow, balance sheet,
/// income); single-word co-occurrence is only consulted when none of them hit.
pub fn classify_statement(snippet: &str) -> StatementKind {
    let text = snippet.to_lowercase();

    if contains_any(&text, &CASHFLOW_KEYWORDS) {
        return StatementKind::Cashflow;
    }
    if contains_any(&text, &BALANCE_KEYWORDS) {
        return StatementKind::Balance;
    }
    if contains_any(&text, &INCOME_KEYWORDS) {
        return StatementKind::Income;
    }

    if (text.contains("total") || text.contains("equity"))
        && (text.contains("assets") || text.contains("liabilities"))
    {
        StatementKind::Balance
    } else if (text.contains("revenue") || text.contains("sales"))
        && (text.contains("net") || text.contains("income"))
    {
        StatementKind::Income
    } else if text.contains("cash") && (text.contains("flow") || text.contains("activities")) {
        StatementKind::Cashflow
    } else {
        StatementKind::Unknown
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword))
}
