use super::*;

#[derive(Debug)]
struct SynonymMatcher {
    field: &'static str,
    normalized: String,
    whole_word: Regex,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldMatch {
    Synonym(&'static str),
    Fuzzy { field: &'static str, score: f64 },
}

impl FieldMatch {
    pub fn field(self) -> &'static str {
        match self {
            FieldMatch::Synonym(field) | FieldMatch::Fuzzy { field, .. } => field,
        }
    }
}

/// Resolves free-form statement labels ("Total Revenue (Note 4)") onto the
/// canonical field catalog.
#[derive(Debug)]
pub struct FieldMapper {
    fuzzy_threshold: f64,
    income: Vec<SynonymMatcher>,
    balance: Vec<SynonymMatcher>,
    cashflow: Vec<SynonymMatcher>,
    bracketed: Regex,
    parenthesized: Regex,
    punctuation: Regex,
    whitespace: Regex,
}

impl FieldMapper {
    pub fn new(fuzzy_threshold: f64) -> Result<Self> {
        let mut mapper = Self {
            fuzzy_threshold,
            income: Vec::new(),
            balance: Vec::new(),
            cashflow: Vec::new(),
            bracketed: Regex::new(r"\[[^\]]*\]").context("failed to compile bracket regex")?,
            parenthesized: Regex::new(r"\([^)]*\)")
                .context("failed to compile parenthesis regex")?,
            punctuation: Regex::new(r"[^\w\s]").context("failed to compile punctuation regex")?,
            whitespace: Regex::new(r"\s+").context("failed to compile whitespace regex")?,
        };

        for kind in StatementKind::CANONICAL {
            let mut matchers = Vec::new();
            for field in fields_for(kind) {
                for synonym in field.synonyms {
                    let normalized = mapper.normalize_label(synonym);
                    if normalized.is_empty() {
                        continue;
                    }
                    let whole_word = Regex::new(&format!(r"\b{}\b", regex::escape(&normalized)))
                        .with_context(|| format!("failed to compile synonym regex: {synonym}"))?;
                    matchers.push(SynonymMatcher {
                        field: field.name,
                        normalized,
                        whole_word,
                    });
                }
            }

            match kind {
                StatementKind::Income => mapper.income = matchers,
                StatementKind::Balance => mapper.balance = matchers,
                StatementKind::Cashflow => mapper.cashflow = matchers,
                StatementKind::Unknown => {}
            }
        }

        Ok(mapper)
    }

    pub fn normalize_label(&self, raw: &str) -> String {
        let text = self.bracketed.replace_all(raw, " ");
        let text = self.parenthesized.replace_all(&text, " ");
        let lowered = text.to_lowercase();
        let text = self.punctuation.replace_all(&lowered, " ");
        self.whitespace.replace_all(&text, " ").trim().to_string()
    }

    pub fn map(&self, raw_label: &str, kind: StatementKind) -> Option<&'static str> {
        self.resolve(raw_label, kind).map(FieldMatch::field)
    }

    pub fn resolve(&self, raw_label: &str, kind: StatementKind) -> Option<FieldMatch> {
        let matchers = self.matchers(kind);
        if matchers.is_empty() {
            return None;
        }

        let normalized = self.normalize_label(raw_label);
        if normalized.is_empty() {
            return None;
        }

        if let Some(exact) = matchers
            .iter()
            .find(|matcher| matcher.normalized == normalized)
        {
            return Some(FieldMatch::Synonym(exact.field));
        }

        // Longest embedded synonym wins so "other receivables" is not read
        // as "receivables"; equal lengths fall back to declaration order.
        let mut longest: Option<&SynonymMatcher> = None;
        for matcher in matchers
            .iter()
            .filter(|matcher| matcher.whole_word.is_match(&normalized))
        {
            if longest.is_none_or(|current| matcher.normalized.len() > current.normalized.len()) {
                longest = Some(matcher);
            }
        }
        if let Some(hit) = longest {
            return Some(FieldMatch::Synonym(hit.field));
        }

        let mut best: Option<(&SynonymMatcher, f64)> = None;
        for matcher in matchers {
            let score = similarity_ratio(&normalized, &matcher.normalized);
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((matcher, score));
            }
        }

        best.filter(|(_, score)| *score >= self.fuzzy_threshold)
            .map(|(matcher, score)| FieldMatch::Fuzzy {
                field: matcher.field,
                score,
            })
    }

    fn matchers(&self, kind: StatementKind) -> &[SynonymMatcher] {
        match kind {
            StatementKind::Income => &self.income,
            StatementKind::Balance => &self.balance,
            StatementKind::Cashflow => &self.cashflow,
            StatementKind::Unknown => &[],
        }
    }
}

/// Ratcliff/Obershelp similarity: twice the matched characters over the
/// combined length, in `[0, 1]`.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a = a.chars().collect::<Vec<char>>();
    let b = b.chars().collect::<Vec<char>>();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut matched = 0usize;
    let mut pending = vec![(0usize, a.len(), 0usize, b.len())];

    while let Some((a_lo, a_hi, b_lo, b_hi)) = pending.pop() {
        let (i, j, size) = longest_common_block(a, b, a_lo, a_hi, b_lo, b_hi);
        if size == 0 {
            continue;
        }

        matched += size;
        pending.push((a_lo, i, b_lo, j));
        pending.push((i + size, a_hi, j + size, b_hi));
    }

    matched
}

fn longest_common_block(
    a: &[char],
    b: &[char],
    a_lo: usize,
    a_hi: usize,
    b_lo: usize,
    b_hi: usize,
) -> (usize, usize, usize) {
    let width = b_hi.saturating_sub(b_lo) + 1;
    let mut best = (a_lo, b_lo, 0usize);
    let mut previous = vec![0usize; width];

    for i in a_lo..a_hi {
        let mut current = vec![0usize; width];
        for j in b_lo..b_hi {
            if a[i] == b[j] {
                let length = previous[j - b_lo] + 1;
                current[j - b_lo + 1] = length;
                if length > best.2 {
                    best = (i + 1 - length, j + 1 - length, length);
                }
            }
        }
        previous = current;
    }

    best
}
