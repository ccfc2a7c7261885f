use super::*;

#[derive(Debug)]
struct StatementPattern {
    statement: StatementKind,
    regex: Regex,
    owners: HashMap<String, &'static str>,
}

/// One compiled label regex per statement kind, covering every synonym of
/// every field, applied to the full document text.
#[derive(Debug)]
pub struct PatternExtractor {
    patterns: Vec<StatementPattern>,
    scale_window: usize,
}

impl PatternExtractor {
    pub fn new(scale_window: usize) -> Result<Self> {
        let mut patterns = Vec::new();
        for statement in StatementKind::CANONICAL {
            let mut owners = HashMap::new();
            for field in fields_for(statement) {
                for synonym in field.synonyms {
                    let key = label_key(synonym);
                    if !key.is_empty() {
                        owners.entry(key).or_insert(field.name);
                    }
                }
            }

            let regex = statement_regex(owners.keys()).with_context(|| {
                format!("failed to compile patterns for {}", statement.as_str())
            })?;
            patterns.push(StatementPattern {
                statement,
                regex,
                owners,
            });
        }

        Ok(Self {
            patterns,
            scale_window,
        })
    }

    /// First match per field wins; a match whose value does not clean is
    /// passed over in favor of the next one.
    pub fn extract_patterns(&self, text: &str, entity: &str, year: i32) -> Vec<FieldObservation> {
        let mut observations = Vec::new();

        for pattern in &self.patterns {
            let mut taken = BTreeSet::new();
            for captures in pattern.regex.captures_iter(text) {
                let (Some(whole), Some(label), Some(raw_value)) =
                    (captures.get(0), captures.name("label"), captures.name("value"))
                else {
                    continue;
                };
                let Some(&field) = pattern.owners.get(&label_key(label.as_str())) else {
                    continue;
                };
                if taken.contains(field) {
                    continue;
                }
                let Some(value) = clean_numeric(raw_value.as_str()) else {
                    continue;
                };

                let scale = detect_scale(text, whole.start(), whole.end(), self.scale_window);
                observations.push(
                    FieldObservation::new(
                        entity,
                        year,
                        pattern.statement,
                        label.as_str(),
                        Some(value * scale),
                        SourceStrategy::PatternText,
                    )
                    .with_field(field),
                );
                taken.insert(field);
            }
        }

        observations
    }
}

fn label_key(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase()
}

// Alternatives run longest first, so at any position the most specific
// synonym ("common stock") is tried before one it contains ("stock").
// A parenthesized annotation without digits, a note reference or a year may
// sit between label and value; a hyphen followed by a space is a separator,
// a hyphen touching the digits is a sign.
fn statement_regex<'a>(synonyms: impl Iterator<Item = &'a String>) -> Result<Regex> {
    let mut alternatives = synonyms.cloned().collect::<Vec<String>>();
    alternatives.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let alternation = alternatives
        .iter()
        .map(|synonym| {
            synonym
                .split(' ')
                .map(regex::escape)
                .collect::<Vec<String>>()
                .join(r"\s+")
        })
        .collect::<Vec<String>>()
        .join("|");

    let pattern = format!(
        r"(?i)\b(?P<label>{alternation})\b(?:\s*\((?:[^)\d]*|note\s*\d+|(?:19|20)\d{{2}})\))?(?:[^\d(\-\n]|-[ \t]){{0,120}}?(?P<value>\(?-?\d+(?:,\d{{3}})*(?:\.\d+)?\)?)"
    );
    Ok(Regex::new(&pattern)?)
}
