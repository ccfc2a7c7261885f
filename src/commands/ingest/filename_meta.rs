use super::*;

/// Infers `(entity, fiscal year)` from a report filename such as
/// `Acme_2023_annual.pdf`.
#[derive(Debug)]
pub struct FilenameMetadataParser {
    entity_patterns: Vec<Regex>,
    year_pattern: Regex,
    default_year: i32,
}

impl FilenameMetadataParser {
    pub fn new(default_year: i32) -> Result<Self> {
        let entity_patterns = [
            r"(?i)([a-z\s&.-]+)_annual_report",
            r"(?i)([a-z\s&.-]+)_10k",
            r"(?i)([a-z\s&.-]+)_annual",
            r"(?i)([a-z\s&.-]+)-\d{4}",
            r"(?i)^([a-z\s&.-]+)_",
            r"(?i)([a-z\s&.-]+)",
        ]
        .iter()
        .map(|pattern| {
            Regex::new(pattern)
                .with_context(|| format!("failed to compile entity filename regex: {pattern}"))
        })
        .collect::<Result<Vec<Regex>>>()?;

        Ok(Self {
            entity_patterns,
            year_pattern: Regex::new(r"20\d{2}").context("failed to compile year regex")?,
            default_year,
        })
    }

    pub fn parse(&self, path: &Path) -> (String, i32) {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        (self.entity_name(&stem), self.fiscal_year(&filename))
    }

    fn entity_name(&self, stem: &str) -> String {
        for pattern in &self.entity_patterns {
            let Some(captured) = pattern
                .captures(stem)
                .and_then(|captures| captures.get(1))
                .map(|m| m.as_str())
            else {
                continue;
            };

            let cleaned = sanitize_entity(&captured.replace('-', " "));
            if !cleaned.is_empty() {
                return title_case(&cleaned);
            }
        }

        let fallback = sanitize_entity(&stem.replace('_', " "));
        if fallback.is_empty() {
            "Unknown".to_string()
        } else {
            title_case(&fallback)
        }
    }

    fn fiscal_year(&self, filename: &str) -> i32 {
        self.year_pattern
            .find(filename)
            .and_then(|m| m.as_str().parse::<i32>().ok())
            .unwrap_or(self.default_year)
    }
}

fn sanitize_entity(raw: &str) -> String {
    let trimmed = raw.trim_matches(|ch: char| !ch.is_alphanumeric());
    trimmed.split_whitespace().collect::<Vec<&str>>().join(" ")
}

fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut previous_is_letter = false;

    for ch in input.chars() {
        if previous_is_letter {
            out.extend(ch.to_lowercase());
        } else {
            out.extend(ch.to_uppercase());
        }
        previous_is_letter = ch.is_alphabetic();
    }

    out
}
