use super::*;

const SECTION_SPLIT_THRESHOLD: usize = 1000;
const MIN_SECTION_PARAGRAPH_CHARS: usize = 50;
const MIN_GENERAL_PARAGRAPH_CHARS: usize = 100;
const GENERAL_SECTION: &str = "General";

#[derive(Debug, Clone)]
struct SectionAnchor {
    start: usize,
    title: String,
}

/// Cuts narrative sections (notes, MD&A, risk factors) into retrieval chunks.
#[derive(Debug)]
pub struct TextChunker {
    anchors: Vec<Regex>,
    paragraph_break: Regex,
}

impl TextChunker {
    pub fn new() -> Result<Self> {
        let anchors = [
            r"(?i)notes to.*financial statements",
            r"(?i)management.?s discussion and analysis",
            r"(?i)md&a",
            r"(?i)risk factors",
            r"(?i)business overview",
            r"(?i)critical accounting",
            r"(?i)market risk",
            r"(?i)liquidity",
            r"(?i)capital resources",
        ]
        .iter()
        .map(|pattern| {
            Regex::new(pattern)
                .with_context(|| format!("failed to compile section anchor regex: {pattern}"))
        })
        .collect::<Result<Vec<Regex>>>()?;

        Ok(Self {
            anchors,
            paragraph_break: Regex::new(r"\n\s*\n").context("failed to compile paragraph regex")?,
        })
    }

    pub fn chunk(&self, text: &str, entity: &str, year: i32) -> Vec<TextChunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let sections = self.find_sections(text);
        if sections.is_empty() {
            return self.general_chunks(text, entity, year);
        }

        let mut chunks = Vec::new();
        for (index, section) in sections.iter().enumerate() {
            let end = sections
                .get(index + 1)
                .map(|next| next.start)
                .unwrap_or(text.len());
            let body = text[section.start..end].trim();

            if body.chars().count() > SECTION_SPLIT_THRESHOLD {
                for (paragraph_index, paragraph) in self.paragraph_break.split(body).enumerate() {
                    let paragraph = paragraph.trim();
                    if paragraph.chars().count() > MIN_SECTION_PARAGRAPH_CHARS {
                        chunks.push(text_chunk(
                            entity,
                            year,
                            &section.title,
                            format!("{entity}_{year}_{index}_{paragraph_index}"),
                            paragraph,
                        ));
                    }
                }
            } else if !body.is_empty() {
                chunks.push(text_chunk(
                    entity,
                    year,
                    &section.title,
                    format!("{entity}_{year}_{index}_0"),
                    body,
                ));
            }
        }

        chunks
    }

    fn find_sections(&self, text: &str) -> Vec<SectionAnchor> {
        let mut sections = self
            .anchors
            .iter()
            .flat_map(|anchor| anchor.find_iter(text))
            .map(|found| SectionAnchor {
                start: found.start(),
                title: found.as_str().trim().to_string(),
            })
            .collect::<Vec<SectionAnchor>>();
        sections.sort_by_key(|section| section.start);
        sections
    }

    fn general_chunks(&self, text: &str, entity: &str, year: i32) -> Vec<TextChunk> {
        self.paragraph_break
            .split(text)
            .enumerate()
            .filter_map(|(index, paragraph)| {
                let paragraph = paragraph.trim();
                (paragraph.chars().count() > MIN_GENERAL_PARAGRAPH_CHARS).then(|| {
                    text_chunk(
                        entity,
                        year,
                        GENERAL_SECTION,
                        format!("{entity}_{year}_general_{index}"),
                        paragraph,
                    )
                })
            })
            .collect()
    }
}

fn text_chunk(entity: &str, year: i32, section: &str, chunk_id: String, text: &str) -> TextChunk {
    TextChunk {
        entity: entity.to_string(),
        year,
        section: section.to_string(),
        chunk_id,
        text: text.to_string(),
        length: text.chars().count(),
    }
}
