use crate::error::IngestError;
use crate::models::{Chunk, ExtractionOptions, SectionType};
use regex::Regex;

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub min_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: 500,
            min_chars: 50,
        }
    }
}

impl From<ExtractionOptions> for ChunkingConfig {
    fn from(value: ExtractionOptions) -> Self {
        Self {
            max_chars: value.chunk_max_chars,
            min_chars: value.chunk_min_chars,
        }
    }
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\u{a0}', " ")
}

/// Splits normalized text into sentence-bounded chunks. Sentences accumulate
/// greedily until the next one would push the buffer past `max_chars`; a
/// single sentence longer than the budget is emitted whole rather than cut
/// mid-sentence. Inputs shorter than `min_chars` after normalization produce
/// no chunks.
pub fn chunk_text(
    text: &str,
    page_number: Option<u32>,
    section_type: SectionType,
    config: ChunkingConfig,
) -> Result<Vec<Chunk>, IngestError> {
    let normalized = normalize_whitespace(text);
    if normalized.chars().count() < config.min_chars {
        return Ok(Vec::new());
    }

    let boundary = Regex::new(r"[.!?]+")?;

    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in boundary.split(&normalized) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }

        let would_overflow =
            current.chars().count() + sentence.chars().count() > config.max_chars;

        if would_overflow && !current.is_empty() {
            chunks.push(make_chunk(&current, page_number, section_type));
            current.clear();
            current.push_str(sentence);
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(sentence);
        }
    }

    if !current.trim().is_empty() {
        chunks.push(make_chunk(&current, page_number, section_type));
    }

    Ok(chunks)
}

fn make_chunk(text: &str, page_number: Option<u32>, section_type: SectionType) -> Chunk {
    let trimmed = text.trim();
    Chunk {
        text: trimmed.to_string(),
        page_number,
        section_type,
        length: trimmed.chars().count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_is_normalized() {
        let input = "A  \t  lot\nof   spacing";
        let normalized = normalize_whitespace(input);
        assert_eq!(normalized, "A lot of spacing");
    }

    #[test]
    fn short_input_is_discarded() {
        let chunks = chunk_text(
            "Too short to keep.",
            None,
            SectionType::Paragraph,
            ChunkingConfig::default(),
        )
        .unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn two_sentence_paragraph_becomes_one_chunk() {
        let text =
            "Paris is the capital of France. It has a population of over two million people.";
        let chunks =
            chunk_text(text, None, SectionType::Paragraph, ChunkingConfig::default()).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].section_type, SectionType::Paragraph);
        assert_eq!(chunks[0].page_number, None);
        assert!(chunks[0].length <= 500);
        assert!(chunks[0].text.contains("capital of France"));
        assert!(chunks[0].text.contains("two million people"));
    }

    #[test]
    fn long_text_splits_on_sentence_boundaries() {
        let sentence = "This sentence is repeated until the running buffer spills over the limit and forces a flush onto the next chunk. ";
        let text = sentence.repeat(12);
        let chunks =
            chunk_text(&text, Some(3), SectionType::Page, ChunkingConfig::default()).unwrap();

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.length <= 500);
            assert_eq!(chunk.page_number, Some(3));
            assert_eq!(chunk.section_type, SectionType::Page);
            // No chunk ends mid-sentence: every boundary fell on a terminator,
            // so each chunk is a whole number of the repeated sentence.
            assert!(chunk.text.starts_with("This sentence"));
            assert!(chunk.text.ends_with("chunk"));
        }
    }

    #[test]
    fn oversized_single_sentence_is_emitted_whole() {
        let text = "x".repeat(600);
        let chunks =
            chunk_text(&text, None, SectionType::Paragraph, ChunkingConfig::default()).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].length, 600);
    }

    #[test]
    fn generated_chunks_meet_minimum_length() {
        let text = "The feed pump supplies water to the boiler drum at full load. \
                    The drum level controller trims the feed valve continuously. \
                    Low level trips the burner management system within two seconds.";
        let chunks =
            chunk_text(text, None, SectionType::Paragraph, ChunkingConfig::default()).unwrap();

        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.length >= 50 || chunks.len() == 1);
        }
    }
}
