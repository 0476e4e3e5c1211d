use crate::models::{AnswerResult, ContextItem, SourceRef};
use regex::Regex;

/// Emitted when the index had no entries at all for the question's scope.
pub const NO_MATCHES_MESSAGE: &str =
    "I couldn't find any relevant information in the document to answer your question.";

/// Emitted when hits existed but none passed the similarity threshold or
/// fit the context budget.
pub const BELOW_THRESHOLD_MESSAGE: &str =
    "I couldn't find sufficiently relevant information to answer your question.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Definition,
    Quantity,
    Temporal,
    Location,
    Person,
    Causal,
    Process,
    General,
}

/// Cue phrases checked against the lower-cased question in fixed priority
/// order; the first row with a match decides the intent. `General` is the
/// fallthrough when nothing matches.
const INTENT_CUES: &[(Intent, &[&str])] = &[
    (Intent::Definition, &["what is", "what are", "define"]),
    (Intent::Quantity, &["how many", "how much", "count"]),
    (Intent::Temporal, &["when", "date"]),
    (Intent::Location, &["where", "location"]),
    (Intent::Person, &["who", "person", "people"]),
    (Intent::Causal, &["why", "reason", "because"]),
    (Intent::Process, &["how", "process", "steps"]),
];

pub fn classify_intent(question: &str) -> Intent {
    let lowered = question.to_lowercase();
    for (intent, cues) in INTENT_CUES {
        if cues.iter().any(|cue| lowered.contains(cue)) {
            return *intent;
        }
    }
    Intent::General
}

const LOCATION_WORDS: [&str; 8] = [
    "in", "at", "located", "address", "city", "country", "state", "region",
];

const CAUSAL_WORDS: [&str; 7] = [
    "because",
    "due to",
    "reason",
    "caused by",
    "result of",
    "since",
    "as a result",
];

const PROCESS_WORDS: [&str; 8] = [
    "step",
    "first",
    "then",
    "next",
    "finally",
    "process",
    "method",
    "procedure",
];

/// Keywords stripped from definition questions before scoring sentences;
/// they name the question form, not the subject.
const DEFINITION_NOISE: [&str; 3] = ["what", "define", "definition"];

const FALLBACK_CHARS: usize = 300;
const PREVIEW_CHARS: usize = 200;

/// What a strategy found in the context. Wording is applied afterwards by
/// `format_answer` so every strategy shares the same phrasing.
enum Evidence {
    Sentence(String),
    Sentences(Vec<String>),
    Fallback(String),
}

fn format_answer(intent: Intent, evidence: Evidence) -> String {
    match evidence {
        Evidence::Sentence(sentence) => match intent {
            Intent::Definition => format!("Based on the document: {sentence}"),
            _ => format!("According to the document: {sentence}"),
        },
        Evidence::Sentences(sentences) => {
            format!("According to the document: {}", sentences.join(". "))
        }
        Evidence::Fallback(preview) => match intent {
            Intent::Definition => {
                format!("The document mentions the following relevant information: {preview}...")
            }
            _ => {
                format!("The document contains the following relevant information: {preview}...")
            }
        },
    }
}

/// Extractive answer synthesis over retrieved context. Every strategy is a
/// pure function of `(question, concatenated context text)`; no state, no
/// I/O. Patterns are compiled once at construction.
pub struct AnswerSynthesizer {
    confidence_boost: f64,
    sentence_boundary: Regex,
    word: Regex,
    number: Regex,
    date_patterns: Vec<Regex>,
    proper_noun: Regex,
}

impl AnswerSynthesizer {
    pub fn new(confidence_boost: f64) -> Result<Self, regex::Error> {
        Ok(Self {
            confidence_boost,
            sentence_boundary: Regex::new(r"[.!?]+")?,
            word: Regex::new(r"\b\w+\b")?,
            number: Regex::new(r"\b\d+(?:[.,]\d+)*\b")?,
            date_patterns: vec![
                Regex::new(r"\b\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b")?,
                Regex::new(r"\b\d{4}[/-]\d{1,2}[/-]\d{1,2}\b")?,
                Regex::new(
                    r"(?i)\b(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2},?\s+\d{4}\b",
                )?,
                Regex::new(
                    r"(?i)\b\d{1,2}\s+(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{4}\b",
                )?,
            ],
            proper_noun: Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\b")?,
        })
    }

    /// Classifies the question, runs the matching extraction strategy over
    /// the joined context text, and scores confidence from the mean
    /// retrieval similarity. Empty context is the "no answer" case.
    pub fn synthesize(&self, question: &str, context: &[ContextItem]) -> AnswerResult {
        if context.is_empty() {
            return AnswerResult::no_answer(BELOW_THRESHOLD_MESSAGE);
        }

        let context_text = context
            .iter()
            .map(|item| item.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let intent = classify_intent(question);
        let evidence = self.extract_evidence(intent, question, &context_text);
        let answer = format_answer(intent, evidence);

        let mean_similarity =
            context.iter().map(|item| item.similarity).sum::<f64>() / context.len() as f64;
        let confidence_score = round3((mean_similarity * self.confidence_boost).min(1.0));

        let sources = context
            .iter()
            .map(|item| SourceRef {
                rank: item.rank,
                text_preview: preview(&item.text),
                page_number: item.metadata.page_number,
                section_type: item.metadata.section_type,
                similarity: round3(item.similarity),
            })
            .collect();

        AnswerResult {
            success: true,
            answer,
            confidence_score,
            sources,
            context_used: context.len(),
        }
    }

    fn extract_evidence(&self, intent: Intent, question: &str, context: &str) -> Evidence {
        match intent {
            Intent::Definition => self.extract_definition(question, context),
            Intent::Quantity => self.extract_quantity(context),
            Intent::Temporal => self.extract_temporal(context),
            Intent::Location => self.extract_location(context),
            Intent::Person => self.extract_person(context),
            Intent::Causal => self.extract_causal(context),
            Intent::Process => self.extract_process(context),
            Intent::General => self.extract_general(question, context),
        }
    }

    fn sentences<'a>(&self, context: &'a str) -> Vec<&'a str> {
        self.sentence_boundary
            .split(context)
            .map(str::trim)
            .filter(|sentence| !sentence.is_empty())
            .collect()
    }

    fn question_terms<'a>(&self, question_lower: &'a str, exclude: &[&str]) -> Vec<&'a str> {
        self.word
            .find_iter(question_lower)
            .map(|word| word.as_str())
            .filter(|word| word.len() > 3 && !exclude.contains(word))
            .collect()
    }

    fn extract_definition(&self, question: &str, context: &str) -> Evidence {
        let question_lower = question.to_lowercase();
        let key_terms = self.question_terms(&question_lower, &DEFINITION_NOISE);

        let mut best_sentence = "";
        let mut max_matches = 0usize;

        for sentence in self.sentences(context) {
            if sentence.chars().count() < 20 {
                continue;
            }
            let lowered = sentence.to_lowercase();
            let matches = key_terms
                .iter()
                .filter(|term| lowered.contains(*term))
                .count();
            if matches > max_matches {
                max_matches = matches;
                best_sentence = sentence;
            }
        }

        if best_sentence.is_empty() {
            Evidence::Fallback(truncate_chars(context, FALLBACK_CHARS))
        } else {
            Evidence::Sentence(best_sentence.to_string())
        }
    }

    fn extract_quantity(&self, context: &str) -> Evidence {
        for sentence in self.sentences(context) {
            if self.number.is_match(sentence) {
                return Evidence::Sentence(sentence.to_string());
            }
        }
        Evidence::Fallback(truncate_chars(context, FALLBACK_CHARS))
    }

    fn extract_temporal(&self, context: &str) -> Evidence {
        for sentence in self.sentences(context) {
            if self
                .date_patterns
                .iter()
                .any(|pattern| pattern.is_match(sentence))
            {
                return Evidence::Sentence(sentence.to_string());
            }
        }
        Evidence::Fallback(truncate_chars(context, FALLBACK_CHARS))
    }

    fn extract_location(&self, context: &str) -> Evidence {
        for sentence in self.sentences(context) {
            if sentence.chars().count() <= 20 {
                continue;
            }
            let lowered = sentence.to_lowercase();
            if LOCATION_WORDS.iter().any(|word| lowered.contains(word)) {
                return Evidence::Sentence(sentence.to_string());
            }
        }
        Evidence::Fallback(truncate_chars(context, FALLBACK_CHARS))
    }

    fn extract_person(&self, context: &str) -> Evidence {
        let names: Vec<&str> = self
            .proper_noun
            .find_iter(context)
            .map(|name| name.as_str())
            .collect();

        if !names.is_empty() {
            for sentence in self.sentences(context) {
                if sentence.chars().count() <= 20 {
                    continue;
                }
                if names.iter().any(|name| sentence.contains(name)) {
                    return Evidence::Sentence(sentence.to_string());
                }
            }
        }
        Evidence::Fallback(truncate_chars(context, FALLBACK_CHARS))
    }

    fn extract_causal(&self, context: &str) -> Evidence {
        for sentence in self.sentences(context) {
            if sentence.chars().count() <= 20 {
                continue;
            }
            let lowered = sentence.to_lowercase();
            if CAUSAL_WORDS.iter().any(|word| lowered.contains(word)) {
                return Evidence::Sentence(sentence.to_string());
            }
        }
        Evidence::Fallback(truncate_chars(context, FALLBACK_CHARS))
    }

    fn extract_process(&self, context: &str) -> Evidence {
        let mut steps = Vec::new();
        for sentence in self.sentences(context) {
            if sentence.chars().count() <= 20 {
                continue;
            }
            let lowered = sentence.to_lowercase();
            if PROCESS_WORDS.iter().any(|word| lowered.contains(word)) {
                steps.push(sentence.to_string());
                if steps.len() == 3 {
                    break;
                }
            }
        }

        if steps.is_empty() {
            Evidence::Fallback(truncate_chars(context, FALLBACK_CHARS))
        } else {
            Evidence::Sentences(steps)
        }
    }

    fn extract_general(&self, question: &str, context: &str) -> Evidence {
        let question_lower = question.to_lowercase();
        let key_terms = self.question_terms(&question_lower, &[]);

        let mut scored: Vec<(&str, usize)> = Vec::new();
        for sentence in self.sentences(context) {
            if sentence.chars().count() < 20 {
                continue;
            }
            let lowered = sentence.to_lowercase();
            let score = key_terms
                .iter()
                .filter(|term| lowered.contains(*term))
                .count();
            if score > 0 {
                scored.push((sentence, score));
            }
        }

        // Stable sort: ties keep document order.
        scored.sort_by(|left, right| right.1.cmp(&left.1));

        if scored.is_empty() {
            Evidence::Fallback(truncate_chars(context, FALLBACK_CHARS))
        } else {
            Evidence::Sentences(
                scored
                    .iter()
                    .take(2)
                    .map(|(sentence, _)| (*sentence).to_string())
                    .collect(),
            )
        }
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        format!("{}...", truncate_chars(text, PREVIEW_CHARS))
    } else {
        text.to_string()
    }
}

fn round3(value: f64) -> f64 {
    (value * 1_000.0).round() / 1_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChunkMetadata, SectionType};

    fn item(text: &str, similarity: f64, rank: usize) -> ContextItem {
        ContextItem {
            text: text.to_string(),
            metadata: ChunkMetadata {
                document_id: "doc-1".to_string(),
                page_number: Some(1),
                section_type: SectionType::Paragraph,
                length: text.chars().count(),
            },
            similarity,
            rank,
        }
    }

    fn synthesizer() -> AnswerSynthesizer {
        AnswerSynthesizer::new(1.2).unwrap()
    }

    #[test]
    fn intents_follow_priority_order() {
        assert_eq!(classify_intent("What is a surge tank?"), Intent::Definition);
        // "how many" must win over the later "how" cue.
        assert_eq!(
            classify_intent("How many pumps are installed?"),
            Intent::Quantity
        );
        assert_eq!(
            classify_intent("When was the plant commissioned?"),
            Intent::Temporal
        );
        assert_eq!(classify_intent("Where is the intake located?"), Intent::Location);
        assert_eq!(classify_intent("Who signed the report?"), Intent::Person);
        assert_eq!(classify_intent("Why did the relay trip?"), Intent::Causal);
        assert_eq!(classify_intent("How do I reset the breaker?"), Intent::Process);
        assert_eq!(classify_intent("List the turbine ratings"), Intent::General);
    }

    #[test]
    fn quantity_strategy_returns_the_numeric_sentence() {
        let context = vec![item(
            "Paris is the capital of France It has a population of over 2,100,000 people",
            0.8,
            1,
        )];
        let result = synthesizer().synthesize("How many people live in Paris?", &context);

        assert!(result.success);
        assert!(result.answer.starts_with("According to the document:"));
        assert!(result.answer.contains("2,100,000"));
        assert_eq!(result.context_used, 1);
    }

    #[test]
    fn quantity_without_digits_falls_back_to_context() {
        let context = vec![item(
            "It has a population of over two million people and keeps growing",
            0.8,
            1,
        )];
        let result = synthesizer().synthesize("How many people live in Paris?", &context);

        assert!(result.success);
        assert!(result
            .answer
            .starts_with("The document contains the following relevant information:"));
        assert!(result.answer.contains("two million"));
    }

    #[test]
    fn definition_strategy_picks_the_best_scoring_sentence() {
        let context = vec![item(
            "The relay cabinet sits in row three. A surge tank is a vessel that absorbs \
             pressure transients in the penstock. Routine checks happen weekly.",
            0.9,
            1,
        )];
        let result = synthesizer().synthesize("What is a surge tank?", &context);

        assert!(result.answer.starts_with("Based on the document:"));
        assert!(result.answer.contains("surge tank is a vessel"));
    }

    #[test]
    fn temporal_strategy_finds_dated_sentences() {
        let context = vec![item(
            "Commissioning finished on 12/03/2019 after a long delay. The second unit followed later.",
            0.7,
            1,
        )];
        let result = synthesizer().synthesize("When was the plant commissioned?", &context);

        assert!(result.answer.contains("12/03/2019"));
    }

    #[test]
    fn person_strategy_uses_the_proper_noun_heuristic() {
        let context = vec![item(
            "The inspection was signed off by Marie Laurent in the presence of the operator",
            0.7,
            1,
        )];
        let result = synthesizer().synthesize("Who signed the inspection?", &context);

        assert!(result.answer.contains("Marie Laurent"));
    }

    #[test]
    fn process_strategy_joins_up_to_three_sentences() {
        let context = vec![item(
            "First isolate the breaker upstream of the panel. Then verify absence of voltage at the terminals. \
             Next apply the grounding set to both bus sections. Finally tag the isolation point for the shift log.",
            0.7,
            1,
        )];
        let result = synthesizer().synthesize("How do I isolate the panel?", &context);

        assert!(result.answer.starts_with("According to the document:"));
        assert!(result.answer.contains("First isolate"));
        assert!(result.answer.contains("Next apply"));
        assert!(!result.answer.contains("Finally tag"));
    }

    #[test]
    fn general_strategy_returns_top_two_scoring_sentences() {
        let context = vec![item(
            "The turbine rating is forty megawatts at rated head. Lubrication uses ISO VG 68 oil. \
             The turbine rating drops at partial load conditions.",
            0.7,
            1,
        )];
        let result = synthesizer().synthesize("Summarize the turbine rating details", &context);

        assert!(result.answer.contains("forty megawatts"));
        assert!(result.answer.contains("partial load"));
        assert!(!result.answer.contains("ISO VG 68"));
    }

    #[test]
    fn confidence_is_boosted_mean_similarity_clamped_to_one() {
        let synthesizer = synthesizer();

        let context = vec![item("The plant has 4 units running", 0.5, 1), item("Unit 5 is in overhaul this month", 0.7, 2)];
        let result = synthesizer.synthesize("How many units are running?", &context);
        assert!((result.confidence_score - 0.72).abs() < 1e-9);

        let context = vec![item("All 6 units are available today", 1.0, 1)];
        let result = synthesizer.synthesize("How many units are available?", &context);
        assert_eq!(result.confidence_score, 1.0);
    }

    #[test]
    fn empty_context_is_the_no_answer_case() {
        let result = synthesizer().synthesize("How many units?", &[]);

        assert!(!result.success);
        assert_eq!(result.confidence_score, 0.0);
        assert_eq!(result.answer, BELOW_THRESHOLD_MESSAGE);
        assert!(result.sources.is_empty());
    }

    #[test]
    fn source_previews_are_truncated_to_200_chars() {
        let long_text = format!("The value is 42 {}", "padding ".repeat(40));
        let context = vec![item(&long_text, 0.8, 1)];
        let result = synthesizer().synthesize("How many?", &context);

        let preview = &result.sources[0].text_preview;
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), 203);
    }
}
