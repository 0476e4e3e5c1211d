use crate::models::{ContextItem, QaOptions, ScoredChunk};

/// Turns ranked search hits into the context set handed to synthesis.
///
/// Hits are walked in ranked order; one is admitted when its distance is
/// under the ceiling and its text still fits the running character budget.
/// A hit that busts the budget is skipped rather than ending the walk,
/// since a shorter chunk further down the ranking may still fit. Ranks are
/// 1-based positions in the original ordering, kept stable so callers can
/// cite sources.
pub fn assemble_context(hits: &[ScoredChunk], options: &QaOptions) -> Vec<ContextItem> {
    let mut items = Vec::new();
    let mut total_chars = 0usize;

    for (position, hit) in hits.iter().enumerate() {
        if hit.distance >= options.max_distance {
            continue;
        }

        let length = hit.text.chars().count();
        if total_chars + length > options.max_context_chars {
            continue;
        }

        total_chars += length;
        items.push(ContextItem {
            text: hit.text.clone(),
            metadata: hit.metadata.clone(),
            similarity: 1.0 - hit.distance,
            rank: position + 1,
        });
    }

    items
}
