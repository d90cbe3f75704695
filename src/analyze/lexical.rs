//! Lexical matcher: whole-word, stem-tolerant occurrences of keywords and their aliases.

use super::{MatchHit, MatchKind};
use crate::catalog::Topic;
use crate::text::{stem, tokenize};

/// Every keyword whose text or alias occurs in the utterance, in catalog order.
/// `normalized` must already be normalized (see `text::normalize_text`).
pub fn find_lexical_hits(normalized: &str, topic: &Topic) -> Vec<MatchHit> {
    let stems: Vec<String> = tokenize(normalized).into_iter().map(stem).collect();
    if stems.is_empty() {
        return Vec::new();
    }

    topic
        .keywords()
        .filter(|(_, kw)| kw.forms.iter().any(|form| contains_run(&stems, form)))
        .map(|(area_id, kw)| MatchHit::new(kw, area_id, MatchKind::Lexical, 1.0))
        .collect()
}

/// True if `needle` appears as a contiguous run of whole tokens in `hay`.
fn contains_run(hay: &[String], needle: &[String]) -> bool {
    if needle.is_empty() || needle.len() > hay.len() {
        return false;
    }
    hay.windows(needle.len()).any(|w| w == needle)
}
