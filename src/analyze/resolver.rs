//! Match resolver: one hit per keyword, the one contributing the most weight.

use std::collections::HashMap;

use super::{MatchHit, MatchKind};
use crate::catalog::Topic;

/// Merge lexical and semantic hits. Output follows catalog order; on equal contribution
/// the lexical hit wins.
pub fn resolve_hits(topic: &Topic, lexical: Vec<MatchHit>, semantic: Vec<MatchHit>) -> Vec<MatchHit> {
    let mut best: HashMap<String, MatchHit> = HashMap::new();
    for hit in lexical.into_iter().chain(semantic) {
        let replace = best
            .get(&hit.keyword)
            .map_or(true, |cur| beats(&hit, cur));
        if replace {
            best.insert(hit.keyword.clone(), hit);
        }
    }

    topic
        .keywords()
        .filter_map(|(_, kw)| best.remove(&kw.text))
        .collect()
}

fn beats(candidate: &MatchHit, current: &MatchHit) -> bool {
    if candidate.contributed_weight != current.contributed_weight {
        return candidate.contributed_weight > current.contributed_weight;
    }
    candidate.kind == MatchKind::Lexical && current.kind != MatchKind::Lexical
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Keyword, TopicArea};

    fn topic() -> Topic {
        Topic::new(
            "t",
            "T",
            vec![
                TopicArea::new("a", "A", vec![Keyword::new("alpha", 4.0), Keyword::new("beta", 2.0)]),
                TopicArea::new("b", "B", vec![Keyword::new("gamma", 1.0)]),
            ],
        )
        .unwrap()
    }

    fn hit(t: &Topic, name: &str, kind: MatchKind, conf: f64) -> MatchHit {
        let (area, kw) = t.keywords().find(|(_, k)| k.text == name).unwrap();
        MatchHit::new(kw, area, kind, conf)
    }

    #[test]
    fn lexical_dominates_semantic_for_same_keyword() {
        let t = topic();
        let out = resolve_hits(
            &t,
            vec![hit(&t, "beta", MatchKind::Lexical, 1.0)],
            vec![
                hit(&t, "beta", MatchKind::Semantic, 0.9),
                hit(&t, "gamma", MatchKind::Semantic, 0.8),
                hit(&t, "alpha", MatchKind::Semantic, 0.95),
            ],
        );
        let got: Vec<_> = out.iter().map(|h| (h.keyword.as_str(), h.kind)).collect();
        assert_eq!(
            got,
            vec![
                ("alpha", MatchKind::Semantic),
                ("beta", MatchKind::Lexical),
                ("gamma", MatchKind::Semantic)
            ]
        );
    }

    #[test]
    fn duplicates_collapse_to_highest_confidence() {
        let t = topic();
        let out = resolve_hits(
            &t,
            vec![],
            vec![
                hit(&t, "gamma", MatchKind::Semantic, 0.8),
                hit(&t, "gamma", MatchKind::Semantic, 0.9),
                hit(&t, "gamma", MatchKind::Semantic, 0.85),
            ],
        );
        assert_eq!(out.len(), 1);
        assert!((out[0].confidence - 0.9).abs() < 1e-9);
    }
}
