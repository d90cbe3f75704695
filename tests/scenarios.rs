// tests/scenarios.rs
//
// End-to-end scoring scenarios through `Session`, no HTTP involved.

use std::sync::Arc;

use topic_coverage::analyze::{DisabledOracle, FixedOracle};
use topic_coverage::{
    AggregationPolicy, Keyword, ScoreBreakdown, ScoringConfig, Session, Topic, TopicArea,
};

/// Weather with "rain" weight 10 and a total topic weight of 100.
fn weather_100() -> Arc<Topic> {
    Arc::new(
        Topic::new(
            "weather",
            "Weather",
            vec![
                TopicArea::new("precipitation", "Precipitation", vec![Keyword::new("rain", 10.0)]),
                TopicArea::new("temperature", "Temperature", vec![Keyword::new("temperature", 30.0)]),
                TopicArea::new("wind", "Wind", vec![Keyword::new("wind", 30.0)]),
                TopicArea::new(
                    "humidity",
                    "Humidity",
                    vec![Keyword::new("humidity", 30.0).with_aliases(["moisture"])],
                ),
            ],
        )
        .expect("valid topic"),
    )
}

fn five_areas() -> Arc<Topic> {
    let areas = ["alpha", "beta", "gamma", "delta", "epsilon"]
        .into_iter()
        .map(|a| TopicArea::new(a, a, vec![Keyword::new(a, 1.0)]))
        .collect();
    Arc::new(Topic::new("greek", "Greek", areas).expect("valid topic"))
}

fn filler(words: usize) -> String {
    vec!["lorem"; words].join(" ")
}

#[tokio::test]
async fn scenario_raining_matches_rain_by_stem() {
    let mut s = Session::new("s", weather_100(), ScoringConfig::default());
    let out = s.submit_turn("It is raining", &FixedOracle::default()).await.unwrap();
    let b = &out.breakdown;
    assert_eq!(b.hits.len(), 1);
    assert_eq!(b.hits[0].keyword, "rain");
    assert!((b.base_score - 8.0).abs() < 1e-9, "base {}", b.base_score);
}

#[tokio::test]
async fn scenario_empty_utterance_scores_zero() {
    let mut s = Session::new("s", weather_100(), ScoringConfig::default());
    s.submit_turn("rain", &FixedOracle::default()).await.unwrap();
    let out = s.submit_turn("   ?! ", &FixedOracle::default()).await.unwrap();
    assert_eq!(out.breakdown, ScoreBreakdown::zero());
}

#[tokio::test]
async fn scenario_long_utterance_without_hits_gets_length_bonus_only() {
    let mut s = Session::new("s", weather_100(), ScoringConfig::default());
    let out = s.submit_turn(&filler(45), &FixedOracle::default()).await.unwrap();
    assert_eq!(out.breakdown.base_score, 0.0);
    assert_eq!(out.breakdown.length_bonus, 5.0);
    assert_eq!(out.breakdown.total, 5.0);

    // with prior coverage the coverage bonus carries over
    s.submit_turn("rain", &FixedOracle::default()).await.unwrap();
    let out = s.submit_turn(&filler(45), &FixedOracle::default()).await.unwrap();
    assert_eq!(out.breakdown.coverage_bonus, 3.0); // round(10 * 1/4)
    assert_eq!(out.breakdown.total, 8.0);
}

#[tokio::test]
async fn scenario_full_coverage_bonus_sticks() {
    let oracle = FixedOracle::default();
    let mut s = Session::new("s", five_areas(), ScoringConfig::default());
    let mut bonuses = Vec::new();
    for text in ["alpha and beta", "gamma", "delta", "epsilon", "nothing relevant here"] {
        let out = s.submit_turn(text, &oracle).await.unwrap();
        bonuses.push(out.breakdown.coverage_bonus);
    }
    assert_eq!(bonuses, vec![4.0, 6.0, 8.0, 10.0, 10.0]);
    assert_eq!(s.coverage_fraction(), 1.0);
}

#[test]
fn scenario_mean_of_forty_sixty_eighty() {
    let totals = [40.0, 60.0, 80.0];
    assert!((AggregationPolicy::Mean.aggregate(&totals) - 60.0).abs() < 1e-9);
    assert_eq!(AggregationPolicy::Max.aggregate(&totals), 80.0);
    assert_eq!(AggregationPolicy::Last.aggregate(&totals), 80.0);
}

#[tokio::test]
async fn coverage_never_shrinks() {
    let oracle = FixedOracle::default();
    let mut s = Session::new("s", weather_100(), ScoringConfig::default());
    let mut prev = s.coverage().covered_area_ids.clone();
    for text in ["wind", "", "temperature and wind", "unrelated", "moisture"] {
        s.submit_turn(text, &oracle).await.unwrap();
        let now = s.coverage().covered_area_ids.clone();
        assert!(now.is_superset(&prev), "{now:?} lost areas from {prev:?}");
        prev = now;
    }
    assert_eq!(prev.len(), 3);
}

#[tokio::test]
async fn keyword_and_alias_twice_is_one_hit() {
    let mut s = Session::new("s", weather_100(), ScoringConfig::default());
    let out = s
        .submit_turn("Humidity, moisture, humidity and more moisture.", &FixedOracle::default())
        .await
        .unwrap();
    let humidity: Vec<_> = out
        .breakdown
        .hits
        .iter()
        .filter(|h| h.keyword == "humidity")
        .collect();
    assert_eq!(humidity.len(), 1);
    assert_eq!(out.breakdown.hits.len(), 1);
}

#[tokio::test]
async fn failing_oracle_equals_lexical_only() {
    let text = "It was raining all day and the wind was strong";
    let mut lexical = Session::new("a", weather_100(), ScoringConfig::default());
    let mut degraded = Session::new("b", weather_100(), ScoringConfig::default());

    let ok = lexical.submit_turn(text, &FixedOracle::default()).await.unwrap();
    let bad = degraded.submit_turn(text, &DisabledOracle).await.unwrap();

    assert!(!ok.degraded);
    assert!(bad.degraded);
    assert_eq!(ok.breakdown, bad.breakdown);
    assert!(bad.breakdown.total > 0.0);
}

#[tokio::test]
async fn totals_always_bounded_and_consistent() {
    let oracle = FixedOracle::new([("temperature", 0.9), ("humidity", 0.76), ("wind", 0.4)]);
    let mut s = Session::new("s", weather_100(), ScoringConfig::default());
    let long = format!("rain wind temperature humidity {}", filler(80));
    for text in ["", "rain", "it is hot and sticky today", long.as_str()] {
        let b = s.submit_turn(text, &oracle).await.unwrap().breakdown;
        assert!((0.0..=100.0).contains(&b.total));
        assert!((0.0..=80.0).contains(&b.base_score));
        assert!((0.0..=10.0).contains(&b.coverage_bonus));
        assert!((0.0..=5.0).contains(&b.length_bonus));
        let sum = (b.base_score + b.coverage_bonus + b.length_bonus).clamp(0.0, 100.0);
        assert!((b.total - sum).abs() < 1e-9);
    }
}

#[tokio::test]
async fn semantic_threshold_is_inclusive_and_configurable() {
    let oracle = FixedOracle::new([("temperature", 0.75), ("wind", 0.74)]);
    let mut s = Session::new("s", weather_100(), ScoringConfig::default());
    let out = s.submit_turn("it feels quite hot", &oracle).await.unwrap();
    let kws: Vec<_> = out.breakdown.hits.iter().map(|h| h.keyword.as_str()).collect();
    assert_eq!(kws, vec!["temperature"]);

    let strict = ScoringConfig {
        semantic_threshold: 0.9,
        ..Default::default()
    };
    let mut s = Session::new("s", weather_100(), strict);
    let out = s.submit_turn("it feels quite hot", &oracle).await.unwrap();
    assert!(out.breakdown.hits.is_empty());
}

#[tokio::test]
async fn aggregation_policy_picks_final_score() {
    let oracle = FixedOracle::default();
    let texts = ["rain temperature wind humidity", "lorem"];
    let mut finals = Vec::new();
    for policy in [AggregationPolicy::Mean, AggregationPolicy::Max, AggregationPolicy::Last] {
        let cfg = ScoringConfig {
            aggregation: policy,
            ..Default::default()
        };
        let mut s = Session::new("s", weather_100(), cfg);
        for t in texts {
            s.submit_turn(t, &oracle).await.unwrap();
        }
        let summary = s.finalize();
        finals.push((summary.final_score, summary.max_score, summary.last_score, summary.mean_score));
    }
    let (mean, max, last) = (finals[0].0, finals[1].0, finals[2].0);
    assert_eq!(max, finals[1].1);
    assert_eq!(last, finals[2].2);
    assert!((mean - finals[0].3).abs() < 1e-9);
    assert!(max > mean && mean > last);
}
