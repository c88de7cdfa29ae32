//! Property tests for rank fusion: determinism, score laws, and
//! ordering invariants that must hold for arbitrary rankings.

use std::collections::HashMap;

use proptest::prelude::*;

use clipseek::evidence::{DocId, Evidence, FrameDoc};
use clipseek::fusion::{PipelineRanking, RankedHit, fuse};

fn hit(id: String, raw: f64) -> RankedHit {
    RankedHit {
        doc_id: DocId::from(id.clone()),
        raw_score: raw,
        evidence: Evidence::Frame(FrameDoc {
            frame_number: 0,
            timestamp: 1.0,
            description: id,
            video_id: "v".to_string(),
            embedding: None,
        }),
    }
}

fn arb_ranking(pipeline: &'static str) -> impl Strategy<Value = PipelineRanking> {
    prop::collection::vec((r"[a-f]{1,3}", 0.0_f64..10.0), 0..12).prop_map(move |raw| {
        // Engine output never repeats a doc id within one ranking.
        let mut seen = std::collections::HashSet::new();
        let hits = raw
            .into_iter()
            .filter(|(id, _)| seen.insert(id.clone()))
            .map(|(id, score)| hit(id, score))
            .collect();
        PipelineRanking {
            pipeline: pipeline.to_string(),
            hits,
        }
    })
}

fn arb_weights() -> impl Strategy<Value = HashMap<String, f64>> {
    (0.0_f64..5.0, 0.0_f64..5.0).prop_map(|(a, b)| {
        HashMap::from([("one".to_string(), a), ("two".to_string(), b)])
    })
}

proptest! {
    #[test]
    fn fusion_is_deterministic(
        a in arb_ranking("one"),
        b in arb_ranking("two"),
        weights in arb_weights(),
        top_n in 1_usize..20,
    ) {
        let rankings = vec![a, b];
        let first = fuse(&rankings, &weights, top_n);
        let second = fuse(&rankings, &weights, top_n);
        prop_assert_eq!(first.len(), second.len());
        for (x, y) in first.iter().zip(&second) {
            prop_assert_eq!(&x.doc_id, &y.doc_id);
            prop_assert_eq!(x.score.to_bits(), y.score.to_bits());
        }
    }

    #[test]
    fn scores_sorted_desc_with_id_tiebreak(
        a in arb_ranking("one"),
        b in arb_ranking("two"),
        weights in arb_weights(),
        top_n in 1_usize..20,
    ) {
        let fused = fuse(&[a, b], &weights, top_n);
        for pair in fused.windows(2) {
            let ordered = pair[0].score > pair[1].score
                || (pair[0].score == pair[1].score && pair[0].doc_id < pair[1].doc_id);
            prop_assert!(ordered, "unordered pair: {:?} then {:?}", pair[0].score, pair[1].score);
        }
    }

    #[test]
    fn truncation_never_exceeds_top_n(
        a in arb_ranking("one"),
        b in arb_ranking("two"),
        weights in arb_weights(),
        top_n in 1_usize..8,
    ) {
        let fused = fuse(&[a, b], &weights, top_n);
        prop_assert!(fused.len() <= top_n);
    }

    #[test]
    fn score_equals_sum_of_contributions(
        a in arb_ranking("one"),
        b in arb_ranking("two"),
        weights in arb_weights(),
    ) {
        let fused = fuse(&[a, b], &weights, 50);
        for result in &fused {
            let sum: f64 = result.contributions.iter().map(|c| c.contribution).sum();
            prop_assert!((result.score - sum).abs() < 1e-12);
        }
    }

    #[test]
    fn adding_a_pipeline_never_lowers_a_score(
        a in arb_ranking("one"),
        b in arb_ranking("two"),
        weights in arb_weights(),
    ) {
        let solo = fuse(std::slice::from_ref(&a), &weights, 100);
        let both = fuse(&[a, b], &weights, 100);
        for result in &solo {
            if let Some(joined) = both.iter().find(|r| r.doc_id == result.doc_id) {
                prop_assert!(joined.score >= result.score - 1e-12);
            }
        }
    }

    #[test]
    fn empty_rankings_fuse_to_nothing(
        weights in arb_weights(),
        top_n in 1_usize..10,
    ) {
        let rankings = vec![
            PipelineRanking { pipeline: "one".to_string(), hits: vec![] },
            PipelineRanking { pipeline: "two".to_string(), hits: vec![] },
        ];
        prop_assert!(fuse(&rankings, &weights, top_n).is_empty());
    }
}
