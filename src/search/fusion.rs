use std::collections::HashMap;

use crate::error::{FusionError, Result};
use crate::models::{Contribution, FusedPassage, FusedRanking, RankedList};

/// Conventional RRF constant.
pub const DEFAULT_FUSION_CONSTANT: f64 = 60.0;

/// How a passage's rank turns into a score contribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FusionStrategy {
    /// Reciprocal rank fusion: each occurrence adds `1 / (c + rank)`.
    Rrf { c: f64 },
    /// Union and dedup only. Every occurrence adds nothing, so the result is
    /// first-seen order (the `c -> inf` limit of RRF).
    DedupOnly,
}

impl Default for FusionStrategy {
    fn default() -> Self {
        Self::Rrf {
            c: DEFAULT_FUSION_CONSTANT,
        }
    }
}

impl FusionStrategy {
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Rrf { c } if !c.is_finite() || c < 0.0 => Err(FusionError::invalid(format!(
                "fusion constant must be a finite value >= 0, got {c}"
            ))),
            _ => Ok(()),
        }
    }

    /// Score added for one occurrence at 1-based `rank`.
    #[inline]
    pub fn contribution(&self, rank: usize) -> f64 {
        match *self {
            Self::Rrf { c } => 1.0 / (c + rank as f64),
            Self::DedupOnly => 0.0,
        }
    }
}

/// Merges per-variant ranked lists into one consensus ranking.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankFuser {
    strategy: FusionStrategy,
}

impl RankFuser {
    pub fn new(strategy: FusionStrategy) -> Result<Self> {
        strategy.validate()?;
        Ok(Self { strategy })
    }

    pub fn rrf(c: f64) -> Result<Self> {
        Self::new(FusionStrategy::Rrf { c })
    }

    /// Fuse `lists` into a deduplicated ranking.
    ///
    /// Lists are replayed in input order and, within a list, by ascending
    /// rank. The first time a content string is seen fixes its ledger slot
    /// and the passage object that represents it. Later occurrences only add
    /// score. The final sort is stable on descending score, so equal scores
    /// keep ledger order.
    ///
    /// Never fails; an empty input yields an empty ranking.
    pub fn fuse(&self, lists: &[RankedList]) -> FusedRanking {
        let mut ledger: Vec<FusedPassage> = Vec::new();
        let mut slots: HashMap<&str, usize> = HashMap::new();

        for (variant, list) in lists.iter().enumerate() {
            for (rank, passage) in list.ranked() {
                let delta = self.strategy.contribution(rank);
                let contribution = Contribution {
                    variant,
                    rank,
                    delta,
                };

                match slots.get(passage.content.as_str()) {
                    Some(&slot) => {
                        let entry = &mut ledger[slot];
                        entry.score += delta;
                        entry.contributions.push(contribution);
                    }
                    None => {
                        slots.insert(passage.content.as_str(), ledger.len());
                        ledger.push(FusedPassage {
                            passage: passage.clone(),
                            score: delta,
                            contributions: vec![contribution],
                        });
                    }
                }
            }
        }

        // sort_by is stable: ties stay in ledger order
        ledger.sort_by(|a, b| b.score.total_cmp(&a.score));

        tracing::debug!(
            lists = lists.len(),
            fused = ledger.len(),
            "Fused ranked lists"
        );

        FusedRanking { entries: ledger }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Passage;

    const EPS: f64 = 1e-12;

    fn list(variant: &str, contents: &[&str]) -> RankedList {
        RankedList::new(
            variant,
            contents.iter().map(|c| Passage::new(*c)).collect(),
        )
    }

    fn fuser() -> RankFuser {
        RankFuser::rrf(60.0).unwrap()
    }

    #[test]
    fn test_empty_inputs() {
        assert!(fuser().fuse(&[]).is_empty());
        assert!(fuser().fuse(&[RankedList::empty("q")]).is_empty());
    }

    #[test]
    fn test_single_occurrence_score_formula() {
        let fused = fuser().fuse(&[list("q", &["a", "b", "c"])]);
        for (i, entry) in fused.entries.iter().enumerate() {
            let rank = (i + 1) as f64;
            assert!((entry.score - 1.0 / (60.0 + rank)).abs() < EPS);
        }
    }

    #[test]
    fn test_cumulative_rank_two_beats_single_rank_one() {
        // 2/62 = 0.032258 > 1/61 = 0.016393
        assert!(2.0 / 62.0 > 1.0 / 61.0);

        let fused = fuser().fuse(&[list("q1", &["top", "twice"]), list("q2", &["x", "twice"])]);
        assert_eq!(fused.entries[0].passage.content, "twice");
        assert!((fused.entries[0].score - 2.0 / 62.0).abs() < EPS);
        let top = fused
            .entries
            .iter()
            .find(|e| e.passage.content == "top")
            .unwrap();
        assert!((top.score - 1.0 / 61.0).abs() < EPS);
    }

    #[test]
    fn test_worked_example_order() {
        let fused = fuser().fuse(&[list("v1", &["P1", "P2"]), list("v2", &["P2", "P3"])]);
        assert_eq!(fused.contents(), vec!["P2", "P1", "P3"]);
        assert!((fused.entries[0].score - (1.0 / 61.0 + 1.0 / 62.0)).abs() < EPS);
        assert!((fused.entries[1].score - 1.0 / 61.0).abs() < EPS);
        assert!((fused.entries[2].score - 1.0 / 62.0).abs() < EPS);
    }

    #[test]
    fn test_ties_keep_first_discovery_order() {
        // Every passage appears once at rank 1 in its own list: all scores equal.
        let lists = vec![list("a", &["z"]), list("b", &["m"]), list("c", &["a"])];
        let fused = fuser().fuse(&lists);
        assert_eq!(fused.contents(), vec!["z", "m", "a"]);
    }

    #[test]
    fn test_ties_across_ranks_keep_ledger_order() {
        // x: ranks 1 and 2, y: ranks 2 and 1 -> identical sums, x discovered first.
        let fused = fuser().fuse(&[list("a", &["x", "y"]), list("b", &["y", "x"])]);
        assert_eq!(fused.contents(), vec!["x", "y"]);
        assert_eq!(fused.entries[0].score, fused.entries[1].score);
    }

    #[test]
    fn test_duplicate_list_doubles_score_without_duplicates() {
        let single = fuser().fuse(&[list("q", &["a", "b"])]);
        let doubled = fuser().fuse(&[list("q", &["a", "b"]), list("q", &["a", "b"])]);
        assert_eq!(doubled.len(), 2);
        for (s, d) in single.entries.iter().zip(&doubled.entries) {
            assert_eq!(s.passage.content, d.passage.content);
            assert!((d.score - 2.0 * s.score).abs() < EPS);
        }
    }

    #[test]
    fn test_first_occurrence_metadata_retained() {
        let first = Passage::new("same").with_metadata("page", 1);
        let second = Passage::new("same").with_metadata("page", 9);
        let fused = fuser().fuse(&[
            RankedList::new("a", vec![first]),
            RankedList::new("b", vec![second]),
        ]);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused.entries[0].passage.metadata["page"], 1);
        assert_eq!(fused.entries[0].contributions.len(), 2);
    }

    #[test]
    fn test_contributions_record_variant_and_rank() {
        let fused = fuser().fuse(&[list("a", &["p", "q"]), list("b", &["q"])]);
        let q = &fused.entries[0];
        assert_eq!(q.passage.content, "q");
        assert_eq!(
            q.contributions
                .iter()
                .map(|c| (c.variant, c.rank))
                .collect::<Vec<_>>(),
            vec![(0, 2), (1, 1)]
        );
    }

    #[test]
    fn test_all_lists_rank_one_scores_maximum() {
        let lists: Vec<_> = (0..4).map(|i| list(&format!("v{i}"), &["best", "other"])).collect();
        let fused = fuser().fuse(&lists);
        assert_eq!(fused.entries[0].passage.content, "best");
        assert!((fused.entries[0].score - 4.0 / 61.0).abs() < EPS);
    }

    #[test]
    fn test_zero_constant_is_accepted() {
        let fused = RankFuser::rrf(0.0).unwrap().fuse(&[list("q", &["a", "b"])]);
        assert!((fused.entries[0].score - 1.0).abs() < EPS);
        assert!((fused.entries[1].score - 0.5).abs() < EPS);
    }

    #[test]
    fn test_negative_constant_rejected() {
        let err = RankFuser::rrf(-1.0).unwrap_err();
        assert!(err.is_caller_error());
        assert!(RankFuser::rrf(f64::INFINITY).is_err());
    }

    #[test]
    fn test_dedup_only_is_first_seen_concatenation() {
        let fuser = RankFuser::new(FusionStrategy::DedupOnly).unwrap();
        let fused = fuser.fuse(&[list("a", &["1", "2", "3"]), list("b", &["3", "4", "1"])]);
        assert_eq!(fused.contents(), vec!["1", "2", "3", "4"]);
        assert!(fused.entries.iter().all(|e| e.score == 0.0));
    }

    #[test]
    fn test_deterministic_across_runs() {
        let lists = vec![
            list("a", &["p1", "p2", "p3"]),
            list("b", &["p3", "p4", "p1"]),
            list("c", &["p5", "p2", "p4"]),
        ];
        let first = fuser().fuse(&lists).contents().join(",");
        for _ in 0..20 {
            assert_eq!(fuser().fuse(&lists).contents().join(","), first);
        }
    }
}
