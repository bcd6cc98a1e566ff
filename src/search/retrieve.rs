use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};

use crate::error::{call_upstream, FusionError, Result};
use crate::models::RankedList;
use crate::search::index::SimilaritySearch;

/// What to do when one variant's retrieval fails or times out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialFailurePolicy {
    /// Any failure fails the whole call.
    #[default]
    FailFast,
    /// A failed variant contributes an empty list; the rest proceed.
    SubstituteEmpty,
}

/// Runs one similarity search per query variant, concurrently.
#[derive(Clone)]
pub struct ParallelRetriever {
    index: Arc<dyn SimilaritySearch>,
    policy: PartialFailurePolicy,
    timeout: Option<Duration>,
}

impl ParallelRetriever {
    pub fn new(index: Arc<dyn SimilaritySearch>) -> Self {
        Self {
            index,
            policy: PartialFailurePolicy::default(),
            timeout: None,
        }
    }

    pub fn with_policy(mut self, policy: PartialFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Retrieve the top `k` passages for every variant.
    ///
    /// All searches are awaited before anything is returned. Output position
    /// `i` always belongs to `variants[i]`, whatever order the searches finish in.
    #[tracing::instrument(skip(self, variants), fields(variants = variants.len()))]
    pub async fn retrieve_all(&self, variants: &[String], k: usize) -> Result<Vec<RankedList>> {
        if k == 0 {
            return Err(FusionError::invalid("retrieval depth must be at least 1"));
        }

        let searches = variants
            .iter()
            .map(|variant| call_upstream("search", self.timeout, self.index.search(variant, k)));
        let outcomes = join_all(searches).await;

        let mut lists = Vec::with_capacity(variants.len());
        for (i, (variant, outcome)) in variants.iter().zip(outcomes).enumerate() {
            match outcome {
                Ok(mut passages) => {
                    if passages.len() > k {
                        tracing::debug!(
                            "Variant {} returned {} passages, keeping top {k}",
                            i + 1,
                            passages.len()
                        );
                        passages.truncate(k);
                    }
                    tracing::debug!("Variant {}: {} passages for {variant:?}", i + 1, passages.len());
                    lists.push(RankedList::new(variant.clone(), passages));
                }
                Err(e) => match self.policy {
                    PartialFailurePolicy::FailFast => {
                        tracing::warn!("Retrieval failed for variant {}: {e}", i + 1);
                        return Err(e);
                    }
                    PartialFailurePolicy::SubstituteEmpty => {
                        tracing::warn!(
                            "Retrieval failed for variant {}: {e}. Substituting an empty list",
                            i + 1
                        );
                        lists.push(RankedList::empty(variant.clone()));
                    }
                },
            }
        }

        Ok(lists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Passage;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Index that answers per query after an optional delay, or fails.
    struct Scripted {
        replies: HashMap<String, (u64, Option<Vec<&'static str>>)>,
    }

    #[async_trait]
    impl SimilaritySearch for Scripted {
        async fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<Passage>> {
            let (delay_ms, reply) = self
                .replies
                .get(query)
                .cloned()
                .unwrap_or((0, Some(Vec::new())));
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            match reply {
                Some(contents) => Ok(contents.into_iter().take(k).map(Passage::new).collect()),
                None => anyhow::bail!("index unreachable"),
            }
        }
    }

    fn variants(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_output_order_matches_input_despite_completion_order() {
        let index = Scripted {
            replies: HashMap::from([
                ("A".to_string(), (80, Some(vec!["a1"]))),
                ("B".to_string(), (5, Some(vec!["b1"]))),
                ("C".to_string(), (20, Some(vec!["c1"]))),
            ]),
        };
        let retriever = ParallelRetriever::new(Arc::new(index));
        let lists = retriever
            .retrieve_all(&variants(&["A", "B", "C"]), 3)
            .await
            .unwrap();
        let order: Vec<&str> = lists.iter().map(|l| l.variant.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
        assert_eq!(lists[0].passages[0].content, "a1");
        assert_eq!(lists[2].passages[0].content, "c1");
    }

    #[tokio::test]
    async fn test_lists_truncated_to_k() {
        struct Greedy;
        #[async_trait]
        impl SimilaritySearch for Greedy {
            async fn search(&self, _query: &str, _k: usize) -> anyhow::Result<Vec<Passage>> {
                Ok((0..10).map(|i| Passage::new(format!("p{i}"))).collect())
            }
        }
        let lists = ParallelRetriever::new(Arc::new(Greedy))
            .retrieve_all(&variants(&["q"]), 3)
            .await
            .unwrap();
        assert_eq!(lists[0].len(), 3);
    }

    #[tokio::test]
    async fn test_fail_fast_fails_whole_call() {
        let index = Scripted {
            replies: HashMap::from([
                ("A".to_string(), (0, Some(vec!["a1"]))),
                ("B".to_string(), (0, None)),
            ]),
        };
        let err = ParallelRetriever::new(Arc::new(index))
            .retrieve_all(&variants(&["A", "B"]), 3)
            .await
            .unwrap_err();
        assert!(err.is_upstream());
    }

    #[tokio::test]
    async fn test_substitute_empty_keeps_positions() {
        let index = Scripted {
            replies: HashMap::from([
                ("A".to_string(), (0, Some(vec!["a1", "a2"]))),
                ("B".to_string(), (0, None)),
                ("C".to_string(), (0, Some(vec!["c1"]))),
            ]),
        };
        let lists = ParallelRetriever::new(Arc::new(index))
            .with_policy(PartialFailurePolicy::SubstituteEmpty)
            .retrieve_all(&variants(&["A", "B", "C"]), 3)
            .await
            .unwrap();
        assert_eq!(lists.len(), 3);
        assert_eq!(lists[0].len(), 2);
        assert!(lists[1].is_empty());
        assert_eq!(lists[1].variant, "B");
        assert_eq!(lists[2].passages[0].content, "c1");
    }

    #[tokio::test]
    async fn test_timeout_treated_as_failure() {
        let index = Scripted {
            replies: HashMap::from([
                ("slow".to_string(), (2_000, Some(vec!["late"]))),
                ("fast".to_string(), (0, Some(vec!["early"]))),
            ]),
        };
        let retriever = ParallelRetriever::new(Arc::new(index)).with_timeout(Duration::from_millis(50));

        let err = retriever
            .retrieve_all(&variants(&["fast", "slow"]), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, FusionError::Timeout { .. }));

        let lists = retriever
            .with_policy(PartialFailurePolicy::SubstituteEmpty)
            .retrieve_all(&variants(&["fast", "slow"]), 3)
            .await
            .unwrap();
        assert_eq!(lists[0].passages[0].content, "early");
        assert!(lists[1].is_empty());
    }

    #[tokio::test]
    async fn test_zero_depth_rejected() {
        let index = Scripted {
            replies: HashMap::new(),
        };
        let err = ParallelRetriever::new(Arc::new(index))
            .retrieve_all(&variants(&["q"]), 0)
            .await
            .unwrap_err();
        assert!(err.is_caller_error());
    }

    #[tokio::test]
    async fn test_no_variants_yields_no_lists() {
        let index = Scripted {
            replies: HashMap::new(),
        };
        let lists = ParallelRetriever::new(Arc::new(index))
            .retrieve_all(&[], 3)
            .await
            .unwrap();
        assert!(lists.is_empty());
    }
}
