use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::StrategyKind;
use crate::search::retrieve::PartialFailurePolicy;

/// One retrievable unit of content. Identity for fusion is `content`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Similarity reported by the index. Not used for fusion.
    #[serde(default)]
    pub score: Option<f32>,
}

impl Passage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Map::new(),
            score: None,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Best-first passages retrieved for a single query variant.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RankedList {
    pub variant: String,
    pub passages: Vec<Passage>,
}

impl RankedList {
    pub fn new(variant: impl Into<String>, passages: Vec<Passage>) -> Self {
        Self {
            variant: variant.into(),
            passages,
        }
    }

    pub fn empty(variant: impl Into<String>) -> Self {
        Self::new(variant, Vec::new())
    }

    /// Passages paired with their 1-based rank.
    pub fn ranked(&self) -> impl Iterator<Item = (usize, &Passage)> {
        self.passages.iter().enumerate().map(|(i, p)| (i + 1, p))
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

/// One score contribution: the passage sat at `rank` in list `variant`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Contribution {
    pub variant: usize,
    pub rank: usize,
    pub delta: f64,
}

/// A deduplicated passage with its accumulated fusion score.
#[derive(Debug, Clone, Serialize)]
pub struct FusedPassage {
    /// First occurrence seen; later duplicates never overwrite it.
    pub passage: Passage,
    pub score: f64,
    /// Every occurrence, in the order fusion replayed them.
    pub contributions: Vec<Contribution>,
}

/// Consensus ordering produced by fusion. Terminal; consumed once.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FusedRanking {
    pub entries: Vec<FusedPassage>,
}

impl FusedRanking {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn passages(&self) -> impl Iterator<Item = &Passage> {
        self.entries.iter().map(|e| &e.passage)
    }

    pub fn contents(&self) -> Vec<&str> {
        self.passages().map(|p| p.content.as_str()).collect()
    }
}

/// Rendered context handed to the answer generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextBlock {
    pub text: String,
    /// Passages rendered into `text`
    pub included: usize,
    /// Passages the fused ranking offered
    pub available: usize,
}

impl ContextBlock {
    pub fn truncated(&self) -> bool {
        self.included < self.available
    }
}

/// Everything one fusion call produced, for callers and diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct FusionOutcome {
    pub request_id: Uuid,
    pub query: String,
    /// Original query first, then generated rephrasings
    pub variants: Vec<String>,
    pub ranking: FusedRanking,
    pub context: ContextBlock,
}

impl FusionOutcome {
    /// Nothing relevant was found. Not an error.
    pub fn is_empty(&self) -> bool {
        self.ranking.is_empty()
    }
}

/// Fuse/ask request
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// Fused passage as returned over HTTP
#[derive(Debug, Clone, Serialize)]
pub struct FusedHit {
    pub content: String,
    pub metadata: Map<String, Value>,
    pub score: f64,
    pub contributions: Vec<Contribution>,
}

impl From<&FusedPassage> for FusedHit {
    fn from(entry: &FusedPassage) -> Self {
        Self {
            content: entry.passage.content.clone(),
            metadata: entry.passage.metadata.clone(),
            score: entry.score,
            contributions: entry.contributions.clone(),
        }
    }
}

/// Fuse response
#[derive(Debug, Clone, Serialize)]
pub struct FuseResponse {
    pub request_id: Uuid,
    pub query: String,
    pub variants: Vec<String>,
    pub results: Vec<FusedHit>,
    pub context: String,
    pub included: usize,
    pub available: usize,
}

impl From<&FusionOutcome> for FuseResponse {
    fn from(outcome: &FusionOutcome) -> Self {
        Self {
            request_id: outcome.request_id,
            query: outcome.query.clone(),
            variants: outcome.variants.clone(),
            results: outcome.ranking.entries.iter().map(FusedHit::from).collect(),
            context: outcome.context.text.clone(),
            included: outcome.context.included,
            available: outcome.context.available,
        }
    }
}

/// Ask response
#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub answer: String,
    #[serde(flatten)]
    pub retrieval: FuseResponse,
}

/// Fusion config update request; absent fields keep their current value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FusionConfigUpdate {
    pub variant_count: Option<usize>,
    pub retrieval_depth: Option<usize>,
    pub fusion_constant: Option<f64>,
    pub context_limit: Option<usize>,
    pub partial_failure_policy: Option<PartialFailurePolicy>,
    pub strategy: Option<StrategyKind>,
    pub collaborator_timeout_secs: Option<u64>,
}
