use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{FusionError, Result};
use crate::search::fusion::FusionStrategy;
use crate::search::retrieve::PartialFailurePolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    /// LLM provider configuration (generation + embeddings)
    pub llm: LlmConfig,
    /// Vector index configuration
    pub index: IndexConfig,
    /// Retrieval and fusion parameters
    pub fusion: FusionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama" or "openai"
    pub provider: String,
    /// Base URL for the LLM API
    pub base_url: String,
    /// Model name for query expansion and answers
    pub chat_model: String,
    /// Model name for embeddings
    pub embedding_model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
}

/// Qdrant collection holding the pre-embedded passages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub url: String,
    pub collection: String,
    pub api_key: Option<String>,
    /// Payload field that holds the passage text.
    pub content_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Rrf,
    DedupOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Number of rephrasings requested from the generator
    pub variant_count: usize,
    /// Passages fetched per variant (k)
    pub retrieval_depth: usize,
    /// RRF dampening constant (c)
    pub fusion_constant: f64,
    /// Passages kept in the rendered context
    pub context_limit: usize,
    pub partial_failure_policy: PartialFailurePolicy,
    pub strategy: StrategyKind,
    /// Upper bound on any single collaborator call
    pub collaborator_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9000".to_string(),
            llm: LlmConfig::default(),
            index: IndexConfig::default(),
            fusion: FusionConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            chat_model: "llama3.2".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            api_key: None,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6333".to_string(),
            collection: "pdf_chunks".to_string(),
            api_key: None,
            content_key: "page_content".to_string(),
        }
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            variant_count: 3,
            retrieval_depth: 3,
            fusion_constant: 60.0,
            context_limit: 5,
            partial_failure_policy: PartialFailurePolicy::FailFast,
            strategy: StrategyKind::Rrf,
            collaborator_timeout_secs: 30,
        }
    }
}

impl FusionConfig {
    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.variant_count == 0 {
            return Err(FusionError::invalid("variant_count must be at least 1"));
        }
        if self.retrieval_depth == 0 {
            return Err(FusionError::invalid("retrieval_depth must be at least 1"));
        }
        if self.context_limit == 0 {
            return Err(FusionError::invalid("context_limit must be at least 1"));
        }
        if !self.fusion_constant.is_finite() || self.fusion_constant < 0.0 {
            return Err(FusionError::invalid(format!(
                "fusion_constant must be a finite value >= 0, got {}",
                self.fusion_constant
            )));
        }
        if self.collaborator_timeout_secs == 0 {
            return Err(FusionError::invalid(
                "collaborator_timeout_secs must be at least 1",
            ));
        }
        Ok(())
    }

    pub fn strategy(&self) -> FusionStrategy {
        match self.strategy {
            StrategyKind::Rrf => FusionStrategy::Rrf {
                c: self.fusion_constant,
            },
            StrategyKind::DedupOnly => FusionStrategy::DedupOnly,
        }
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_secs(self.collaborator_timeout_secs)
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("RAG_FUSION_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Ok(model) = std::env::var("LLM_EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            config.llm.api_key = Some(key);
        }

        // Index config
        if let Ok(url) = std::env::var("QDRANT_URL") {
            config.index.url = url;
        }
        if let Ok(collection) = std::env::var("QDRANT_COLLECTION") {
            config.index.collection = collection;
        }
        if let Ok(key) = std::env::var("QDRANT_API_KEY") {
            config.index.api_key = Some(key);
        }
        if let Ok(key) = std::env::var("QDRANT_CONTENT_KEY") {
            config.index.content_key = key;
        }

        // Fusion config
        parse_env("FUSION_VARIANT_COUNT", &mut config.fusion.variant_count);
        parse_env("FUSION_RETRIEVAL_DEPTH", &mut config.fusion.retrieval_depth);
        parse_env("FUSION_CONSTANT", &mut config.fusion.fusion_constant);
        parse_env("FUSION_CONTEXT_LIMIT", &mut config.fusion.context_limit);
        if let Ok(val) = std::env::var("FUSION_PARTIAL_FAILURE") {
            match val.as_str() {
                "fail_fast" => config.fusion.partial_failure_policy = PartialFailurePolicy::FailFast,
                "substitute_empty" => {
                    config.fusion.partial_failure_policy = PartialFailurePolicy::SubstituteEmpty
                }
                other => tracing::warn!("Ignoring unknown FUSION_PARTIAL_FAILURE value: {other}"),
            }
        }
        if let Ok(val) = std::env::var("FUSION_STRATEGY") {
            match val.as_str() {
                "rrf" => config.fusion.strategy = StrategyKind::Rrf,
                "dedup_only" => config.fusion.strategy = StrategyKind::DedupOnly,
                other => tracing::warn!("Ignoring unknown FUSION_STRATEGY value: {other}"),
            }
        }
        parse_env(
            "FUSION_TIMEOUT_SECS",
            &mut config.fusion.collaborator_timeout_secs,
        );

        config
    }
}

/// Overwrite `slot` from env var `name`; unparseable values keep the default.
fn parse_env<T: FromStr>(name: &str, slot: &mut T) {
    if let Ok(val) = std::env::var(name) {
        match val.trim().parse() {
            Ok(v) => *slot = v,
            Err(_) => tracing::warn!("Ignoring unparseable {name} value: {val}"),
        }
    }
}
