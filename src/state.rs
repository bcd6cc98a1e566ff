use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, FusionConfig};
use crate::llm::embeddings::EmbeddingClient;
use crate::llm::generate::LlmClient;
use crate::pipeline::FusionEngine;
use crate::search::index::QdrantIndex;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<FusionEngine>,
    /// Fusion parameters; replaced at runtime via the config API.
    pub fusion: Arc<RwLock<FusionConfig>>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        config.fusion.validate()?;

        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()?;

        let generator = Arc::new(LlmClient::new(http_client.clone(), config.llm.clone()));
        let embedder = Arc::new(EmbeddingClient::new(http_client.clone(), config.llm.clone()));
        let index = Arc::new(QdrantIndex::new(
            http_client,
            config.index.clone(),
            embedder,
        ));

        Ok(Self::with_engine(
            config.fusion,
            FusionEngine::new(generator, index),
        ))
    }

    /// Build state around an already-wired engine.
    pub fn with_engine(fusion: FusionConfig, engine: FusionEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            fusion: Arc::new(RwLock::new(fusion)),
        }
    }

    /// Parameters for one request. Later config updates do not affect it.
    pub fn fusion_snapshot(&self) -> FusionConfig {
        self.fusion.read().clone()
    }
}
