use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use crate::config::FusionConfig;
use crate::error::{call_upstream, FusionError, Result};
use crate::llm::generate::TextGenerator;
use crate::llm::query_expand::{sanitize_for_prompt, QueryExpander};
use crate::models::FusionOutcome;
use crate::search::context::ContextAssembler;
use crate::search::fusion::RankFuser;
use crate::search::index::SimilaritySearch;
use crate::search::retrieve::ParallelRetriever;

/// Answer returned when fusion found nothing to ground an answer on.
pub const NO_CONTENT_ANSWER: &str = "No relevant content was found for this question.";

const ANSWER_INSTRUCTIONS: &str = "You are a document assistant. Answer the user's question \
     using only the provided excerpts.\n\
     - For summaries, give a brief overview of the key points.\n\
     - For specific questions, extract and present the relevant information directly.\n\
     - For explanations, start with a simple overview, then add detail if needed.\n\
     - If the excerpts do not contain the answer, reply: \"The documents do not contain this information.\"\n\
     Be clear and concise.";

/// Multi-query retrieval with rank fusion.
///
/// Stateless between calls: every call validates its parameters, expands the
/// query, searches once per variant, fuses and renders from scratch.
#[derive(Clone)]
pub struct FusionEngine {
    generator: Arc<dyn TextGenerator>,
    index: Arc<dyn SimilaritySearch>,
    assembler: ContextAssembler,
}

impl FusionEngine {
    pub fn new(generator: Arc<dyn TextGenerator>, index: Arc<dyn SimilaritySearch>) -> Self {
        Self {
            generator,
            index,
            assembler: ContextAssembler::default(),
        }
    }

    pub fn with_assembler(mut self, assembler: ContextAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    /// Expand, retrieve, fuse and render context for `query`.
    ///
    /// An empty ranking is a normal outcome; check [`FusionOutcome::is_empty`].
    pub async fn run(&self, query: &str, params: &FusionConfig) -> Result<FusionOutcome> {
        params.validate()?;
        if query.trim().is_empty() {
            return Err(FusionError::invalid("query must not be empty"));
        }

        let request_id = Uuid::new_v4();
        self.run_stages(request_id, query, params)
            .instrument(tracing::info_span!("fusion", %request_id))
            .await
    }

    async fn run_stages(
        &self,
        request_id: Uuid,
        query: &str,
        params: &FusionConfig,
    ) -> Result<FusionOutcome> {
        let timeout = params.collaborator_timeout();
        let fuser = RankFuser::new(params.strategy())?;

        let variants = QueryExpander::new(self.generator.clone())
            .with_timeout(timeout)
            .expand(query, params.variant_count)
            .await?;

        let lists = ParallelRetriever::new(self.index.clone())
            .with_policy(params.partial_failure_policy)
            .with_timeout(timeout)
            .retrieve_all(&variants, params.retrieval_depth)
            .await?;

        let ranking = fuser.fuse(&lists);
        let context = self.assembler.assemble(&ranking, params.context_limit)?;

        tracing::info!(
            variants = variants.len(),
            fused = ranking.len(),
            included = context.included,
            "Fusion complete"
        );

        Ok(FusionOutcome {
            request_id,
            query: query.to_string(),
            variants,
            ranking,
            context,
        })
    }

    /// Run fusion, then ask the generator to answer from the fused context.
    ///
    /// The generator is not called when nothing was retrieved.
    pub async fn answer(&self, query: &str, params: &FusionConfig) -> Result<(String, FusionOutcome)> {
        let outcome = self.run(query, params).await?;

        if outcome.is_empty() {
            tracing::info!(request_id = %outcome.request_id, "No relevant content found");
            return Ok((NO_CONTENT_ANSWER.to_string(), outcome));
        }

        let prompt = build_answer_prompt(&outcome.context.text, query);
        let answer = call_upstream(
            "generation",
            Some(params.collaborator_timeout()),
            self.generator.generate(&prompt),
        )
        .await?;

        Ok((answer.trim().to_string(), outcome))
    }
}

fn build_answer_prompt(context: &str, question: &str) -> String {
    let context = sanitize_for_prompt(context);
    let question = sanitize_for_prompt(question);
    format!(
        "{ANSWER_INSTRUCTIONS}\n\nRelevant excerpts:\n{context}\n\n\
         User's question: {question}\n\nAnswer:"
    )
}
