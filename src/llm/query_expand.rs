use std::sync::Arc;
use std::time::Duration;

use crate::error::{call_upstream, FusionError, Result};
use crate::llm::generate::TextGenerator;

/// Control tokens that would let user text escape its slot in a chat template.
const CHAT_CONTROL_TOKENS: [&str; 3] = ["<|im_start|>", "<|im_end|>", "<|endoftext|>"];

/// Strip chat-template control tokens from text headed into a prompt.
pub fn sanitize_for_prompt(text: &str) -> String {
    let mut out = text.to_string();
    for token in CHAT_CONTROL_TOKENS {
        if out.contains(token) {
            out = out.replace(token, "");
        }
    }
    out
}

/// Rephrases one query into several variants through a text generator.
#[derive(Clone)]
pub struct QueryExpander {
    generator: Arc<dyn TextGenerator>,
    timeout: Option<Duration>,
}

impl QueryExpander {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Return `original` followed by up to `count` generated rephrasings.
    ///
    /// A response with no usable lines is logged and the original query is
    /// used alone. Generator failures are returned, not retried.
    #[tracing::instrument(skip(self))]
    pub async fn expand(&self, original: &str, count: usize) -> Result<Vec<String>> {
        if original.trim().is_empty() {
            return Err(FusionError::invalid("query must not be empty"));
        }
        if count == 0 {
            return Err(FusionError::invalid("variant count must be at least 1"));
        }

        let prompt = build_expansion_prompt(original, count);
        let response = call_upstream(
            "generation",
            self.timeout,
            self.generator.generate(&prompt),
        )
        .await?;

        let generated = match parse_variants(&response, count) {
            Ok(lines) => lines,
            Err(e) => {
                tracing::warn!("{e}. Continuing with the original query only");
                Vec::new()
            }
        };

        if generated.len() < count {
            tracing::debug!(
                "Generator produced {} of {count} requested variants",
                generated.len()
            );
        }

        let mut variants = Vec::with_capacity(generated.len() + 1);
        variants.push(original.to_string());
        variants.extend(generated);
        tracing::debug!(?variants, "Query expanded");
        Ok(variants)
    }
}

fn build_expansion_prompt(original: &str, count: usize) -> String {
    let query = sanitize_for_prompt(original);
    format!(
        "Generate {count} different ways to ask this question: {query}\n\n\
         Write each rephrasing on its own line. Do not add explanations."
    )
}

/// Split a generator response into trimmed, non-empty lines, keeping at most `count`.
fn parse_variants(content: &str, count: usize) -> Result<Vec<String>> {
    let lines: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(count)
        .map(str::to_string)
        .collect();

    if lines.is_empty() {
        let preview: String = content.chars().take(80).collect();
        return Err(FusionError::MalformedUpstreamOutput(format!(
            "no usable variant lines in generator output {preview:?}"
        )));
    }
    Ok(lines)
}
