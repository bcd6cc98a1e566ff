use crate::error::{FusionError, Result};
use crate::models::{ContextBlock, FusedRanking};

/// Separator placed between passages in the rendered context.
pub const DEFAULT_SEPARATOR: &str = "\n\n...\n\n";

/// Truncates a fused ranking and renders it for the answer generator.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    separator: String,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

impl ContextAssembler {
    pub fn with_separator(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }

    /// Keep the first `limit` passages in fused order and join their content.
    pub fn assemble(&self, fused: &FusedRanking, limit: usize) -> Result<ContextBlock> {
        if limit == 0 {
            return Err(FusionError::invalid("context limit must be at least 1"));
        }

        let available = fused.len();
        let kept: Vec<&str> = fused
            .passages()
            .take(limit)
            .map(|p| p.content.as_str())
            .collect();
        let included = kept.len();

        if included < available {
            tracing::info!(
                included,
                available,
                "Context truncated to {included} of {available} fused passages"
            );
        }

        Ok(ContextBlock {
            text: kept.join(self.separator.as_str()),
            included,
            available,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Passage, RankedList};
    use crate::search::fusion::RankFuser;

    fn ranking(contents: &[&str]) -> FusedRanking {
        let list = RankedList::new("q", contents.iter().map(|c| Passage::new(*c)).collect());
        RankFuser::default().fuse(&[list])
    }

    #[test]
    fn test_truncates_to_limit_in_order() {
        let fused = ranking(&["one", "two", "three", "four", "five"]);
        let block = ContextAssembler::default().assemble(&fused, 3).unwrap();
        assert_eq!(block.text, "one\n\n...\n\ntwo\n\n...\n\nthree");
        assert_eq!(block.included, 3);
        assert_eq!(block.available, 5);
        assert!(block.truncated());
        assert_eq!(block.text.matches(DEFAULT_SEPARATOR).count(), 2);
    }

    #[test]
    fn test_limit_larger_than_ranking() {
        let fused = ranking(&["only"]);
        let block = ContextAssembler::default().assemble(&fused, 5).unwrap();
        assert_eq!(block.text, "only");
        assert_eq!(block.included, 1);
        assert!(!block.truncated());
    }

    #[test]
    fn test_empty_ranking_renders_empty_block() {
        let block = ContextAssembler::default()
            .assemble(&FusedRanking::default(), 5)
            .unwrap();
        assert!(block.text.is_empty());
        assert_eq!(block.included, 0);
        assert_eq!(block.available, 0);
    }

    #[test]
    fn test_zero_limit_rejected() {
        let err = ContextAssembler::default()
            .assemble(&ranking(&["a"]), 0)
            .unwrap_err();
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_custom_separator() {
        let block = ContextAssembler::with_separator("\n---\n")
            .assemble(&ranking(&["a", "b"]), 2)
            .unwrap();
        assert_eq!(block.text, "a\n---\nb");
    }
}
