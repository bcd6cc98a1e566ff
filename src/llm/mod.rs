pub mod embeddings;
pub mod generate;
pub mod query_expand;
