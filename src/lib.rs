//! # rag-fusion
//!
//! Multi-query retrieval for retrieval-augmented answering. One question is
//! rephrased several ways, each phrasing is searched against a vector index,
//! and the independent rankings are merged with Reciprocal Rank Fusion into a
//! single deduplicated ordering that feeds the answer prompt.
//!
//! ## Architecture
//!
//! ```text
//!                        ┌─────────────┐
//!                        │  User Query  │
//!                        └──────┬───────┘
//!                               │
//!                               ▼
//!                   ┌───────────────────────┐
//!                   │    QueryExpander      │
//!                   │ original + N variants │
//!                   └───────────┬───────────┘
//!                               │ N+1 queries
//!           ┌───────────────────┼───────────────────┐
//!           ▼                   ▼                   ▼
//!    ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//!    │ Original Q  │     │  Variant 1  │     │  Variant N  │
//!    │ top-k search│     │ top-k search│     │ top-k search│
//!    └──────┬──────┘     └──────┬──────┘     └──────┬──────┘
//!           │     (concurrent, joined in input order)
//!           └───────────────────┼───────────────────┘
//!                               │ N+1 ranked lists
//!                               ▼
//!                   ┌───────────────────────┐
//!                   │      RankFuser        │
//!                   │ Σ 1/(c + rank), dedup │
//!                   │ by content, stable    │
//!                   └───────────┬───────────┘
//!                               │
//!                               ▼
//!                   ┌───────────────────────┐
//!                   │  ContextAssembler     │
//!                   │  first `limit` only   │
//!                   └───────────┬───────────┘
//!                               │
//!                               ▼
//!                   ┌───────────────────────┐
//!                   │  Answer (optional)    │
//!                   └───────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, LLM, index and fusion parameters
//! - [`error`] - Error taxonomy shared by every stage
//! - [`models`] - Passages, ranked lists, fused rankings, context blocks, request/response types
//! - [`llm::generate`] - Text generation via Ollama or OpenAI-compatible APIs
//! - [`llm::embeddings`] - Query embeddings for the vector index
//! - [`llm::query_expand`] - Query rephrasing
//! - [`search::index`] - Similarity search capability and the Qdrant adapter
//! - [`search::retrieve`] - Concurrent per-variant retrieval with an explicit failure policy
//! - [`search::fusion`] - Reciprocal Rank Fusion with deterministic tie-breaking
//! - [`search::context`] - Context truncation and rendering
//! - [`pipeline`] - The end-to-end engine
//! - [`api`] - Axum HTTP handlers
//! - [`state`] - Shared application state

pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod search;
pub mod state;
