use axum::routing::{get, post, put};
use axum::Router;
use tracing_subscriber::EnvFilter;

use rag_fusion::api;
use rag_fusion::config::Config;
use rag_fusion::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!("LLM provider: {} ({})", config.llm.provider, config.llm.base_url);
    tracing::info!(
        "Vector index: {} collection '{}'",
        config.index.url,
        config.index.collection
    );
    tracing::info!(
        "Fusion: {} variants, k={}, c={}, context limit {}, {:?}",
        config.fusion.variant_count,
        config.fusion.retrieval_depth,
        config.fusion.fusion_constant,
        config.fusion.context_limit,
        config.fusion.partial_failure_policy
    );

    let state = AppState::new(config.clone())?;

    let app = Router::new()
        .route("/api/fuse", post(api::fuse::fuse))
        .route("/api/ask", post(api::ask::ask))
        .route("/api/config", get(api::config::get_config))
        .route("/api/config", put(api::config::update_config))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
