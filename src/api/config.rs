use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::api::error_status;
use crate::config::FusionConfig;
use crate::models::FusionConfigUpdate;
use crate::state::AppState;

/// GET /api/config - Current fusion parameters
pub async fn get_config(State(state): State<AppState>) -> Json<FusionConfig> {
    Json(state.fusion_snapshot())
}

/// PUT /api/config - Update fusion parameters. Applies to later requests only.
pub async fn update_config(
    State(state): State<AppState>,
    Json(update): Json<FusionConfigUpdate>,
) -> Result<Json<FusionConfig>, (StatusCode, String)> {
    let mut candidate = state.fusion_snapshot();
    apply_update(&mut candidate, update);
    candidate.validate().map_err(error_status)?;

    *state.fusion.write() = candidate.clone();
    tracing::info!(?candidate, "Fusion config updated");
    Ok(Json(candidate))
}

fn apply_update(config: &mut FusionConfig, update: FusionConfigUpdate) {
    if let Some(v) = update.variant_count {
        config.variant_count = v;
    }
    if let Some(v) = update.retrieval_depth {
        config.retrieval_depth = v;
    }
    if let Some(v) = update.fusion_constant {
        config.fusion_constant = v;
    }
    if let Some(v) = update.context_limit {
        config.context_limit = v;
    }
    if let Some(v) = update.partial_failure_policy {
        config.partial_failure_policy = v;
    }
    if let Some(v) = update.strategy {
        config.strategy = v;
    }
    if let Some(v) = update.collaborator_timeout_secs {
        config.collaborator_timeout_secs = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrategyKind;

    #[test]
    fn test_apply_update_only_touches_given_fields() {
        let mut config = FusionConfig::default();
        let update: FusionConfigUpdate =
            serde_json::from_str(r#"{"context_limit": 8, "strategy": "dedup_only"}"#).unwrap();
        apply_update(&mut config, update);
        assert_eq!(config.context_limit, 8);
        assert_eq!(config.strategy, StrategyKind::DedupOnly);
        assert_eq!(config.variant_count, 3);
        assert_eq!(config.fusion_constant, 60.0);
    }

    #[test]
    fn test_apply_update_can_produce_invalid_config() {
        let mut config = FusionConfig::default();
        apply_update(
            &mut config,
            FusionConfigUpdate {
                fusion_constant: Some(-5.0),
                ..Default::default()
            },
        );
        assert!(config.validate().is_err());
    }
}
