//! Configuration handlers
//!
//! - GET   /api/config          - full configuration, secrets stripped
//! - PATCH /api/config/pipeline - update defaults for new sessions

use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::config::{AppConfig, PipelineConfig};
use crate::error::{AppError, Result};
use crate::events::SystemEvent;
use crate::pipeline::RenderMode;
use crate::state::AppState;

fn sanitize_config_for_api(config: &mut AppConfig) {
    for server in &mut config.webrtc.turn_servers {
        if !server.credential.is_empty() {
            server.credential = "********".to_string();
        }
    }
}

pub async fn get_all_config(State(state): State<Arc<AppState>>) -> Json<AppConfig> {
    let mut config = (*state.config.get()).clone();
    sanitize_config_for_api(&mut config);
    Json(config)
}

#[derive(Debug, Default, Deserialize)]
pub struct PipelineConfigUpdate {
    pub default_enabled: Option<bool>,
    pub default_mode: Option<RenderMode>,
    pub max_sessions: Option<usize>,
    pub failure_log_interval_ms: Option<u64>,
}

impl PipelineConfigUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(ms) = self.failure_log_interval_ms {
            if !(100..=600_000).contains(&ms) {
                return Err(AppError::BadRequest(
                    "Invalid failure_log_interval_ms: must be 100-600000".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn apply_to(&self, config: &mut PipelineConfig) {
        if let Some(enabled) = self.default_enabled {
            config.default_enabled = enabled;
        }
        if let Some(mode) = self.default_mode {
            config.default_mode = mode;
        }
        if let Some(max) = self.max_sessions {
            config.max_sessions = max;
        }
        if let Some(ms) = self.failure_log_interval_ms {
            config.failure_log_interval_ms = ms;
        }
    }
}

/// Persist new pipeline defaults and apply them to sessions created from
/// now on
pub async fn update_pipeline_config(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PipelineConfigUpdate>,
) -> Result<Json<PipelineConfig>> {
    req.validate()?;

    state
        .config
        .update(|config| {
            req.apply_to(&mut config.pipeline);
        })
        .await?;

    let pipeline = state.config.get().pipeline.clone();
    state.registry.update_config(pipeline.clone());
    state.events.publish(SystemEvent::ConfigChanged);

    Ok(Json(pipeline))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TurnServer;

    #[test]
    fn test_update_validation_and_apply() {
        let bad = PipelineConfigUpdate {
            failure_log_interval_ms: Some(1),
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let update = PipelineConfigUpdate {
            default_mode: Some(RenderMode::Isolated),
            max_sessions: Some(0),
            ..Default::default()
        };
        update.validate().unwrap();
        let mut config = PipelineConfig::default();
        update.apply_to(&mut config);
        assert_eq!(config.default_mode, RenderMode::Isolated);
        assert_eq!(config.max_sessions, 0);
        assert!(config.default_enabled);
    }

    #[test]
    fn test_sanitize_hides_turn_credentials() {
        let mut config = AppConfig::default();
        config
            .webrtc
            .turn_servers
            .push(TurnServer::new(
                "turn:example.com:3478".to_string(),
                "user".to_string(),
                "secret".to_string(),
            ));
        sanitize_config_for_api(&mut config);
        assert_eq!(config.webrtc.turn_servers[0].credential, "********");
        assert_eq!(config.webrtc.turn_servers[0].username, "user");
    }
}
