//! Server information: rates, connection details, experience stages.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, ApiResponse, RequestOptions};
use crate::error::ApiError;
use crate::services::cache::CachedResource;

pub const SERVER_CONFIG_ENDPOINT: &str = "/server/config";
pub const SERVER_STAGES_ENDPOINT: &str = "/server/stages";
pub const DEFAULT_SERVER_NAME: &str = "CodexAAC";

/// Game server settings as exposed by the backend. Fields the backend omits
/// keep their zero value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    pub server_name: String,
    pub world_type: String,
    pub ip: String,
    pub login_port: u16,
    pub game_port: u16,
    pub rate_exp: f64,
    pub rate_skill: f64,
    pub rate_magic: f64,
    pub rate_loot: f64,
    pub rate_spawn: f64,
    pub map_name: String,
    pub map_author: String,
    pub house_rent_period: String,
    pub max_players: u32,
    pub owner_name: String,
    pub owner_email: String,
    pub url: String,
    pub location: String,
    pub protection_level: u32,
    pub low_level_bonus_exp: f64,
    pub rate_use_stages: bool,
    pub frag_duration: u64,
    pub red_skull_duration: u64,
    pub black_skull_duration: u64,
    pub day_kills_to_red_skull: u32,
    pub week_kills_to_red_skull: u32,
    pub month_kills_to_red_skull: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub min_level: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_level: Option<u32>,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StagesConfig {
    pub experience_stages: Vec<Stage>,
    pub skills_stages: Vec<Stage>,
    pub magic_level_stages: Vec<Stage>,
}

#[derive(Debug)]
pub struct ServerService {
    api: Arc<ApiClient>,
    config: CachedResource<ServerConfig>,
    stages: CachedResource<StagesConfig>,
}

impl ServerService {
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api, config: CachedResource::new(), stages: CachedResource::new() }
    }

    /// # Errors
    ///
    /// Propagates the API error of a failed fetch.
    pub async fn config(&self) -> Result<Arc<ServerConfig>, ApiError> {
        self.config
            .get_or_fetch(|| async {
                let resp = self.api.get::<ApiResponse<ServerConfig>>(SERVER_CONFIG_ENDPOINT, RequestOptions::public()).await;
                resp.map(|resp| resp.data)
            })
            .await
    }

    /// Configured server name, or [`DEFAULT_SERVER_NAME`] when blank.
    ///
    /// # Errors
    ///
    /// Propagates the API error of a failed config fetch.
    pub async fn server_name(&self) -> Result<String, ApiError> {
        let config = self.config().await?;
        let name = config.server_name.trim();
        Ok(if name.is_empty() { DEFAULT_SERVER_NAME.to_owned() } else { name.to_owned() })
    }

    /// # Errors
    ///
    /// Propagates the API error of a failed fetch.
    pub async fn stages(&self) -> Result<Arc<StagesConfig>, ApiError> {
        self.stages
            .get_or_fetch(|| async {
                let resp = self.api.get::<ApiResponse<StagesConfig>>(SERVER_STAGES_ENDPOINT, RequestOptions::public()).await;
                resp.map(|resp| resp.data)
            })
            .await
    }

    pub async fn clear_cache(&self) {
        self.config.clear().await;
        self.stages.clear().await;
    }
}

#[cfg(test)]
#[path = "server_test.rs"]
mod tests;
