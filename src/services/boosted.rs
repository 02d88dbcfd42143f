//! Daily boosted creature and boss.
//!
//! `/boosted` answers with a bare object rather than the usual envelope.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, RequestOptions};
use crate::error::ApiError;
use crate::services::cache::CachedResource;

pub const BOOSTED_ENDPOINT: &str = "/boosted";

/// Creature identity plus the outfit needed to render it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoostedCreature {
    pub boost_name: String,
    pub race_id: String,
    pub look_type: i32,
    pub look_head: i32,
    pub look_body: i32,
    pub look_legs: i32,
    pub look_feet: i32,
    pub look_addons: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub look_mount: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Boosted {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boss: Option<BoostedCreature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creature: Option<BoostedCreature>,
}

#[derive(Debug)]
pub struct BoostedService {
    api: Arc<ApiClient>,
    boosted: CachedResource<Boosted>,
}

impl BoostedService {
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api, boosted: CachedResource::new() }
    }

    /// # Errors
    ///
    /// Propagates the API error of a failed fetch.
    pub async fn boosted(&self) -> Result<Arc<Boosted>, ApiError> {
        self.boosted
            .get_or_fetch(|| self.api.get(BOOSTED_ENDPOINT, RequestOptions::public()))
            .await
    }

    pub async fn clear_cache(&self) {
        self.boosted.clear().await;
    }
}

#[cfg(test)]
#[path = "boosted_test.rs"]
mod tests;
