//! Community links shown in the site footer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, ApiResponse, RequestOptions};
use crate::error::{ApiError, ErrorKind};
use crate::services::cache::CachedResource;

pub const SOCIAL_LINKS_ENDPOINT: &str = "/social/links";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialLinks {
    pub facebook: String,
    pub instagram: String,
    pub whatsapp: String,
    pub discord: String,
}

#[derive(Debug)]
pub struct SocialService {
    api: Arc<ApiClient>,
    links: CachedResource<SocialLinks>,
}

impl SocialService {
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api, links: CachedResource::new() }
    }

    /// # Errors
    ///
    /// Propagates the API error of a failed fetch; a response without
    /// `data` is a [`ErrorKind::Decode`] error.
    pub async fn links(&self) -> Result<Arc<SocialLinks>, ApiError> {
        self.links
            .get_or_fetch(|| async {
                let resp = self.api.get::<ApiResponse<Option<SocialLinks>>>(SOCIAL_LINKS_ENDPOINT, RequestOptions::public());
                resp.await?.data.ok_or_else(|| {
                    ApiError::new(ErrorKind::Decode, None, "Invalid social links response: data is missing.")
                })
            })
            .await
    }

    pub async fn clear_cache(&self) {
        self.links.clear().await;
    }
}

#[cfg(test)]
#[path = "social_test.rs"]
mod tests;
