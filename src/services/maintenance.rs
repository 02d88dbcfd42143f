//! Public maintenance status, read by the maintenance page.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, ApiResponse, RequestOptions};
use crate::error::ApiError;

pub const MAINTENANCE_STATUS_ENDPOINT: &str = "/maintenance/status";
pub const DEFAULT_MAINTENANCE_TEXT: &str =
    "We are currently performing scheduled maintenance to improve your experience. Please check back soon.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceData {
    pub maintenance: bool,
    pub message: Option<String>,
}

impl MaintenanceData {
    /// Operator message while maintenance is on, the default text otherwise.
    #[must_use]
    pub fn display_message(&self) -> &str {
        match self.message.as_deref() {
            Some(message) if self.maintenance && !message.is_empty() => message,
            _ => DEFAULT_MAINTENANCE_TEXT,
        }
    }
}

#[derive(Debug)]
pub struct MaintenanceService {
    api: Arc<ApiClient>,
}

impl MaintenanceService {
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// # Errors
    ///
    /// Propagates the API error of a failed fetch.
    pub async fn status(&self) -> Result<MaintenanceData, ApiError> {
        let resp: ApiResponse<MaintenanceData> =
            self.api.get(MAINTENANCE_STATUS_ENDPOINT, RequestOptions::public()).await?;
        Ok(resp.data)
    }

    /// Text for the maintenance page. Never fails: errors fall back to the
    /// default text.
    pub async fn page_message(&self) -> String {
        match self.status().await {
            Ok(data) => data.display_message().to_owned(),
            Err(e) => {
                tracing::debug!(error = %e, "maintenance status unavailable");
                DEFAULT_MAINTENANCE_TEXT.to_owned()
            }
        }
    }
}

#[cfg(test)]
#[path = "maintenance_test.rs"]
mod tests;
