//! HTTP client for pulling published fee schedules and exemptions.

use async_trait::async_trait;
use poshlina_core::{CourtType, ExemptionCategory, FeeSchedule};
use serde::de::DeserializeOwned;
use tracing::info;

use crate::{ScheduleSource, SyncError};

/// Pulls fee data from a publishing server.
///
/// Endpoints: `GET {base}/api/court-fees/{court}` returns a `FeeSchedule`,
/// `GET {base}/api/court-fees/exemptions` returns the exemption catalogue.
pub struct HttpScheduleSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpScheduleSource {
    /// Create a source for the given base URL.
    ///
    /// `base_url` should be like `https://fees.example.org` (a trailing slash is trimmed).
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn schedule_url(&self, court: CourtType) -> String {
        format!("{}/api/court-fees/{}", self.base_url, court)
    }

    fn exemptions_url(&self) -> String {
        format!("{}/api/court-fees/exemptions", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SyncError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl ScheduleSource for HttpScheduleSource {
    fn name(&self) -> String {
        self.base_url.clone()
    }

    async fn fetch_schedule(&self, court: CourtType) -> Result<FeeSchedule, SyncError> {
        let url = self.schedule_url(court);
        info!(url = %url, %court, "pulling fee schedule");
        let schedule: FeeSchedule = self.get_json(&url).await?;
        info!(version = %schedule.version, rules = schedule.rules.len(), "pulled fee schedule");
        Ok(schedule)
    }

    async fn fetch_exemptions(&self) -> Result<Vec<ExemptionCategory>, SyncError> {
        let url = self.exemptions_url();
        info!(url = %url, "pulling exemption catalogue");
        let exemptions: Vec<ExemptionCategory> = self.get_json(&url).await?;
        info!(count = exemptions.len(), "pulled exemption catalogue");
        Ok(exemptions)
    }
}
