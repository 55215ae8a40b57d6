//! Where fresh schedules come from.

use async_trait::async_trait;
use poshlina_core::{CourtType, ExemptionCategory, FeeSchedule};

use crate::SyncError;

/// Remote capability: "fetch the latest schedule for jurisdiction X".
///
/// The transport is up to the implementation. Failures are reported, never
/// retried; the data service decides what to fall back to.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// Recorded as the `source` of the version info of anything this source provides.
    fn name(&self) -> String;

    async fn fetch_schedule(&self, court: CourtType) -> Result<FeeSchedule, SyncError>;

    async fn fetch_exemptions(&self) -> Result<Vec<ExemptionCategory>, SyncError>;
}

/// A source with no remote behind it. Every fetch reports unavailability.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSource;

#[async_trait]
impl ScheduleSource for OfflineSource {
    fn name(&self) -> String {
        "offline".to_string()
    }

    async fn fetch_schedule(&self, court: CourtType) -> Result<FeeSchedule, SyncError> {
        Err(SyncError::Unavailable(format!(
            "no remote source configured for the {court} schedule"
        )))
    }

    async fn fetch_exemptions(&self) -> Result<Vec<ExemptionCategory>, SyncError> {
        Err(SyncError::Unavailable(
            "no remote source configured for exemptions".to_string(),
        ))
    }
}
