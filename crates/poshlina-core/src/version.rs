//! Provenance and age of the loaded fee data.

use chrono::{DateTime, Utc};
use ring::digest::{SHA256, digest};
use serde::{Deserialize, Serialize};

use crate::{FeeError, FeeRule, FeeSchedule};

/// Schedules older than this many days are no longer considered up to date.
pub const DEFAULT_FRESHNESS_DAYS: i64 = 30;
/// Up to this age a stale schedule only gets a soft recommendation.
pub const SOFT_WARNING_DAYS: i64 = 60;
/// Beyond this age the warning becomes critical.
pub const CRITICAL_WARNING_DAYS: i64 = 180;

/// Where a schedule came from and a fingerprint of its rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataVersionInfo {
    pub version: String,
    pub release_date: DateTime<Utc>,
    pub source: String,
    /// Hex SHA-256 of the canonical JSON of the rules.
    pub checksum: String,
}

impl DataVersionInfo {
    pub fn for_schedule(schedule: &FeeSchedule, source: &str) -> Result<Self, FeeError> {
        Ok(Self {
            version: schedule.version.clone(),
            release_date: schedule.last_updated,
            source: source.to_string(),
            checksum: rules_checksum(&schedule.rules)?,
        })
    }

    /// Whether `schedule` still hashes to the recorded checksum.
    pub fn matches(&self, schedule: &FeeSchedule) -> bool {
        self.version == schedule.version
            && rules_checksum(&schedule.rules).is_ok_and(|sum| sum == self.checksum)
    }
}

/// Hex SHA-256 over the JSON serialisation of `rules`.
pub fn rules_checksum(rules: &[FeeRule]) -> Result<String, FeeError> {
    let bytes = serde_json::to_vec(rules)?;
    let hash = digest(&SHA256, &bytes);
    Ok(hex::encode(hash.as_ref()))
}

/// Staleness of the locally cached data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFreshnessStatus {
    pub last_update: DateTime<Utc>,
    pub days_since_update: i64,
    pub is_up_to_date: bool,
    /// Advisory text; `None` while the data is up to date.
    pub warning: Option<String>,
}

impl DataFreshnessStatus {
    /// Evaluate freshness of data last refreshed at `last_update`, as seen at `now`.
    ///
    /// A timestamp in the future counts as zero days old.
    pub fn evaluate(last_update: DateTime<Utc>, now: DateTime<Utc>, threshold_days: i64) -> Self {
        let days_since_update = (now - last_update).num_days().max(0);
        let is_up_to_date = days_since_update <= threshold_days;

        let warning = if is_up_to_date {
            None
        } else if days_since_update <= SOFT_WARNING_DAYS {
            Some(format!(
                "Fee data was last updated {days_since_update} days ago; we recommend verifying current rates with the Tax Code."
            ))
        } else if days_since_update <= CRITICAL_WARNING_DAYS {
            Some(format!(
                "Attention: fee data is {days_since_update} days old and may not reflect recent amendments. Verify rates before filing."
            ))
        } else {
            Some(format!(
                "Critical warning: fee data has not been updated for {days_since_update} days. Results may be outdated; check the current edition of the Tax Code."
            ))
        };

        Self {
            last_update,
            days_since_update,
            is_up_to_date,
            warning,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::schedule::{arbitration_schedule, general_schedule};

    fn status_after(days: i64) -> DataFreshnessStatus {
        let last = general_schedule().last_updated;
        let now = last + TimeDelta::days(days) + TimeDelta::hours(5);
        DataFreshnessStatus::evaluate(last, now, DEFAULT_FRESHNESS_DAYS)
    }

    #[test]
    fn fresh_data_has_no_warning() {
        let status = status_after(29);
        assert_eq!(status.days_since_update, 29);
        assert!(status.is_up_to_date);
        assert!(status.warning.is_none());
    }

    #[test]
    fn threshold_day_is_still_fresh() {
        assert!(status_after(30).is_up_to_date);
    }

    #[test]
    fn stale_data_recommends_verifying() {
        let status = status_after(31);
        assert!(!status.is_up_to_date);
        assert!(status.warning.unwrap().contains("recommend verifying"));
    }

    #[test]
    fn older_data_gets_attention() {
        let warning = status_after(120).warning.unwrap();
        assert!(warning.starts_with("Attention"));
    }

    #[test]
    fn very_old_data_is_critical() {
        let status = status_after(200);
        assert_eq!(status.days_since_update, 200);
        assert!(status.warning.unwrap().to_lowercase().contains("critical"));
    }

    #[test]
    fn future_timestamp_counts_as_fresh() {
        let now = general_schedule().last_updated;
        let status = DataFreshnessStatus::evaluate(now + TimeDelta::days(3), now, DEFAULT_FRESHNESS_DAYS);
        assert_eq!(status.days_since_update, 0);
        assert!(status.is_up_to_date);
    }

    #[test]
    fn checksum_is_stable_and_sensitive() {
        let general = general_schedule();
        let a = rules_checksum(&general.rules).unwrap();
        let b = rules_checksum(&general_schedule().rules).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
        assert_ne!(a, rules_checksum(&arbitration_schedule().rules).unwrap());
    }

    #[test]
    fn checksum_of_empty_rules_is_known_digest() {
        // SHA-256 of the two bytes `[]`.
        assert_eq!(
            rules_checksum(&[]).unwrap(),
            "4f53cda18c2baa0c0354bb5f9a3ecbe5ed12ab4d8e11ba873c2f11161202b945"
        );
    }

    #[test]
    fn version_info_detects_tampering() {
        let schedule = general_schedule();
        let info = DataVersionInfo::for_schedule(&schedule, "bundled").unwrap();
        assert!(info.matches(&schedule));

        let mut tampered = schedule.clone();
        tampered.rules[2].fee_value = 2.5;
        assert!(!info.matches(&tampered));
    }
}
