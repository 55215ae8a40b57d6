//! Fee data service: current schedules with versioning, caching and offline fallback.
//!
//! Reads never fail. A usable cached schedule wins; anything missing or
//! corrupted falls back to the tables bundled with the binary. Refreshes are
//! fail-open: a failed fetch is logged and the current data is returned.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use poshlina_core::version::DEFAULT_FRESHNESS_DAYS;
use poshlina_core::{
    CalculationRequest, CalculationResult, CourtType, DataFreshnessStatus, DataVersionInfo,
    ExemptionCategory, ExemptionManager, FeeCalculationEngine, FeeError, FeeSchedule,
    bundled_exemptions, bundled_release_date, bundled_schedule,
};
use poshlina_store::KeyValueStore;
use serde::Serialize;
use tracing::{info, warn};

use crate::{OfflineSource, ScheduleSource, SyncError};

pub const EXEMPTIONS_KEY: &str = "court_fee_exemptions";
pub const LAST_UPDATE_KEY: &str = "court_fee_last_update";
/// `source` recorded for data seeded from the bundled tables.
pub const BUNDLED_SOURCE: &str = "bundled";

pub fn schedule_key(court: CourtType) -> String {
    format!("court_fee_schedule_{court}")
}

pub fn version_key(court: CourtType) -> String {
    format!("court_fee_version_{court}")
}

#[derive(Debug, Clone)]
pub struct DataServiceConfig {
    /// Upper bound on a single remote fetch.
    pub refresh_timeout: Duration,
    /// Data older than this is reported as stale.
    pub freshness_threshold_days: i64,
}

impl Default for DataServiceConfig {
    fn default() -> Self {
        Self {
            refresh_timeout: Duration::from_secs(10),
            freshness_threshold_days: DEFAULT_FRESHNESS_DAYS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStatistics {
    pub schedules_cached: usize,
    pub exemption_sets_cached: usize,
    /// Bytes held by all fee-data entries, metadata included.
    pub total_size_bytes: usize,
    pub last_update: Option<DateTime<Utc>>,
    pub is_offline_ready: bool,
}

/// Outcome of [`FeeDataService::update_all`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateReport {
    pub updated: Vec<CourtType>,
    pub failed: Vec<(CourtType, String)>,
    pub exemptions_updated: bool,
    pub exemptions_error: Option<String>,
}

/// Supplies current fee data to the calculation engine.
pub struct FeeDataService {
    store: Arc<dyn KeyValueStore>,
    source: Arc<dyn ScheduleSource>,
    config: DataServiceConfig,
}

impl FeeDataService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        source: Arc<dyn ScheduleSource>,
        config: DataServiceConfig,
    ) -> Self {
        Self {
            store,
            source,
            config,
        }
    }

    /// A service with no remote source; refreshes always fall back.
    pub fn offline(store: Arc<dyn KeyValueStore>) -> Self {
        Self::new(store, Arc::new(OfflineSource), DataServiceConfig::default())
    }

    pub fn config(&self) -> &DataServiceConfig {
        &self.config
    }

    // ── Reads ──

    /// The schedule to calculate with: cached if usable, bundled otherwise.
    pub fn get_current_schedule(&self, court: CourtType) -> FeeSchedule {
        match self.cached_schedule(court) {
            Ok(Some(schedule)) => schedule,
            Ok(None) => bundled_schedule(court),
            Err(e) => {
                warn!(%court, error = %e, "cached schedule unusable, falling back to bundled data");
                if !matches!(e, SyncError::Store(_)) {
                    self.discard(&schedule_key(court));
                    self.discard(&version_key(court));
                }
                bundled_schedule(court)
            }
        }
    }

    /// The cached schedule for `court`, if there is one; errors mean it is corrupted.
    pub fn cached_schedule(&self, court: CourtType) -> Result<Option<FeeSchedule>, SyncError> {
        let Some(raw) = self.store.get(&schedule_key(court))? else {
            return Ok(None);
        };
        let schedule: FeeSchedule = serde_json::from_str(&raw)?;
        if schedule.court_type != court {
            return Err(SyncError::CourtMismatch {
                requested: court,
                received: schedule.court_type,
            });
        }
        schedule.validate()?;
        Ok(Some(schedule))
    }

    /// The exemption catalogue: cached if usable, bundled otherwise.
    pub fn exemption_manager(&self) -> ExemptionManager {
        match self.cached_exemptions() {
            Ok(Some(manager)) => manager,
            Ok(None) => ExemptionManager::bundled(),
            Err(e) => {
                warn!(error = %e, "cached exemptions unusable, falling back to bundled data");
                if !matches!(e, SyncError::Store(_)) {
                    self.discard(EXEMPTIONS_KEY);
                }
                ExemptionManager::bundled()
            }
        }
    }

    pub fn current_exemptions(&self) -> Vec<ExemptionCategory> {
        self.exemption_manager().catalogue().to_vec()
    }

    fn cached_exemptions(&self) -> Result<Option<ExemptionManager>, SyncError> {
        let Some(raw) = self.store.get(EXEMPTIONS_KEY)? else {
            return Ok(None);
        };
        let catalogue: Vec<ExemptionCategory> = serde_json::from_str(&raw)?;
        Ok(Some(ExemptionManager::new(catalogue)?))
    }

    /// An engine over the current schedules of both court types.
    pub fn engine(&self) -> FeeCalculationEngine {
        let general = self.get_current_schedule(CourtType::General);
        let arbitration = self.get_current_schedule(CourtType::Arbitration);
        FeeCalculationEngine::new(general, arbitration).unwrap_or_else(|e| {
            warn!(error = %e, "current schedules rejected by engine, using bundled data");
            FeeCalculationEngine::bundled()
        })
    }

    /// Calculate against the current data.
    pub fn calculate(&self, request: &CalculationRequest) -> Result<CalculationResult, FeeError> {
        self.engine().calculate(request)
    }

    /// Version metadata of the current schedule for `court`.
    pub fn get_version_info(&self, court: CourtType) -> Result<DataVersionInfo, FeeError> {
        let schedule = self.get_current_schedule(court);
        let stored = self
            .store
            .get(&version_key(court))
            .ok()
            .flatten()
            .and_then(|raw| serde_json::from_str::<DataVersionInfo>(&raw).ok());

        match stored {
            Some(info) if info.matches(&schedule) => Ok(info),
            _ => {
                let source = if schedule == bundled_schedule(court) {
                    BUNDLED_SOURCE
                } else {
                    "cache"
                };
                DataVersionInfo::for_schedule(&schedule, source)
            }
        }
    }

    // ── Refresh ──

    /// Refresh `court` from the remote source, keeping current data on any failure.
    pub async fn update_schedule(&self, court: CourtType) -> FeeSchedule {
        match self.try_update_schedule(court).await {
            Ok(schedule) => schedule,
            Err(e) => {
                warn!(%court, error = %e, "schedule refresh failed, keeping current data");
                self.get_current_schedule(court)
            }
        }
    }

    /// Refresh `court`, reporting why it failed. Nothing is persisted on failure.
    pub async fn try_update_schedule(&self, court: CourtType) -> Result<FeeSchedule, SyncError> {
        let timeout = self.config.refresh_timeout;
        let schedule = tokio::time::timeout(timeout, self.source.fetch_schedule(court))
            .await
            .map_err(|_| SyncError::Timeout(timeout))??;

        if schedule.court_type != court {
            return Err(SyncError::CourtMismatch {
                requested: court,
                received: schedule.court_type,
            });
        }
        schedule.validate()?;

        self.persist_schedule(&schedule, &self.source.name())?;
        self.store.set(LAST_UPDATE_KEY, &Utc::now().to_rfc3339())?;
        info!(%court, version = %schedule.version, "fee schedule refreshed");
        Ok(schedule)
    }

    /// Refresh the exemption catalogue, keeping current data on any failure.
    pub async fn update_exemptions(&self) -> Vec<ExemptionCategory> {
        match self.try_update_exemptions().await {
            Ok(catalogue) => catalogue,
            Err(e) => {
                warn!(error = %e, "exemption refresh failed, keeping current data");
                self.current_exemptions()
            }
        }
    }

    pub async fn try_update_exemptions(&self) -> Result<Vec<ExemptionCategory>, SyncError> {
        let timeout = self.config.refresh_timeout;
        let catalogue = tokio::time::timeout(timeout, self.source.fetch_exemptions())
            .await
            .map_err(|_| SyncError::Timeout(timeout))??;

        let manager = ExemptionManager::new(catalogue)?;
        self.store
            .set(EXEMPTIONS_KEY, &serde_json::to_string(manager.catalogue())?)?;
        info!(count = manager.catalogue().len(), "exemption catalogue refreshed");
        Ok(manager.catalogue().to_vec())
    }

    /// Refresh every schedule and the exemptions concurrently.
    pub async fn update_all(&self) -> UpdateReport {
        let schedules = join_all(
            CourtType::ALL
                .into_iter()
                .map(|court| async move { (court, self.try_update_schedule(court).await) }),
        );
        let (schedules, exemptions) = futures::join!(schedules, self.try_update_exemptions());

        let mut report = UpdateReport::default();
        for (court, result) in schedules {
            match result {
                Ok(_) => report.updated.push(court),
                Err(e) => {
                    warn!(%court, error = %e, "schedule refresh failed");
                    report.failed.push((court, e.to_string()));
                }
            }
        }
        match exemptions {
            Ok(_) => report.exemptions_updated = true,
            Err(e) => {
                warn!(error = %e, "exemption refresh failed");
                report.exemptions_error = Some(e.to_string());
            }
        }
        report
    }

    /// Seed missing or unusable cache entries with the bundled tables.
    ///
    /// Seeding is not a refresh: the last-update timestamp is left untouched.
    pub fn initialize_offline_cache(&self) -> Result<(), SyncError> {
        for court in CourtType::ALL {
            if !matches!(self.cached_schedule(court), Ok(Some(_))) {
                self.persist_schedule(&bundled_schedule(court), BUNDLED_SOURCE)?;
                info!(%court, "seeded cache with bundled schedule");
            }
        }
        if !matches!(self.cached_exemptions(), Ok(Some(_))) {
            self.store
                .set(EXEMPTIONS_KEY, &serde_json::to_string(&bundled_exemptions())?)?;
            info!("seeded cache with bundled exemptions");
        }
        Ok(())
    }

    /// Remove every fee-data entry from the store.
    pub fn clear_cache(&self) -> Result<(), SyncError> {
        for court in CourtType::ALL {
            self.store.remove(&schedule_key(court))?;
            self.store.remove(&version_key(court))?;
        }
        self.store.remove(EXEMPTIONS_KEY)?;
        self.store.remove(LAST_UPDATE_KEY)?;
        info!("fee data cache cleared");
        Ok(())
    }

    fn persist_schedule(&self, schedule: &FeeSchedule, source: &str) -> Result<(), SyncError> {
        let info = DataVersionInfo::for_schedule(schedule, source)?;
        let court = schedule.court_type;
        self.store
            .set(&schedule_key(court), &serde_json::to_string(schedule)?)?;
        self.store.set(&version_key(court), &serde_json::to_string(&info)?)?;
        Ok(())
    }

    fn discard(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            warn!(key, error = %e, "failed to discard corrupted cache entry");
        }
    }

    // ── Freshness & integrity ──

    /// When the data was last refreshed; the bundled release date if never.
    pub fn last_update(&self) -> DateTime<Utc> {
        self.stored_last_update().unwrap_or_else(bundled_release_date)
    }

    fn stored_last_update(&self) -> Option<DateTime<Utc>> {
        let raw = self.store.get(LAST_UPDATE_KEY).ok().flatten()?;
        DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }

    pub fn check_data_freshness(&self) -> DataFreshnessStatus {
        self.check_data_freshness_at(Utc::now())
    }

    pub fn check_data_freshness_at(&self, now: DateTime<Utc>) -> DataFreshnessStatus {
        DataFreshnessStatus::evaluate(self.last_update(), now, self.config.freshness_threshold_days)
    }

    /// Whether everything cached parses, validates and matches its checksum.
    pub fn validate_data_integrity(&self) -> bool {
        let problems = self.integrity_problems();
        for problem in &problems {
            warn!(problem = %problem, "fee data integrity check failed");
        }
        problems.is_empty()
    }

    /// Human-readable list of what is wrong with the cache; empty when sound.
    pub fn integrity_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for court in CourtType::ALL {
            let schedule = match self.cached_schedule(court) {
                Ok(Some(schedule)) => schedule,
                Ok(None) => continue,
                Err(e) => {
                    problems.push(format!("{court} schedule: {e}"));
                    continue;
                }
            };
            match self.store.get(&version_key(court)) {
                Ok(Some(raw)) => match serde_json::from_str::<DataVersionInfo>(&raw) {
                    Ok(info) if info.matches(&schedule) => {}
                    Ok(info) => problems.push(format!(
                        "{court} schedule does not match recorded checksum {}",
                        info.checksum
                    )),
                    Err(e) => problems.push(format!("{court} version info: {e}")),
                },
                Ok(None) => problems.push(format!("{court} schedule has no version info")),
                Err(e) => problems.push(format!("{court} version info: {e}")),
            }
        }

        if let Err(e) = self.cached_exemptions() {
            problems.push(format!("exemptions: {e}"));
        }

        match self.store.get(LAST_UPDATE_KEY) {
            Ok(Some(_)) if self.stored_last_update().is_none() => {
                problems.push("last update timestamp is not RFC 3339".to_string());
            }
            Err(e) => problems.push(format!("last update timestamp: {e}")),
            _ => {}
        }

        problems
    }

    pub fn get_cache_statistics(&self) -> CacheStatistics {
        let size_of = |key: &str| -> Option<usize> {
            match self.store.get(key) {
                Ok(value) => value.map(|v| v.len()),
                Err(e) => {
                    warn!(key, error = %e, "cache entry unreadable");
                    None
                }
            }
        };

        let mut schedules_cached = 0;
        let mut total_size_bytes = 0;
        for court in CourtType::ALL {
            if let Some(bytes) = size_of(&schedule_key(court)) {
                schedules_cached += 1;
                total_size_bytes += bytes;
            }
            total_size_bytes += size_of(&version_key(court)).unwrap_or(0);
        }

        let exemption_bytes = size_of(EXEMPTIONS_KEY);
        let exemption_sets_cached = usize::from(exemption_bytes.is_some());
        total_size_bytes += exemption_bytes.unwrap_or(0);
        total_size_bytes += size_of(LAST_UPDATE_KEY).unwrap_or(0);

        CacheStatistics {
            schedules_cached,
            exemption_sets_cached,
            total_size_bytes,
            last_update: self.stored_last_update(),
            is_offline_ready: schedules_cached > 0 && exemption_sets_cached > 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::TimeDelta;
    use poshlina_core::{Discount, schedule::general_schedule};
    use poshlina_store::MemoryStore;

    use super::*;

    /// Serves canned data; courts without an entry fail as unavailable.
    #[derive(Default)]
    struct FakeSource {
        schedules: HashMap<CourtType, FeeSchedule>,
        exemptions: Option<Vec<ExemptionCategory>>,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ScheduleSource for FakeSource {
        fn name(&self) -> String {
            "fake".to_string()
        }

        async fn fetch_schedule(&self, court: CourtType) -> Result<FeeSchedule, SyncError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.schedules
                .get(&court)
                .cloned()
                .ok_or_else(|| SyncError::Unavailable(format!("no {court} schedule")))
        }

        async fn fetch_exemptions(&self) -> Result<Vec<ExemptionCategory>, SyncError> {
            self.exemptions
                .clone()
                .ok_or_else(|| SyncError::Unavailable("no exemptions".into()))
        }
    }

    /// A newer general schedule with a 2.5% third bracket; later brackets
    /// start where it ends.
    fn newer_general() -> FeeSchedule {
        let mut schedule = general_schedule();
        schedule.version = "2024.1.0".into();
        schedule.rules[2].fee_value = 2.5;
        schedule.rules[3].base_fee = 5_700.0;
        schedule.rules[4].base_fee = 13_700.0;
        schedule
    }

    fn service_with(store: Arc<MemoryStore>, source: FakeSource) -> FeeDataService {
        let config = DataServiceConfig {
            refresh_timeout: Duration::from_millis(200),
            ..DataServiceConfig::default()
        };
        FeeDataService::new(store, Arc::new(source), config)
    }

    fn general_only(schedule: FeeSchedule) -> FakeSource {
        FakeSource {
            schedules: HashMap::from([(CourtType::General, schedule)]),
            ..FakeSource::default()
        }
    }

    #[tokio::test]
    async fn offline_refresh_falls_back_to_bundled() {
        let store = Arc::new(MemoryStore::new());
        let service = FeeDataService::offline(store.clone());

        let schedule = service.update_schedule(CourtType::General).await;
        assert_eq!(schedule, bundled_schedule(CourtType::General));
        assert!(!schedule.rules.is_empty());
        assert!(service.get_current_schedule(CourtType::General).is_contiguous());
        assert!(service.validate_data_integrity());
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn successful_refresh_is_persisted() {
        let store = Arc::new(MemoryStore::new());
        let service = service_with(store.clone(), general_only(newer_general()));

        let schedule = service.update_schedule(CourtType::General).await;
        assert_eq!(schedule.version, "2024.1.0");
        assert_eq!(service.get_current_schedule(CourtType::General), newer_general());
        assert_eq!(
            service.get_current_schedule(CourtType::Arbitration),
            bundled_schedule(CourtType::Arbitration)
        );

        let info = service.get_version_info(CourtType::General).unwrap();
        assert_eq!(info.source, "fake");
        assert!(info.matches(&newer_general()));
        assert!(service.validate_data_integrity());
        assert!(service.check_data_freshness().is_up_to_date);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_cached_schedule() {
        let store = Arc::new(MemoryStore::new());
        service_with(store.clone(), general_only(newer_general()))
            .update_schedule(CourtType::General)
            .await;

        let offline = FeeDataService::offline(store.clone());
        let schedule = offline.update_schedule(CourtType::General).await;
        assert_eq!(schedule, newer_general());
    }

    #[tokio::test]
    async fn calculations_use_refreshed_rates() {
        let store = Arc::new(MemoryStore::new());
        let service = service_with(store, general_only(newer_general()));
        service.update_schedule(CourtType::General).await;

        let result = service
            .calculate(&CalculationRequest {
                claim_amount: 150_000.0,
                court_type: CourtType::General,
                exemption: None,
            })
            .unwrap();
        assert_eq!(result.base_fee, 4_450.0);
        assert_eq!(result.schedule_version, "2024.1.0");
    }

    #[tokio::test]
    async fn invalid_remote_schedule_is_rejected() {
        let mut gappy = newer_general();
        gappy.rules[1].min_amount = 20_005;
        let store = Arc::new(MemoryStore::new());
        let service = service_with(store.clone(), general_only(gappy));

        let err = service.try_update_schedule(CourtType::General).await.unwrap_err();
        assert!(matches!(err, SyncError::Invalid(_)));
        assert_eq!(
            service.update_schedule(CourtType::General).await,
            bundled_schedule(CourtType::General)
        );
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn remote_schedule_with_falling_fee_is_rejected() {
        let mut stepped = newer_general();
        stepped.rules[2].base_fee = 100.0;
        let store = Arc::new(MemoryStore::new());
        let service = service_with(store.clone(), general_only(stepped));

        let err = service.try_update_schedule(CourtType::General).await.unwrap_err();
        assert!(matches!(err, SyncError::Invalid(_)));
        let current = service.update_schedule(CourtType::General).await;
        assert_eq!(current, bundled_schedule(CourtType::General));
        assert!(store.is_empty().unwrap());

        let engine = service.engine();
        let below = engine.calculate_general_jurisdiction_fee(100_000.0).unwrap().amount;
        let above = engine.calculate_general_jurisdiction_fee(100_001.0).unwrap().amount;
        assert!(below <= above);
    }

    #[tokio::test]
    async fn remote_schedule_without_positive_ceiling_is_rejected() {
        let mut uncapped = newer_general();
        uncapped.max_fee = 0.0;
        let service = service_with(Arc::new(MemoryStore::new()), general_only(uncapped));

        let err = service.try_update_schedule(CourtType::General).await.unwrap_err();
        assert!(matches!(err, SyncError::Invalid(_)));
        assert_eq!(service.get_current_schedule(CourtType::General).max_fee, 60_000.0);
    }

    #[tokio::test]
    async fn mismatched_court_is_rejected() {
        let source = FakeSource {
            schedules: HashMap::from([(CourtType::Arbitration, newer_general())]),
            ..FakeSource::default()
        };
        let service = service_with(Arc::new(MemoryStore::new()), source);
        let err = service.try_update_schedule(CourtType::Arbitration).await.unwrap_err();
        assert!(matches!(err, SyncError::CourtMismatch { .. }));
    }

    #[tokio::test]
    async fn slow_source_times_out() {
        let source = FakeSource {
            delay: Some(Duration::from_secs(5)),
            ..general_only(newer_general())
        };
        let service = service_with(Arc::new(MemoryStore::new()), source);

        let err = service.try_update_schedule(CourtType::General).await.unwrap_err();
        assert!(matches!(err, SyncError::Timeout(_)));
        assert_eq!(
            service.update_schedule(CourtType::General).await,
            bundled_schedule(CourtType::General)
        );
    }

    #[tokio::test]
    async fn one_fetch_per_refresh() {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(general_only(newer_general()));
        let service = FeeDataService::new(store, source.clone(), DataServiceConfig::default());
        service.update_schedule(CourtType::General).await;
        service.update_schedule(CourtType::Arbitration).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn corrupted_cache_degrades_to_bundled() {
        let store = Arc::new(MemoryStore::new());
        store.set(&schedule_key(CourtType::General), "{not json").unwrap();
        let service = FeeDataService::offline(store.clone());

        assert!(!service.validate_data_integrity());
        assert_eq!(
            service.get_current_schedule(CourtType::General),
            bundled_schedule(CourtType::General)
        );
        // The corrupted entry is discarded on read.
        assert_eq!(store.get(&schedule_key(CourtType::General)).unwrap(), None);
        assert!(service.validate_data_integrity());
    }

    #[test]
    fn cached_schedule_under_wrong_key_is_corrupt() {
        let store = Arc::new(MemoryStore::new());
        let arbitration = serde_json::to_string(&bundled_schedule(CourtType::Arbitration)).unwrap();
        store.set(&schedule_key(CourtType::General), &arbitration).unwrap();
        let service = FeeDataService::offline(store);

        assert!(!service.validate_data_integrity());
        assert_eq!(
            service.get_current_schedule(CourtType::General).court_type,
            CourtType::General
        );
    }

    #[tokio::test]
    async fn checksum_mismatch_fails_integrity() {
        let store = Arc::new(MemoryStore::new());
        let service = service_with(store.clone(), general_only(newer_general()));
        service.update_schedule(CourtType::General).await;

        let mut tampered = newer_general();
        tampered.rules[3].fee_value = 0.9;
        store
            .set(&schedule_key(CourtType::General), &serde_json::to_string(&tampered).unwrap())
            .unwrap();

        let problems = service.integrity_problems();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("checksum"));
        assert!(!service.validate_data_integrity());
    }

    #[test]
    fn corrupted_exemptions_fall_back() {
        let store = Arc::new(MemoryStore::new());
        store.set(EXEMPTIONS_KEY, "[{\"id\": 3}]").unwrap();
        let service = FeeDataService::offline(store);

        assert!(!service.validate_data_integrity());
        assert_eq!(service.current_exemptions(), bundled_exemptions());
    }

    #[test]
    fn freshness_thresholds() {
        let store = Arc::new(MemoryStore::new());
        let service = FeeDataService::offline(store.clone());
        let last = Utc::now() - TimeDelta::days(400);
        store.set(LAST_UPDATE_KEY, &last.to_rfc3339()).unwrap();

        let at = |days: i64| service.check_data_freshness_at(last + TimeDelta::days(days) + TimeDelta::minutes(1));

        let fresh = at(29);
        assert!(fresh.is_up_to_date);
        assert!(fresh.warning.is_none());

        let stale = at(31);
        assert!(!stale.is_up_to_date);
        assert!(stale.warning.is_some());

        let critical = at(200);
        assert_eq!(critical.days_since_update, 200);
        assert!(critical.warning.unwrap().to_lowercase().contains("critical"));
    }

    #[test]
    fn freshness_without_refresh_uses_bundled_release() {
        let service = FeeDataService::offline(Arc::new(MemoryStore::new()));
        assert_eq!(service.last_update(), bundled_release_date());
        let status = service.check_data_freshness_at(bundled_release_date() + TimeDelta::days(10));
        assert_eq!(status.days_since_update, 10);
        assert!(status.is_up_to_date);
    }

    #[test]
    fn garbage_timestamp_is_reported() {
        let store = Arc::new(MemoryStore::new());
        store.set(LAST_UPDATE_KEY, "yesterday").unwrap();
        let service = FeeDataService::offline(store);
        assert_eq!(service.last_update(), bundled_release_date());
        assert!(!service.validate_data_integrity());
    }

    #[test]
    fn statistics_and_offline_readiness() {
        let store = Arc::new(MemoryStore::new());
        let service = FeeDataService::offline(store);

        let empty = service.get_cache_statistics();
        assert_eq!(empty.schedules_cached, 0);
        assert_eq!(empty.total_size_bytes, 0);
        assert!(!empty.is_offline_ready);

        service.initialize_offline_cache().unwrap();
        let seeded = service.get_cache_statistics();
        assert_eq!(seeded.schedules_cached, 2);
        assert_eq!(seeded.exemption_sets_cached, 1);
        assert!(seeded.total_size_bytes > 0);
        assert!(seeded.last_update.is_none());
        assert!(seeded.is_offline_ready);
        assert!(service.validate_data_integrity());

        service.clear_cache().unwrap();
        assert_eq!(service.get_cache_statistics(), empty);
    }

    #[tokio::test]
    async fn schedule_alone_is_not_offline_ready() {
        let service = service_with(Arc::new(MemoryStore::new()), general_only(newer_general()));
        service.update_schedule(CourtType::General).await;
        let stats = service.get_cache_statistics();
        assert_eq!(stats.schedules_cached, 1);
        assert!(stats.last_update.is_some());
        assert!(!stats.is_offline_ready);
    }

    #[tokio::test]
    async fn update_all_reports_each_part() {
        let mut catalogue = bundled_exemptions();
        catalogue.retain(|e| e.discount != Discount::Exempt);
        let source = FakeSource {
            exemptions: Some(catalogue.clone()),
            ..general_only(newer_general())
        };
        let service = service_with(Arc::new(MemoryStore::new()), source);

        let report = service.update_all().await;
        assert_eq!(report.updated, vec![CourtType::General]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, CourtType::Arbitration);
        assert!(report.exemptions_updated);
        assert_eq!(service.current_exemptions(), catalogue);
        assert!(service.get_cache_statistics().is_offline_ready);
    }

    #[tokio::test]
    async fn invalid_remote_exemptions_keep_bundled() {
        let mut broken = bundled_exemptions();
        broken[0].discount = Discount::Percentage(150.0);
        let source = FakeSource {
            exemptions: Some(broken),
            ..FakeSource::default()
        };
        let service = service_with(Arc::new(MemoryStore::new()), source);

        assert_eq!(service.update_exemptions().await, bundled_exemptions());
    }
}
