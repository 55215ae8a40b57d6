//! Sync layer: remote schedule sources, the versioned offline cache, and the
//! data service that ties them to the calculation engine.

mod error;
pub mod service;
pub mod source;

#[cfg(feature = "http")]
pub mod http;

pub use error::SyncError;
pub use service::{CacheStatistics, DataServiceConfig, FeeDataService, UpdateReport};
pub use source::{OfflineSource, ScheduleSource};

#[cfg(feature = "http")]
pub use http::HttpScheduleSource;
