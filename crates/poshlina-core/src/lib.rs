//! Court-fee core: versioned bracket schedules, the exemption catalogue, and the
//! calculation engine that turns a claim amount into a fee with an audit trail.

pub mod engine;
pub mod error;
pub mod exemption;
pub mod money;
pub mod schedule;
pub mod version;

pub use engine::{
    BreakdownItem, CalculationRequest, CalculationResult, FeeCalculation, FeeCalculationEngine,
    LegalReference,
};
pub use error::FeeError;
pub use exemption::{Discount, ExemptionCategory, ExemptionManager, bundled_exemptions};
pub use schedule::{
    CourtType, FeeRule, FeeSchedule, FeeType, bundled_release_date, bundled_schedule,
    find_applicable_rule,
};
pub use version::{DataFreshnessStatus, DataVersionInfo, rules_checksum};
