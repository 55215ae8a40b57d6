//! Progressive fee schedules per jurisdiction type.
//!
//! A schedule is a table of contiguous brackets covering `[0, ∞)`. Rules are
//! plain data consulted by one resolver, [`find_applicable_rule`]; the
//! jurisdiction only decides which table (and which statutory ceiling) applies.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::FeeError;
use crate::money::round_money;

/// Version of the bundled tables shipped with the binary.
pub const BUNDLED_VERSION: &str = "2023.1.0";

/// Release date of the bundled tables (2023-01-01T00:00:00Z).
pub const BUNDLED_RELEASE_TIMESTAMP: i64 = 1_672_531_200;

/// Jurisdiction type: general civil courts or commercial (arbitration) courts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourtType {
    General,
    Arbitration,
}

impl CourtType {
    pub const ALL: [CourtType; 2] = [CourtType::General, CourtType::Arbitration];

    pub fn as_str(self) -> &'static str {
        match self {
            CourtType::General => "general",
            CourtType::Arbitration => "arbitration",
        }
    }
}

impl fmt::Display for CourtType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CourtType {
    type Err = FeeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(CourtType::General),
            "arbitration" => Ok(CourtType::Arbitration),
            other => Err(FeeError::InvalidInput(format!("unknown court type '{other}'"))),
        }
    }
}

/// How a bracket turns a claim amount into a fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeType {
    /// `max(claim × fee_value%, minimum_fee)`
    Percentage,
    /// `fee_value`, independent of the claim.
    Fixed,
    /// `base_fee + fee_value% × (claim − floor)`
    Progressive,
}

/// One bracket of a progressive schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeRule {
    pub min_amount: u64,
    /// `None` marks the unbounded top bracket.
    pub max_amount: Option<u64>,
    pub fee_type: FeeType,
    pub fee_value: f64,
    #[serde(default)]
    pub base_fee: f64,
    #[serde(default)]
    pub minimum_fee: Option<f64>,
    pub legal_basis: String,
    pub formula: String,
}

impl FeeRule {
    /// Amount above which the marginal rate of this bracket applies.
    pub fn floor(&self) -> u64 {
        self.min_amount.saturating_sub(1)
    }

    /// Whether `amount` falls inside this bracket's upper bound.
    pub fn covers(&self, amount: f64) -> bool {
        self.max_amount.is_none_or(|max| amount <= max as f64)
    }

    /// Unrounded, uncapped fee this bracket charges for `amount`.
    pub fn fee_at(&self, amount: f64) -> f64 {
        let rate = self.fee_value / 100.0;
        match self.fee_type {
            FeeType::Percentage => {
                let fee = amount * rate;
                self.minimum_fee.map_or(fee, |minimum| fee.max(minimum))
            }
            FeeType::Fixed => self.fee_value,
            FeeType::Progressive => self.base_fee + rate * (amount - self.floor() as f64),
        }
    }
}

/// The full bracket table for one jurisdiction type at one version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub court_type: CourtType,
    pub version: String,
    pub last_updated: DateTime<Utc>,
    /// Statutory ceiling; the fee never exceeds it.
    pub max_fee: f64,
    pub applicable_article: String,
    pub rules: Vec<FeeRule>,
}

impl FeeSchedule {
    /// Structural check: version format, a positive ceiling, and non-empty
    /// contiguous rules covering `[0, ∞)` whose fees never step down at a boundary.
    pub fn validate(&self) -> Result<(), FeeError> {
        if !is_valid_version(&self.version) {
            return Err(FeeError::InvalidSchedule(format!(
                "version '{}' does not match YYYY.N.M",
                self.version
            )));
        }
        if self.applicable_article.trim().is_empty() {
            return Err(FeeError::InvalidSchedule("empty applicable article".into()));
        }
        if !(self.max_fee.is_finite() && self.max_fee > 0.0) {
            return Err(FeeError::InvalidSchedule(format!("bad ceiling {}", self.max_fee)));
        }

        let first = self
            .rules
            .first()
            .ok_or_else(|| FeeError::InvalidSchedule("schedule has no rules".into()))?;
        if first.min_amount != 0 {
            return Err(FeeError::InvalidSchedule(format!(
                "first bracket starts at {} instead of 0",
                first.min_amount
            )));
        }

        for (i, rule) in self.rules.iter().enumerate() {
            validate_rule(i, rule)?;

            match (rule.max_amount, self.rules.get(i + 1)) {
                (Some(max), Some(next)) => {
                    if max < rule.min_amount {
                        return Err(FeeError::InvalidSchedule(format!(
                            "bracket {i} ends ({max}) before it starts ({})",
                            rule.min_amount
                        )));
                    }
                    if next.min_amount != max + 1 {
                        return Err(FeeError::InvalidSchedule(format!(
                            "gap or overlap between bracket {i} (max {max}) and bracket {} (min {})",
                            i + 1,
                            next.min_amount
                        )));
                    }
                    // Claims just above `max` already fall in the next bracket.
                    let top = round_money(rule.fee_at(max as f64));
                    let bottom = round_money(next.fee_at(max as f64));
                    if bottom < top {
                        return Err(FeeError::InvalidSchedule(format!(
                            "fee drops from {top} to {bottom} between bracket {i} and bracket {}",
                            i + 1
                        )));
                    }
                }
                (None, Some(_)) => {
                    return Err(FeeError::InvalidSchedule(format!(
                        "unbounded bracket {i} is not the last one"
                    )));
                }
                (Some(max), None) => {
                    return Err(FeeError::InvalidSchedule(format!(
                        "last bracket ends at {max}; schedule must be unbounded"
                    )));
                }
                (None, None) => {}
            }
        }
        Ok(())
    }

    /// Whether the sorted rules are contiguous and non-overlapping.
    pub fn is_contiguous(&self) -> bool {
        self.validate().is_ok()
    }
}

fn validate_rule(index: usize, rule: &FeeRule) -> Result<(), FeeError> {
    if !(rule.fee_value.is_finite() && rule.fee_value > 0.0) {
        return Err(FeeError::InvalidSchedule(format!(
            "bracket {index} has non-positive fee value {}",
            rule.fee_value
        )));
    }
    if !(rule.base_fee.is_finite() && rule.base_fee >= 0.0) {
        return Err(FeeError::InvalidSchedule(format!(
            "bracket {index} has negative base fee {}",
            rule.base_fee
        )));
    }
    if let Some(minimum) = rule.minimum_fee
        && !(minimum.is_finite() && minimum >= 0.0)
    {
        return Err(FeeError::InvalidSchedule(format!(
            "bracket {index} has bad minimum fee {minimum}"
        )));
    }
    if rule.legal_basis.trim().is_empty() || rule.formula.trim().is_empty() {
        return Err(FeeError::InvalidSchedule(format!(
            "bracket {index} is missing its legal basis or formula"
        )));
    }
    Ok(())
}

/// `YYYY.N.M` with a four-digit year and numeric minor/patch parts.
pub fn is_valid_version(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    let numeric = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    parts.len() == 3 && parts[0].len() == 4 && parts.iter().all(|p| numeric(p))
}

/// Find the bracket containing `amount`.
///
/// Rules must be sorted and contiguous from 0 (see [`FeeSchedule::validate`]),
/// so the first rule whose upper bound covers the amount is the one. Amounts
/// between integer boundaries (e.g. 20 000.50) land in the higher bracket,
/// whose floor is the lower bracket's maximum.
pub fn find_applicable_rule(amount: f64, rules: &[FeeRule]) -> Option<&FeeRule> {
    if !(amount.is_finite() && amount >= 0.0) {
        return None;
    }
    rules.iter().find(|rule| rule.covers(amount))
}

// ── Bundled tables ──

/// Release date of the bundled tables.
pub fn bundled_release_date() -> DateTime<Utc> {
    DateTime::from_timestamp(BUNDLED_RELEASE_TIMESTAMP, 0).unwrap_or_default()
}

fn progressive(min: u64, max: Option<u64>, base: f64, rate: f64, basis: &str, formula: &str) -> FeeRule {
    FeeRule {
        min_amount: min,
        max_amount: max,
        fee_type: FeeType::Progressive,
        fee_value: rate,
        base_fee: base,
        minimum_fee: None,
        legal_basis: basis.to_string(),
        formula: formula.to_string(),
    }
}

/// General jurisdiction courts, ст. 333.19 НК РФ.
pub fn general_schedule() -> FeeSchedule {
    const BASIS: &str = "пп. 1 п. 1 ст. 333.19 НК РФ";
    FeeSchedule {
        court_type: CourtType::General,
        version: BUNDLED_VERSION.to_string(),
        last_updated: bundled_release_date(),
        max_fee: 60_000.0,
        applicable_article: "ст. 333.19 НК РФ".to_string(),
        rules: vec![
            FeeRule {
                min_amount: 0,
                max_amount: Some(20_000),
                fee_type: FeeType::Percentage,
                fee_value: 4.0,
                base_fee: 0.0,
                minimum_fee: Some(400.0),
                legal_basis: BASIS.to_string(),
                formula: "4% of the claim, not less than 400".to_string(),
            },
            progressive(20_001, Some(100_000), 800.0, 3.0, BASIS, "800 + 3% of the amount over 20 000"),
            progressive(100_001, Some(200_000), 3_200.0, 2.0, BASIS, "3 200 + 2% of the amount over 100 000"),
            progressive(200_001, Some(1_000_000), 5_200.0, 1.0, BASIS, "5 200 + 1% of the amount over 200 000"),
            progressive(
                1_000_001,
                None,
                13_200.0,
                0.5,
                BASIS,
                "13 200 + 0.5% of the amount over 1 000 000, not more than 60 000",
            ),
        ],
    }
}

/// Arbitration (commercial) courts, ст. 333.21 НК РФ.
pub fn arbitration_schedule() -> FeeSchedule {
    const BASIS: &str = "пп. 1 п. 1 ст. 333.21 НК РФ";
    FeeSchedule {
        court_type: CourtType::Arbitration,
        version: BUNDLED_VERSION.to_string(),
        last_updated: bundled_release_date(),
        max_fee: 200_000.0,
        applicable_article: "ст. 333.21 НК РФ".to_string(),
        rules: vec![
            FeeRule {
                min_amount: 0,
                max_amount: Some(100_000),
                fee_type: FeeType::Percentage,
                fee_value: 4.0,
                base_fee: 0.0,
                minimum_fee: Some(2_000.0),
                legal_basis: BASIS.to_string(),
                formula: "4% of the claim, not less than 2 000".to_string(),
            },
            progressive(100_001, Some(200_000), 4_000.0, 3.0, BASIS, "4 000 + 3% of the amount over 100 000"),
            progressive(200_001, Some(1_000_000), 7_000.0, 2.0, BASIS, "7 000 + 2% of the amount over 200 000"),
            progressive(1_000_001, Some(2_000_000), 23_000.0, 1.0, BASIS, "23 000 + 1% of the amount over 1 000 000"),
            progressive(
                2_000_001,
                None,
                33_000.0,
                0.5,
                BASIS,
                "33 000 + 0.5% of the amount over 2 000 000, not more than 200 000",
            ),
        ],
    }
}

/// The schedule shipped with the binary for `court`.
pub fn bundled_schedule(court: CourtType) -> FeeSchedule {
    match court {
        CourtType::General => general_schedule(),
        CourtType::Arbitration => arbitration_schedule(),
    }
}
