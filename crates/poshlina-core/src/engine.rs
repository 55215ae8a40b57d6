//! Fee calculation engine.
//!
//! Pure computation over an injected pair of schedules: resolve the bracket,
//! apply its formula, cap at the statutory ceiling, then overlay an exemption.
//! Every step is recorded in the breakdown so the result can be audited.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::money::round_money;
use crate::schedule::{arbitration_schedule, general_schedule};
use crate::{
    CourtType, Discount, ExemptionCategory, ExemptionManager, FeeError, FeeSchedule, FeeType,
    find_applicable_rule,
};

/// Part two of the Tax Code (chapter 25.3, state duty).
pub const TAX_CODE_URL: &str = "https://www.consultant.ru/document/cons_doc_LAW_28165/";

/// One audited step of a calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownItem {
    pub description: String,
    /// Signed contribution to the final fee.
    pub amount: f64,
    pub formula: String,
    pub legal_basis: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegalReference {
    pub article: String,
    pub description: String,
    pub url: String,
    pub last_verified: NaiveDate,
}

/// Base fee before any exemption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeCalculation {
    pub claim_amount: f64,
    pub court_type: CourtType,
    pub amount: f64,
    pub formula: String,
    pub breakdown: Vec<BreakdownItem>,
    pub applicable_article: String,
    pub schedule_version: String,
    pub legal_references: Vec<LegalReference>,
}

/// Final outcome of one fee computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub claim_amount: f64,
    pub court_type: CourtType,
    pub base_fee: f64,
    pub exemption_discount: f64,
    pub final_fee: f64,
    /// Final fee as a percentage of the claim.
    pub effective_rate: f64,
    pub exemption_id: Option<String>,
    pub schedule_version: String,
    pub breakdown: Vec<BreakdownItem>,
    pub legal_references: Vec<LegalReference>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalculationRequest {
    pub claim_amount: f64,
    pub court_type: CourtType,
    pub exemption: Option<ExemptionCategory>,
}

/// Computes court fees from one schedule per jurisdiction type.
#[derive(Debug, Clone)]
pub struct FeeCalculationEngine {
    general: FeeSchedule,
    arbitration: FeeSchedule,
}

impl Default for FeeCalculationEngine {
    fn default() -> Self {
        Self::bundled()
    }
}

impl FeeCalculationEngine {
    /// Build an engine over the given schedules after validating both.
    pub fn new(general: FeeSchedule, arbitration: FeeSchedule) -> Result<Self, FeeError> {
        for (expected, schedule) in [(CourtType::General, &general), (CourtType::Arbitration, &arbitration)] {
            if schedule.court_type != expected {
                return Err(FeeError::InvalidSchedule(format!(
                    "expected a {expected} schedule, got {}",
                    schedule.court_type
                )));
            }
            schedule.validate()?;
        }
        Ok(Self { general, arbitration })
    }

    /// Engine over the tables shipped with the binary.
    pub fn bundled() -> Self {
        Self {
            general: general_schedule(),
            arbitration: arbitration_schedule(),
        }
    }

    pub fn schedule(&self, court: CourtType) -> &FeeSchedule {
        match court {
            CourtType::General => &self.general,
            CourtType::Arbitration => &self.arbitration,
        }
    }

    pub fn calculate_general_jurisdiction_fee(&self, claim_amount: f64) -> Result<FeeCalculation, FeeError> {
        self.calculate_fee(CourtType::General, claim_amount)
    }

    pub fn calculate_arbitration_fee(&self, claim_amount: f64) -> Result<FeeCalculation, FeeError> {
        self.calculate_fee(CourtType::Arbitration, claim_amount)
    }

    /// Base fee for `claim_amount` in `court`. The claim must be positive.
    pub fn calculate_fee(&self, court: CourtType, claim_amount: f64) -> Result<FeeCalculation, FeeError> {
        if !(claim_amount.is_finite() && claim_amount > 0.0) {
            return Err(FeeError::InvalidInput(format!(
                "claim amount must be a positive number, got {claim_amount}"
            )));
        }

        let schedule = self.schedule(court);
        let rule = find_applicable_rule(claim_amount, &schedule.rules).ok_or_else(|| {
            FeeError::InvalidSchedule(format!("no {court} bracket covers {claim_amount}"))
        })?;
        debug!(%court, claim_amount, bracket_min = rule.min_amount, "resolved fee bracket");

        let raw = rule.fee_at(claim_amount);
        let mut formula = match rule.fee_type {
            FeeType::Percentage => match rule.minimum_fee {
                Some(minimum) if claim_amount * rule.fee_value / 100.0 < minimum => format!(
                    "max({} × {}%, {}) = {}",
                    num(claim_amount),
                    num(rule.fee_value),
                    num(minimum),
                    num(raw)
                ),
                _ => format!("{} × {}% = {}", num(claim_amount), num(rule.fee_value), num(raw)),
            },
            FeeType::Fixed => format!("fixed {}", num(raw)),
            FeeType::Progressive => format!(
                "{} + ({} − {}) × {}% = {}",
                num(rule.base_fee),
                num(claim_amount),
                rule.floor(),
                num(rule.fee_value),
                num(raw)
            ),
        };
        let raw = round_money(raw);

        let mut breakdown = vec![BreakdownItem {
            description: format!("State fee, {court} jurisdiction ({})", schedule.applicable_article),
            amount: raw,
            formula: formula.clone(),
            legal_basis: rule.legal_basis.clone(),
        }];

        let mut amount = raw;
        let ceiling = round_money(schedule.max_fee);
        if raw > ceiling {
            amount = ceiling;
            formula = format!("min({formula}, {})", num(ceiling));
            breakdown.push(BreakdownItem {
                description: "Statutory maximum applied".to_string(),
                amount: round_money(ceiling - raw),
                formula: format!("min({}, {}) = {}", num(raw), num(ceiling), num(ceiling)),
                legal_basis: rule.legal_basis.clone(),
            });
        }

        Ok(FeeCalculation {
            claim_amount,
            court_type: court,
            amount,
            formula,
            breakdown,
            applicable_article: schedule.applicable_article.clone(),
            schedule_version: schedule.version.clone(),
            legal_references: vec![LegalReference {
                article: schedule.applicable_article.clone(),
                description: format!("State fee rates for claims in {court} courts"),
                url: TAX_CODE_URL.to_string(),
                last_verified: schedule.last_updated.date_naive(),
            }],
        })
    }

    /// Overlay `exemption` on a base calculation.
    ///
    /// The exemption is priced by [`ExemptionManager::calculate_discount`]; its
    /// applicability to the court is the caller's concern (see [`Self::calculate`]).
    pub fn apply_exemptions(
        base: &FeeCalculation,
        exemption: Option<&ExemptionCategory>,
    ) -> Result<CalculationResult, FeeError> {
        let discount = ExemptionManager::calculate_discount(base.amount, exemption)?;
        let final_fee = base.amount - discount;

        let mut breakdown = base.breakdown.clone();
        let mut legal_references = base.legal_references.clone();

        if let Some(exemption) = exemption {
            let formula = match exemption.discount {
                Discount::Exempt => format!("{} − {} = 0", num(base.amount), num(discount)),
                Discount::Fixed(value) => format!(
                    "{} − min({}, {}) = {}",
                    num(base.amount),
                    num(value),
                    num(base.amount),
                    num(final_fee)
                ),
                Discount::Percentage(percent) => format!(
                    "{} − {} × {}% = {}",
                    num(base.amount),
                    num(base.amount),
                    num(percent),
                    num(final_fee)
                ),
            };
            breakdown.push(BreakdownItem {
                description: format!("Exemption: {}", exemption.name),
                amount: -discount,
                formula,
                legal_basis: exemption.legal_basis.clone(),
            });
            let last_verified = base
                .legal_references
                .first()
                .map(|r| r.last_verified)
                .unwrap_or_default();
            legal_references.push(LegalReference {
                article: exemption.legal_basis.clone(),
                description: exemption.description.clone(),
                url: TAX_CODE_URL.to_string(),
                last_verified,
            });
        }

        Ok(CalculationResult {
            claim_amount: base.claim_amount,
            court_type: base.court_type,
            base_fee: base.amount,
            exemption_discount: discount,
            final_fee,
            effective_rate: round_money(final_fee / base.claim_amount * 100.0),
            exemption_id: exemption.map(|e| e.id.clone()),
            schedule_version: base.schedule_version.clone(),
            breakdown,
            legal_references,
        })
    }

    /// Full pipeline: base fee, then the requested exemption when it applies to the court.
    pub fn calculate(&self, request: &CalculationRequest) -> Result<CalculationResult, FeeError> {
        let base = self.calculate_fee(request.court_type, request.claim_amount)?;

        let exemption = match &request.exemption {
            Some(e) if !ExemptionManager::validate_exemption(Some(e), Some(request.court_type)) => {
                warn!(
                    exemption = %e.id,
                    court = %request.court_type,
                    "exemption not applicable to court type, ignoring"
                );
                None
            }
            other => other.as_ref(),
        };

        Self::apply_exemptions(&base, exemption)
    }
}

/// Render a number for formula strings: whole values without decimals.
fn num(value: f64) -> String {
    let rounded = round_money(value);
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        format!("{rounded:.2}")
    }
}
