//! Statutory exemptions and the discount they grant on a computed fee.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::money::{format_rub, round_money};
use crate::{CourtType, FeeError};

/// Discount granted by an exemption.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Discount {
    /// Percent of the base fee, `0..=100`.
    Percentage(f64),
    /// Fixed rouble amount, never more than the fee itself.
    Fixed(f64),
    /// Full waiver.
    Exempt,
}

/// A statutory discount policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExemptionCategory {
    pub id: String,
    pub name: String,
    pub description: String,
    pub legal_basis: String,
    pub discount: Discount,
    pub applicable_courts: Vec<CourtType>,
}

impl ExemptionCategory {
    pub fn applies_to(&self, court: CourtType) -> bool {
        self.applicable_courts.contains(&court)
    }

    pub fn validate(&self) -> Result<(), FeeError> {
        if self.id.trim().is_empty() {
            return Err(FeeError::InvalidExemption("empty exemption id".into()));
        }
        match self.discount {
            Discount::Percentage(p) if !(0.0..=100.0).contains(&p) => {
                Err(FeeError::InvalidExemption(format!(
                    "'{}': percentage {p} outside 0..=100",
                    self.id
                )))
            }
            Discount::Fixed(v) if !(v.is_finite() && v >= 0.0) => Err(FeeError::InvalidExemption(
                format!("'{}': fixed discount {v} is negative", self.id),
            )),
            _ => Ok(()),
        }
    }
}

/// Filters, validates and prices exemptions independently of the fee engine.
#[derive(Debug, Clone)]
pub struct ExemptionManager {
    catalogue: Vec<ExemptionCategory>,
}

impl Default for ExemptionManager {
    fn default() -> Self {
        Self::bundled()
    }
}

impl ExemptionManager {
    /// Build a manager over `catalogue`, rejecting invalid entries and duplicate ids.
    pub fn new(catalogue: Vec<ExemptionCategory>) -> Result<Self, FeeError> {
        let mut seen = HashSet::new();
        for exemption in &catalogue {
            exemption.validate()?;
            if !seen.insert(exemption.id.as_str()) {
                return Err(FeeError::InvalidExemption(format!(
                    "duplicate exemption id '{}'",
                    exemption.id
                )));
            }
        }
        Ok(Self { catalogue })
    }

    pub fn bundled() -> Self {
        Self {
            catalogue: bundled_exemptions(),
        }
    }

    pub fn catalogue(&self) -> &[ExemptionCategory] {
        &self.catalogue
    }

    pub fn find(&self, id: &str) -> Option<&ExemptionCategory> {
        self.catalogue.iter().find(|e| e.id == id)
    }

    /// Exemptions that may be applied in `court`.
    pub fn get_available_exemptions(&self, court: CourtType) -> Vec<&ExemptionCategory> {
        self.catalogue.iter().filter(|e| e.applies_to(court)).collect()
    }

    /// False when either side is missing or the court is not in the exemption's list.
    pub fn validate_exemption(exemption: Option<&ExemptionCategory>, court: Option<CourtType>) -> bool {
        match (exemption, court) {
            (Some(exemption), Some(court)) => exemption.applies_to(court),
            _ => false,
        }
    }

    /// Like [`Self::validate_exemption`], but names the offending exemption and court.
    pub fn ensure_applicable(exemption: &ExemptionCategory, court: CourtType) -> Result<(), FeeError> {
        if Self::validate_exemption(Some(exemption), Some(court)) {
            Ok(())
        } else {
            Err(FeeError::NotApplicable {
                exemption: exemption.id.clone(),
                court,
            })
        }
    }

    /// Discount granted on `base_fee`, always within `[0, base_fee]`.
    ///
    /// A missing exemption yields no discount; a negative base fee or a
    /// malformed exemption is an error.
    pub fn calculate_discount(base_fee: f64, exemption: Option<&ExemptionCategory>) -> Result<f64, FeeError> {
        if base_fee.is_nan() || base_fee < 0.0 {
            return Err(FeeError::InvalidInput("base fee cannot be negative".into()));
        }
        if !base_fee.is_finite() {
            return Err(FeeError::InvalidInput("base fee must be finite".into()));
        }
        let Some(exemption) = exemption else {
            return Ok(0.0);
        };
        exemption.validate()?;

        let discount = match exemption.discount {
            Discount::Exempt => base_fee,
            Discount::Fixed(value) => value.max(0.0).min(base_fee),
            Discount::Percentage(percent) => base_fee * percent.clamp(0.0, 100.0) / 100.0,
        };
        Ok(round_money(discount).clamp(0.0, base_fee))
    }

    /// The candidate yielding the largest discount on `base_fee`.
    pub fn get_best_exemption(base_fee: f64, candidates: &[ExemptionCategory]) -> Option<&ExemptionCategory> {
        let mut best: Option<(&ExemptionCategory, f64)> = None;
        for candidate in candidates {
            let Ok(discount) = Self::calculate_discount(base_fee, Some(candidate)) else {
                continue;
            };
            if best.is_none_or(|(_, top)| discount > top) {
                best = Some((candidate, discount));
            }
        }
        best.map(|(exemption, _)| exemption)
    }

    /// Human-readable summary of what `exemption` does to `base_fee`.
    pub fn get_exemption_description(base_fee: f64, exemption: &ExemptionCategory) -> Result<String, FeeError> {
        let discount = Self::calculate_discount(base_fee, Some(exemption))?;
        let remaining = round_money(base_fee - discount);
        let head = format!("{} ({})", exemption.name, exemption.legal_basis);

        Ok(match exemption.discount {
            Discount::Exempt => format!(
                "{head}: full exemption from the state fee, saves {}",
                format_rub(discount)
            ),
            Discount::Fixed(_) => format!(
                "{head}: fee reduced by {}, {} left to pay",
                format_rub(discount),
                format_rub(remaining)
            ),
            Discount::Percentage(percent) => format!(
                "{head}: {percent}% discount saves {}, {} left to pay",
                format_rub(discount),
                format_rub(remaining)
            ),
        })
    }
}

fn exemption(
    id: &str,
    name: &str,
    description: &str,
    legal_basis: &str,
    discount: Discount,
    applicable_courts: &[CourtType],
) -> ExemptionCategory {
    ExemptionCategory {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        legal_basis: legal_basis.to_string(),
        discount,
        applicable_courts: applicable_courts.to_vec(),
    }
}

/// Exemption catalogue shipped with the binary (ст. 333.20, 333.36, 333.37, 333.40 НК РФ).
pub fn bundled_exemptions() -> Vec<ExemptionCategory> {
    use CourtType::{Arbitration, General};

    vec![
        exemption(
            "wwii_veterans",
            "Veterans of the Great Patriotic War",
            "Veterans and disabled veterans of the Great Patriotic War",
            "пп. 3 п. 2 ст. 333.36 НК РФ",
            Discount::Exempt,
            &[General, Arbitration],
        ),
        exemption(
            "disabled_group_1_2",
            "Disability groups I and II",
            "Persons with group I or II disability, claims up to 1 000 000",
            "пп. 2 п. 2 ст. 333.36 НК РФ",
            Discount::Exempt,
            &[General],
        ),
        exemption(
            "consumer_protection",
            "Consumer protection claims",
            "Plaintiffs in consumer rights disputes, claims up to 1 000 000",
            "п. 3 ст. 333.36 НК РФ",
            Discount::Exempt,
            &[General],
        ),
        exemption(
            "labor_disputes",
            "Labour disputes",
            "Employees claiming wages and other employment-related amounts",
            "пп. 1 п. 1 ст. 333.36 НК РФ",
            Discount::Exempt,
            &[General],
        ),
        exemption(
            "alimony",
            "Alimony claims",
            "Plaintiffs claiming alimony",
            "пп. 2 п. 1 ст. 333.36 НК РФ",
            Discount::Exempt,
            &[General],
        ),
        exemption(
            "settlement_first_instance",
            "Settlement at first instance",
            "70% of the paid fee is refunded when the parties settle before the first-instance ruling",
            "пп. 3 п. 1 ст. 333.40 НК РФ",
            Discount::Percentage(70.0),
            &[General, Arbitration],
        ),
        exemption(
            "property_status_reduction",
            "Reduction by property status",
            "The court may reduce the fee taking the payer's property status into account",
            "п. 2 ст. 333.20 НК РФ",
            Discount::Fixed(1_000.0),
            &[General, Arbitration],
        ),
    ]
}
