//! Statutory deductions.
//!
//! A deduction scheme is an ordered list of labelled items. Flat items are
//! computed on gross income first; progressive items (withholding tax) are then
//! computed on gross less the flat items of the same scheme. Each employee
//! profile names the scheme that applies to it.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PayrollError;
use crate::model::employee::EmployeeProfile;
use crate::model::payslip::DeductionLine;
use crate::payroll::aggregate::{PresencePolicy, ShiftDefinition};
use crate::utils::money::round2;

pub const GOVERNMENT_SCHEME: &str = "government";
pub const PRIVATE_SCHEME: &str = "private";
pub const PROFILE_SCHEME: &str = "profile";

/// `rate * clamp(base, floor, ceiling)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionRule {
    pub rate: Decimal,
    #[serde(default)]
    pub floor: Decimal,
    #[serde(default)]
    pub ceiling: Option<Decimal>,
}

impl ContributionRule {
    pub fn apply(&self, base: Decimal) -> Decimal {
        let mut base = base.max(self.floor);
        if let Some(ceiling) = self.ceiling {
            base = base.min(ceiling);
        }
        round2(self.rate * base)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    /// `None` only on the last, open-ended bracket.
    pub upper_bound: Option<Decimal>,
    pub base_tax: Decimal,
    pub rate: Decimal,
}

impl TaxBracket {
    pub fn new(upper_bound: Option<Decimal>, base_tax: Decimal, rate: Decimal) -> Self {
        Self {
            upper_bound,
            base_tax,
            rate,
        }
    }
}

/// Ascending brackets; each starts where the previous one ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TaxBracket>", into = "Vec<TaxBracket>")]
pub struct TaxTable {
    brackets: Vec<TaxBracket>,
}

impl TryFrom<Vec<TaxBracket>> for TaxTable {
    type Error = PayrollError;

    fn try_from(brackets: Vec<TaxBracket>) -> Result<Self, Self::Error> {
        let invalid = |detail: String| PayrollError::ParseFailure {
            what: "tax table".to_string(),
            detail,
        };

        let Some((last, bounded)) = brackets.split_last() else {
            return Err(invalid("needs at least one bracket".into()));
        };
        if last.upper_bound.is_some() {
            return Err(invalid("last bracket must be open-ended".into()));
        }

        let mut lower = Decimal::ZERO;
        for (i, bracket) in bounded.iter().enumerate() {
            let Some(upper) = bracket.upper_bound else {
                return Err(invalid(format!("bracket {i} is open-ended but not last")));
            };
            if upper <= lower {
                return Err(invalid(format!("bracket {i} does not ascend")));
            }
            lower = upper;
        }

        if let Some(i) = brackets
            .iter()
            .position(|b| b.rate < Decimal::ZERO || b.base_tax < Decimal::ZERO)
        {
            return Err(invalid(format!("bracket {i} has a negative amount")));
        }

        Ok(Self { brackets })
    }
}

impl From<TaxTable> for Vec<TaxBracket> {
    fn from(table: TaxTable) -> Self {
        table.brackets
    }
}

impl TaxTable {
    /// Monthly withholding table under the TRAIN law (2023 onwards).
    pub fn train_monthly() -> Self {
        Self {
            brackets: vec![
                TaxBracket::new(Some(dec!(20833)), dec!(0), dec!(0)),
                TaxBracket::new(Some(dec!(33333)), dec!(0), dec!(0.15)),
                TaxBracket::new(Some(dec!(66667)), dec!(1875), dec!(0.20)),
                TaxBracket::new(Some(dec!(166667)), dec!(8541.80), dec!(0.25)),
                TaxBracket::new(Some(dec!(666667)), dec!(33541.80), dec!(0.30)),
                TaxBracket::new(None, dec!(183541.80), dec!(0.35)),
            ],
        }
    }

    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }

    pub fn apply(&self, taxable: Decimal) -> Decimal {
        let taxable = taxable.max(Decimal::ZERO);
        let mut lower = Decimal::ZERO;

        for bracket in &self.brackets {
            match bracket.upper_bound {
                Some(upper) if taxable > upper => lower = upper,
                _ => return round2(bracket.base_tax + bracket.rate * (taxable - lower)),
            }
        }

        // Unreachable for a validated table: the last bracket is open-ended.
        Decimal::ZERO
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeductionKind {
    Contribution(ContributionRule),
    Progressive { brackets: TaxTable },
    Fixed { amount: Decimal },
    /// The amount stored on the employee profile under the item label.
    ProfileAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionItem {
    pub label: String,
    pub rule: DeductionKind,
}

impl DeductionItem {
    pub fn new(label: impl Into<String>, rule: DeductionKind) -> Self {
        Self {
            label: label.into(),
            rule,
        }
    }

    fn is_progressive(&self) -> bool {
        matches!(self.rule, DeductionKind::Progressive { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionScheme {
    pub name: String,
    pub items: Vec<DeductionItem>,
    /// Whether regular employees lose pay for late minutes.
    #[serde(default = "default_late_penalty")]
    pub late_penalty: bool,
}

fn default_late_penalty() -> bool {
    true
}

impl DeductionScheme {
    /// GSIS, PhilHealth and withholding tax.
    pub fn government() -> Self {
        Self {
            name: GOVERNMENT_SCHEME.to_string(),
            items: vec![
                DeductionItem::new(
                    "GSIS",
                    DeductionKind::Contribution(ContributionRule {
                        rate: dec!(0.09),
                        floor: Decimal::ZERO,
                        ceiling: None,
                    }),
                ),
                philhealth(),
                withholding_tax(),
            ],
            late_penalty: true,
        }
    }

    /// SSS, Pag-IBIG, PhilHealth and withholding tax.
    pub fn private() -> Self {
        Self {
            name: PRIVATE_SCHEME.to_string(),
            items: vec![
                DeductionItem::new(
                    "SSS",
                    DeductionKind::Contribution(ContributionRule {
                        rate: dec!(0.045),
                        floor: dec!(3250),
                        ceiling: Some(dec!(30000)),
                    }),
                ),
                DeductionItem::new(
                    "Pag-IBIG",
                    DeductionKind::Contribution(ContributionRule {
                        rate: dec!(0.02),
                        floor: Decimal::ZERO,
                        ceiling: Some(dec!(10000)),
                    }),
                ),
                philhealth(),
                withholding_tax(),
            ],
            late_penalty: true,
        }
    }

    /// Per-employee fixed amounts kept on the profile.
    pub fn profile() -> Self {
        Self {
            name: PROFILE_SCHEME.to_string(),
            items: ["GSIS", "PhilHealth", "Tax"]
                .into_iter()
                .map(|label| DeductionItem::new(label, DeductionKind::ProfileAmount))
                .collect(),
            late_penalty: true,
        }
    }

    /// Deduction lines in scheme order.
    pub fn apply(&self, gross: Decimal, profile: &EmployeeProfile) -> Vec<DeductionLine> {
        let mut amounts = vec![Decimal::ZERO; self.items.len()];

        for (amount, item) in amounts.iter_mut().zip(&self.items) {
            *amount = match &item.rule {
                DeductionKind::Contribution(rule) => rule.apply(gross),
                DeductionKind::Fixed { amount } => round2(*amount),
                DeductionKind::ProfileAmount => match profile.fixed_deductions.get(&item.label) {
                    Some(value) => round2(*value),
                    None => {
                        warn!(
                            employee_id = profile.employee_id,
                            label = %item.label,
                            "Profile has no amount for deduction, using zero"
                        );
                        Decimal::ZERO
                    }
                },
                DeductionKind::Progressive { .. } => continue,
            };
        }

        let flat_total: Decimal = amounts
            .iter()
            .zip(&self.items)
            .filter(|(_, item)| !item.is_progressive())
            .map(|(amount, _)| *amount)
            .sum();
        let taxable = gross - flat_total;
        debug!(scheme = %self.name, %gross, %taxable, "Computing statutory deductions");

        for (amount, item) in amounts.iter_mut().zip(&self.items) {
            if let DeductionKind::Progressive { brackets } = &item.rule {
                *amount = brackets.apply(taxable);
            }
        }

        self.items
            .iter()
            .zip(amounts)
            .map(|(item, amount)| DeductionLine {
                label: item.label.clone(),
                amount,
            })
            .collect()
    }
}

fn philhealth() -> DeductionItem {
    DeductionItem::new(
        "PhilHealth",
        DeductionKind::Contribution(ContributionRule {
            rate: dec!(0.025),
            floor: dec!(10000),
            ceiling: Some(dec!(100000)),
        }),
    )
}

fn withholding_tax() -> DeductionItem {
    DeductionItem::new(
        "Tax",
        DeductionKind::Progressive {
            brackets: TaxTable::train_monthly(),
        },
    )
}

/// Shape of the `PAYROLL_RULES_PATH` file.
#[derive(Debug, Deserialize)]
struct RulesFile {
    schemes: Vec<DeductionScheme>,
}

/// Everything the pipeline needs besides the employee's own records.
#[derive(Debug, Clone)]
pub struct PayrollRules {
    schemes: BTreeMap<String, DeductionScheme>,
    pub default_scheme: String,
    /// 1 to 12; yearly bonuses are paid in this month.
    pub year_end_month: u32,
    pub shift: ShiftDefinition,
    pub presence: PresencePolicy,
}

impl Default for PayrollRules {
    fn default() -> Self {
        let schemes = [
            DeductionScheme::government(),
            DeductionScheme::private(),
            DeductionScheme::profile(),
        ];
        Self {
            schemes: schemes.into_iter().map(|s| (s.name.clone(), s)).collect(),
            default_scheme: GOVERNMENT_SCHEME.to_string(),
            year_end_month: 12,
            shift: ShiftDefinition::default(),
            presence: PresencePolicy::default(),
        }
    }
}

impl PayrollRules {
    /// Adds or replaces a scheme by name.
    pub fn with_scheme(mut self, scheme: DeductionScheme) -> Self {
        self.schemes.insert(scheme.name.clone(), scheme);
        self
    }

    /// Merges the schemes of a JSON rules file over the built-in ones.
    pub fn with_schemes_from_file(self, path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading payroll rules from {}", path.display()))?;
        let file: RulesFile = serde_json::from_str(&raw)
            .with_context(|| format!("parsing payroll rules in {}", path.display()))?;

        Ok(file
            .schemes
            .into_iter()
            .fold(self, |rules, scheme| rules.with_scheme(scheme)))
    }

    pub fn scheme(&self, name: &str) -> Option<&DeductionScheme> {
        self.schemes.get(name)
    }

    pub fn scheme_names(&self) -> impl Iterator<Item = &str> {
        self.schemes.keys().map(String::as_str)
    }

    /// The scheme a profile names; an unknown name is a profile error.
    pub fn scheme_for(&self, profile: &EmployeeProfile) -> Result<&DeductionScheme, PayrollError> {
        self.scheme(&profile.deduction_scheme).ok_or_else(|| {
            PayrollError::invalid_profile(
                "deduction_scheme",
                format!("unknown scheme '{}'", profile.deduction_scheme),
            )
        })
    }

    pub fn is_year_end(&self, month: u32) -> bool {
        month == self.year_end_month
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::employee::EmploymentType;

    fn profile(scheme: &str) -> EmployeeProfile {
        EmployeeProfile::new(
            1,
            EmploymentType::Regular,
            dec!(125),
            Some(dec!(22000)),
            dec!(5),
            scheme,
        )
        .unwrap()
    }

    #[test]
    fn contribution_respects_floor_and_ceiling() {
        let sss = ContributionRule {
            rate: dec!(0.045),
            floor: dec!(3250),
            ceiling: Some(dec!(30000)),
        };
        assert_eq!(sss.apply(dec!(2000)), dec!(146.25));
        assert_eq!(sss.apply(dec!(50000)), dec!(1350.00));
        assert_eq!(sss.apply(dec!(20000)), dec!(900.00));
    }

    #[test]
    fn uncapped_contribution() {
        let gsis = ContributionRule {
            rate: dec!(0.09),
            floor: Decimal::ZERO,
            ceiling: None,
        };
        assert_eq!(gsis.apply(dec!(250000)), dec!(22500.00));
    }

    #[test]
    fn tax_brackets() {
        let table = TaxTable::train_monthly();
        assert_eq!(table.apply(dec!(15000)), dec!(0));
        assert_eq!(table.apply(dec!(20833)), dec!(0));
        assert_eq!(table.apply(dec!(25000)), dec!(625.05));
        assert_eq!(table.apply(dec!(40000)), dec!(3208.40));
        assert_eq!(table.apply(dec!(1000000)), dec!(300208.35));
        assert_eq!(table.apply(dec!(-10)), dec!(0));
    }

    #[test]
    fn tax_table_validation() {
        let ok = vec![
            TaxBracket::new(Some(dec!(100)), dec!(0), dec!(0)),
            TaxBracket::new(None, dec!(0), dec!(0.1)),
        ];
        assert!(TaxTable::try_from(ok).is_ok());

        let descending = vec![
            TaxBracket::new(Some(dec!(100)), dec!(0), dec!(0)),
            TaxBracket::new(Some(dec!(50)), dec!(0), dec!(0.1)),
            TaxBracket::new(None, dec!(0), dec!(0.2)),
        ];
        assert!(TaxTable::try_from(descending).is_err());

        let closed = vec![TaxBracket::new(Some(dec!(100)), dec!(0), dec!(0))];
        assert!(TaxTable::try_from(closed).is_err());

        assert!(TaxTable::try_from(Vec::new()).is_err());
    }

    #[test]
    fn tax_is_computed_on_the_remainder() {
        let lines = DeductionScheme::private().apply(dec!(30000), &profile(PRIVATE_SCHEME));
        let labels: Vec<&str> = lines.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, vec!["SSS", "Pag-IBIG", "PhilHealth", "Tax"]);

        // 30000 - (1350 + 200 + 750) = 27700 taxable
        assert_eq!(lines[0].amount, dec!(1350.00));
        assert_eq!(lines[1].amount, dec!(200.00));
        assert_eq!(lines[2].amount, dec!(750.00));
        assert_eq!(lines[3].amount, dec!(1030.05));
    }

    #[test]
    fn profile_amounts_come_from_the_profile() {
        let p = profile(PROFILE_SCHEME)
            .with_fixed_deduction("GSIS", dec!(1980))
            .with_fixed_deduction("Tax", dec!(312.5));
        let lines = DeductionScheme::profile().apply(dec!(22000), &p);
        let amounts: Vec<Decimal> = lines.iter().map(|l| l.amount).collect();
        assert_eq!(amounts, vec![dec!(1980), dec!(0), dec!(312.50)]);
    }

    #[test]
    fn unknown_scheme_is_a_profile_error() {
        let rules = PayrollRules::default();
        assert!(rules.scheme_for(&profile("government")).is_ok());
        assert!(matches!(
            rules.scheme_for(&profile("cooperative")),
            Err(PayrollError::InvalidProfileData { .. })
        ));
    }

    #[test]
    fn schemes_deserialize_from_json() {
        let raw = r#"{
            "schemes": [{
                "name": "cooperative",
                "late_penalty": false,
                "items": [
                    { "label": "Coop Share", "rule": { "kind": "fixed", "amount": "250" } },
                    { "label": "SSS", "rule": { "kind": "contribution", "rate": "0.045", "floor": "3250", "ceiling": "30000" } },
                    { "label": "Tax", "rule": { "kind": "progressive", "brackets": [
                        { "upper_bound": "20000", "base_tax": "0", "rate": "0" },
                        { "upper_bound": null, "base_tax": "0", "rate": "0.1" }
                    ] } }
                ]
            }]
        }"#;
        let file: RulesFile = serde_json::from_str(raw).unwrap();
        let rules = file
            .schemes
            .into_iter()
            .fold(PayrollRules::default(), |r, s| r.with_scheme(s));

        let scheme = rules.scheme("cooperative").unwrap();
        assert!(!scheme.late_penalty);
        let lines = scheme.apply(dec!(21000), &profile("cooperative"));
        // taxable = 21000 - 250 - 945 = 19805
        assert_eq!(lines[2].amount, dec!(0.00));
        assert_eq!(lines[1].amount, dec!(945.00));
        assert!(rules.scheme(GOVERNMENT_SCHEME).is_some());
    }

    #[test]
    fn rejects_unordered_brackets_in_json() {
        let raw = r#"[{ "upper_bound": "500", "base_tax": "0", "rate": "0" },
                      { "upper_bound": "100", "base_tax": "0", "rate": "0" },
                      { "upper_bound": null, "base_tax": "0", "rate": "0.1" }]"#;
        assert!(serde_json::from_str::<TaxTable>(raw).is_err());
    }
}
