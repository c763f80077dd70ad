use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::PayrollError;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({ "id": 1, "full_name": "Maria Santos" }))]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    /// Canonical name used to check uploaded time records.
    #[schema(example = "Maria Santos")]
    pub full_name: String,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EmploymentType {
    /// Fixed monthly salary, absences and lateness are deducted.
    Regular,
    /// Paid for clocked hours only.
    Irregular,
}

/// Compensation inputs for one employee.
///
/// Build through [`EmployeeProfile::new`] so the invariants hold: rates and
/// leave credits are never negative and a regular employee always has a
/// positive monthly salary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EmployeeProfile {
    #[schema(example = 1)]
    pub employee_id: u64,
    pub employment_type: EmploymentType,
    #[schema(example = "125.00", value_type = String)]
    pub hourly_rate: Decimal,
    #[schema(example = "22000.00", value_type = Option<String>)]
    pub monthly_salary: Option<Decimal>,
    #[schema(example = "5", value_type = String)]
    pub leave_credits: Decimal,
    /// Name of the deduction scheme in the payroll rules.
    #[schema(example = "government")]
    pub deduction_scheme: String,
    /// Per-period amounts for `profile_amount` scheme items, keyed by item label.
    #[schema(value_type = Object)]
    pub fixed_deductions: BTreeMap<String, Decimal>,
    #[schema(example = "SG-11")]
    pub salary_grade: Option<String>,
}

impl EmployeeProfile {
    pub fn new(
        employee_id: u64,
        employment_type: EmploymentType,
        hourly_rate: Decimal,
        monthly_salary: Option<Decimal>,
        leave_credits: Decimal,
        deduction_scheme: impl Into<String>,
    ) -> Result<Self, PayrollError> {
        let profile = Self {
            employee_id,
            employment_type,
            hourly_rate,
            monthly_salary,
            leave_credits,
            deduction_scheme: deduction_scheme.into(),
            fixed_deductions: BTreeMap::new(),
            salary_grade: None,
        };
        profile.validate()?;
        Ok(profile)
    }

    #[cfg(test)]
    pub fn with_fixed_deduction(mut self, label: impl Into<String>, amount: Decimal) -> Self {
        self.fixed_deductions.insert(label.into(), amount);
        self
    }

    #[cfg(test)]
    pub fn with_salary_grade(mut self, grade: impl Into<String>) -> Self {
        self.salary_grade = Some(grade.into());
        self
    }

    pub fn validate(&self) -> Result<(), PayrollError> {
        if self.hourly_rate < Decimal::ZERO {
            return Err(PayrollError::invalid_profile("hourly_rate", "must not be negative"));
        }
        if self.leave_credits < Decimal::ZERO {
            return Err(PayrollError::invalid_profile("leave_credits", "must not be negative"));
        }
        if self.deduction_scheme.trim().is_empty() {
            return Err(PayrollError::invalid_profile("deduction_scheme", "is required"));
        }
        if let Some((label, _)) = self.fixed_deductions.iter().find(|(_, v)| **v < Decimal::ZERO) {
            return Err(PayrollError::invalid_profile(
                format!("fixed_deductions.{label}"),
                "must not be negative",
            ));
        }
        if self.employment_type == EmploymentType::Regular {
            self.regular_salary()?;
        }
        Ok(())
    }

    /// Monthly salary of a regular employee.
    pub fn regular_salary(&self) -> Result<Decimal, PayrollError> {
        match self.monthly_salary {
            Some(salary) if salary > Decimal::ZERO => Ok(salary),
            Some(_) => Err(PayrollError::invalid_profile(
                "monthly_salary",
                "must be positive for regular employees",
            )),
            None => Err(PayrollError::invalid_profile(
                "monthly_salary",
                "is required for regular employees",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn regular_requires_salary() {
        let err = EmployeeProfile::new(1, EmploymentType::Regular, dec!(100), None, dec!(0), "government")
            .unwrap_err();
        assert!(matches!(err, PayrollError::InvalidProfileData { ref field, .. } if field == "monthly_salary"));
    }

    #[test]
    fn rejects_negative_leave_credits() {
        let err = EmployeeProfile::new(
            1,
            EmploymentType::Irregular,
            dec!(150),
            None,
            dec!(-1),
            "government",
        )
        .unwrap_err();
        assert!(matches!(err, PayrollError::InvalidProfileData { ref field, .. } if field == "leave_credits"));
    }

    #[test]
    fn employment_type_round_trips_through_strings() {
        assert_eq!("regular".parse::<EmploymentType>().unwrap(), EmploymentType::Regular);
        assert_eq!(EmploymentType::Irregular.as_ref(), "irregular");
        assert!("contractual".parse::<EmploymentType>().is_err());
    }
}
