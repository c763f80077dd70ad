use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::PayrollError;
use crate::utils::calendar::PayPeriod;
use crate::utils::money::round2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Loan {
    #[schema(example = 7)]
    pub id: u64,
    #[schema(example = 1)]
    pub employee_id: u64,
    #[schema(example = "Salary Loan")]
    pub name: String,
    #[schema(example = "1200.00", value_type = String)]
    pub principal_amount: Decimal,
    #[schema(example = 12)]
    pub duration_months: u32,
    /// 1 to 12.
    #[schema(example = 10)]
    pub start_month: u32,
    #[schema(example = 2026)]
    pub start_year: i32,
    #[schema(example = "1100.00", value_type = String)]
    pub balance: Decimal,
}

impl Loan {
    /// A new loan; the balance starts at the principal.
    pub fn new(
        id: u64,
        employee_id: u64,
        name: impl Into<String>,
        principal_amount: Decimal,
        duration_months: u32,
        start_month: u32,
        start_year: i32,
    ) -> Result<Self, PayrollError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PayrollError::invalid_profile("loan.name", "is required"));
        }
        if principal_amount <= Decimal::ZERO {
            return Err(PayrollError::invalid_profile("loan.principal_amount", "must be positive"));
        }
        if duration_months == 0 {
            return Err(PayrollError::invalid_profile("loan.duration_months", "must be at least 1"));
        }
        if !(1..=12).contains(&start_month) {
            return Err(PayrollError::invalid_profile("loan.start_month", "must be between 1 and 12"));
        }

        Ok(Self {
            id,
            employee_id,
            name,
            principal_amount,
            duration_months,
            start_month,
            start_year,
            balance: principal_amount,
        })
    }

    pub fn start_period(&self) -> Option<PayPeriod> {
        PayPeriod::resolve(&self.start_month.to_string(), self.start_year)
    }

    /// Regular monthly installment before capping at the balance.
    pub fn installment(&self) -> Decimal {
        round2(self.principal_amount / Decimal::from(self.duration_months))
    }

    pub fn is_open(&self) -> bool {
        self.balance > Decimal::ZERO
    }
}
