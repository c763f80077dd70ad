use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::employee::EmploymentType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeductionLine {
    #[schema(example = "PhilHealth")]
    pub label: String,
    #[schema(example = "550.00", value_type = String)]
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LoanDeductionLine {
    pub loan_id: u64,
    #[schema(example = "Salary Loan")]
    pub name: String,
    #[schema(example = "100.00", value_type = String)]
    pub amount: Decimal,
    /// Balance left after this payslip's payment.
    #[schema(example = "1100.00", value_type = String)]
    pub remaining_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BonusLine {
    #[schema(example = "Rice Allowance")]
    pub name: String,
    #[schema(example = "1500.00", value_type = String)]
    pub amount: Decimal,
}

/// A computed pay period. Never edited; a recomputation writes a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Payslip {
    /// Zero until stored.
    pub id: u64,
    pub employee_id: u64,
    pub document_id: u64,
    #[schema(example = "October")]
    pub month: String,
    #[schema(example = 2026)]
    pub year: i32,
    pub employment_type: EmploymentType,

    #[schema(example = "160.00", value_type = String)]
    pub total_hours: Decimal,
    #[schema(example = 35)]
    pub late_minutes: i64,
    #[schema(example = 22)]
    pub working_days: u32,
    #[schema(example = 20)]
    pub days_present: u32,
    #[schema(example = 2)]
    pub days_absent: u32,
    #[schema(example = "2", value_type = String)]
    pub leave_used: Decimal,

    #[schema(example = "0.00", value_type = String)]
    pub absent_deduction: Decimal,
    #[schema(example = "21912.50", value_type = String)]
    pub gross_income: Decimal,

    pub statutory: Vec<DeductionLine>,
    pub loans: Vec<LoanDeductionLine>,
    #[schema(example = "100.00", value_type = String)]
    pub loan_deduction: Decimal,
    #[schema(example = "87.50", value_type = String)]
    pub late_deduction: Decimal,
    pub bonuses: Vec<BonusLine>,
    #[schema(example = "1500.00", value_type = String)]
    pub bonuses_total: Decimal,

    #[schema(example = "3000.00", value_type = String)]
    pub total_deductions: Decimal,
    #[schema(example = "20412.50", value_type = String)]
    pub net_income: Decimal,

    #[schema(example = "2026-11-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
impl Payslip {
    pub fn statutory_total(&self) -> Decimal {
        self.statutory.iter().map(|l| l.amount).sum()
    }
}
