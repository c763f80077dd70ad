//! Multi-month payslip summary.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::employee::{Employee, EmployeeProfile, EmploymentType};
use crate::model::payslip::Payslip;
use crate::utils::calendar::{PayPeriod, quarter_label};

pub const BASE_PAY: &str = "Base Pay";
pub const LATE: &str = "Late";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
pub struct Figures {
    #[schema(value_type = String, example = "21000.00")]
    pub gross_income: Decimal,
    #[schema(value_type = String, example = "2630.00")]
    pub total_deductions: Decimal,
    #[schema(value_type = String, example = "19870.00")]
    pub net_income: Decimal,
}

impl Figures {
    fn of(payslip: &Payslip) -> Self {
        Self {
            gross_income: payslip.gross_income,
            total_deductions: payslip.total_deductions,
            net_income: payslip.net_income,
        }
    }

    fn add(&mut self, other: Figures) {
        self.gross_income += other.gross_income;
        self.total_deductions += other.total_deductions;
        self.net_income += other.net_income;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthSummary {
    #[schema(example = "October 2026")]
    pub month: String,
    #[schema(example = "Oct-Dec 2026")]
    pub quarter: String,
    #[serde(flatten)]
    pub figures: Figures,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct QuarterSummary {
    #[schema(example = "Oct-Dec 2026")]
    pub quarter: String,
    #[serde(flatten)]
    pub figures: Figures,
}

/// One income or deduction item across the summarized months.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BreakdownRow {
    #[schema(example = "PhilHealth")]
    pub label: String,
    /// Month label to amount.
    #[schema(value_type = Object)]
    pub amounts: BTreeMap<String, Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PayslipSummary {
    pub employee_id: u64,
    #[schema(example = "Maria Santos")]
    pub full_name: String,
    pub employment_type: Option<EmploymentType>,
    pub salary_grade: Option<String>,
    pub months: Vec<MonthSummary>,
    pub quarters: Vec<QuarterSummary>,
    pub income_breakdown: Vec<BreakdownRow>,
    pub deduction_breakdown: Vec<BreakdownRow>,
    /// Balance left on each loan after the month's payment. Not a deduction.
    pub loan_balances: Vec<BreakdownRow>,
    pub totals: Figures,
}

fn add_to_row(rows: &mut Vec<BreakdownRow>, label: &str, month: &str, amount: Decimal) {
    let index = match rows.iter().position(|r| r.label == label) {
        Some(index) => index,
        None => {
            rows.push(BreakdownRow {
                label: label.to_string(),
                amounts: BTreeMap::new(),
            });
            rows.len() - 1
        }
    };
    *rows[index].amounts.entry(month.to_string()).or_default() += amount;
}

/// Builds the summary from payslips given in display order.
pub fn summarize(
    employee: &Employee,
    profile: Option<&EmployeeProfile>,
    payslips: &[Payslip],
) -> PayslipSummary {
    let mut months = Vec::with_capacity(payslips.len());
    let mut quarters: Vec<QuarterSummary> = Vec::new();
    let mut income_breakdown = Vec::new();
    let mut deduction_breakdown = Vec::new();
    let mut loan_balances = Vec::new();
    let mut totals = Figures::default();

    for payslip in payslips {
        let month = format!("{} {}", payslip.month, payslip.year);
        let quarter = PayPeriod::resolve(&payslip.month, payslip.year)
            .map(|p| quarter_label(&p))
            .unwrap_or_else(|| month.clone());
        let figures = Figures::of(payslip);

        totals.add(figures);
        match quarters.iter_mut().find(|q| q.quarter == quarter) {
            Some(q) => q.figures.add(figures),
            None => quarters.push(QuarterSummary {
                quarter: quarter.clone(),
                figures,
            }),
        }

        add_to_row(&mut income_breakdown, BASE_PAY, &month, payslip.gross_income);
        for bonus in &payslip.bonuses {
            add_to_row(&mut income_breakdown, &bonus.name, &month, bonus.amount);
        }

        for line in &payslip.statutory {
            add_to_row(&mut deduction_breakdown, &line.label, &month, line.amount);
        }
        for loan in &payslip.loans {
            add_to_row(&mut deduction_breakdown, &loan.name, &month, loan.amount);
            add_to_row(&mut loan_balances, &loan.name, &month, loan.remaining_balance);
        }
        if payslip.late_deduction > Decimal::ZERO {
            add_to_row(&mut deduction_breakdown, LATE, &month, payslip.late_deduction);
        }

        months.push(MonthSummary {
            month,
            quarter,
            figures,
        });
    }

    PayslipSummary {
        employee_id: employee.id,
        full_name: employee.full_name.clone(),
        employment_type: profile.map(|p| p.employment_type),
        salary_grade: profile.and_then(|p| p.salary_grade.clone()),
        months,
        quarters,
        income_breakdown,
        deduction_breakdown,
        loan_balances,
        totals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::payslip::{BonusLine, DeductionLine, LoanDeductionLine};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn payslip(month: &str, gross: Decimal, late: Decimal) -> Payslip {
        Payslip {
            id: 1,
            employee_id: 1,
            document_id: 1,
            month: month.into(),
            year: 2026,
            employment_type: EmploymentType::Regular,
            total_hours: dec!(160),
            late_minutes: 0,
            working_days: 22,
            days_present: 22,
            days_absent: 0,
            leave_used: Decimal::ZERO,
            absent_deduction: Decimal::ZERO,
            gross_income: gross,
            statutory: vec![DeductionLine {
                label: "PhilHealth".into(),
                amount: dec!(500),
            }],
            loans: vec![LoanDeductionLine {
                loan_id: 7,
                name: "Salary Loan".into(),
                amount: dec!(100),
                remaining_balance: dec!(1000),
            }],
            loan_deduction: dec!(100),
            late_deduction: late,
            bonuses: vec![BonusLine {
                name: "Rice Allowance".into(),
                amount: dec!(1500),
            }],
            bonuses_total: dec!(1500),
            total_deductions: dec!(600) + late,
            net_income: gross + dec!(1500) - dec!(600),
            created_at: Utc::now(),
        }
    }

    fn employee() -> Employee {
        Employee {
            id: 1,
            full_name: "Maria Santos".into(),
        }
    }

    #[test]
    fn groups_by_quarter_and_totals() {
        let slips = [
            payslip("September", dec!(20000), Decimal::ZERO),
            payslip("October", dec!(22000), Decimal::ZERO),
            payslip("November", dec!(21900), dec!(100)),
        ];
        let summary = summarize(&employee(), None, &slips);

        assert_eq!(summary.months.len(), 3);
        assert_eq!(summary.months[0].quarter, "Jul-Sep 2026");
        let quarters: Vec<&str> = summary.quarters.iter().map(|q| q.quarter.as_str()).collect();
        assert_eq!(quarters, vec!["Jul-Sep 2026", "Oct-Dec 2026"]);
        assert_eq!(summary.quarters[1].figures.gross_income, dec!(43900));
        assert_eq!(summary.totals.gross_income, dec!(63900));
        assert_eq!(summary.totals.total_deductions, dec!(1900));
        assert!(summary.employment_type.is_none());
    }

    #[test]
    fn breakdowns_follow_first_appearance() {
        let slips = [
            payslip("October", dec!(22000), Decimal::ZERO),
            payslip("November", dec!(21900), dec!(100)),
        ];
        let summary = summarize(&employee(), None, &slips);

        let income: Vec<&str> = summary.income_breakdown.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(income, vec![BASE_PAY, "Rice Allowance"]);

        let deductions: Vec<&str> =
            summary.deduction_breakdown.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(
            deductions,
            vec!["PhilHealth", "Salary Loan", LATE]
        );
        assert_eq!(summary.deduction_breakdown[2].amounts.len(), 1);
        assert_eq!(
            summary.deduction_breakdown[2].amounts.get("November 2026"),
            Some(&dec!(100))
        );
    }

    #[test]
    fn loan_balances_are_kept_apart_from_deductions() {
        let summary = summarize(&employee(), None, &[payslip("October", dec!(22000), Decimal::ZERO)]);

        assert_eq!(summary.loan_balances.len(), 1);
        assert_eq!(summary.loan_balances[0].label, "Salary Loan");
        assert_eq!(
            summary.loan_balances[0].amounts.get("October 2026"),
            Some(&dec!(1000))
        );
        assert_eq!(
            summary.deduction_breakdown[1].amounts.get("October 2026"),
            Some(&dec!(100))
        );
    }

    #[test]
    fn unknown_month_is_its_own_quarter() {
        let summary = summarize(&employee(), None, &[payslip("Octobr", dec!(1), Decimal::ZERO)]);
        assert_eq!(summary.quarters[0].quarter, "Octobr 2026");
    }
}
