use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::PayrollError;
use crate::model::bonus::Bonus;
use crate::model::employee::{EmployeeProfile, EmploymentType};
use crate::model::loan::Loan;
use crate::model::payslip::{LoanDeductionLine, Payslip};
use crate::model::time_record::TimeRecordDocument;
use crate::payroll::aggregate::AttendanceAggregator;
use crate::payroll::bonuses;
use crate::payroll::loans::{self, LoanPayment};
use crate::payroll::rules::PayrollRules;
use crate::utils::calendar::{DEFAULT_WORKING_DAYS, PayPeriod};
use crate::utils::money::round2;

/// A computed payslip and the balance changes that go with it.
///
/// Nothing is written here; the payroll service applies all of it in one
/// store session.
#[derive(Debug, Clone, PartialEq)]
pub struct PayrollOutcome {
    pub payslip: Payslip,
    /// New leave credit balance; `None` when credits are untouched.
    pub leave_credits: Option<Decimal>,
    pub loan_payments: Vec<LoanPayment>,
}

struct Earnings {
    days_absent: u32,
    leave_used: Decimal,
    absent_deduction: Decimal,
    late_deduction: Decimal,
    gross: Decimal,
    leave_credits: Option<Decimal>,
}

/// Computes the payslip of one pending time record.
///
/// Absences and leave come first, then statutory deductions on the resulting
/// gross, then loans and bonuses.
pub fn compute(
    profile: &EmployeeProfile,
    document: &TimeRecordDocument,
    loans: &[Loan],
    bonuses: &[Bonus],
    rules: &PayrollRules,
    now: DateTime<Utc>,
) -> Result<PayrollOutcome, PayrollError> {
    let record = &document.record;
    let context = || format!("employee {}, {} {}", document.employee_id, record.month, record.year);

    if profile.employee_id != document.employee_id {
        return Err(PayrollError::ComputationFailure {
            context: context(),
            detail: format!("profile belongs to employee {}", profile.employee_id),
        });
    }
    if !document.is_pending() {
        return Err(PayrollError::not_found(format!(
            "pending time record for {} {}",
            record.month, record.year
        )));
    }
    profile.validate()?;
    let scheme = rules.scheme_for(profile)?;

    let period = PayPeriod::resolve(&record.month, record.year);
    let working_days = period.map(|p| p.working_days()).unwrap_or(DEFAULT_WORKING_DAYS);
    if working_days == 0 {
        return Err(PayrollError::ComputationFailure {
            context: context(),
            detail: "period has no working days".to_string(),
        });
    }

    let summary = AttendanceAggregator::new(rules.shift, rules.presence).aggregate(&record.entries);
    debug!(
        employee_id = document.employee_id,
        working_days,
        minutes = summary.total_minutes,
        late = summary.total_late_minutes,
        present = summary.days_present,
        "Attendance aggregated"
    );

    let earnings = match profile.employment_type {
        EmploymentType::Irregular => Earnings {
            days_absent: 0,
            leave_used: Decimal::ZERO,
            absent_deduction: Decimal::ZERO,
            late_deduction: Decimal::ZERO,
            gross: round2(Decimal::from(summary.total_minutes) * profile.hourly_rate / Decimal::from(60)),
            leave_credits: None,
        },
        EmploymentType::Regular => {
            let salary = profile.regular_salary()?;
            let days_absent = working_days.saturating_sub(summary.days_present);
            let leave_used = profile.leave_credits.min(Decimal::from(days_absent));
            let unpaid_days = Decimal::from(days_absent) - leave_used;

            let absent_deduction = round2(salary / Decimal::from(working_days) * unpaid_days);
            let late_deduction = if scheme.late_penalty {
                round2(
                    Decimal::from(summary.total_late_minutes) * profile.hourly_rate
                        / Decimal::from(60),
                )
            } else {
                Decimal::ZERO
            };

            Earnings {
                days_absent,
                leave_used,
                absent_deduction,
                late_deduction,
                gross: salary - absent_deduction - late_deduction,
                leave_credits: Some(profile.leave_credits - leave_used),
            }
        }
    };

    let statutory = scheme.apply(earnings.gross, profile);
    let statutory_total: Decimal = statutory.iter().map(|l| l.amount).sum();

    let loan_cycle = loans::amortize(period, loans);
    let bonus_cycle = bonuses::resolve(period, rules, bonuses);

    let total_deductions = statutory_total + loan_cycle.total + earnings.late_deduction;
    let net_income =
        earnings.gross + bonus_cycle.total - (statutory_total + loan_cycle.total);

    let payslip = Payslip {
        id: 0,
        employee_id: document.employee_id,
        document_id: document.id,
        month: record.month.clone(),
        year: record.year,
        employment_type: profile.employment_type,
        total_hours: round2(summary.total_hours()),
        late_minutes: summary.total_late_minutes,
        working_days,
        days_present: summary.days_present,
        days_absent: earnings.days_absent,
        leave_used: earnings.leave_used,
        absent_deduction: earnings.absent_deduction,
        gross_income: earnings.gross,
        statutory,
        loans: loan_cycle.payments.iter().map(LoanDeductionLine::from).collect(),
        loan_deduction: loan_cycle.total,
        late_deduction: earnings.late_deduction,
        bonuses: bonus_cycle.lines,
        bonuses_total: bonus_cycle.total,
        total_deductions,
        net_income,
        created_at: now,
    };

    Ok(PayrollOutcome {
        payslip,
        leave_credits: earnings.leave_credits,
        loan_payments: loan_cycle.payments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::bonus::BonusFrequency;
    use crate::model::time_record::{DocumentStatus, TimeRecordDraft};
    use crate::payroll::aggregate::tests::{entry, full_day};
    use crate::payroll::rules::{DeductionScheme, GOVERNMENT_SCHEME};
    use chrono::{NaiveTime, TimeZone};
    use rust_decimal_macros::dec;

    fn document(month: &str, days: impl IntoIterator<Item = u8>) -> TimeRecordDocument {
        TimeRecordDocument {
            id: 10,
            employee_id: 1,
            status: DocumentStatus::Pending,
            record: TimeRecordDraft {
                employee_name: "MARIA SANTOS".into(),
                month: month.into(),
                year: 2026,
                shift_window_description: "8:00 AM - 12:00 PM and 1:00 PM - 5:00 PM".into(),
                approver_name: "JUAN Z. DELA CRUZ".into(),
                approver_title: "Principal".into(),
                total_time: "Not found".into(),
                entries: days.into_iter().map(full_day).collect(),
            },
        }
    }

    fn regular(credits: Decimal) -> EmployeeProfile {
        EmployeeProfile::new(
            1,
            EmploymentType::Regular,
            dec!(125),
            Some(dec!(22000)),
            credits,
            GOVERNMENT_SCHEME,
        )
        .unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 11, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn regular_absences_are_covered_by_leave() {
        let outcome = compute(
            &regular(dec!(5)),
            &document("October", 1..=20),
            &[],
            &[],
            &PayrollRules::default(),
            now(),
        )
        .unwrap();
        let slip = &outcome.payslip;

        assert_eq!(slip.working_days, 22);
        assert_eq!(slip.days_present, 20);
        assert_eq!(slip.days_absent, 2);
        assert_eq!(slip.leave_used, dec!(2));
        assert_eq!(slip.absent_deduction, dec!(0));
        assert_eq!(slip.gross_income, dec!(22000));
        assert_eq!(outcome.leave_credits, Some(dec!(3)));

        // GSIS 1980 + PhilHealth 550, tax exempt below 20833
        assert_eq!(slip.statutory_total(), dec!(2530.00));
        assert_eq!(slip.net_income, dec!(19470.00));
        assert_eq!(slip.total_hours, dec!(160));
    }

    #[test]
    fn irregular_is_paid_by_the_hour() {
        let profile = EmployeeProfile::new(
            1,
            EmploymentType::Irregular,
            dec!(150),
            None,
            dec!(5),
            GOVERNMENT_SCHEME,
        )
        .unwrap();
        let outcome = compute(
            &profile,
            &document("October", 1..=20),
            &[],
            &[],
            &PayrollRules::default(),
            now(),
        )
        .unwrap();

        assert_eq!(outcome.payslip.gross_income, dec!(24000));
        assert_eq!(outcome.payslip.days_absent, 0);
        assert_eq!(outcome.payslip.leave_used, dec!(0));
        assert_eq!(outcome.payslip.late_deduction, dec!(0));
        assert_eq!(outcome.leave_credits, None);
    }

    #[test]
    fn unpaid_absence_late_loans_and_bonuses() {
        let mut doc = document("October", 1..=18);
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0);
        doc.record.entries.push(entry(19, (t(8, 35), t(12, 0)), (t(13, 0), t(17, 0))));

        let loan = Loan::new(7, 1, "Salary Loan", dec!(1200), 12, 10, 2026).unwrap();
        let bonus = Bonus {
            id: 1,
            employee_id: 1,
            name: "Rice Allowance".into(),
            amount: dec!(1500),
            frequency: BonusFrequency::Monthly,
        };

        let outcome = compute(
            &regular(dec!(1)),
            &doc,
            &[loan],
            &[bonus],
            &PayrollRules::default(),
            now(),
        )
        .unwrap();
        let slip = &outcome.payslip;

        assert_eq!(slip.days_absent, 3);
        assert_eq!(slip.leave_used, dec!(1));
        assert_eq!(slip.absent_deduction, dec!(2000.00));
        assert_eq!(slip.late_minutes, 35);
        assert_eq!(slip.late_deduction, dec!(72.92));
        assert_eq!(slip.gross_income, dec!(19927.08));
        assert_eq!(outcome.leave_credits, Some(dec!(0)));

        assert_eq!(slip.statutory_total(), dec!(2291.62));
        assert_eq!(slip.loan_deduction, dec!(100.00));
        assert_eq!(slip.loans[0].remaining_balance, dec!(1100.00));
        assert_eq!(slip.bonuses_total, dec!(1500));
        assert_eq!(slip.total_deductions, dec!(2464.54));
        assert_eq!(slip.net_income, dec!(19035.46));
        assert_eq!(outcome.loan_payments.len(), 1);
    }

    #[test]
    fn scheme_without_late_penalty() {
        let mut doc = document("October", 1..=21);
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0);
        doc.record.entries.push(entry(22, (t(9, 0), t(12, 0)), (t(13, 0), t(17, 0))));

        let mut lenient = DeductionScheme::government();
        lenient.name = "lenient".into();
        lenient.late_penalty = false;
        let rules = PayrollRules::default().with_scheme(lenient);

        let mut profile = regular(dec!(0));
        profile.deduction_scheme = "lenient".into();

        let outcome = compute(&profile, &doc, &[], &[], &rules, now()).unwrap();
        assert_eq!(outcome.payslip.late_minutes, 60);
        assert_eq!(outcome.payslip.late_deduction, dec!(0));
        assert_eq!(outcome.payslip.gross_income, dec!(22000));
    }

    #[test]
    fn unresolvable_month_uses_default_working_days() {
        let loan = Loan::new(7, 1, "Salary Loan", dec!(1200), 12, 1, 2026).unwrap();
        let outcome = compute(
            &regular(dec!(0)),
            &document("Octobr", 1..=22),
            &[loan],
            &[],
            &PayrollRules::default(),
            now(),
        )
        .unwrap();
        assert_eq!(outcome.payslip.working_days, DEFAULT_WORKING_DAYS);
        assert_eq!(outcome.payslip.days_absent, 0);
        assert!(outcome.loan_payments.is_empty());
    }

    #[test]
    fn invalid_profile_is_rejected() {
        let mut profile = regular(dec!(0));
        profile.monthly_salary = None;
        let err = compute(
            &profile,
            &document("October", 1..=22),
            &[],
            &[],
            &PayrollRules::default(),
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, PayrollError::InvalidProfileData { .. }));
    }

    #[test]
    fn processed_document_is_not_recomputed() {
        let mut doc = document("October", 1..=22);
        doc.status = DocumentStatus::Processed;
        let err = compute(&regular(dec!(0)), &doc, &[], &[], &PayrollRules::default(), now())
            .unwrap_err();
        assert!(matches!(err, PayrollError::NotFound { .. }));
    }
}
