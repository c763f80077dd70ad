use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument};

use crate::error::PayrollError;
use crate::model::payslip::Payslip;
use crate::payroll::{self, PayrollRules};
use crate::report::{self, PayslipSummary};
use crate::store::{Repository, Session, StoreError};
use crate::utils::calendar::canonical_month;

pub struct PayrollService {
    repo: Arc<dyn Repository>,
    rules: Arc<PayrollRules>,
}

impl PayrollService {
    pub fn new(repo: Arc<dyn Repository>, rules: Arc<PayrollRules>) -> Self {
        Self { repo, rules }
    }

    /// Computes and stores the payslip of a pending time record.
    ///
    /// The profile row stays locked for the whole run, so two runs for the same
    /// employee cannot both consume the same leave credits or loan balance.
    /// Leave credits, loan balances, the payslip and the processed status are
    /// committed together; on any failure none of them are.
    #[instrument(skip(self))]
    pub async fn run_payroll(
        &self,
        employee_id: u64,
        month: &str,
        year: i32,
        now: DateTime<Utc>,
    ) -> Result<Payslip, PayrollError> {
        let month = canonical_month(month);
        let context = format!("employee {employee_id}, {month} {year}");
        let failed = |e: StoreError| {
            error!(error = %e, context = %context, "Payroll run failed, rolling back");
            PayrollError::ComputationFailure {
                context: context.clone(),
                detail: e.to_string(),
            }
        };

        let mut session = self.repo.begin().await.map_err(&failed)?;

        let mut profile = session
            .lock_profile(employee_id)
            .await
            .map_err(&failed)?
            .ok_or(PayrollError::ProfileMissing { employee_id })?;

        let document = session
            .find_document(employee_id, &month, year)
            .await
            .map_err(&failed)?
            .filter(|d| d.is_pending())
            .ok_or_else(|| PayrollError::not_found(format!("pending time record for {month} {year}")))?;

        let loans = session.loans(employee_id).await.map_err(&failed)?;
        let bonuses = session.bonuses(employee_id).await.map_err(&failed)?;

        let outcome = payroll::compute(&profile, &document, &loans, &bonuses, &self.rules, now)?;

        if let Some(credits) = outcome.leave_credits {
            profile.leave_credits = credits;
            session.save_profile(&profile).await.map_err(&failed)?;
        }
        for payment in &outcome.loan_payments {
            session
                .update_loan_balance(payment.loan_id, payment.remaining_balance)
                .await
                .map_err(&failed)?;
        }

        let mut payslip = outcome.payslip;
        payslip.id = session.insert_payslip(&payslip).await.map_err(&failed)?;
        session.mark_processed(document.id).await.map_err(&failed)?;
        session.commit().await.map_err(&failed)?;

        info!(
            payslip_id = payslip.id,
            gross = %payslip.gross_income,
            net = %payslip.net_income,
            "Payslip computed"
        );

        Ok(payslip)
    }

    /// Latest payslip, for one period when given.
    #[instrument(skip(self))]
    pub async fn payslip(
        &self,
        employee_id: u64,
        period: Option<(String, i32)>,
    ) -> Result<Payslip, PayrollError> {
        let mut session = self.repo.begin().await?;
        let period = period.map(|(month, year)| (canonical_month(&month), year));

        session
            .latest_payslip(employee_id, period.as_ref().map(|(m, y)| (m.as_str(), *y)))
            .await?
            .ok_or_else(|| match &period {
                Some((month, year)) => PayrollError::not_found(format!("payslip for {month} {year}")),
                None => PayrollError::not_found("payslip"),
            })
    }

    /// Summary over the selected months; months without a payslip are left out.
    #[instrument(skip(self, periods), fields(months = periods.len()))]
    pub async fn summary(
        &self,
        employee_id: u64,
        periods: &[(String, i32)],
    ) -> Result<PayslipSummary, PayrollError> {
        let mut session = self.repo.begin().await?;

        let employee = session
            .employee(employee_id)
            .await?
            .ok_or_else(|| PayrollError::not_found(format!("employee {employee_id}")))?;
        let profile = session.profile(employee_id).await?;

        let payslips = latest_for_each(session.as_mut(), employee_id, periods).await?;

        Ok(report::summarize(&employee, profile.as_ref(), &payslips))
    }
}

async fn latest_for_each(
    session: &mut dyn Session,
    employee_id: u64,
    periods: &[(String, i32)],
) -> Result<Vec<Payslip>, StoreError> {
    let mut payslips: Vec<Payslip> = Vec::new();

    for (month, year) in periods {
        let month = canonical_month(month);
        if payslips.iter().any(|p| p.year == *year && p.month.eq_ignore_ascii_case(&month)) {
            continue;
        }
        if let Some(payslip) = session.latest_payslip(employee_id, Some((month.as_str(), *year))).await? {
            payslips.push(payslip);
        }
    }

    Ok(payslips)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::extract::AttendanceExtractor;
    use crate::model::bonus::{Bonus, BonusFrequency};
    use crate::model::employee::{EmployeeProfile, EmploymentType};
    use crate::model::loan::Loan;
    use crate::model::time_record::{DocumentStatus, TimeRecordDraft};
    use crate::payroll::aggregate::tests::full_day;
    use crate::service::ingest::IngestService;
    use crate::store::MemoryRepository;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    pub(crate) fn draft(month: &str, year: i32, days: u8) -> TimeRecordDraft {
        TimeRecordDraft {
            employee_name: "MARIA SANTOS".into(),
            month: month.into(),
            year,
            shift_window_description: "Not found".into(),
            approver_name: "Not found".into(),
            approver_title: "Not found".into(),
            total_time: "Not found".into(),
            entries: (1..=days).map(full_day).collect(),
        }
    }

    pub(crate) fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 11, 2, 8, 0, 0).unwrap()
    }

    /// Maria Santos, regular, 22000 a month with 5 leave credits and a
    /// 1200 salary loan from October 2026.
    pub(crate) async fn seeded() -> (Arc<MemoryRepository>, u64) {
        let repo = Arc::new(MemoryRepository::new());
        let mut session = repo.begin().await.unwrap();

        let id = session.insert_employee("Maria Santos").await.unwrap();
        let profile = EmployeeProfile::new(
            id,
            EmploymentType::Regular,
            dec!(125),
            Some(dec!(22000)),
            dec!(5),
            "government",
        )
        .unwrap()
        .with_salary_grade("SG-11");
        session.save_profile(&profile).await.unwrap();

        let loan = Loan::new(0, id, "Salary Loan", dec!(1200), 12, 10, 2026).unwrap();
        session.insert_loan(&loan).await.unwrap();
        session
            .insert_bonus(&Bonus {
                id: 0,
                employee_id: id,
                name: "Rice Allowance".into(),
                amount: dec!(1500),
                frequency: BonusFrequency::Monthly,
            })
            .await
            .unwrap();

        session.insert_document(id, &draft("October", 2026, 20)).await.unwrap();
        session.commit().await.unwrap();

        (repo, id)
    }

    fn service(repo: &Arc<MemoryRepository>) -> PayrollService {
        PayrollService::new(repo.clone(), Arc::new(PayrollRules::default()))
    }

    #[actix_web::test]
    async fn run_updates_balances_and_marks_processed() {
        let (repo, id) = seeded().await;
        let payslip = service(&repo).run_payroll(id, "october", 2026, now()).await.unwrap();

        assert!(payslip.id > 0);
        assert_eq!(payslip.days_absent, 2);
        assert_eq!(payslip.leave_used, dec!(2));
        assert_eq!(payslip.absent_deduction, Decimal::ZERO);
        assert_eq!(payslip.loan_deduction, dec!(100.00));
        assert_eq!(payslip.bonuses_total, dec!(1500));

        let mut session = repo.begin().await.unwrap();
        let profile = session.profile(id).await.unwrap().unwrap();
        assert_eq!(profile.leave_credits, dec!(3));

        let loans = session.loans(id).await.unwrap();
        assert_eq!(loans[0].balance, dec!(1100.00));

        let document = session.find_document(id, "October", 2026).await.unwrap().unwrap();
        assert_eq!(document.status, DocumentStatus::Processed);

        let stored = session.latest_payslip(id, Some(("October", 2026))).await.unwrap().unwrap();
        assert_eq!(stored, payslip);
    }

    #[actix_web::test]
    async fn processed_record_is_not_computed_twice() {
        let (repo, id) = seeded().await;
        let service = service(&repo);
        service.run_payroll(id, "October", 2026, now()).await.unwrap();

        let err = service.run_payroll(id, "October", 2026, now()).await.unwrap_err();
        assert!(matches!(err, PayrollError::NotFound { .. }));

        let mut session = repo.begin().await.unwrap();
        assert_eq!(session.profile(id).await.unwrap().unwrap().leave_credits, dec!(3));
        assert_eq!(session.loans(id).await.unwrap()[0].balance, dec!(1100.00));
    }

    #[actix_web::test]
    async fn missing_profile_and_missing_record() {
        let (repo, id) = seeded().await;
        let mut session = repo.begin().await.unwrap();
        let other = session.insert_employee("Juan Dela Cruz").await.unwrap();
        session.commit().await.unwrap();

        let service = service(&repo);
        assert!(matches!(
            service.run_payroll(other, "October", 2026, now()).await,
            Err(PayrollError::ProfileMissing { employee_id }) if employee_id == other
        ));
        assert!(matches!(
            service.run_payroll(id, "November", 2026, now()).await,
            Err(PayrollError::NotFound { .. })
        ));
    }

    #[actix_web::test]
    async fn failed_run_leaves_balances_untouched() {
        let (repo, id) = seeded().await;
        let mut session = repo.begin().await.unwrap();
        let mut profile = session.profile(id).await.unwrap().unwrap();
        profile.deduction_scheme = "cooperative".into();
        session.save_profile(&profile).await.unwrap();
        session.commit().await.unwrap();

        let err = service(&repo).run_payroll(id, "October", 2026, now()).await.unwrap_err();
        assert!(matches!(err, PayrollError::InvalidProfileData { .. }));

        let mut session = repo.begin().await.unwrap();
        assert_eq!(session.profile(id).await.unwrap().unwrap().leave_credits, dec!(5));
        assert_eq!(session.loans(id).await.unwrap()[0].balance, dec!(1200));
        let document = session.find_document(id, "October", 2026).await.unwrap().unwrap();
        assert!(document.is_pending());
    }

    #[actix_web::test]
    async fn irregular_employee_keeps_leave_credits() {
        let repo = Arc::new(MemoryRepository::new());
        let mut session = repo.begin().await.unwrap();
        let id = session.insert_employee("Maria Santos").await.unwrap();
        let profile = EmployeeProfile::new(
            id,
            EmploymentType::Irregular,
            dec!(150),
            None,
            dec!(4),
            "government",
        )
        .unwrap();
        session.save_profile(&profile).await.unwrap();
        session.insert_document(id, &draft("October", 2026, 20)).await.unwrap();
        session.commit().await.unwrap();

        let payslip = service(&repo).run_payroll(id, "10", 2026, now()).await.unwrap();
        assert_eq!(payslip.gross_income, dec!(24000));
        assert_eq!(payslip.leave_used, Decimal::ZERO);

        let mut session = repo.begin().await.unwrap();
        assert_eq!(session.profile(id).await.unwrap().unwrap().leave_credits, dec!(4));
    }

    #[actix_web::test]
    async fn upload_then_compute() {
        let (repo, id) = seeded().await;
        let ingest = IngestService::new(repo.clone(), AttendanceExtractor::default());
        let text = crate::extract::tests::sample_dtr("MARIA SANTOS", "September", 2026);
        ingest.ingest(id, &text, false).await.unwrap();

        let payslip = service(&repo).run_payroll(id, "September", 2026, now()).await.unwrap();
        assert_eq!(payslip.days_present, 4);
        // Loan starts in October.
        assert!(payslip.loans.is_empty());
    }

    #[actix_web::test]
    async fn payslip_lookup_and_summary() {
        let (repo, id) = seeded().await;
        let mut session = repo.begin().await.unwrap();
        session.insert_document(id, &draft("November", 2026, 21)).await.unwrap();
        session.commit().await.unwrap();

        let service = service(&repo);
        service.run_payroll(id, "October", 2026, now()).await.unwrap();
        let november = service
            .run_payroll(id, "November", 2026, now() + chrono::Duration::days(30))
            .await
            .unwrap();

        let latest = service.payslip(id, None).await.unwrap();
        assert_eq!(latest.id, november.id);

        let october = service
            .payslip(id, Some(("OCTOBER".to_string(), 2026)))
            .await
            .unwrap();
        assert_eq!(october.month, "October");

        assert!(matches!(
            service.payslip(id, Some(("March".to_string(), 2026))).await,
            Err(PayrollError::NotFound { .. })
        ));

        let summary = service
            .summary(
                id,
                &[
                    ("October".to_string(), 2026),
                    ("November".to_string(), 2026),
                    ("December".to_string(), 2026),
                ],
            )
            .await
            .unwrap();
        assert_eq!(summary.months.len(), 2);
        assert_eq!(summary.quarters.len(), 1);
        assert_eq!(summary.quarters[0].quarter, "Oct-Dec 2026");
    }
}
