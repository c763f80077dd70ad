use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, instrument};

use crate::error::PayrollError;
use crate::model::bonus::{Bonus, BonusFrequency};
use crate::model::employee::{Employee, EmployeeProfile};
use crate::model::loan::Loan;
use crate::payroll::PayrollRules;
use crate::store::{Repository, Session};
use crate::utils::calendar::resolve_month;

/// Employee records and the compensation data payroll reads.
pub struct EmployeeService {
    repo: Arc<dyn Repository>,
    rules: Arc<PayrollRules>,
}

async fn require_employee(session: &mut dyn Session, id: u64) -> Result<Employee, PayrollError> {
    session
        .employee(id)
        .await?
        .ok_or_else(|| PayrollError::not_found(format!("employee {id}")))
}

impl EmployeeService {
    pub fn new(repo: Arc<dyn Repository>, rules: Arc<PayrollRules>) -> Self {
        Self { repo, rules }
    }

    /// Scheme assigned to profiles that do not name one.
    pub fn default_scheme(&self) -> &str {
        &self.rules.default_scheme
    }

    #[instrument(skip(self))]
    pub async fn create(&self, full_name: &str) -> Result<Employee, PayrollError> {
        let full_name = full_name.split_whitespace().collect::<Vec<_>>().join(" ");
        if full_name.is_empty() {
            return Err(PayrollError::invalid_profile("full_name", "is required"));
        }

        let mut session = self.repo.begin().await?;
        let id = session.insert_employee(&full_name).await?;
        session.commit().await?;

        info!(employee_id = id, "Employee created");
        Ok(Employee { id, full_name })
    }

    pub async fn employee(&self, id: u64) -> Result<Employee, PayrollError> {
        let mut session = self.repo.begin().await?;
        require_employee(session.as_mut(), id).await
    }

    pub async fn profile(&self, employee_id: u64) -> Result<EmployeeProfile, PayrollError> {
        let mut session = self.repo.begin().await?;
        require_employee(session.as_mut(), employee_id).await?;
        session
            .profile(employee_id)
            .await?
            .ok_or(PayrollError::ProfileMissing { employee_id })
    }

    /// Creates or replaces a profile. The scheme must exist in the loaded rules.
    #[instrument(skip(self, profile), fields(employee_id = profile.employee_id))]
    pub async fn save_profile(&self, profile: EmployeeProfile) -> Result<EmployeeProfile, PayrollError> {
        profile.validate()?;
        self.rules.scheme_for(&profile)?;

        let mut session = self.repo.begin().await?;
        require_employee(session.as_mut(), profile.employee_id).await?;
        session.save_profile(&profile).await?;
        session.commit().await?;

        info!(scheme = %profile.deduction_scheme, "Profile saved");
        Ok(profile)
    }

    pub async fn loans(&self, employee_id: u64) -> Result<Vec<Loan>, PayrollError> {
        let mut session = self.repo.begin().await?;
        require_employee(session.as_mut(), employee_id).await?;
        Ok(session.loans(employee_id).await?)
    }

    /// Registers a loan; `start_month` is a month name or a number.
    #[instrument(skip(self))]
    pub async fn add_loan(
        &self,
        employee_id: u64,
        name: &str,
        principal_amount: Decimal,
        duration_months: u32,
        start_month: &str,
        start_year: i32,
    ) -> Result<Loan, PayrollError> {
        let month = resolve_month(start_month).ok_or_else(|| PayrollError::ParseFailure {
            what: "loan start month".into(),
            detail: format!("'{start_month}' is not a month"),
        })?;
        let mut loan = Loan::new(
            0,
            employee_id,
            name.trim(),
            principal_amount,
            duration_months,
            month.number_from_month(),
            start_year,
        )?;

        let mut session = self.repo.begin().await?;
        require_employee(session.as_mut(), employee_id).await?;
        loan.id = session.insert_loan(&loan).await?;
        session.commit().await?;

        info!(loan_id = loan.id, installment = %loan.installment(), "Loan added");
        Ok(loan)
    }

    pub async fn bonuses(&self, employee_id: u64) -> Result<Vec<Bonus>, PayrollError> {
        let mut session = self.repo.begin().await?;
        require_employee(session.as_mut(), employee_id).await?;
        Ok(session.bonuses(employee_id).await?)
    }

    #[instrument(skip(self))]
    pub async fn add_bonus(
        &self,
        employee_id: u64,
        name: &str,
        amount: Decimal,
        frequency: BonusFrequency,
    ) -> Result<Bonus, PayrollError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PayrollError::invalid_profile("bonus.name", "is required"));
        }
        if amount <= Decimal::ZERO {
            return Err(PayrollError::invalid_profile("bonus.amount", "must be positive"));
        }

        let mut bonus = Bonus {
            id: 0,
            employee_id,
            name: name.to_string(),
            amount,
            frequency,
        };

        let mut session = self.repo.begin().await?;
        require_employee(session.as_mut(), employee_id).await?;
        bonus.id = session.insert_bonus(&bonus).await?;
        session.commit().await?;

        info!(bonus_id = bonus.id, "Bonus added");
        Ok(bonus)
    }
}
