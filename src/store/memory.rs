use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::model::bonus::Bonus;
use crate::model::employee::{Employee, EmployeeProfile};
use crate::model::loan::Loan;
use crate::model::payslip::Payslip;
use crate::model::time_record::{
    DocumentPeriod, DocumentStatus, TimeRecordDocument, TimeRecordDraft,
};
use crate::store::{Repository, Session, StoreError, is_newer};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    last_id: u64,
    employees: BTreeMap<u64, Employee>,
    profiles: BTreeMap<u64, EmployeeProfile>,
    documents: BTreeMap<u64, TimeRecordDocument>,
    loans: BTreeMap<u64, Loan>,
    bonuses: BTreeMap<u64, Bonus>,
    payslips: BTreeMap<u64, Payslip>,
}

impl MemoryState {
    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }
}

/// Process-local store for tests and runs without `DATABASE_URL`.
///
/// One session at a time holds the whole state; it works on a copy that
/// replaces the shared state on commit.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct MemorySession {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn begin(&self) -> Result<Box<dyn Session>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemorySession { guard, work }))
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn employee(&mut self, id: u64) -> Result<Option<Employee>, StoreError> {
        Ok(self.work.employees.get(&id).cloned())
    }

    async fn insert_employee(&mut self, full_name: &str) -> Result<u64, StoreError> {
        let id = self.work.next_id();
        self.work.employees.insert(
            id,
            Employee {
                id,
                full_name: full_name.to_string(),
            },
        );
        Ok(id)
    }

    async fn profile(&mut self, employee_id: u64) -> Result<Option<EmployeeProfile>, StoreError> {
        Ok(self.work.profiles.get(&employee_id).cloned())
    }

    async fn lock_profile(
        &mut self,
        employee_id: u64,
    ) -> Result<Option<EmployeeProfile>, StoreError> {
        // The session already holds the whole store.
        self.profile(employee_id).await
    }

    async fn save_profile(&mut self, profile: &EmployeeProfile) -> Result<(), StoreError> {
        if !self.work.employees.contains_key(&profile.employee_id) {
            return Err(StoreError::Missing {
                what: "employee",
                id: profile.employee_id,
            });
        }
        self.work
            .profiles
            .insert(profile.employee_id, profile.clone());
        Ok(())
    }

    async fn find_document(
        &mut self,
        employee_id: u64,
        month: &str,
        year: i32,
    ) -> Result<Option<TimeRecordDocument>, StoreError> {
        Ok(self
            .work
            .documents
            .values()
            .find(|d| d.employee_id == employee_id && d.covers(month, year))
            .cloned())
    }

    async fn insert_document(
        &mut self,
        employee_id: u64,
        draft: &TimeRecordDraft,
    ) -> Result<u64, StoreError> {
        if self
            .work
            .documents
            .values()
            .any(|d| d.employee_id == employee_id && d.covers(&draft.month, draft.year))
        {
            return Err(StoreError::Duplicate { what: "time record" });
        }
        let id = self.work.next_id();
        self.work.documents.insert(
            id,
            TimeRecordDocument {
                id,
                employee_id,
                status: DocumentStatus::Pending,
                record: draft.clone(),
            },
        );
        Ok(id)
    }

    async fn delete_document(&mut self, document_id: u64) -> Result<(), StoreError> {
        self.work.documents.remove(&document_id);
        Ok(())
    }

    async fn document_periods(
        &mut self,
        employee_id: u64,
    ) -> Result<Vec<DocumentPeriod>, StoreError> {
        Ok(self
            .work
            .documents
            .values()
            .filter(|d| d.employee_id == employee_id)
            .map(|d| DocumentPeriod {
                document_id: d.id,
                month: d.record.month.clone(),
                year: d.record.year,
                status: d.status,
            })
            .collect())
    }

    async fn mark_processed(&mut self, document_id: u64) -> Result<(), StoreError> {
        let document = self
            .work
            .documents
            .get_mut(&document_id)
            .ok_or(StoreError::Missing {
                what: "time record",
                id: document_id,
            })?;
        document.status = DocumentStatus::Processed;
        Ok(())
    }

    async fn loans(&mut self, employee_id: u64) -> Result<Vec<Loan>, StoreError> {
        Ok(self
            .work
            .loans
            .values()
            .filter(|l| l.employee_id == employee_id)
            .cloned()
            .collect())
    }

    async fn insert_loan(&mut self, loan: &Loan) -> Result<u64, StoreError> {
        let id = self.work.next_id();
        self.work.loans.insert(id, Loan { id, ..loan.clone() });
        Ok(id)
    }

    async fn update_loan_balance(
        &mut self,
        loan_id: u64,
        balance: Decimal,
    ) -> Result<(), StoreError> {
        let loan = self.work.loans.get_mut(&loan_id).ok_or(StoreError::Missing {
            what: "loan",
            id: loan_id,
        })?;
        loan.balance = balance;
        Ok(())
    }

    async fn bonuses(&mut self, employee_id: u64) -> Result<Vec<Bonus>, StoreError> {
        Ok(self
            .work
            .bonuses
            .values()
            .filter(|b| b.employee_id == employee_id)
            .cloned()
            .collect())
    }

    async fn insert_bonus(&mut self, bonus: &Bonus) -> Result<u64, StoreError> {
        let id = self.work.next_id();
        self.work.bonuses.insert(id, Bonus { id, ..bonus.clone() });
        Ok(id)
    }

    async fn insert_payslip(&mut self, payslip: &Payslip) -> Result<u64, StoreError> {
        let id = self.work.next_id();
        self.work.payslips.insert(id, Payslip { id, ..payslip.clone() });
        Ok(id)
    }

    async fn latest_payslip(
        &mut self,
        employee_id: u64,
        period: Option<(&str, i32)>,
    ) -> Result<Option<Payslip>, StoreError> {
        let latest = self
            .work
            .payslips
            .values()
            .filter(|p| p.employee_id == employee_id)
            .filter(|p| match period {
                Some((month, year)) => p.year == year && p.month.eq_ignore_ascii_case(month.trim()),
                None => true,
            })
            .fold(None::<&Payslip>, |best, p| match best {
                Some(b) if !is_newer(p, b) => Some(b),
                _ => Some(p),
            });
        Ok(latest.cloned())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemorySession { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn uncommitted_writes_are_discarded() {
        let repo = MemoryRepository::new();

        let mut session = repo.begin().await.unwrap();
        session.insert_employee("Maria Santos").await.unwrap();
        drop(session);

        let mut session = repo.begin().await.unwrap();
        assert!(session.employee(1).await.unwrap().is_none());
        let id = session.insert_employee("Maria Santos").await.unwrap();
        session.commit().await.unwrap();

        let mut session = repo.begin().await.unwrap();
        let employee = session.employee(id).await.unwrap().unwrap();
        assert_eq!(employee.full_name, "Maria Santos");
    }

    #[actix_web::test]
    async fn unknown_loan_balance_update_fails() {
        let repo = MemoryRepository::new();
        let mut session = repo.begin().await.unwrap();
        assert!(matches!(
            session.update_loan_balance(99, Decimal::ZERO).await,
            Err(StoreError::Missing { what: "loan", id: 99 })
        ));
    }

    #[actix_web::test]
    async fn profile_requires_an_employee() {
        use crate::model::employee::EmploymentType;
        use rust_decimal_macros::dec;

        let repo = MemoryRepository::new();
        let mut session = repo.begin().await.unwrap();
        let profile = EmployeeProfile::new(
            42,
            EmploymentType::Irregular,
            dec!(150),
            None,
            dec!(0),
            "government",
        )
        .unwrap();
        assert!(matches!(
            session.save_profile(&profile).await,
            Err(StoreError::Missing { what: "employee", id: 42 })
        ));
    }
}
