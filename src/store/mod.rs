//! Persistence behind the extraction and payroll services.
//!
//! Every unit of work runs in a [`Session`]. Writes become visible only on
//! [`Session::commit`]; a session dropped without committing is rolled back.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use derive_more::Display;
use rust_decimal::Decimal;

use crate::model::bonus::Bonus;
use crate::model::employee::{Employee, EmployeeProfile};
use crate::model::loan::Loan;
use crate::model::payslip::Payslip;
use crate::model::time_record::{DocumentPeriod, TimeRecordDocument, TimeRecordDraft};

pub use memory::MemoryRepository;
pub use mysql::MySqlRepository;

#[derive(Debug, Display)]
pub enum StoreError {
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),

    #[display(fmt = "migration failed: {}", _0)]
    Migration(sqlx::migrate::MigrateError),

    /// A stored value that no longer maps onto the domain types.
    #[display(fmt = "corrupt {} data: {}", table, detail)]
    Corrupt { table: &'static str, detail: String },

    #[display(fmt = "{} {} does not exist", what, id)]
    Missing { what: &'static str, id: u64 },

    /// A write hit a uniqueness constraint.
    #[display(fmt = "{} already exists", what)]
    Duplicate { what: &'static str },
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Database(e) => Some(e),
            StoreError::Migration(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e)
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        StoreError::Migration(e)
    }
}

impl StoreError {
    pub fn corrupt(table: &'static str, detail: impl Into<String>) -> Self {
        StoreError::Corrupt {
            table,
            detail: detail.into(),
        }
    }
}

#[async_trait]
pub trait Repository: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn Session>, StoreError>;
}

#[async_trait]
pub trait Session: Send {
    async fn employee(&mut self, id: u64) -> Result<Option<Employee>, StoreError>;
    async fn insert_employee(&mut self, full_name: &str) -> Result<u64, StoreError>;

    async fn profile(&mut self, employee_id: u64) -> Result<Option<EmployeeProfile>, StoreError>;
    /// Reads the profile and holds it until the session ends.
    async fn lock_profile(&mut self, employee_id: u64)
    -> Result<Option<EmployeeProfile>, StoreError>;
    /// Inserts or replaces, including the fixed deduction amounts.
    async fn save_profile(&mut self, profile: &EmployeeProfile) -> Result<(), StoreError>;

    /// Case-insensitive on the month label.
    async fn find_document(
        &mut self,
        employee_id: u64,
        month: &str,
        year: i32,
    ) -> Result<Option<TimeRecordDocument>, StoreError>;
    /// Stores a pending document with its daily entries.
    async fn insert_document(
        &mut self,
        employee_id: u64,
        draft: &TimeRecordDraft,
    ) -> Result<u64, StoreError>;
    /// Removes a document and its daily entries.
    async fn delete_document(&mut self, document_id: u64) -> Result<(), StoreError>;
    async fn document_periods(&mut self, employee_id: u64)
    -> Result<Vec<DocumentPeriod>, StoreError>;
    async fn mark_processed(&mut self, document_id: u64) -> Result<(), StoreError>;

    /// All loans of an employee, paid off or not, oldest first.
    async fn loans(&mut self, employee_id: u64) -> Result<Vec<Loan>, StoreError>;
    async fn insert_loan(&mut self, loan: &Loan) -> Result<u64, StoreError>;
    async fn update_loan_balance(&mut self, loan_id: u64, balance: Decimal)
    -> Result<(), StoreError>;

    async fn bonuses(&mut self, employee_id: u64) -> Result<Vec<Bonus>, StoreError>;
    async fn insert_bonus(&mut self, bonus: &Bonus) -> Result<u64, StoreError>;

    async fn insert_payslip(&mut self, payslip: &Payslip) -> Result<u64, StoreError>;
    /// Most recent payslip, for one period when given.
    async fn latest_payslip(
        &mut self,
        employee_id: u64,
        period: Option<(&str, i32)>,
    ) -> Result<Option<Payslip>, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Newest first: by creation time, then by id.
pub(crate) fn is_newer(candidate: &Payslip, current: &Payslip) -> bool {
    (candidate.created_at, candidate.id) > (current.created_at, current.id)
}
