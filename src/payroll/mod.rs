//! Payslip computation: attendance totals, statutory deductions, loan
//! installments and bonuses. Everything in here is pure; persistence happens
//! in `service::payroll`.

pub mod aggregate;
pub mod bonuses;
pub mod loans;
pub mod pipeline;
pub mod rules;

pub use pipeline::compute;
pub use rules::PayrollRules;
