pub mod employee;
pub mod ingest;
pub mod payroll;

pub use employee::EmployeeService;
pub use ingest::IngestService;
pub use payroll::PayrollService;
