pub mod bonus;
pub mod employee;
pub mod loan;
pub mod payslip;
pub mod time_record;
