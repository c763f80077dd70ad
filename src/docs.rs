use crate::api::dtr::UploadDtr;
use crate::api::employee::{CreateBonus, CreateEmployee, CreateLoan, UpdateProfile};
use crate::api::payroll::{ComputePayroll, SummaryRequest};
use crate::api::{ErrorBody, MonthInput};
use crate::model::bonus::{Bonus, BonusFrequency};
use crate::model::employee::{Employee, EmployeeProfile, EmploymentType};
use crate::model::loan::Loan;
use crate::model::payslip::{BonusLine, DeductionLine, LoanDeductionLine, Payslip};
use crate::model::time_record::{DocumentPeriod, DocumentStatus};
use crate::report::{BreakdownRow, Figures, MonthSummary, PayslipSummary, QuarterSummary};
use crate::service::ingest::{IngestReport, SkippedReport, StoredDocument};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "DTR Payroll API",
        version = "1.0.0",
        description = r#"
## Daily Time Record Payroll

Turns OCR text of Civil Service Form 48 daily time records into monthly payslips.

### 🔹 Key Features
- **DTR Upload**
  - Extract one or more months from raw text, checked against the employee's name
- **Payroll**
  - Attendance, leave credits, statutory deductions, loans and bonuses in one run
- **Payslips**
  - Latest payslip per period and multi-month summaries by quarter
- **Employees**
  - Compensation profiles, loans and bonuses

### 📦 Response Format
- JSON bodies; money is a decimal string with two places
- Errors: `{ "error": <code>, "message": <text> }`

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::dtr::upload_dtr,
        crate::api::dtr::list_months,

        crate::api::payroll::compute_payroll,
        crate::api::payroll::get_payslip,
        crate::api::payroll::latest_payslip,
        crate::api::payroll::payslip_summary,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::get_profile,
        crate::api::employee::put_profile,
        crate::api::employee::list_loans,
        crate::api::employee::add_loan,
        crate::api::employee::list_bonuses,
        crate::api::employee::add_bonus
    ),
    components(
        schemas(
            ErrorBody,
            MonthInput,
            UploadDtr,
            IngestReport,
            StoredDocument,
            SkippedReport,
            DocumentPeriod,
            DocumentStatus,
            ComputePayroll,
            SummaryRequest,
            Payslip,
            DeductionLine,
            LoanDeductionLine,
            BonusLine,
            PayslipSummary,
            MonthSummary,
            QuarterSummary,
            BreakdownRow,
            Figures,
            CreateEmployee,
            Employee,
            EmploymentType,
            EmployeeProfile,
            UpdateProfile,
            CreateLoan,
            Loan,
            CreateBonus,
            Bonus,
            BonusFrequency
        )
    ),
    tags(
        (name = "DTR", description = "Time record upload APIs"),
        (name = "Payroll", description = "Payroll and payslip APIs"),
        (name = "Employee", description = "Employee compensation APIs"),
    )
)]
pub struct ApiDoc;
