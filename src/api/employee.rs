use std::collections::BTreeMap;

use actix_web::{HttpResponse, Responder, web};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;
use utoipa::ToSchema;

use super::MonthInput;
use crate::model::bonus::BonusFrequency;
use crate::model::employee::{EmployeeProfile, EmploymentType};
use crate::service::EmployeeService;

#[derive(Deserialize, ToSchema)]
pub struct CreateEmployee {
    /// Name as it appears on the employee's DTRs.
    #[schema(example = "Maria Santos")]
    pub full_name: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateProfile {
    pub employment_type: EmploymentType,
    #[schema(example = "125.00", value_type = String)]
    pub hourly_rate: Decimal,
    #[schema(example = "22000.00", value_type = Option<String>)]
    pub monthly_salary: Option<Decimal>,
    #[schema(example = "5", value_type = String)]
    #[serde(default)]
    pub leave_credits: Decimal,
    /// Defaults to the configured scheme.
    #[schema(example = "government")]
    pub deduction_scheme: Option<String>,
    #[schema(value_type = Object, example = json!({ "Pag-IBIG": "200.00" }))]
    #[serde(default)]
    pub fixed_deductions: BTreeMap<String, Decimal>,
    #[schema(example = "SG-11")]
    pub salary_grade: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateLoan {
    #[schema(example = "Salary Loan")]
    pub name: String,
    #[schema(example = "1200.00", value_type = String)]
    pub principal_amount: Decimal,
    #[schema(example = 12)]
    pub duration_months: u32,
    /// Month name or number.
    pub start_month: MonthInput,
    #[schema(example = 2026)]
    pub start_year: i32,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateBonus {
    #[schema(example = "Rice Allowance")]
    pub name: String,
    #[schema(example = "1500.00", value_type = String)]
    pub amount: Decimal,
    pub frequency: BonusFrequency,
}

#[utoipa::path(
    post,
    path = "/api/employee",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = crate::model::employee::Employee),
        (status = 422, description = "Missing name", body = crate::api::ErrorBody)
    ),
    tag = "Employee"
)]
pub async fn create_employee(
    service: web::Data<EmployeeService>,
    body: web::Json<CreateEmployee>,
) -> actix_web::Result<impl Responder> {
    let employee = service.create(&body.full_name).await?;
    Ok(HttpResponse::Created().json(employee))
}

#[utoipa::path(
    get,
    path = "/api/employee/{employee_id}",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, body = crate::model::employee::Employee),
        (status = 404, description = "Employee not found", body = crate::api::ErrorBody)
    ),
    tag = "Employee"
)]
pub async fn get_employee(
    service: web::Data<EmployeeService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee = service.employee(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(employee))
}

#[utoipa::path(
    get,
    path = "/api/employee/{employee_id}/profile",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, body = EmployeeProfile),
        (status = 404, description = "Employee or profile not found", body = crate::api::ErrorBody)
    ),
    tag = "Employee"
)]
pub async fn get_profile(
    service: web::Data<EmployeeService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let profile = service.profile(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[utoipa::path(
    put,
    path = "/api/employee/{employee_id}/profile",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    request_body = UpdateProfile,
    responses(
        (status = 200, description = "Profile saved", body = EmployeeProfile),
        (status = 404, description = "Employee not found", body = crate::api::ErrorBody),
        (status = 422, description = "Invalid profile data", body = crate::api::ErrorBody)
    ),
    tag = "Employee"
)]
pub async fn put_profile(
    service: web::Data<EmployeeService>,
    path: web::Path<u64>,
    body: web::Json<UpdateProfile>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();
    let body = body.into_inner();
    let scheme = body
        .deduction_scheme
        .unwrap_or_else(|| service.default_scheme().to_string());

    let mut profile = EmployeeProfile::new(
        employee_id,
        body.employment_type,
        body.hourly_rate,
        body.monthly_salary,
        body.leave_credits,
        scheme,
    )?;
    profile.fixed_deductions = body.fixed_deductions;
    profile.salary_grade = body.salary_grade;

    debug!(employee_id, scheme = %profile.deduction_scheme, "Saving profile");
    let profile = service.save_profile(profile).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[utoipa::path(
    get,
    path = "/api/employee/{employee_id}/loans",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, body = [crate::model::loan::Loan]),
        (status = 404, description = "Employee not found", body = crate::api::ErrorBody)
    ),
    tag = "Employee"
)]
pub async fn list_loans(
    service: web::Data<EmployeeService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let loans = service.loans(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(loans))
}

#[utoipa::path(
    post,
    path = "/api/employee/{employee_id}/loans",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan added", body = crate::model::loan::Loan),
        (status = 404, description = "Employee not found", body = crate::api::ErrorBody),
        (status = 422, description = "Invalid loan", body = crate::api::ErrorBody)
    ),
    tag = "Employee"
)]
pub async fn add_loan(
    service: web::Data<EmployeeService>,
    path: web::Path<u64>,
    body: web::Json<CreateLoan>,
) -> actix_web::Result<impl Responder> {
    let loan = service
        .add_loan(
            path.into_inner(),
            &body.name,
            body.principal_amount,
            body.duration_months,
            &body.start_month.label(),
            body.start_year,
        )
        .await?;
    Ok(HttpResponse::Created().json(loan))
}

#[utoipa::path(
    get,
    path = "/api/employee/{employee_id}/bonuses",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, body = [crate::model::bonus::Bonus]),
        (status = 404, description = "Employee not found", body = crate::api::ErrorBody)
    ),
    tag = "Employee"
)]
pub async fn list_bonuses(
    service: web::Data<EmployeeService>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let bonuses = service.bonuses(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(bonuses))
}

#[utoipa::path(
    post,
    path = "/api/employee/{employee_id}/bonuses",
    params(
        ("employee_id" = u64, Path, description = "Employee ID")
    ),
    request_body = CreateBonus,
    responses(
        (status = 201, description = "Bonus added", body = crate::model::bonus::Bonus),
        (status = 404, description = "Employee not found", body = crate::api::ErrorBody),
        (status = 422, description = "Invalid bonus", body = crate::api::ErrorBody)
    ),
    tag = "Employee"
)]
pub async fn add_bonus(
    service: web::Data<EmployeeService>,
    path: web::Path<u64>,
    body: web::Json<CreateBonus>,
) -> actix_web::Result<impl Responder> {
    let bonus = service
        .add_bonus(path.into_inner(), &body.name, body.amount, body.frequency)
        .await?;
    Ok(HttpResponse::Created().json(bonus))
}
