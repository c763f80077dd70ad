use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use super::resolve_period;
use crate::api::dtr::EmployeeQuery;
use crate::service::PayrollService;

#[derive(Deserialize, ToSchema)]
pub struct ComputePayroll {
    #[schema(example = 1)]
    pub employee_id: u64,

    /// Month name or number; `"2026-10"` or `"October, 2026"` when `year` is omitted.
    #[schema(example = "October")]
    pub month: String,

    #[schema(example = 2026)]
    pub year: Option<i32>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PayslipQuery {
    /// Employee ID
    pub employee_id: u64,
    /// Month name or number, or a full period such as `2026-10`
    pub month: String,
    pub year: Option<i32>,
}

#[derive(Deserialize, ToSchema)]
pub struct SummaryRequest {
    #[schema(example = 1)]
    pub employee_id: u64,

    /// Periods in display order.
    #[schema(example = json!(["2026-10", "November, 2026", "2026-12"]))]
    pub months: Vec<String>,
}

#[utoipa::path(
    post,
    path = "/api/payroll/compute",
    request_body = ComputePayroll,
    responses(
        (status = 201, description = "Payslip computed and stored", body = crate::model::payslip::Payslip),
        (status = 404, description = "No profile or no pending time record", body = crate::api::ErrorBody),
        (status = 422, description = "Invalid period or profile data", body = crate::api::ErrorBody),
        (status = 500, description = "Computation failed and was rolled back", body = crate::api::ErrorBody)
    ),
    tag = "Payroll"
)]
pub async fn compute_payroll(
    service: web::Data<PayrollService>,
    body: web::Json<ComputePayroll>,
) -> actix_web::Result<impl Responder> {
    let (month, year) = resolve_period(&body.month, body.year)?;

    let payslip = service
        .run_payroll(body.employee_id, &month, year, Utc::now())
        .await?;

    info!(employee_id = body.employee_id, payslip_id = payslip.id, "Payroll run finished");
    Ok(HttpResponse::Created().json(payslip))
}

#[utoipa::path(
    get,
    path = "/api/payslip",
    params(PayslipQuery),
    responses(
        (status = 200, description = "Most recent payslip of the period", body = crate::model::payslip::Payslip),
        (status = 404, description = "No payslip for the period", body = crate::api::ErrorBody),
        (status = 422, description = "Unreadable period", body = crate::api::ErrorBody)
    ),
    tag = "Payroll"
)]
pub async fn get_payslip(
    service: web::Data<PayrollService>,
    query: web::Query<PayslipQuery>,
) -> actix_web::Result<impl Responder> {
    let period = resolve_period(&query.month, query.year)?;
    let payslip = service.payslip(query.employee_id, Some(period)).await?;
    Ok(HttpResponse::Ok().json(payslip))
}

#[utoipa::path(
    get,
    path = "/api/payslip/latest",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Most recent payslip of any period", body = crate::model::payslip::Payslip),
        (status = 404, description = "No payslip yet", body = crate::api::ErrorBody)
    ),
    tag = "Payroll"
)]
pub async fn latest_payslip(
    service: web::Data<PayrollService>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    let payslip = service.payslip(query.employee_id, None).await?;
    Ok(HttpResponse::Ok().json(payslip))
}

#[utoipa::path(
    post,
    path = "/api/payslip/summary",
    request_body = SummaryRequest,
    responses(
        (status = 200, description = "Summary of the selected months", body = crate::report::PayslipSummary),
        (status = 404, description = "Employee not found", body = crate::api::ErrorBody),
        (status = 422, description = "Unreadable period", body = crate::api::ErrorBody)
    ),
    tag = "Payroll"
)]
pub async fn payslip_summary(
    service: web::Data<PayrollService>,
    body: web::Json<SummaryRequest>,
) -> actix_web::Result<impl Responder> {
    let periods = body
        .months
        .iter()
        .map(|m| resolve_period(m, None))
        .collect::<Result<Vec<_>, _>>()?;

    let summary = service.summary(body.employee_id, &periods).await?;
    Ok(HttpResponse::Ok().json(summary))
}
