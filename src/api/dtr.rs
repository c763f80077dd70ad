use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use tracing::{debug, error};
use utoipa::{IntoParams, ToSchema};

use crate::error::PayrollError;
use crate::service::IngestService;

#[derive(Deserialize, ToSchema)]
pub struct UploadDtr {
    #[schema(example = 1)]
    pub employee_id: u64,

    /// OCR text of one or more DTR pages.
    #[schema(example = "DAILY TIME RECORD\nMARIA SANTOS\n(Name)\nFor the month of October, 2026\n1 7:55 AM 12:00 PM 12:58 PM 5:00 PM")]
    pub raw_text: String,

    /// Replace documents already on file for the same periods.
    #[serde(default)]
    pub replace_existing: bool,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmployeeQuery {
    /// Employee ID
    pub employee_id: u64,
}

#[utoipa::path(
    post,
    path = "/api/dtr",
    request_body(
        content = UploadDtr,
        description = "Raw DTR text for an employee",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Time records stored", body = crate::service::ingest::IngestReport),
        (status = 403, description = "The record belongs to someone else", body = crate::api::ErrorBody),
        (status = 404, description = "Employee not found", body = crate::api::ErrorBody),
        (status = 409, description = "A record for the period is already on file", body = crate::api::ErrorBody),
        (status = 422, description = "Nothing could be extracted", body = crate::api::ErrorBody)
    ),
    tag = "DTR"
)]
pub async fn upload_dtr(
    service: web::Data<IngestService>,
    body: web::Json<UploadDtr>,
) -> actix_web::Result<impl Responder> {
    let body = body.into_inner();
    debug!(employee_id = body.employee_id, bytes = body.raw_text.len(), "DTR upload received");

    let report = service
        .ingest(body.employee_id, &body.raw_text, body.replace_existing)
        .await
        .inspect_err(|e: &PayrollError| {
            if matches!(e, PayrollError::Store(_)) {
                error!(error = %e, employee_id = body.employee_id, "Failed to store time records");
            }
        })?;

    Ok(HttpResponse::Created().json(report))
}

#[utoipa::path(
    get,
    path = "/api/dtr/months",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Uploaded periods and their status", body = [crate::model::time_record::DocumentPeriod]),
        (status = 404, description = "Employee not found", body = crate::api::ErrorBody)
    ),
    tag = "DTR"
)]
pub async fn list_months(
    service: web::Data<IngestService>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    let periods = service.periods(query.employee_id).await?;
    Ok(HttpResponse::Ok().json(periods))
}
