use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

use crate::store::StoreError;

/// Every failure the extraction and payroll paths can surface to a caller.
#[derive(Debug, Display)]
pub enum PayrollError {
    #[display(fmt = "could not parse {}: {}", what, detail)]
    ParseFailure { what: String, detail: String },

    #[display(fmt = "time record belongs to {}, not {}", found, expected)]
    IdentityMismatch { found: String, expected: String },

    #[display(fmt = "could not extract month and year from time record section {}", section)]
    MissingPeriod { section: usize },

    #[display(fmt = "no DAILY TIME RECORD section found in the uploaded text")]
    NoSectionsFound,

    #[display(fmt = "{} not found", what)]
    NotFound { what: String },

    #[display(fmt = "employee {} has no compensation profile", employee_id)]
    ProfileMissing { employee_id: u64 },

    #[display(
        fmt = "a time record for {} {} already exists; set replace_existing to replace it",
        month,
        year
    )]
    DuplicatePeriod { month: String, year: i32 },

    #[display(fmt = "invalid profile data for '{}': {}", field, detail)]
    InvalidProfileData { field: String, detail: String },

    #[display(fmt = "payroll computation failed for {}: {}", context, detail)]
    ComputationFailure { context: String, detail: String },

    #[display(fmt = "store error: {}", _0)]
    Store(StoreError),
}

impl std::error::Error for PayrollError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PayrollError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for PayrollError {
    fn from(e: StoreError) -> Self {
        PayrollError::Store(e)
    }
}

impl PayrollError {
    pub fn not_found(what: impl Into<String>) -> Self {
        PayrollError::NotFound { what: what.into() }
    }

    pub fn invalid_profile(field: impl Into<String>, detail: impl Into<String>) -> Self {
        PayrollError::InvalidProfileData {
            field: field.into(),
            detail: detail.into(),
        }
    }

    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            PayrollError::ParseFailure { .. } => "parse_failure",
            PayrollError::IdentityMismatch { .. } => "identity_mismatch",
            PayrollError::MissingPeriod { .. } => "missing_period",
            PayrollError::NoSectionsFound => "no_sections_found",
            PayrollError::NotFound { .. } => "not_found",
            PayrollError::ProfileMissing { .. } => "profile_missing",
            PayrollError::DuplicatePeriod { .. } => "duplicate_period",
            PayrollError::InvalidProfileData { .. } => "invalid_profile_data",
            PayrollError::ComputationFailure { .. } => "computation_failure",
            PayrollError::Store(_) => "store_error",
        }
    }
}

impl ResponseError for PayrollError {
    fn status_code(&self) -> StatusCode {
        match self {
            PayrollError::IdentityMismatch { .. } => StatusCode::FORBIDDEN,
            PayrollError::NotFound { .. } | PayrollError::ProfileMissing { .. } => {
                StatusCode::NOT_FOUND
            }
            PayrollError::DuplicatePeriod { .. } => StatusCode::CONFLICT,
            PayrollError::ParseFailure { .. }
            | PayrollError::MissingPeriod { .. }
            | PayrollError::NoSectionsFound
            | PayrollError::InvalidProfileData { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PayrollError::ComputationFailure { .. } | PayrollError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self.status_code() {
            StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error".to_string(),
            _ => self.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "error": self.code(),
            "message": message
        }))
    }
}
