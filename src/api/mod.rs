pub mod dtr;
pub mod employee;
pub mod payroll;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::PayrollError;
use crate::utils::calendar::{canonical_month, parse_period_label};

/// Body of every error response.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = "duplicate_period")]
    pub error: String,
    #[schema(example = "a time record for October 2026 already exists; set replace_existing to replace it")]
    pub message: String,
}

/// A month given either as a number or as a name.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum MonthInput {
    Number(u32),
    Name(String),
}

impl MonthInput {
    pub fn label(&self) -> String {
        match self {
            MonthInput::Number(n) => n.to_string(),
            MonthInput::Name(name) => name.clone(),
        }
    }
}

/// Reads a period from a month field and an optional year.
///
/// Without a year the month must carry it: `"2026-10"`, `"October, 2026"`.
pub fn resolve_period(month: &str, year: Option<i32>) -> Result<(String, i32), PayrollError> {
    match year {
        Some(year) => Ok((canonical_month(month), year)),
        None => parse_period_label(month).ok_or_else(|| PayrollError::ParseFailure {
            what: "period".into(),
            detail: format!("'{month}' is not YYYY-MM or 'Month, Year'"),
        }),
    }
}
