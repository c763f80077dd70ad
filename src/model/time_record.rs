use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::utils::time_format::hhmm_opt;

/// Placeholder stored for informational fields the extractor could not find.
pub const NOT_FOUND: &str = "Not found";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processed,
}

/// One row of a DTR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DailyAttendanceEntry {
    #[schema(example = 1)]
    pub day: u8,

    #[serde(with = "hhmm_opt")]
    #[schema(example = "07:55", value_type = String, nullable = true)]
    pub am_arrival: Option<NaiveTime>,

    #[serde(with = "hhmm_opt")]
    #[schema(example = "12:00", value_type = String, nullable = true)]
    pub am_departure: Option<NaiveTime>,

    #[serde(with = "hhmm_opt")]
    #[schema(example = "12:58", value_type = String, nullable = true)]
    pub pm_arrival: Option<NaiveTime>,

    #[serde(with = "hhmm_opt")]
    #[schema(example = "17:00", value_type = String, nullable = true)]
    pub pm_departure: Option<NaiveTime>,

    #[schema(example = 0)]
    pub undertime_hours: u32,

    #[schema(example = 15)]
    pub undertime_minutes: u32,
}

impl DailyAttendanceEntry {
    pub fn undertime_total_minutes(&self) -> i64 {
        i64::from(self.undertime_hours) * 60 + i64::from(self.undertime_minutes)
    }
}

/// A time record as recovered from text, before it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TimeRecordDraft {
    #[schema(example = "MARIA L. SANTOS")]
    pub employee_name: String,
    #[schema(example = "October")]
    pub month: String,
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = "8:00 AM - 12:00 PM and 1:00 PM - 5:00 PM")]
    pub shift_window_description: String,
    #[schema(example = "JUAN Z. DELA CRUZ")]
    pub approver_name: String,
    #[schema(example = "Principal")]
    pub approver_title: String,
    #[schema(example = "168 hours and 30 minutes")]
    pub total_time: String,
    pub entries: Vec<DailyAttendanceEntry>,
}

/// A stored time record for one employee and one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TimeRecordDocument {
    pub id: u64,
    pub employee_id: u64,
    pub status: DocumentStatus,
    #[serde(flatten)]
    pub record: TimeRecordDraft,
}

impl TimeRecordDocument {
    pub fn is_pending(&self) -> bool {
        self.status == DocumentStatus::Pending
    }

    /// Case-insensitive match on the stored period.
    pub fn covers(&self, month: &str, year: i32) -> bool {
        self.record.year == year && self.record.month.eq_ignore_ascii_case(month.trim())
    }
}

/// A stored period as listed for an employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DocumentPeriod {
    pub document_id: u64,
    #[schema(example = "October")]
    pub month: String,
    #[schema(example = 2026)]
    pub year: i32,
    pub status: DocumentStatus,
}
