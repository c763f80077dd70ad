use std::cmp::Ordering;
use std::fmt;

use chrono::{Datelike, Month, NaiveDate, Weekday};

/// Used when a document's month cannot be mapped to a calendar month.
pub const DEFAULT_WORKING_DAYS: u32 = 22;

/// A calendar month of a given year. Ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PayPeriod {
    pub month: Month,
    pub year: i32,
}

impl PayPeriod {
    pub fn new(month: Month, year: i32) -> Self {
        Self { month, year }
    }

    /// Builds a period from a stored month label such as `"October"` or `"10"`.
    pub fn resolve(month: &str, year: i32) -> Option<Self> {
        resolve_month(month).map(|month| Self::new(month, year))
    }

    pub fn month_number(&self) -> u32 {
        self.month.number_from_month()
    }

    /// Monday to Friday count of the month.
    pub fn working_days(&self) -> u32 {
        let Some(first) = NaiveDate::from_ymd_opt(self.year, self.month_number(), 1) else {
            return DEFAULT_WORKING_DAYS;
        };

        first
            .iter_days()
            .take_while(|d| d.month() == first.month())
            .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .count() as u32
    }

    /// 1 to 4.
    pub fn quarter(&self) -> u32 {
        (self.month_number() - 1) / 3 + 1
    }

    fn key(&self) -> (i32, u32) {
        (self.year, self.month_number())
    }
}

impl Ord for PayPeriod {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for PayPeriod {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PayPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.month.name(), self.year)
    }
}

/// Accepts a month name, a three letter abbreviation or a number from 1 to 12.
pub fn resolve_month(value: &str) -> Option<Month> {
    let value = value.trim();
    if value.chars().all(|c| c.is_ascii_digit()) && !value.is_empty() {
        let number: u8 = value.parse().ok()?;
        return Month::try_from(number).ok();
    }
    value.parse::<Month>().ok()
}

/// Full month name when the label resolves, otherwise the label capitalized as written.
pub fn canonical_month(value: &str) -> String {
    match resolve_month(value) {
        Some(month) => month.name().to_string(),
        None => capitalize(value.trim()),
    }
}

/// Reads `"2026-10"`, `"October, 2026"` or `"October 2026"` into `(month name, year)`.
pub fn parse_period_label(value: &str) -> Option<(String, i32)> {
    let value = value.trim();

    if let Some((year, month)) = value.split_once('-') {
        let year: i32 = year.trim().parse().ok()?;
        let month = resolve_month(month)?;
        return Some((month.name().to_string(), year));
    }

    let (month, year) = value
        .split_once(',')
        .or_else(|| value.rsplit_once(char::is_whitespace))?;
    let year: i32 = year.trim().parse().ok()?;
    Some((canonical_month(month), year))
}

/// Quarter label used by the payslip summary, e.g. `"Jan-Mar 2026"`.
pub fn quarter_label(period: &PayPeriod) -> String {
    let label = match period.quarter() {
        1 => "Jan-Mar",
        2 => "Apr-Jun",
        3 => "Jul-Sep",
        _ => "Oct-Dec",
    };
    format!("{} {}", label, period.year)
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
