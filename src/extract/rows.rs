use std::collections::BTreeMap;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::PayrollError;
use crate::model::time_record::DailyAttendanceEntry;
use crate::utils::time_format::{UnqualifiedTimePolicy, parse_time_token};

/// A time cell: `h:mm` with an optional qualifier, or a dash for a blank punch.
const SLOT: &str = r"\d{1,2}:\d{2}(?:\s*[ap]\.?\s*m\.?)?|[-–—]{1,3}";

/// Day token, four time cells, optional `<N> hrs <M> mins` undertime.
static ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^(?P<day>\d{{1,2}}|[^\s\d])[\s.,]+(?P<t1>{SLOT})\s+(?P<t2>{SLOT})\s+(?P<t3>{SLOT})\s+(?P<t4>{SLOT})(?:\s+(?P<uh>\d+)\s*hrs?\.?\s*(?P<um>\d+)\s*mins?\.?)?"
    ))
    .expect("valid daily row regex")
});

/// Characters OCR commonly produces in place of a specific two-digit day.
///
/// Kept as data so the mapping can be reviewed and extended from configuration
/// (`DAY_FALLBACKS="u=11,U=11"`) without touching the row parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayFallbacks(BTreeMap<char, u8>);

impl DayFallbacks {
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, token: char, day: u8) -> Self {
        self.0.insert(token, day);
        self
    }

    pub fn lookup(&self, token: char) -> Option<u8> {
        self.0.get(&token).copied()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for DayFallbacks {
    /// `u`/`U` is how a handwritten or low-contrast "11" usually comes back.
    fn default() -> Self {
        Self::empty().with('u', 11).with('U', 11)
    }
}

impl FromStr for DayFallbacks {
    type Err = PayrollError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut table = Self::empty();

        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let invalid = |detail: &str| PayrollError::ParseFailure {
                what: format!("day fallback '{pair}'"),
                detail: detail.to_string(),
            };

            let (token, day) = pair.split_once('=').ok_or_else(|| invalid("expected <char>=<day>"))?;
            let mut chars = token.trim().chars();
            let token = match (chars.next(), chars.next()) {
                (Some(c), None) if !c.is_ascii_digit() && !c.is_whitespace() => c,
                _ => return Err(invalid("token must be a single non-digit character")),
            };
            let day: u8 = day.trim().parse().map_err(|_| invalid("day is not a number"))?;
            if !(1..=31).contains(&day) {
                return Err(invalid("day must be between 1 and 31"));
            }

            table = table.with(token, day);
        }

        Ok(table)
    }
}

/// What a single line of section text turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// Does not have the shape of a daily row.
    NotARow,
    Row(DailyAttendanceEntry),
    /// Looked like a row but could not be used.
    Dropped(String),
}

pub fn parse_row(
    line: &str,
    fallbacks: &DayFallbacks,
    policy: UnqualifiedTimePolicy,
) -> RowOutcome {
    let Some(caps) = ROW.captures(line.trim()) else {
        return RowOutcome::NotARow;
    };

    let day_token = &caps["day"];
    let day = if day_token.chars().all(|c| c.is_ascii_digit()) {
        match day_token.parse::<u8>() {
            Ok(day) => day,
            Err(_) => return RowOutcome::Dropped(format!("unreadable day '{day_token}'")),
        }
    } else {
        // The regex guarantees exactly one character here.
        match day_token.chars().next().and_then(|c| fallbacks.lookup(c)) {
            Some(day) => day,
            None => return RowOutcome::NotARow,
        }
    };

    if !(1..=31).contains(&day) {
        return RowOutcome::Dropped(format!("day {day} is out of range"));
    }

    let mut times = [None; 4];
    for (slot, name) in times.iter_mut().zip(["t1", "t2", "t3", "t4"]) {
        match parse_time_token(&caps[name], policy) {
            Ok(time) => *slot = time,
            Err(e) => return RowOutcome::Dropped(format!("day {day}: {e}")),
        }
    }

    let mut undertime = [0u32; 2];
    for (slot, name) in undertime.iter_mut().zip(["uh", "um"]) {
        if let Some(m) = caps.name(name) {
            match m.as_str().parse() {
                Ok(value) => *slot = value,
                Err(_) => {
                    return RowOutcome::Dropped(format!(
                        "day {day}: unreadable undertime '{}'",
                        m.as_str()
                    ));
                }
            }
        }
    }

    RowOutcome::Row(DailyAttendanceEntry {
        day,
        am_arrival: times[0],
        am_departure: times[1],
        pm_arrival: times[2],
        pm_departure: times[3],
        undertime_hours: undertime[0],
        undertime_minutes: undertime[1],
    })
}
