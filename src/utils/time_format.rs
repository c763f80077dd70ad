use chrono::NaiveTime;
use derive_more::Display;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};

/// `h:mm` with an optional `AM`/`PM` (also `a.m.`, `P M`).
static TIME_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2})\s*(?:([AaPp])\.?\s*[Mm]\.?)?$").expect("valid time token regex")
});

const PLACEHOLDERS: [&str; 5] = ["-", "--", "---", "\u{2014}", "\u{2013}"];

/// What to do with a time token that carries no AM/PM qualifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UnqualifiedTimePolicy {
    /// Read the token literally as a 24-hour clock value.
    #[default]
    AsAuthored,
    /// Refuse the token; the caller drops the row.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum TimeTokenError {
    #[display(fmt = "malformed time token '{}'", _0)]
    Malformed(String),
    #[display(fmt = "time token '{}' is out of range", _0)]
    OutOfRange(String),
    #[display(fmt = "time token '{}' has no AM/PM qualifier", _0)]
    Unqualified(String),
}

/// Dash-like cells stand for a blank punch.
pub fn is_placeholder(token: &str) -> bool {
    let token = token.trim();
    token.is_empty() || PLACEHOLDERS.contains(&token)
}

/// Parses one recognized time cell.
///
/// Returns `Ok(None)` for a placeholder cell. Qualified tokens are converted to
/// the 24-hour clock (`12:xx AM` is just after midnight, `12:xx PM` just after
/// noon). Unqualified tokens are never guessed: they are either taken as
/// written or refused, depending on `policy`.
pub fn parse_time_token(
    token: &str,
    policy: UnqualifiedTimePolicy,
) -> Result<Option<NaiveTime>, TimeTokenError> {
    if is_placeholder(token) {
        return Ok(None);
    }

    let trimmed = token.trim();
    let caps = TIME_TOKEN
        .captures(trimmed)
        .ok_or_else(|| TimeTokenError::Malformed(trimmed.to_string()))?;

    let hour: u32 = caps[1]
        .parse()
        .map_err(|_| TimeTokenError::Malformed(trimmed.to_string()))?;
    let minute: u32 = caps[2]
        .parse()
        .map_err(|_| TimeTokenError::Malformed(trimmed.to_string()))?;

    let hour = match caps.get(3).map(|m| m.as_str().to_ascii_uppercase()) {
        Some(qualifier) => {
            if !(1..=12).contains(&hour) {
                return Err(TimeTokenError::OutOfRange(trimmed.to_string()));
            }
            if qualifier == "P" { hour % 12 + 12 } else { hour % 12 }
        }
        None => match policy {
            UnqualifiedTimePolicy::AsAuthored => hour,
            UnqualifiedTimePolicy::Reject => {
                return Err(TimeTokenError::Unqualified(trimmed.to_string()));
            }
        },
    };

    NaiveTime::from_hms_opt(hour, minute, 0)
        .map(Some)
        .ok_or_else(|| TimeTokenError::OutOfRange(trimmed.to_string()))
}

/// Parses a canonical `HH:MM` value (also accepts `H:MM`).
pub fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()
}

pub fn format_hhmm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// An arrival before the official start counts as the official start.
pub fn clamp_arrival(actual: NaiveTime, expected: NaiveTime) -> NaiveTime {
    actual.max(expected)
}

/// A departure after the official end counts as the official end.
pub fn clamp_departure(actual: NaiveTime, expected: NaiveTime) -> NaiveTime {
    actual.min(expected)
}

/// Signed minutes from `start` to `end`.
pub fn minutes_between(start: NaiveTime, end: NaiveTime) -> i64 {
    (end - start).num_minutes()
}

/// Minutes by which `actual` is later than `expected`, never negative.
pub fn minutes_late(actual: NaiveTime, expected: NaiveTime) -> i64 {
    minutes_between(expected, actual).max(0)
}

/// Serde adapter rendering `Option<NaiveTime>` as `"HH:MM"` or `null`.
pub mod hhmm_opt {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(t) => serializer.serialize_str(&super::format_hhmm(*t)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => super::parse_hhmm(&s)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid HH:MM time '{s}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn qualified_tokens_become_24_hour() {
        let p = UnqualifiedTimePolicy::AsAuthored;
        assert_eq!(parse_time_token("7:55 AM", p), Ok(Some(t(7, 55))));
        assert_eq!(parse_time_token("12:05PM", p), Ok(Some(t(12, 5))));
        assert_eq!(parse_time_token("12:30 am", p), Ok(Some(t(0, 30))));
        assert_eq!(parse_time_token("5:01 p.m.", p), Ok(Some(t(17, 1))));
    }

    #[test]
    fn unqualified_tokens_follow_policy() {
        assert_eq!(
            parse_time_token("5:00", UnqualifiedTimePolicy::AsAuthored),
            Ok(Some(t(5, 0)))
        );
        assert_eq!(
            parse_time_token("17:00", UnqualifiedTimePolicy::AsAuthored),
            Ok(Some(t(17, 0)))
        );
        assert!(matches!(
            parse_time_token("5:00", UnqualifiedTimePolicy::Reject),
            Err(TimeTokenError::Unqualified(_))
        ));
    }

    #[test]
    fn placeholders_are_absent() {
        for token in ["-", "--", "\u{2014}", "  "] {
            assert_eq!(
                parse_time_token(token, UnqualifiedTimePolicy::Reject),
                Ok(None)
            );
        }
    }

    #[test]
    fn rejects_out_of_range_and_garbage() {
        let p = UnqualifiedTimePolicy::AsAuthored;
        assert!(matches!(
            parse_time_token("13:00 PM", p),
            Err(TimeTokenError::OutOfRange(_))
        ));
        assert!(matches!(
            parse_time_token("8:75", p),
            Err(TimeTokenError::OutOfRange(_))
        ));
        assert!(matches!(
            parse_time_token("8.00", p),
            Err(TimeTokenError::Malformed(_))
        ));
    }

    #[test]
    fn clamps_and_lateness() {
        assert_eq!(clamp_arrival(t(7, 45), t(8, 0)), t(8, 0));
        assert_eq!(clamp_arrival(t(8, 10), t(8, 0)), t(8, 10));
        assert_eq!(clamp_departure(t(12, 30), t(12, 0)), t(12, 0));
        assert_eq!(minutes_between(t(8, 0), t(12, 0)), 240);
        assert_eq!(minutes_late(t(8, 17), t(8, 0)), 17);
        assert_eq!(minutes_late(t(7, 50), t(8, 0)), 0);
        assert_eq!(format_hhmm(t(7, 5)), "07:05");
        assert_eq!(parse_hhmm("7:05"), Some(t(7, 5)));
    }
}
