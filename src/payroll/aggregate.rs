use std::str::FromStr;

use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};

use crate::error::PayrollError;
use crate::model::time_record::DailyAttendanceEntry;
use crate::utils::money::minutes_to_hours;
use crate::utils::time_format::{
    clamp_arrival, clamp_departure, minutes_between, minutes_late, parse_hhmm,
};

/// The official arrival and departure times of a working day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftDefinition {
    pub am_arrival: NaiveTime,
    pub am_departure: NaiveTime,
    pub pm_arrival: NaiveTime,
    pub pm_departure: NaiveTime,
}

impl Default for ShiftDefinition {
    fn default() -> Self {
        let at = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap_or_default();
        Self {
            am_arrival: at(8),
            am_departure: at(12),
            pm_arrival: at(13),
            pm_departure: at(17),
        }
    }
}

impl FromStr for ShiftDefinition {
    type Err = PayrollError;

    /// `08:00-12:00,13:00-17:00`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |detail: &str| PayrollError::ParseFailure {
            what: format!("shift window '{s}'"),
            detail: detail.to_string(),
        };

        let (am, pm) = s.split_once(',').ok_or_else(|| invalid("expected two ranges"))?;
        let range = |value: &str| -> Result<(NaiveTime, NaiveTime), PayrollError> {
            let (from, to) = value
                .split_once('-')
                .ok_or_else(|| invalid("expected HH:MM-HH:MM"))?;
            let from = parse_hhmm(from).ok_or_else(|| invalid("bad start time"))?;
            let to = parse_hhmm(to).ok_or_else(|| invalid("bad end time"))?;
            if to <= from {
                return Err(invalid("range ends before it starts"));
            }
            Ok((from, to))
        };

        let (am_arrival, am_departure) = range(am)?;
        let (pm_arrival, pm_departure) = range(pm)?;
        if pm_arrival < am_departure {
            return Err(invalid("afternoon starts before the morning ends"));
        }

        Ok(Self {
            am_arrival,
            am_departure,
            pm_arrival,
            pm_departure,
        })
    }
}

/// Which punches make a day count as present.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PresencePolicy {
    /// Both an AM and a PM arrival.
    #[default]
    BothArrivals,
    AnyArrival,
    /// All four punches.
    FullDay,
}

/// Attendance totals for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttendanceSummary {
    pub total_minutes: i64,
    pub total_late_minutes: i64,
    pub days_present: u32,
}

impl AttendanceSummary {
    pub fn total_hours(&self) -> Decimal {
        minutes_to_hours(self.total_minutes)
    }
}

fn half_minutes(
    arrival: Option<NaiveTime>,
    departure: Option<NaiveTime>,
    expected_arrival: NaiveTime,
    expected_departure: NaiveTime,
) -> i64 {
    match (arrival, departure) {
        (Some(arrival), Some(departure)) => minutes_between(
            clamp_arrival(arrival, expected_arrival),
            clamp_departure(departure, expected_departure),
        )
        .max(0),
        _ => 0,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AttendanceAggregator {
    shift: ShiftDefinition,
    presence: PresencePolicy,
}

impl AttendanceAggregator {
    pub fn new(shift: ShiftDefinition, presence: PresencePolicy) -> Self {
        Self { shift, presence }
    }

    /// Credited minutes of one day, within the official window, less undertime.
    pub fn daily_minutes(&self, entry: &DailyAttendanceEntry) -> i64 {
        let am = half_minutes(
            entry.am_arrival,
            entry.am_departure,
            self.shift.am_arrival,
            self.shift.am_departure,
        );
        let pm = half_minutes(
            entry.pm_arrival,
            entry.pm_departure,
            self.shift.pm_arrival,
            self.shift.pm_departure,
        );
        (am + pm - entry.undertime_total_minutes()).max(0)
    }

    #[cfg(test)]
    pub fn daily_hours(&self, entry: &DailyAttendanceEntry) -> Decimal {
        minutes_to_hours(self.daily_minutes(entry))
    }

    pub fn daily_late_minutes(&self, entry: &DailyAttendanceEntry) -> i64 {
        let am = entry
            .am_arrival
            .map(|t| minutes_late(t, self.shift.am_arrival))
            .unwrap_or(0);
        let pm = entry
            .pm_arrival
            .map(|t| minutes_late(t, self.shift.pm_arrival))
            .unwrap_or(0);
        am + pm
    }

    pub fn is_present(&self, entry: &DailyAttendanceEntry) -> bool {
        match self.presence {
            PresencePolicy::BothArrivals => entry.am_arrival.is_some() && entry.pm_arrival.is_some(),
            PresencePolicy::AnyArrival => entry.am_arrival.is_some() || entry.pm_arrival.is_some(),
            PresencePolicy::FullDay => {
                entry.am_arrival.is_some()
                    && entry.am_departure.is_some()
                    && entry.pm_arrival.is_some()
                    && entry.pm_departure.is_some()
            }
        }
    }

    pub fn aggregate(&self, entries: &[DailyAttendanceEntry]) -> AttendanceSummary {
        entries
            .iter()
            .fold(AttendanceSummary::default(), |mut acc, entry| {
                acc.total_minutes += self.daily_minutes(entry);
                acc.total_late_minutes += self.daily_late_minutes(entry);
                if self.is_present(entry) {
                    acc.days_present += 1;
                }
                acc
            })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn t(h: u32, m: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(h, m, 0)
    }

    pub(crate) fn entry(
        day: u8,
        am: (Option<NaiveTime>, Option<NaiveTime>),
        pm: (Option<NaiveTime>, Option<NaiveTime>),
    ) -> DailyAttendanceEntry {
        DailyAttendanceEntry {
            day,
            am_arrival: am.0,
            am_departure: am.1,
            pm_arrival: pm.0,
            pm_departure: pm.1,
            undertime_hours: 0,
            undertime_minutes: 0,
        }
    }

    /// A punctual eight hour day.
    pub(crate) fn full_day(day: u8) -> DailyAttendanceEntry {
        entry(day, (t(8, 0), t(12, 0)), (t(13, 0), t(17, 0)))
    }

    #[test]
    fn early_arrival_and_late_departure_are_clamped() {
        let agg = AttendanceAggregator::default();
        let e = entry(1, (t(7, 30), t(12, 30)), (t(12, 45), t(18, 0)));
        assert_eq!(agg.daily_hours(&e), dec!(8));
        assert_eq!(agg.daily_late_minutes(&e), 0);
    }

    #[test]
    fn clamped_hours_never_exceed_the_shift() {
        let agg = AttendanceAggregator::default();
        for (arrive, leave) in [((6, 0), (19, 0)), ((8, 0), (17, 0)), ((0, 0), (23, 59))] {
            let e = entry(
                1,
                (t(arrive.0, arrive.1), t(12, 0)),
                (t(13, 0), t(leave.0, leave.1)),
            );
            assert!(agg.daily_hours(&e) <= dec!(8));
        }
    }

    #[test]
    fn missing_half_contributes_nothing() {
        let agg = AttendanceAggregator::default();
        let e = entry(1, (None, None), (t(13, 30), t(17, 0)));
        assert_eq!(agg.daily_hours(&e), dec!(3.5));
        assert_eq!(agg.daily_late_minutes(&e), 30);
        assert!(!agg.is_present(&e));

        let e = entry(2, (t(8, 0), None), (t(13, 0), t(17, 0)));
        assert_eq!(agg.daily_hours(&e), dec!(4));
    }

    #[test]
    fn undertime_is_subtracted_and_floored() {
        let agg = AttendanceAggregator::default();
        let mut e = full_day(1);
        e.undertime_minutes = 30;
        assert_eq!(agg.daily_hours(&e), dec!(7.5));

        let mut e = entry(2, (t(8, 0), t(9, 0)), (None, None));
        e.undertime_hours = 2;
        assert_eq!(agg.daily_hours(&e), Decimal::ZERO);
    }

    #[test]
    fn departure_before_arrival_counts_zero() {
        let agg = AttendanceAggregator::default();
        let e = entry(1, (t(11, 0), t(10, 0)), (None, None));
        assert_eq!(agg.daily_minutes(&e), 0);
    }

    #[test]
    fn late_minutes_sum_both_halves() {
        let agg = AttendanceAggregator::default();
        let e = entry(1, (t(8, 15), t(12, 0)), (t(13, 20), t(17, 0)));
        assert_eq!(agg.daily_late_minutes(&e), 35);
    }

    #[test]
    fn presence_policies() {
        let half = entry(1, (t(8, 0), t(12, 0)), (None, None));
        let no_out = entry(2, (t(8, 0), None), (t(13, 0), None));

        let both = AttendanceAggregator::new(ShiftDefinition::default(), PresencePolicy::BothArrivals);
        let any = AttendanceAggregator::new(ShiftDefinition::default(), PresencePolicy::AnyArrival);
        let full = AttendanceAggregator::new(ShiftDefinition::default(), PresencePolicy::FullDay);

        assert!(!both.is_present(&half));
        assert!(any.is_present(&half));
        assert!(both.is_present(&no_out));
        assert!(!full.is_present(&no_out));
        assert!(full.is_present(&full_day(3)));
    }

    #[test]
    fn aggregates_a_month() {
        let agg = AttendanceAggregator::default();
        let entries = vec![
            full_day(1),
            entry(2, (t(8, 10), t(12, 0)), (t(13, 0), t(17, 0))),
            entry(3, (None, None), (None, None)),
        ];
        let summary = agg.aggregate(&entries);
        assert_eq!(summary.total_minutes, 480 + 470);
        assert_eq!(summary.total_late_minutes, 10);
        assert_eq!(summary.days_present, 2);
    }

    #[test]
    fn parses_shift_window() {
        let shift: ShiftDefinition = "07:30-11:30, 12:30-16:30".parse().unwrap();
        assert_eq!(shift.am_arrival, NaiveTime::from_hms_opt(7, 30, 0).unwrap());
        assert_eq!(shift.pm_departure, NaiveTime::from_hms_opt(16, 30, 0).unwrap());

        assert!("08:00-12:00".parse::<ShiftDefinition>().is_err());
        assert!("12:00-08:00,13:00-17:00".parse::<ShiftDefinition>().is_err());
        assert!("08:00-12:00,11:00-17:00".parse::<ShiftDefinition>().is_err());
    }
}
