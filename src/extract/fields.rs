//! Header and footer fields of a DTR section.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::utils::calendar::canonical_month;

static NAME_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bname\b").expect("valid name label regex"));

/// Form title, form code and column labels that sit near the name field.
static BOILERPLATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(daily\s+time\s+record|form|csc|official\s+hours|regular?|month)\b")
        .expect("valid boilerplate regex")
});

static DATE_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[a-z]+\s+\d{1,2}\s*[-–]\s*\d{1,2},\s*\d{4}$").expect("valid date range regex")
});

static CERTIFICATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(verified|certify|prescribed|in\s+charge|signature)")
        .expect("valid certification regex")
});

/// `October, 2026` or `October 1-31, 2026`.
static MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(january|february|march|april|may|june|july|august|september|october|november|december)\s*(?:\d{1,2}\s*[-–]\s*\d{1,2}\s*)?,\s*(\d{4})\b",
    )
    .expect("valid month regex")
});

/// Any `Word, 2026`, for months OCR has misspelled.
static LOOSE_MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Za-z]+),\s*(\d{4})\b").expect("valid loose month regex"));

static SHIFT_WINDOW: Lazy<Regex> = Lazy::new(|| {
    let time = r"(\d{1,2}:\d{2})\s*([ap]\.?\s*m\.?)?";
    Regex::new(&format!(
        r"(?i){time}\s*[-–]\s*{time}\s+and\s+{time}\s*[-–]\s*{time}"
    ))
    .expect("valid shift window regex")
});

static APPROVER_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(principal|manager|supervisor|director|administrator|in-charge)\b")
        .expect("valid approver title regex")
});

static TOTAL_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\btotal\s+(\d+\s+hours?\s+and\s+\d+\s+minutes?)\b").expect("valid total regex")
});

pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A plausible person name: not form text, two or more words, no digits.
pub fn is_valid_name(candidate: &str) -> bool {
    let candidate = candidate.trim();
    !candidate.is_empty()
        && !BOILERPLATE.is_match(candidate)
        && !DATE_RANGE.is_match(candidate)
        && candidate.split_whitespace().count() >= 2
        && !candidate.chars().any(|c| c.is_ascii_digit())
}

fn trim_label_noise(value: &str) -> &str {
    value.trim_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '(' | ')' | '_' | '-'))
}

/// Finds the employee name around a `NAME` label.
///
/// Tries, per label line: the text after the label (then before it) on the
/// same line, the line above, the line below.
pub fn find_employee_name(lines: &[&str]) -> Option<String> {
    for (i, line) in lines.iter().enumerate() {
        let Some(label) = NAME_LABEL.find(line) else {
            continue;
        };

        let same_line = [
            trim_label_noise(&line[label.end()..]),
            trim_label_noise(&line[..label.start()]),
        ];
        let previous = i.checked_sub(1).map(|p| lines[p]);
        let next = lines.get(i + 1).copied();

        let candidate = same_line
            .into_iter()
            .chain(previous)
            .chain(next)
            .find(|c| is_valid_name(c));

        if let Some(name) = candidate {
            return Some(collapse_whitespace(name));
        }
    }
    None
}

/// `(month, year)`, preferring a real month name.
pub fn find_period(text: &str) -> Option<(String, i32)> {
    let caps = MONTH_YEAR
        .captures(text)
        .or_else(|| LOOSE_MONTH_YEAR.captures(text))?;
    let year: i32 = caps[2].parse().ok()?;
    Some((canonical_month(&caps[1]), year))
}

fn render_time(caps: &Captures<'_>, time: usize, qualifier: usize) -> String {
    match caps.get(qualifier) {
        Some(q) => {
            let q: String = q
                .as_str()
                .chars()
                .filter(|c| c.is_ascii_alphabetic())
                .collect();
            format!("{} {}", &caps[time], q.to_uppercase())
        }
        None => caps[time].to_string(),
    }
}

/// Official hours, e.g. `8:00 AM - 12:00 PM and 1:00 PM - 5:00 PM`.
pub fn find_shift_window(text: &str) -> Option<String> {
    let caps = SHIFT_WINDOW.captures(text)?;
    Some(format!(
        "{} - {} and {} - {}",
        render_time(&caps, 1, 2),
        render_time(&caps, 3, 4),
        render_time(&caps, 5, 6),
        render_time(&caps, 7, 8),
    ))
}

fn title_case(value: &str) -> String {
    value
        .split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

fn is_approver_name(candidate: &str) -> bool {
    is_valid_name(candidate) && !CERTIFICATION.is_match(candidate)
}

/// `(name, title)` of the officer who verified the record.
///
/// Looks below the certification line when there is one. Either part may be
/// missing.
pub fn find_approver(lines: &[&str]) -> (Option<String>, Option<String>) {
    let start = lines
        .iter()
        .position(|l| CERTIFICATION.is_match(l))
        .unwrap_or(0);

    for (i, line) in lines.iter().enumerate().skip(start) {
        let Some(title) = APPROVER_TITLE.find(line) else {
            continue;
        };

        let before = line[..title.start()].trim_matches(|c: char| c.is_whitespace() || c == ',' || c == '-');
        let name = if is_approver_name(before) {
            Some(collapse_whitespace(before))
        } else {
            i.checked_sub(1)
                .filter(|p| *p >= start)
                .map(|p| lines[p])
                .filter(|l| is_approver_name(l))
                .map(collapse_whitespace)
        };

        return (name, Some(title_case(title.as_str())));
    }

    (None, None)
}

/// `160 hours and 30 minutes` from a `TOTAL ...` line.
pub fn find_total_time(text: &str) -> Option<String> {
    TOTAL_TIME
        .captures(text)
        .map(|caps| collapse_whitespace(&caps[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_validity() {
        assert!(is_valid_name("MARIA L. SANTOS"));
        assert!(!is_valid_name("SANTOS"));
        assert!(!is_valid_name("DAILY TIME RECORD"));
        assert!(!is_valid_name("Civil Service Form No. 48"));
        assert!(!is_valid_name("For the month of"));
        assert!(!is_valid_name("Juan 2nd Cruz"));
        assert!(!is_valid_name("Regular days"));
    }

    #[test]
    fn surnames_containing_form_words_are_names() {
        assert!(is_valid_name("RAMON FORMOSO"));
        assert!(is_valid_name("ANA MONTHEIRO"));
        assert!(is_valid_name("LUZ REGULADO"));

        let lines = ["DAILY TIME RECORD", "RAMON FORMOSO", "(Name)", "October, 2026"];
        assert_eq!(find_employee_name(&lines).as_deref(), Some("RAMON FORMOSO"));
    }

    #[test]
    fn name_after_label_on_same_line() {
        let lines = ["DAILY TIME RECORD", "Name: MARIA SANTOS", "For the month of October, 2026"];
        assert_eq!(find_employee_name(&lines).as_deref(), Some("MARIA SANTOS"));
    }

    #[test]
    fn name_on_line_above_label() {
        let lines = ["DAILY TIME RECORD", "MARIA   SANTOS", "(Name)", "October, 2026"];
        assert_eq!(find_employee_name(&lines).as_deref(), Some("MARIA SANTOS"));
    }

    #[test]
    fn name_on_line_below_label() {
        let lines = ["Civil Service Form No. 48", "NAME", "MARIA SANTOS", "October, 2026"];
        assert_eq!(find_employee_name(&lines).as_deref(), Some("MARIA SANTOS"));
    }

    #[test]
    fn no_acceptable_name() {
        let lines = ["DAILY TIME RECORD", "NAME", "For the month of October, 2026"];
        assert_eq!(find_employee_name(&lines), None);
    }

    #[test]
    fn period_prefers_real_month_names() {
        assert_eq!(
            find_period("For the month of October 1-31, 2026"),
            Some(("October".to_string(), 2026))
        );
        assert_eq!(
            find_period("Regular days, 2025 ... for MARCH, 2026"),
            Some(("March".to_string(), 2026))
        );
        assert_eq!(find_period("month of Octobr, 2026"), Some(("Octobr".to_string(), 2026)));
        assert_eq!(find_period("no period here"), None);
    }

    #[test]
    fn shift_window_is_normalized() {
        let text = "Regular days 8:00 a.m. - 12:00 pm and 1:00PM – 5:00 PM";
        assert_eq!(
            find_shift_window(text).as_deref(),
            Some("8:00 AM - 12:00 PM and 1:00 PM - 5:00 PM")
        );
        assert_eq!(find_shift_window("Regular days 8:00 - 12:00").as_deref(), None);
    }

    #[test]
    fn approver_below_certification() {
        let lines = [
            "MARIA SANTOS",
            "VERIFIED as to the prescribed office hours",
            "JUAN Z. DELA CRUZ",
            "Principal",
        ];
        assert_eq!(
            find_approver(&lines),
            (Some("JUAN Z. DELA CRUZ".to_string()), Some("Principal".to_string()))
        );
    }

    #[test]
    fn approver_title_on_same_line() {
        let lines = ["ANA B. REYES, IN-CHARGE"];
        assert_eq!(
            find_approver(&lines),
            (Some("ANA B. REYES".to_string()), Some("In-Charge".to_string()))
        );
    }

    #[test]
    fn total_time() {
        assert_eq!(
            find_total_time("TOTAL  160 hours and 30 minutes").as_deref(),
            Some("160 hours and 30 minutes")
        );
        assert_eq!(find_total_time("TOTAL"), None);
    }
}
