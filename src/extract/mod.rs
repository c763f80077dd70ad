//! Recovers DTR documents from OCR text.
//!
//! A single upload may hold several months back to back; each starts at a
//! `DAILY TIME RECORD` title. Sections are validated against the uploading
//! employee before anything is returned, so a misdirected upload never yields
//! a draft for somebody else's attendance.

pub mod fields;
pub mod rows;

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::PayrollError;
use crate::model::time_record::{NOT_FOUND, TimeRecordDraft};
use crate::utils::time_format::UnqualifiedTimePolicy;

pub use rows::{DayFallbacks, RowOutcome};

static SECTION_MARKER: Lazy<Regex> =
    Lazy::new(|| {
        Regex::new(r"(?im)^[ \t]*daily\s+time\s+record").expect("valid section marker regex")
    });

#[derive(Debug, Clone, Default)]
pub struct ExtractorConfig {
    pub day_fallbacks: DayFallbacks,
    pub unqualified_time: UnqualifiedTimePolicy,
}

/// A section that produced no draft, and why.
#[derive(Debug)]
pub struct SkippedSection {
    pub section: usize,
    pub reason: PayrollError,
}

#[derive(Debug, Default)]
pub struct Extraction {
    pub documents: Vec<TimeRecordDraft>,
    pub skipped: Vec<SkippedSection>,
    pub sections_found: usize,
    /// Lines shaped like daily rows that were discarded.
    pub rows_dropped: usize,
}

impl Extraction {
    pub fn rows_extracted(&self) -> usize {
        self.documents.iter().map(|d| d.entries.len()).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AttendanceExtractor {
    config: ExtractorConfig,
}

/// Section texts in document order, each starting at its marker.
pub fn split_sections(text: &str) -> Vec<&str> {
    let starts: Vec<usize> = SECTION_MARKER.find_iter(text).map(|m| m.start()).collect();

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(text.len());
            &text[start..end]
        })
        .collect()
}

fn normalize_name(value: &str) -> String {
    fields::collapse_whitespace(value).to_uppercase()
}

impl AttendanceExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Extracts every DTR section of `raw_text` for `requester`.
    ///
    /// Fails with `NoSectionsFound` when the text has no section marker and
    /// with `IdentityMismatch` as soon as any section names someone else; in
    /// that case nothing is returned. A section without a readable period is
    /// recorded in [`Extraction::skipped`] and the others are kept.
    pub fn extract(&self, raw_text: &str, requester: &str) -> Result<Extraction, PayrollError> {
        let sections = split_sections(raw_text);
        if sections.is_empty() {
            return Err(PayrollError::NoSectionsFound);
        }

        let mut extraction = Extraction {
            sections_found: sections.len(),
            ..Default::default()
        };

        for (index, section) in sections.iter().enumerate() {
            match self.extract_section(index, section, requester) {
                Ok((draft, dropped)) => {
                    extraction.rows_dropped += dropped;
                    extraction.documents.push(draft);
                }
                Err(e @ PayrollError::IdentityMismatch { .. }) => {
                    warn!(section = index, error = %e, "Rejecting upload");
                    return Err(e);
                }
                Err(e) => {
                    warn!(section = index, error = %e, "Skipping time record section");
                    extraction.skipped.push(SkippedSection { section: index, reason: e });
                }
            }
        }

        info!(
            sections = extraction.sections_found,
            documents = extraction.documents.len(),
            rows = extraction.rows_extracted(),
            dropped = extraction.rows_dropped,
            "Time record extraction finished"
        );

        Ok(extraction)
    }

    fn extract_section(
        &self,
        index: usize,
        section: &str,
        requester: &str,
    ) -> Result<(TimeRecordDraft, usize), PayrollError> {
        let lines: Vec<&str> = section
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        let employee_name =
            fields::find_employee_name(&lines).unwrap_or_else(|| NOT_FOUND.to_string());

        let expected = normalize_name(requester);
        if expected.is_empty() || !normalize_name(&employee_name).contains(&expected) {
            return Err(PayrollError::IdentityMismatch {
                found: employee_name,
                expected: requester.trim().to_string(),
            });
        }

        let (month, year) =
            fields::find_period(section).ok_or(PayrollError::MissingPeriod { section: index })?;

        let (approver_name, approver_title) = fields::find_approver(&lines);

        let mut entries = Vec::new();
        let mut seen_days = BTreeSet::new();
        let mut dropped = 0;

        for line in &lines {
            match rows::parse_row(line, &self.config.day_fallbacks, self.config.unqualified_time) {
                RowOutcome::NotARow => {}
                RowOutcome::Row(entry) => {
                    if seen_days.insert(entry.day) {
                        entries.push(entry);
                    } else {
                        debug!(section = index, day = entry.day, "Dropping repeated day row");
                        dropped += 1;
                    }
                }
                RowOutcome::Dropped(reason) => {
                    debug!(section = index, %reason, "Dropping daily row");
                    dropped += 1;
                }
            }
        }

        let draft = TimeRecordDraft {
            employee_name,
            month,
            year,
            shift_window_description: fields::find_shift_window(section)
                .unwrap_or_else(|| NOT_FOUND.to_string()),
            approver_name: approver_name.unwrap_or_else(|| NOT_FOUND.to_string()),
            approver_title: approver_title.unwrap_or_else(|| NOT_FOUND.to_string()),
            total_time: fields::find_total_time(section).unwrap_or_else(|| NOT_FOUND.to_string()),
            entries,
        };

        Ok((draft, dropped))
    }
}
