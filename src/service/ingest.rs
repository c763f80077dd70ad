use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::error::PayrollError;
use crate::extract::AttendanceExtractor;
use crate::model::time_record::{DocumentPeriod, TimeRecordDraft};
use crate::store::{Repository, StoreError};
use crate::utils::calendar::PayPeriod;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StoredDocument {
    pub document_id: u64,
    #[schema(example = "October")]
    pub month: String,
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = 21)]
    pub entries: usize,
    /// An earlier upload for the same period was deleted.
    pub replaced: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SkippedReport {
    pub section: usize,
    #[schema(example = "missing_period")]
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IngestReport {
    #[schema(example = 2)]
    pub sections_found: usize,
    #[schema(example = 42)]
    pub rows_extracted: usize,
    #[schema(example = 1)]
    pub rows_dropped: usize,
    pub documents: Vec<StoredDocument>,
    pub skipped: Vec<SkippedReport>,
}

pub struct IngestService {
    repo: Arc<dyn Repository>,
    extractor: AttendanceExtractor,
}

impl IngestService {
    pub fn new(repo: Arc<dyn Repository>, extractor: AttendanceExtractor) -> Self {
        Self { repo, extractor }
    }

    /// Extracts every DTR in `raw_text` and stores them for `employee_id`.
    ///
    /// All or nothing: an identity mismatch in any section, or a period that is
    /// already on file while `replace_existing` is off, stores no document at
    /// all.
    #[instrument(skip(self, raw_text), fields(bytes = raw_text.len()))]
    pub async fn ingest(
        &self,
        employee_id: u64,
        raw_text: &str,
        replace_existing: bool,
    ) -> Result<IngestReport, PayrollError> {
        let mut session = self.repo.begin().await?;

        let employee = session
            .employee(employee_id)
            .await?
            .ok_or_else(|| PayrollError::not_found(format!("employee {employee_id}")))?;

        let extraction = self.extractor.extract(raw_text, &employee.full_name)?;
        if extraction.documents.is_empty() {
            return Err(extraction
                .skipped
                .into_iter()
                .next()
                .map(|s| s.reason)
                .unwrap_or(PayrollError::NoSectionsFound));
        }

        let mut documents = Vec::with_capacity(extraction.documents.len());

        for draft in &extraction.documents {
            let existing = session
                .find_document(employee_id, &draft.month, draft.year)
                .await?;

            let replaced = match existing {
                Some(previous) if replace_existing => {
                    info!(document_id = previous.id, month = %draft.month, year = draft.year, "Replacing time record");
                    session.delete_document(previous.id).await?;
                    true
                }
                Some(_) => {
                    warn!(month = %draft.month, year = draft.year, "Time record already on file");
                    return Err(PayrollError::DuplicatePeriod {
                        month: draft.month.clone(),
                        year: draft.year,
                    });
                }
                None => false,
            };

            let document_id = session
                .insert_document(employee_id, draft)
                .await
                .map_err(|e| period_conflict(e, draft))?;
            documents.push(StoredDocument {
                document_id,
                month: draft.month.clone(),
                year: draft.year,
                entries: draft.entries.len(),
                replaced,
            });
        }

        session.commit().await?;

        info!(stored = documents.len(), "Time records stored");

        Ok(IngestReport {
            sections_found: extraction.sections_found,
            rows_extracted: extraction.rows_extracted(),
            rows_dropped: extraction.rows_dropped,
            documents,
            skipped: extraction
                .skipped
                .iter()
                .map(|s| SkippedReport {
                    section: s.section,
                    error: s.reason.code().to_string(),
                    message: s.reason.to_string(),
                })
                .collect(),
        })
    }

    /// Uploaded periods of an employee, oldest first.
    pub async fn periods(&self, employee_id: u64) -> Result<Vec<DocumentPeriod>, PayrollError> {
        let mut session = self.repo.begin().await?;
        session
            .employee(employee_id)
            .await?
            .ok_or_else(|| PayrollError::not_found(format!("employee {employee_id}")))?;

        let mut periods = session.document_periods(employee_id).await?;
        // Unresolvable months sort after every calendar month of their year.
        periods.sort_by_key(|p| {
            let month = PayPeriod::resolve(&p.month, p.year).map_or(13, |r| r.month_number());
            (p.year, month, p.document_id)
        });
        Ok(periods)
    }
}

/// A concurrent upload of the same period loses on the unique key.
fn period_conflict(e: StoreError, draft: &TimeRecordDraft) -> PayrollError {
    match e {
        StoreError::Duplicate { .. } => {
            warn!(month = %draft.month, year = draft.year, "Time record stored concurrently");
            PayrollError::DuplicatePeriod {
                month: draft.month.clone(),
                year: draft.year,
            }
        }
        e => e.into(),
    }
}
