//! Batch results: per-file outcomes, the record set, and run statistics.

use crate::error::{Card2CsvError, ExtractionError, FileError};
use crate::export;
use crate::pipeline::retry::Extraction;
use crate::record::ContactRecord;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// What happened to one upload.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FileOutcome {
    /// The file reached extraction and produced a record (possibly the sentinel).
    Extracted {
        index: usize,
        filename: String,
        extraction: Extraction,
    },
    /// Image conversion failed; the file contributes no record.
    Skipped(FileError),
}

impl FileOutcome {
    /// 0-based upload position.
    pub fn index(&self) -> usize {
        match self {
            FileOutcome::Extracted { index, .. } => *index,
            FileOutcome::Skipped(e) => e.index,
        }
    }

    pub fn filename(&self) -> &str {
        match self {
            FileOutcome::Extracted { filename, .. } => filename,
            FileOutcome::Skipped(e) => &e.filename,
        }
    }

    /// The record for this file, with `source_file` attached.
    pub fn record(&self) -> Option<&ContactRecord> {
        match self {
            FileOutcome::Extracted { extraction, .. } => Some(extraction.record()),
            FileOutcome::Skipped(_) => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, FileOutcome::Skipped(_))
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, FileOutcome::Extracted { extraction, .. } if extraction.is_fallback())
    }
}

/// Counters for one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub total_files: usize,
    /// Files that produced a record, fallbacks included.
    pub extracted: usize,
    /// Files whose record is the "unreadable card" sentinel.
    pub fallbacks: usize,
    /// Files dropped because image conversion failed.
    pub skipped: usize,
    /// Provider round trips across the whole batch.
    pub total_attempts: u64,
    pub duration_ms: u64,
}

/// Everything a batch produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutput {
    /// The result set: one record per file that reached extraction, in upload order.
    pub records: Vec<ContactRecord>,
    /// One entry per upload, in upload order.
    pub outcomes: Vec<FileOutcome>,
    pub stats: BatchStats,
}

impl BatchOutput {
    /// Files dropped during image conversion.
    pub fn skipped(&self) -> impl Iterator<Item = &FileError> {
        self.outcomes.iter().filter_map(|o| match o {
            FileOutcome::Skipped(e) => Some(e),
            FileOutcome::Extracted { .. } => None,
        })
    }

    /// `(filename, cause)` for every file that fell back to the sentinel record.
    pub fn fallbacks(&self) -> impl Iterator<Item = (&str, &ExtractionError)> {
        self.outcomes.iter().filter_map(|o| match o {
            FileOutcome::Extracted {
                filename,
                extraction,
                ..
            } => extraction.cause().map(|c| (filename.as_str(), c)),
            FileOutcome::Skipped(_) => None,
        })
    }

    /// The result set as CSV, or `None` when no file reached extraction.
    pub fn to_csv(&self) -> Result<Option<String>, Card2CsvError> {
        export::records_to_csv(&self.records)
    }

    /// Write the CSV export to `path` atomically.
    ///
    /// # Errors
    /// [`Card2CsvError::NoRecords`] when the result set is empty; nothing is written.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), Card2CsvError> {
        let path = path.as_ref();
        let csv = self.to_csv()?.ok_or(Card2CsvError::NoRecords {
            total: self.stats.total_files,
        })?;
        export::write_atomic(path, &csv)?;
        info!("Wrote {} rows to {}", self.records.len(), path.display());
        Ok(())
    }
}
