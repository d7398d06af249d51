//! Retry policy around the read → parse round trip.
//!
//! Each attempt is a fresh provider call followed by a parse; a parse failure
//! is never retried by re-parsing the same text. Transport errors and bad
//! JSON cost one attempt each and there is no delay between attempts.
//!
//! When attempts run out the policy fails open: it returns
//! [`Extraction::Fallback`] holding the sentinel record and the last cause,
//! so one unreadable card never aborts a batch and callers can still tell
//! that a fallback happened.

use crate::error::ExtractionError;
use crate::pipeline::llm::CardReader;
use crate::pipeline::normalize::NormalizedImage;
use crate::pipeline::parse::parse_reply;
use crate::record::ContactRecord;
use serde::Serialize;
use std::future::Future;
use tracing::warn;

/// Outcome of extracting one card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Extraction {
    /// An attempt produced a record; it is returned unmodified.
    Success {
        record: ContactRecord,
        attempts: u32,
    },
    /// Every attempt failed; `record` is [`ContactRecord::extraction_failed`].
    Fallback {
        record: ContactRecord,
        cause: ExtractionError,
        attempts: u32,
    },
}

impl Extraction {
    pub fn record(&self) -> &ContactRecord {
        match self {
            Extraction::Success { record, .. } | Extraction::Fallback { record, .. } => record,
        }
    }

    pub fn into_record(self) -> ContactRecord {
        match self {
            Extraction::Success { record, .. } | Extraction::Fallback { record, .. } => record,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Extraction::Fallback { .. })
    }

    /// Round trips spent on this card.
    pub fn attempts(&self) -> u32 {
        match self {
            Extraction::Success { attempts, .. } | Extraction::Fallback { attempts, .. } => {
                *attempts
            }
        }
    }

    /// The error behind a fallback, if any.
    pub fn cause(&self) -> Option<&ExtractionError> {
        match self {
            Extraction::Success { .. } => None,
            Extraction::Fallback { cause, .. } => Some(cause),
        }
    }

    pub(crate) fn set_source_file(&mut self, filename: &str) {
        let record = match self {
            Extraction::Success { record, .. } | Extraction::Fallback { record, .. } => record,
        };
        record.source_file = filename.to_string();
    }
}

/// Run `attempt` up to `retries + 1` times, falling back to the sentinel record.
///
/// `label` only appears in log lines (usually the upload filename).
pub async fn with_retries<F, Fut>(retries: u32, label: &str, mut attempt: F) -> Extraction
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ContactRecord, ExtractionError>>,
{
    let max_attempts = retries.saturating_add(1);
    let mut n = 1;
    loop {
        let err = match attempt().await {
            Ok(record) => {
                return Extraction::Success {
                    record,
                    attempts: n,
                }
            }
            Err(e) => e,
        };

        warn!("{}: attempt {}/{} failed — {}", label, n, max_attempts, err);

        if n >= max_attempts {
            warn!("{}: giving up, recording unreadable card", label);
            return Extraction::Fallback {
                record: ContactRecord::extraction_failed(),
                cause: err,
                attempts: n,
            };
        }
        n += 1;
    }
}

/// Read and parse one card with the configured number of retries.
pub async fn extract_with_retry<R: CardReader>(
    reader: &R,
    image: &NormalizedImage,
    retries: u32,
    label: &str,
) -> Extraction {
    with_retries(retries, label, move || async move {
        let raw = reader.read_card(image).await?;
        parse_reply(&raw)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::EXTRACTION_FAILED_NOTE;
    use std::cell::Cell;

    fn run(
        retries: u32,
        script: Vec<Result<ContactRecord, ExtractionError>>,
    ) -> (Extraction, usize) {
        let calls = Cell::new(0usize);
        let outcome = tokio_test::block_on(with_retries(retries, "test.png", || {
            let i = calls.get();
            calls.set(i + 1);
            let next = script.get(i).cloned().unwrap_or(Err(ExtractionError::EmptyReply));
            async move { next }
        }));
        (outcome, calls.get())
    }

    fn named(name: &str) -> ContactRecord {
        ContactRecord {
            name: name.into(),
            ..ContactRecord::default()
        }
    }

    fn bad_json() -> ExtractionError {
        ExtractionError::MalformedJson {
            detail: "expected value at line 1 column 1".into(),
        }
    }

    #[test]
    fn first_success_stops_immediately() {
        let (outcome, calls) = run(1, vec![Ok(named("A"))]);
        assert_eq!(calls, 1);
        assert_eq!(
            outcome,
            Extraction::Success {
                record: named("A"),
                attempts: 1
            }
        );
    }

    #[test]
    fn second_attempt_result_is_returned_unmodified() {
        let (outcome, calls) = run(1, vec![Err(bad_json()), Ok(named("B"))]);
        assert_eq!(calls, 2);
        assert_eq!(outcome.record(), &named("B"));
        assert_eq!(outcome.attempts(), 2);
        assert!(!outcome.is_fallback());
    }

    #[test]
    fn default_retry_makes_at_most_two_calls() {
        let (outcome, calls) = run(1, vec![Err(bad_json()), Err(bad_json()), Ok(named("C"))]);
        assert_eq!(calls, 2);
        assert!(outcome.is_fallback());
    }

    #[test]
    fn fallback_is_sentinel_with_last_cause() {
        let net = ExtractionError::Provider {
            message: "connection reset".into(),
        };
        let (outcome, _) = run(1, vec![Err(net), Err(bad_json())]);
        let record = outcome.record();
        assert_eq!(record.notes, EXTRACTION_FAILED_NOTE);
        assert!(record.is_extraction_failed());
        assert_eq!(outcome.cause(), Some(&bad_json()));
    }

    #[test]
    fn zero_retries_means_single_attempt() {
        let (outcome, calls) = run(0, vec![Err(bad_json()), Ok(named("D"))]);
        assert_eq!(calls, 1);
        assert!(outcome.is_fallback());
        assert_eq!(outcome.attempts(), 1);
    }

    #[test]
    fn network_and_parse_errors_cost_the_same() {
        let net = ExtractionError::Provider {
            message: "timeout".into(),
        };
        let (outcome, calls) = run(2, vec![Err(net), Err(bad_json()), Ok(named("E"))]);
        assert_eq!(calls, 3);
        assert_eq!(outcome.record().name, "E");
    }

    #[test]
    fn serialises_with_status_tag() {
        let (outcome, _) = run(0, vec![Err(ExtractionError::EmptyReply)]);
        let v = serde_json::to_value(&outcome).unwrap();
        assert_eq!(v["status"], "fallback");
        assert_eq!(v["attempts"], 1);
    }
}
