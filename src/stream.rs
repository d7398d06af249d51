//! Streaming extraction API: emit one outcome per upload as it completes.
//!
//! Unlike the eager [`crate::batch::extract_batch`], which returns after the
//! last file, [`extract_stream`] yields each [`FileOutcome`] as soon as that
//! file is done, so a UI can show records card by card. Files are still
//! processed one at a time and outcomes arrive in upload order.

use crate::batch::{process_upload, resolve_provider};
use crate::config::ExtractionConfig;
use crate::error::Card2CsvError;
use crate::output::FileOutcome;
use crate::pipeline::input::Upload;
use crate::pipeline::llm::{CardReader, VisionClient};
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of per-file outcomes.
pub type OutcomeStream = Pin<Box<dyn Stream<Item = FileOutcome> + Send>>;

/// Extract a batch, streaming outcomes in upload order.
///
/// # Returns
/// - `Ok(OutcomeStream)` — one item per upload
/// - `Err(Card2CsvError)` — the provider could not be resolved
///
/// # Example
/// ```rust,no_run
/// use edgequake_card2csv::{extract_stream, ExtractionConfig, Upload};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let uploads = vec![Upload::new("card.jpg", std::fs::read("card.jpg")?)];
/// let mut stream = extract_stream(uploads, &ExtractionConfig::default())?;
/// while let Some(outcome) = stream.next().await {
///     match outcome.record() {
///         Some(r) => println!("{}: {} <{}>", r.source_file, r.name, r.email),
///         None => eprintln!("{} skipped", outcome.filename()),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub fn extract_stream(
    uploads: Vec<Upload>,
    config: &ExtractionConfig,
) -> Result<OutcomeStream, Card2CsvError> {
    let provider = resolve_provider(config)?;
    let client = Arc::new(VisionClient::new(provider, config));
    Ok(extract_stream_with(client, uploads, config))
}

/// Streaming counterpart of [`crate::batch::extract_batch_with`].
pub fn extract_stream_with<R: CardReader + 'static>(
    reader: Arc<R>,
    uploads: Vec<Upload>,
    config: &ExtractionConfig,
) -> OutcomeStream {
    let total = uploads.len();
    info!("Starting streaming batch: {} files", total);

    let config = config.clone();
    let s = stream::iter(uploads.into_iter().enumerate()).then(move |(index, upload)| {
        let reader = Arc::clone(&reader);
        let cfg = config.clone();
        async move { process_upload(reader.as_ref(), index, total, &upload, &cfg).await }
    });

    Box::pin(s)
}
