//! Eager (whole-batch) extraction entry points.
//!
//! Uploads are processed strictly one at a time, in upload order: file
//! *i + 1* is not normalised until file *i*'s record (or skip) is final.
//! Use [`crate::stream::extract_stream`] to receive outcomes as they happen.

use crate::config::ExtractionConfig;
use crate::error::{Card2CsvError, FileError};
use crate::output::{BatchOutput, BatchStats, FileOutcome};
use crate::pipeline::input::Upload;
use crate::pipeline::llm::{CardReader, VisionClient};
use crate::pipeline::normalize::normalize_blocking;
use crate::pipeline::retry::extract_with_retry;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Extract contact records from a batch of card images.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(BatchOutput)` whenever the provider could be resolved, even if every
/// file failed: skipped files and fallback records are reported inside the
/// output, never as an `Err`.
///
/// # Errors
/// Only [`Card2CsvError::ProviderNotConfigured`] is fatal here.
pub async fn extract_batch(
    uploads: &[Upload],
    config: &ExtractionConfig,
) -> Result<BatchOutput, Card2CsvError> {
    let provider = resolve_provider(config)?;
    let client = VisionClient::new(provider, config);
    Ok(extract_batch_with(&client, uploads, config).await)
}

/// Run the batch against an explicit [`CardReader`].
///
/// The reader is injected rather than resolved from the environment, which
/// is how tests drive the pipeline with scripted replies.
pub async fn extract_batch_with<R: CardReader>(
    reader: &R,
    uploads: &[Upload],
    config: &ExtractionConfig,
) -> BatchOutput {
    let start = Instant::now();
    let total = uploads.len();
    info!("Starting batch: {} files", total);

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut output = BatchOutput {
        records: Vec::with_capacity(total),
        outcomes: Vec::with_capacity(total),
        stats: BatchStats {
            total_files: total,
            ..BatchStats::default()
        },
    };

    for (index, upload) in uploads.iter().enumerate() {
        let outcome = process_upload(reader, index, total, upload, config).await;
        match &outcome {
            FileOutcome::Extracted { extraction, .. } => {
                output.stats.extracted += 1;
                output.stats.total_attempts += u64::from(extraction.attempts());
                if extraction.is_fallback() {
                    output.stats.fallbacks += 1;
                }
                output.records.push(extraction.record().clone());
            }
            FileOutcome::Skipped(_) => output.stats.skipped += 1,
        }
        output.outcomes.push(outcome);
    }

    output.stats.duration_ms = start.elapsed().as_millis() as u64;

    info!(
        "Batch complete: {}/{} files extracted ({} fallbacks, {} skipped), {}ms",
        output.stats.extracted,
        total,
        output.stats.fallbacks,
        output.stats.skipped,
        output.stats.duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, output.stats.extracted);
    }

    output
}

/// Extract a batch and write the CSV export to `output_path`.
///
/// # Errors
/// Besides provider resolution, fails with [`Card2CsvError::NoRecords`] when
/// every file was skipped (no file is written in that case).
pub async fn extract_to_file(
    uploads: &[Upload],
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<BatchOutput, Card2CsvError> {
    let output = extract_batch(uploads, config).await?;
    output.write_csv(output_path)?;
    Ok(output)
}

/// Synchronous wrapper around [`extract_batch`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_batch_sync(
    uploads: &[Upload],
    config: &ExtractionConfig,
) -> Result<BatchOutput, Card2CsvError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Card2CsvError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract_batch(uploads, config))
}

/// Normalise, extract, and tag one upload.
pub(crate) async fn process_upload<R: CardReader>(
    reader: &R,
    index: usize,
    total: usize,
    upload: &Upload,
    config: &ExtractionConfig,
) -> FileOutcome {
    let filename = upload.filename.as_str();
    if let Some(ref cb) = config.progress_callback {
        cb.on_file_start(index, total, filename);
    }

    let image = match normalize_blocking(filename, &upload.bytes, config.jpeg_quality).await {
        Ok(image) => image,
        Err(e) => {
            warn!("Skipping '{}': {}", filename, e);
            if let Some(ref cb) = config.progress_callback {
                cb.on_file_skipped(index, total, filename, &e.to_string());
            }
            return FileOutcome::Skipped(FileError {
                index,
                filename: filename.to_string(),
                source: e,
            });
        }
    };
    debug!(
        "File {}/{} '{}': {} bytes JPEG",
        index + 1,
        total,
        filename,
        image.bytes.len()
    );

    let mut extraction = extract_with_retry(reader, &image, config.retries, filename).await;
    extraction.set_source_file(filename);

    if let Some(ref cb) = config.progress_callback {
        cb.on_file_complete(index, total, filename, extraction.is_fallback());
    }

    FileOutcome::Extracted {
        index,
        filename: filename.to_string(),
        extraction,
    }
}

/// Instantiate a named provider with the given model.
fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, Card2CsvError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Card2CsvError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model`; the
///    factory reads the matching API key (`OPENAI_API_KEY`, ...).
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **OpenAI** when `OPENAI_API_KEY` is set, with `config.model`.
/// 5. **Full auto-detection** via `ProviderFactory::from_env`.
pub(crate) fn resolve_provider(
    config: &ExtractionConfig,
) -> Result<Arc<dyn LLMProvider>, Card2CsvError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_vision_provider(name, &config.model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_vision_provider("openai", &config.model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Card2CsvError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
