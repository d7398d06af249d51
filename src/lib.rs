//! # edgequake-card2csv
//!
//! Extract contact details from business-card photos with Vision Language
//! Models (VLMs) and export them as a CSV table.
//!
//! ## Pipeline Overview
//!
//! ```text
//! uploads (filename, bytes)
//!  │
//!  ├─ 1. Normalise  png / jpeg / heic → RGB JPEG @ quality 95
//!  ├─ 2. VLM        one chat request per card, temperature 0
//!  ├─ 3. Parse      strip ```json fences, decode the JSON object
//!  ├─ 4. Retry      repeat 2–3 up to `retries` times, else sentinel record
//!  └─ 5. Export     union-of-keys CSV, one row per card
//! ```
//!
//! Files are processed one at a time, in upload order. A file that cannot be
//! decoded is skipped and reported; a file whose extraction keeps failing
//! still gets a row, marked `Extraction failed or unreadable card`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_card2csv::{extract_batch, ExtractionConfig, Upload};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = ExtractionConfig::default();
//!     let uploads = vec![Upload::new("card.jpg", std::fs::read("card.jpg")?)];
//!     let output = extract_batch(&uploads, &config).await?;
//!     if let Some(csv) = output.to_csv()? {
//!         print!("{csv}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `card2csv` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `heif`  | off     | Decode `.heic` / `.heif` uploads through libheif |
//! | `heif-bundled` | off | `heif`, building libheif from source instead of linking the host copy |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod export;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod record;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{extract_batch, extract_batch_sync, extract_batch_with, extract_to_file};
pub use config::{ExtractionConfig, ExtractionConfigBuilder, DEFAULT_MODEL};
pub use error::{Card2CsvError, ExtractionError, FileError, ImageConversionError};
pub use export::{records_to_csv, rows_to_csv, EXPORT_FILE_NAME, EXPORT_MIME_TYPE};
pub use output::{BatchOutput, BatchStats, FileOutcome};
pub use pipeline::input::{read_upload, Upload};
pub use pipeline::llm::{CardReader, VisionClient};
pub use pipeline::normalize::{normalize_image, DeclaredFormat, NormalizedImage};
pub use pipeline::parse::parse_reply;
pub use pipeline::retry::{extract_with_retry, Extraction};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use record::{ContactRecord, CONTACT_FIELDS, EXTRACTION_FAILED_NOTE, SOURCE_FILE_KEY};
pub use stream::{extract_stream, extract_stream_with, OutcomeStream};
