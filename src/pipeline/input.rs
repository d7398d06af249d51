//! Upload inputs: in-memory `(filename, bytes)` pairs.
//!
//! The batch never reads ambient state; callers hand it an explicit list of
//! [`Upload`]s. [`read_upload`] is the convenience used by the CLI to build
//! one from a local path, validating existence and read permission first so
//! the user gets a meaningful error before any network call is made.

use crate::error::Card2CsvError;
use std::path::Path;
use tracing::debug;

/// One uploaded card image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Original filename; its suffix selects the decoder and it becomes `source_file`.
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

/// Read a local image file into an [`Upload`] named after the file's base name.
pub async fn read_upload(path: impl AsRef<Path>) -> Result<Upload, Card2CsvError> {
    let path = path.as_ref();

    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Card2CsvError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => Card2CsvError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => Card2CsvError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    debug!("Read upload '{}' ({} bytes)", filename, bytes.len());
    Ok(Upload { filename, bytes })
}
