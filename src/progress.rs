//! Progress-callback trait for per-file batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the batch walks the upload list. Files are processed one at a
//! time, so events for file *i + 1* never arrive before file *i* finished.
//!
//! # Example
//!
//! ```rust
//! use edgequake_card2csv::{BatchProgressCallback, ExtractionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, index: usize, total: usize, filename: &str, fallback: bool) {
//!         self.done.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} {} (fallback: {})", index + 1, total, filename, fallback);
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch aggregator as it processes each upload.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `index` is the 0-based upload position.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first file is touched.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called before a file is normalised.
    fn on_file_start(&self, index: usize, total_files: usize, filename: &str) {
        let _ = (index, total_files, filename);
    }

    /// Called when a file produced a record.
    ///
    /// `fallback` is true when every attempt failed and the sentinel
    /// record was recorded instead.
    fn on_file_complete(&self, index: usize, total_files: usize, filename: &str, fallback: bool) {
        let _ = (index, total_files, filename, fallback);
    }

    /// Called when a file failed image conversion and was dropped.
    fn on_file_skipped(&self, index: usize, total_files: usize, filename: &str, error: &str) {
        let _ = (index, total_files, filename, error);
    }

    /// Called once after every file has been attempted.
    ///
    /// `records` counts files that reached extraction (fallbacks included).
    fn on_batch_complete(&self, total_files: usize, records: usize) {
        let _ = (total_files, records);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        fallbacks: AtomicUsize,
        skips: AtomicUsize,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_file_start(&self, _index: usize, _total: usize, _filename: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_complete(&self, _index: usize, _total: usize, _filename: &str, fallback: bool) {
            self.completes.fetch_add(1, Ordering::SeqCst);
            if fallback {
                self.fallbacks.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn on_file_skipped(&self, _index: usize, _total: usize, _filename: &str, _error: &str) {
            self.skips.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_file_start(0, 2, "a.png");
        cb.on_file_complete(0, 2, "a.png", false);
        cb.on_file_skipped(1, 2, "b.heic", "bad header");
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let t = TrackingCallback::default();
        t.on_file_start(0, 3, "a.png");
        t.on_file_complete(0, 3, "a.png", false);
        t.on_file_start(1, 3, "b.png");
        t.on_file_complete(1, 3, "b.png", true);
        t.on_file_start(2, 3, "c.png");
        t.on_file_skipped(2, 3, "c.png", "corrupt");

        assert_eq!(t.starts.load(Ordering::SeqCst), 3);
        assert_eq!(t.completes.load(Ordering::SeqCst), 2);
        assert_eq!(t.fallbacks.load(Ordering::SeqCst), 1);
        assert_eq!(t.skips.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(10);
        cb.on_file_complete(0, 10, "x.jpg", false);
    }
}
