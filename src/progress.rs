//! Progress-callback trait for batch conversion events.
//!
//! Pass a [`BatchProgressCallback`] to [`crate::convert::Pipeline::run_batch`]
//! to be told when the batch starts, when each resume starts and finishes,
//! and when the batch ends. The `cv2doc` binary drives a terminal progress
//! bar from these events; library callers can forward them anywhere.
//!
//! # Example
//!
//! ```rust
//! use cv2doc::BatchProgressCallback;
//! use std::path::Path;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, index: usize, total: usize, _input: &Path, output: &Path) {
//!         self.done.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} → {}", index, total, output.display());
//!     }
//! }
//! ```

use std::path::Path;

/// Called by the batch driver as it processes each resume.
///
/// Files are processed one at a time, so events arrive in order. All methods
/// have default no-op implementations.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first file.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called before a file is processed. `index` is 1-based.
    fn on_file_start(&self, index: usize, total: usize, input: &Path) {
        let _ = (index, total, input);
    }

    /// Called after a file produced its document at `output`.
    fn on_file_complete(&self, index: usize, total: usize, input: &Path, output: &Path) {
        let _ = (index, total, input, output);
    }

    /// Called once after every file succeeded. Not called when the batch aborts.
    fn on_batch_complete(&self, total: usize) {
        let _ = total;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}
