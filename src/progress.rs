//! Progress reporting for the screenshot run.
//!
//! FFmpeg writes `key=value` progress blocks to stdout (`-progress pipe:1`).
//! The transcoder turns each block into a [`ProgressInfo`] snapshot and hands
//! it to a [`ProgressCallback`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use picture_book::{PictureBook, PictureBookConfig, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("{pct:.1}% ({} screenshots)", info.current);
//!         }
//!     }
//! }
//!
//! let book = PictureBook::new(PictureBookConfig::default())
//!     .with_progress(Arc::new(PrintProgress));
//! book.render("episode.mkv", "out/")?;
//! # Ok::<(), picture_book::PictureBookError>(())
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

/// A snapshot of rendering progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Screenshots written so far.
    pub current: u64,
    /// Screenshots planned, if known.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time since the run started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// Position in the input video FFmpeg has reached.
    pub current_timestamp: Option<Duration>,
    /// Whether this is the final report of the run.
    pub finished: bool,
}

/// Trait for receiving progress updates.
///
/// Implementations must be [`Send`] and [`Sync`]; callbacks are invoked from
/// the thread that reads FFmpeg's output. They observe the run but cannot
/// stop it.
pub trait ProgressCallback: Send + Sync {
    /// Called whenever FFmpeg reports progress.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Tracks progress timing and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: Option<u64>,
    current: u64,
    current_timestamp: Option<Duration>,
    start_time: Instant,
    finished: bool,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, total: Option<u64>) -> Self {
        Self {
            callback,
            total,
            current: 0,
            current_timestamp: None,
            start_time: Instant::now(),
            finished: false,
        }
    }

    /// Record FFmpeg's cumulative frame count and position, then report.
    ///
    /// A `finished` update is the final report.
    pub(crate) fn update(
        &mut self,
        frames_written: u64,
        position: Option<Duration>,
        finished: bool,
    ) {
        if self.finished {
            return;
        }
        self.current = frames_written;
        if position.is_some() {
            self.current_timestamp = position;
        }
        self.finished = finished;
        self.report(finished);
    }

    /// Emit the final report unless one was already sent.
    pub(crate) fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            self.report(true);
        }
    }

    fn report(&self, finished: bool) {
        let elapsed = self.start_time.elapsed();

        let percentage = self
            .total
            .filter(|&t| t > 0)
            .map(|t| (self.current.min(t) as f32 / t as f32) * 100.0);

        let estimated_remaining = if self.current > 0 {
            self.total.map(|t| {
                let remaining = t.saturating_sub(self.current);
                elapsed.mul_f64(remaining as f64 / self.current as f64)
            })
        } else {
            None
        };

        let info = ProgressInfo {
            current: self.current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            current_timestamp: self.current_timestamp,
            finished,
        };

        self.callback.on_progress(&info);
    }
}
