//! Timestamp to frame-index mapping.
//!
//! Screenshots are selected by input frame number, so every planned
//! timestamp is turned into `floor(t * fps)` under the video's constant frame
//! rate. Two timestamps can land on the same frame after rounding; this is
//! where those collapse into one.

use crate::conversion;
use crate::error::PictureBookError;
use crate::metadata::FrameRate;
use crate::planner::CaptureTimestamp;

/// Maps capture timestamps onto frame indices of a constant-frame-rate
/// video.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use picture_book::{CaptureReason, CaptureTimestamp, FrameIndexMapper, FrameRate};
///
/// let at = |millis| CaptureTimestamp::new(Duration::from_millis(millis), CaptureReason::GapFill);
/// let mapper = FrameIndexMapper::new(&FrameRate::Constant(25.0), 100)?;
/// assert_eq!(mapper.to_frame_indices(&[at(0), at(39), at(41), at(10_000)]), [0, 1, 99]);
/// # Ok::<(), picture_book::PictureBookError>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FrameIndexMapper {
    frames_per_second: f64,
    total_frames: u64,
}

impl FrameIndexMapper {
    /// Create a mapper for a video with `total_frames` frames.
    ///
    /// # Errors
    ///
    /// - [`PictureBookError::FrameRateUnavailable`] unless `frame_rate` is a
    ///   positive constant rate.
    /// - [`PictureBookError::EmptyVideo`] if `total_frames` is zero.
    pub fn new(frame_rate: &FrameRate, total_frames: u64) -> Result<Self, PictureBookError> {
        let frames_per_second = frame_rate.constant()?;
        if total_frames == 0 {
            return Err(PictureBookError::EmptyVideo);
        }
        Ok(Self {
            frames_per_second,
            total_frames,
        })
    }

    /// Frame rate used for the mapping.
    pub fn frames_per_second(&self) -> f64 {
        self.frames_per_second
    }

    /// Index of the last frame.
    pub fn last_frame(&self) -> u64 {
        self.total_frames - 1
    }

    /// Map one timestamp, clamped to the last frame.
    pub fn frame_index(&self, timestamp: &CaptureTimestamp) -> u64 {
        conversion::timestamp_to_frame_number(timestamp.time, self.frames_per_second)
            .min(self.last_frame())
    }

    /// Map sorted timestamps to strictly increasing frame indices.
    ///
    /// Timestamps that fall on the same frame collapse to a single index;
    /// the output is never longer than the input.
    pub fn to_frame_indices(&self, timestamps: &[CaptureTimestamp]) -> Vec<u64> {
        let mut indices: Vec<u64> = timestamps
            .iter()
            .map(|timestamp| self.frame_index(timestamp))
            .collect();
        // Already sorted for planner output; sorting keeps the strict
        // ordering for arbitrary callers too.
        indices.sort_unstable();
        indices.dedup();

        if indices.len() < timestamps.len() {
            log::debug!(
                "{} timestamp(s) collapsed onto shared frames",
                timestamps.len() - indices.len()
            );
        }
        indices
    }
}

/// Map `timestamps` to frame indices in one call.
///
/// # Errors
///
/// Same as [`FrameIndexMapper::new`].
pub fn to_frame_indices(
    timestamps: &[CaptureTimestamp],
    frame_rate: &FrameRate,
    total_frames: u64,
) -> Result<Vec<u64>, PictureBookError> {
    Ok(FrameIndexMapper::new(frame_rate, total_frames)?.to_frame_indices(timestamps))
}
