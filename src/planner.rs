//! Capture timestamp planning.
//!
//! [`TimestampPlanner`] decides when to take screenshots:
//!
//! 1. one screenshot in the middle of every subtitle, where the picture has
//!    usually settled after a cut;
//! 2. one at the very start and one on the last frame of the video, so the
//!    book opens and closes with a real frame;
//! 3. timestamps closer than one frame apart are merged;
//! 4. uniformly spaced gap-fill screenshots wherever two neighbours are more
//!    than `max_gap` apart.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use picture_book::{SubtitleEntry, SubtitleTimeline, TimestampPlanner};
//!
//! let secs = Duration::from_secs;
//! let timeline = SubtitleTimeline::load(vec![
//!     SubtitleEntry::new(secs(1), secs(3), "a"),
//!     SubtitleEntry::new(secs(10), secs(12), "b"),
//! ])?;
//!
//! // One frame per second, at most five seconds between screenshots.
//! let planner = TimestampPlanner::new(secs(5), secs(1))?;
//! let times: Vec<f64> = planner
//!     .plan(&timeline, secs(15))
//!     .iter()
//!     .map(|capture| capture.time.as_secs_f64())
//!     .collect();
//! assert_eq!(times, [0.0, 2.0, 6.5, 11.0, 14.0]);
//! # Ok::<(), picture_book::PictureBookError>(())
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

use crate::conversion;
use crate::error::PictureBookError;
use crate::timeline::SubtitleTimeline;

const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// Why a timestamp was planned. Diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureReason {
    /// Middle of a subtitle's display window.
    SubtitleMidpoint,
    /// First frame of the video.
    VideoStart,
    /// Last frame of the video.
    VideoEnd,
    /// Inserted to keep consecutive screenshots within the maximum gap.
    GapFill,
}

impl Display for CaptureReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            CaptureReason::SubtitleMidpoint => write!(f, "subtitle-midpoint"),
            CaptureReason::VideoStart => write!(f, "video-start"),
            CaptureReason::VideoEnd => write!(f, "video-end"),
            CaptureReason::GapFill => write!(f, "gap-fill"),
        }
    }
}

/// A planned screenshot time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTimestamp {
    /// Offset from the start of the video.
    pub time: Duration,
    /// Why it was planned.
    pub reason: CaptureReason,
}

impl CaptureTimestamp {
    /// Create a capture timestamp.
    pub fn new(time: Duration, reason: CaptureReason) -> Self {
        Self { time, reason }
    }
}

/// Plans screenshot timestamps for a subtitle timeline.
#[derive(Debug, Clone, Copy)]
pub struct TimestampPlanner {
    max_gap: Duration,
    frame_period: Duration,
}

impl TimestampPlanner {
    /// Create a planner.
    ///
    /// `frame_period` is the length of one frame (`1 / fps`); timestamps
    /// closer together than that are treated as duplicates.
    ///
    /// # Errors
    ///
    /// - [`PictureBookError::InvalidConfiguration`] if `max_gap` is zero.
    /// - [`PictureBookError::FrameRateUnavailable`] if `frame_period` is zero.
    pub fn new(max_gap: Duration, frame_period: Duration) -> Result<Self, PictureBookError> {
        if max_gap.is_zero() {
            return Err(PictureBookError::InvalidConfiguration {
                key: "max_gap",
                reason: "must be greater than 0".to_string(),
            });
        }
        if frame_period.is_zero() {
            return Err(PictureBookError::FrameRateUnavailable(
                "frame period is zero".to_string(),
            ));
        }
        if max_gap < frame_period {
            log::warn!(
                "Maximum gap {:?} is shorter than one frame ({:?}); every frame will be captured",
                max_gap,
                frame_period
            );
        }
        Ok(Self {
            max_gap,
            frame_period,
        })
    }

    /// Create a planner for a video running at `frames_per_second`.
    ///
    /// # Errors
    ///
    /// Same as [`new`](TimestampPlanner::new); a non-positive rate yields a
    /// zero frame period.
    pub fn for_frame_rate(
        max_gap: Duration,
        frames_per_second: f64,
    ) -> Result<Self, PictureBookError> {
        Self::new(max_gap, conversion::frame_period(frames_per_second))
    }

    /// The maximum allowed gap between consecutive screenshots.
    pub fn max_gap(&self) -> Duration {
        self.max_gap
    }

    /// The length of one frame.
    pub fn frame_period(&self) -> Duration {
        self.frame_period
    }

    /// Plan the screenshots for `timeline` in a video of `video_duration`.
    ///
    /// The result is strictly increasing, lies within
    /// `[0, video_duration]`, and no two neighbours are more than `max_gap`
    /// apart.
    pub fn plan(&self, timeline: &SubtitleTimeline, video_duration: Duration) -> Vec<CaptureTimestamp> {
        let mut timestamps = Vec::with_capacity(timeline.len() + 2);
        timestamps.push(CaptureTimestamp::new(Duration::ZERO, CaptureReason::VideoStart));

        let mut beyond_end = 0_usize;
        for entry in timeline.entries() {
            if entry.start >= video_duration {
                beyond_end += 1;
                continue;
            }
            let end = entry.end.min(video_duration);
            let midpoint = entry.start + (end - entry.start) / 2;
            timestamps.push(CaptureTimestamp::new(midpoint, CaptureReason::SubtitleMidpoint));
        }
        if beyond_end > 0 {
            log::warn!(
                "{beyond_end} subtitle(s) start after the end of the video ({:.3}s) and were ignored",
                video_duration.as_secs_f64()
            );
        }

        timestamps.push(CaptureTimestamp::new(
            video_duration.saturating_sub(self.frame_period),
            CaptureReason::VideoEnd,
        ));

        timestamps.sort_by_key(|capture| capture.time);
        let before_merge = timestamps.len();
        let mut timestamps = merge_within(timestamps, self.frame_period);
        let merged = before_merge - timestamps.len();

        let mut passes = 0_usize;
        let mut gap_fills = 0_usize;
        loop {
            let (filled, inserted) = fill_gaps(&timestamps, self.max_gap);
            timestamps = filled;
            passes += 1;
            gap_fills += inserted;
            // The spacing is exact, so the second pass only confirms that no
            // gap is left above the maximum.
            if inserted == 0 {
                break;
            }
        }

        log::debug!(
            "Planned {} timestamps ({} merged, {} gap fills, {} passes)",
            timestamps.len(),
            merged,
            gap_fills,
            passes,
        );
        timestamps
    }
}

/// Drop timestamps closer than `frame_period` to the previously kept one.
///
/// Input must be sorted; the earliest timestamp of a cluster wins.
fn merge_within(timestamps: Vec<CaptureTimestamp>, frame_period: Duration) -> Vec<CaptureTimestamp> {
    let mut kept: Vec<CaptureTimestamp> = Vec::with_capacity(timestamps.len());
    for capture in timestamps {
        match kept.last() {
            Some(last) if capture.time - last.time < frame_period || capture.time == last.time => {}
            _ => kept.push(capture),
        }
    }
    kept
}

/// Insert uniformly spaced timestamps into every gap longer than `max_gap`.
///
/// A gap `g` between `a` and `b` receives `k = ceil(g / max_gap) - 1` points
/// at `a + i * g / (k + 1)`. Offsets are computed in whole nanoseconds from
/// `a`, so every resulting gap is at most `ceil(g / (k + 1)) <= max_gap`.
///
/// Returns the new sequence and the number of points inserted.
fn fill_gaps(timestamps: &[CaptureTimestamp], max_gap: Duration) -> (Vec<CaptureTimestamp>, usize) {
    let max_gap_nanos = max_gap.as_nanos();
    let mut filled = Vec::with_capacity(timestamps.len());
    let mut inserted = 0_usize;

    for (position, current) in timestamps.iter().enumerate() {
        filled.push(*current);
        let Some(next) = timestamps.get(position + 1) else {
            break;
        };

        let gap = (next.time - current.time).as_nanos();
        if gap <= max_gap_nanos {
            continue;
        }

        let segments = gap.div_ceil(max_gap_nanos);
        for step in 1..segments {
            let offset = duration_from_nanos(gap * step / segments);
            filled.push(CaptureTimestamp::new(current.time + offset, CaptureReason::GapFill));
        }
        inserted += (segments - 1) as usize;
    }

    (filled, inserted)
}

fn duration_from_nanos(nanos: u128) -> Duration {
    Duration::new(
        (nanos / NANOS_PER_SECOND) as u64,
        (nanos % NANOS_PER_SECOND) as u32,
    )
}
