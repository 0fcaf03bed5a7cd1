//! Internal time and frame conversion helpers.
//!
//! Shared arithmetic between the planner, the frame-index mapper, and the
//! FFmpeg-backed probing code.

use std::time::Duration;

use ffmpeg_next::Rational;

/// Fraction of a frame by which a timestamp may fall short of a frame
/// boundary and still land on it. Covers the nanosecond rounding of
/// [`frame_period`] at NTSC rates such as 30000/1001.
const FRAME_BOUNDARY_TOLERANCE: f64 = 1e-6;

/// Convert a [`Duration`] to a frame number using the video's frame rate.
///
/// Rounds towards zero, i.e. `floor(t * fps)` for non-negative input.
pub(crate) fn timestamp_to_frame_number(timestamp: Duration, frames_per_second: f64) -> u64 {
    (timestamp.as_secs_f64() * frames_per_second + FRAME_BOUNDARY_TOLERANCE).floor() as u64
}

/// Length of a single frame at the given rate.
///
/// Returns [`Duration::ZERO`] for non-positive or non-finite rates.
pub(crate) fn frame_period(frames_per_second: f64) -> Duration {
    if frames_per_second.is_finite() && frames_per_second > 0.0 {
        Duration::from_secs_f64(1.0 / frames_per_second)
    } else {
        Duration::ZERO
    }
}

/// Convert an FFmpeg rational to a floating-point rate.
///
/// `None` when the denominator or numerator is zero (FFmpeg's "0/0").
pub(crate) fn rational_to_f64(rate: Rational) -> Option<f64> {
    if rate.numerator() == 0 || rate.denominator() == 0 {
        None
    } else {
        Some(rate.numerator() as f64 / rate.denominator() as f64)
    }
}

/// Rescale a PTS value from stream time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator().max(1) as f64
}

/// Number of decimal digits needed to print `count`.
///
/// Used for zero-padded output file names; `0` still needs one digit.
pub(crate) fn decimal_width(count: usize) -> usize {
    count.max(1).ilog10() as usize + 1
}
