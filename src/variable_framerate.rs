//! Variable frame rate (VFR) detection.
//!
//! Screenshots are selected by frame number, which only maps cleanly onto
//! time when frames are evenly spaced. [`VariableFrameRateAnalysis`] scans
//! the packet timestamps of the video stream so that variable-frame-rate
//! input can be rejected before anything is planned.
//!
//! # Example
//!
//! ```no_run
//! use picture_book::{MediaFile, PictureBookError};
//!
//! let mut media = MediaFile::open("input.mp4")?;
//! let analysis = media.analyze_variable_framerate()?;
//! if analysis.is_vfr {
//!     println!("VFR detected: {:.2}–{:.2} fps", analysis.min_fps, analysis.max_fps);
//! }
//! # Ok::<(), PictureBookError>(())
//! ```

use ffmpeg_next::{Error as FfmpegError, Packet};

use crate::conversion;
use crate::error::PictureBookError;
use crate::media::MediaFile;

/// Relative standard deviation of frame durations above which a stream
/// counts as variable frame rate.
pub const VFR_THRESHOLD: f64 = 0.10;

/// Results of VFR analysis on a video stream.
#[derive(Debug, Clone, Default)]
pub struct VariableFrameRateAnalysis {
    /// Whether the stream appears to be variable frame rate.
    pub is_vfr: bool,
    /// Mean frame duration in seconds.
    pub mean_frame_duration: f64,
    /// Standard deviation of frame durations in seconds.
    pub frame_duration_stddev: f64,
    /// Minimum instantaneous FPS observed.
    pub min_fps: f64,
    /// Maximum instantaneous FPS observed.
    pub max_fps: f64,
    /// Mean FPS (1 / mean_frame_duration).
    pub mean_fps: f64,
    /// Number of packets analyzed.
    pub frames_analyzed: u64,
}

impl VariableFrameRateAnalysis {
    /// Analyze presentation timestamps given in seconds, in any order.
    ///
    /// Fewer than two distinct timestamps are treated as constant.
    pub fn from_timestamps(mut seconds: Vec<f64>) -> Self {
        seconds.sort_unstable_by(f64::total_cmp);
        let frames_analyzed = seconds.len() as u64;

        let durations: Vec<f64> = seconds
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .filter(|&duration| duration > 0.0)
            .collect();

        if durations.is_empty() {
            return Self {
                frames_analyzed,
                ..Self::default()
            };
        }

        let mean = durations.iter().sum::<f64>() / durations.len() as f64;
        let variance = durations
            .iter()
            .map(|duration| (duration - mean).powi(2))
            .sum::<f64>()
            / durations.len() as f64;
        let stddev = variance.sqrt();

        let min_duration = durations.iter().copied().fold(f64::INFINITY, f64::min);
        let max_duration = durations.iter().copied().fold(0.0_f64, f64::max);
        let max_fps = 1.0 / min_duration;
        let min_fps = 1.0 / max_duration;
        // 1/mean can land a hair outside [min, max] through rounding.
        let mean_fps = (1.0 / mean).clamp(min_fps, max_fps);

        Self {
            is_vfr: stddev / mean > VFR_THRESHOLD,
            mean_frame_duration: mean,
            frame_duration_stddev: stddev,
            min_fps,
            max_fps,
            mean_fps,
            frames_analyzed,
        }
    }
}

/// Collect the PTS of every packet of `video_stream_index` and analyze them.
pub(crate) fn analyze_variable_framerate_impl(
    media: &mut MediaFile,
    video_stream_index: usize,
) -> Result<VariableFrameRateAnalysis, PictureBookError> {
    log::debug!("Analyzing frame timing (stream={video_stream_index})");
    let time_base = media
        .input_context
        .stream(video_stream_index)
        .ok_or(PictureBookError::NoVideoStream)?
        .time_base();

    media.rewind();
    let mut seconds = Vec::new();
    let mut packet = Packet::empty();
    loop {
        match packet.read(&mut media.input_context) {
            Ok(()) => {
                if packet.stream() != video_stream_index {
                    continue;
                }
                if let Some(pts) = packet.pts() {
                    seconds.push(conversion::pts_to_seconds(pts, time_base));
                }
            }
            Err(FfmpegError::Eof) => break,
            Err(error) => return Err(PictureBookError::from(error)),
        }
    }
    media.rewind();

    let analysis = VariableFrameRateAnalysis::from_timestamps(seconds);
    log::debug!(
        "Frame timing: {} packets, mean {:.3} fps, stddev/mean {:.4}, vfr={}",
        analysis.frames_analyzed,
        analysis.mean_fps,
        if analysis.mean_frame_duration > 0.0 {
            analysis.frame_duration_stddev / analysis.mean_frame_duration
        } else {
            0.0
        },
        analysis.is_vfr,
    );
    Ok(analysis)
}
