//! Media metadata types.
//!
//! [`MediaMetadata`] is extracted once when a [`MediaFile`](crate::MediaFile)
//! is opened. The planning pipeline itself only needs the three scalars
//! gathered in [`VideoProperties`], which callers may also build by hand.

use std::time::Duration;

use crate::error::PictureBookError;

/// Complete metadata for a media file.
///
/// # Example
///
/// ```no_run
/// use picture_book::MediaFile;
///
/// let media = MediaFile::open("input.mkv").unwrap();
/// let metadata = media.metadata();
/// println!("Duration: {:?}", metadata.duration);
/// println!("Subtitle tracks: {}", metadata.subtitle_tracks.len());
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct MediaMetadata {
    /// Metadata of the best video stream, if the file has one.
    pub video: Option<VideoMetadata>,
    /// All subtitle streams, in track order.
    pub subtitle_tracks: Vec<SubtitleTrackMetadata>,
    /// Container-level duration.
    pub duration: Duration,
    /// Container format name (e.g. `"matroska,webm"`, `"mov,mp4,m4a,3gp,3g2,mj2"`).
    pub format: String,
}

/// Metadata for a video stream.
#[derive(Debug, Clone)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Average frames per second as reported by the container; `0.0` when
    /// unknown.
    pub frames_per_second: f64,
    /// Frame count from the stream header, or estimated from duration and
    /// frame rate when the header does not carry one.
    pub frame_count: u64,
    /// Codec name (e.g. `"h264"`).
    pub codec: String,
    /// Index of the stream within the container.
    pub stream_index: usize,
}

/// Metadata for a subtitle stream.
#[derive(Debug, Clone)]
#[must_use]
pub struct SubtitleTrackMetadata {
    /// Codec name (e.g. `"subrip"`, `"ass"`, `"hdmv_pgs_subtitle"`).
    pub codec: String,
    /// Language tag, if present.
    pub language: Option<String>,
    /// Zero-based position among the file's subtitle streams. This is the
    /// value FFmpeg's `subtitles` filter expects for its `si` option.
    pub track_index: usize,
    /// Index of the stream within the container.
    pub stream_index: usize,
}

/// Frame rate of a video stream, as far as it could be established.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameRate {
    /// Frames are evenly spaced at this many frames per second.
    Constant(f64),
    /// Frame durations vary; `mean_fps` is informational only.
    Variable {
        /// Mean instantaneous frame rate.
        mean_fps: f64,
    },
    /// The container does not report a frame rate.
    Unknown,
}

impl FrameRate {
    /// The constant rate in frames per second.
    ///
    /// # Errors
    ///
    /// Returns [`PictureBookError::FrameRateUnavailable`] for variable or
    /// unknown rates, and for non-positive constant rates.
    pub fn constant(&self) -> Result<f64, PictureBookError> {
        match *self {
            FrameRate::Constant(fps) if fps.is_finite() && fps > 0.0 => Ok(fps),
            FrameRate::Constant(fps) => Err(PictureBookError::FrameRateUnavailable(format!(
                "invalid frame rate {fps}"
            ))),
            FrameRate::Variable { mean_fps } => {
                Err(PictureBookError::FrameRateUnavailable(format!(
                    "video has a variable frame rate (mean {mean_fps:.3} fps); only constant frame rates are supported"
                )))
            }
            FrameRate::Unknown => Err(PictureBookError::FrameRateUnavailable(
                "the container does not report a frame rate".to_string(),
            )),
        }
    }
}

/// The scalar video facts the screenshot planner needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoProperties {
    /// Total duration of the video.
    pub duration: Duration,
    /// Frame rate of the video stream.
    pub frame_rate: FrameRate,
    /// Total number of frames.
    pub frame_count: u64,
}

impl VideoProperties {
    /// Describe a constant-frame-rate video, deriving the frame count from
    /// duration and rate.
    pub fn constant(duration: Duration, frames_per_second: f64) -> Self {
        let frame_count = (duration.as_secs_f64() * frames_per_second).round().max(0.0) as u64;
        Self {
            duration,
            frame_rate: FrameRate::Constant(frames_per_second),
            frame_count,
        }
    }
}
