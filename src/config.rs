//! Run configuration.
//!
//! [`PictureBookConfig`] is a single immutable record threaded through the
//! whole pipeline: planning reads the gap and format settings, the filter
//! builder reads the style, scale and grayscale settings, and the transcoder
//! reads the FFmpeg settings.
//!
//! # Example
//!
//! ```
//! use picture_book::{ImageFormat, PictureBookConfig};
//!
//! let config = PictureBookConfig::new()
//!     .with_max_gap_seconds(3.0)
//!     .with_image_format(ImageFormat::Png)
//!     .with_grayscale(true)
//!     .with_scale("800:-2");
//! config.validate()?;
//! # Ok::<(), picture_book::PictureBookError>(())
//! ```

use std::path::PathBuf;
use std::time::Duration;

use crate::error::PictureBookError;
use crate::ffmpeg::FfmpegLogLevel;
use crate::filter::StyleOverrides;
use crate::invocation::ImageFormat;

/// Best JPEG quality accepted by FFmpeg's `-q:v`.
pub const MIN_JPEG_QUALITY: u8 = 2;
/// Worst JPEG quality accepted by FFmpeg's `-q:v`.
pub const MAX_JPEG_QUALITY: u8 = 31;

/// Settings for one picture-book run.
///
/// Defaults: scale to 640 pixels wide keeping the aspect ratio, color, at
/// most 5 seconds between screenshots, best-quality JPEG, the video's own
/// default subtitle track, no overwriting, FFmpeg logging errors only.
#[derive(Debug, Clone, PartialEq)]
pub struct PictureBookConfig {
    /// ASS style overrides for the burned-in subtitles.
    pub style_overrides: StyleOverrides,
    /// Arguments of FFmpeg's `scale` filter. Empty disables scaling.
    pub scale: String,
    /// Convert screenshots to grayscale.
    pub grayscale: bool,
    /// Maximum number of seconds between two consecutive screenshots.
    pub max_gap_seconds: f64,
    /// Screenshot format.
    pub image_format: ImageFormat,
    /// JPEG quality, 2 (best) to 31 (worst). Ignored for PNG.
    pub quality: u8,
    /// Embedded subtitle track to use. `None` picks the video's default
    /// subtitle stream.
    pub subtitle_track: Option<usize>,
    /// Replace screenshots already in the output directory. They are
    /// removed before FFmpeg runs.
    pub overwrite: bool,
    /// Log level of the external `ffmpeg` process.
    pub ffmpeg_log_level: FfmpegLogLevel,
    /// The `ffmpeg` executable.
    pub ffmpeg_program: PathBuf,
}

impl Default for PictureBookConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PictureBookConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self {
            style_overrides: StyleOverrides::new(),
            scale: "640:-1".to_string(),
            grayscale: false,
            max_gap_seconds: 5.0,
            image_format: ImageFormat::Jpeg,
            quality: MIN_JPEG_QUALITY,
            subtitle_track: None,
            overwrite: false,
            ffmpeg_log_level: FfmpegLogLevel::Error,
            ffmpeg_program: PathBuf::from("ffmpeg"),
        }
    }

    /// Set the subtitle style overrides.
    #[must_use]
    pub fn with_style_overrides(mut self, overrides: StyleOverrides) -> Self {
        self.style_overrides = overrides;
        self
    }

    /// Set the `scale` filter arguments; an empty string disables scaling.
    #[must_use]
    pub fn with_scale(mut self, scale: impl Into<String>) -> Self {
        self.scale = scale.into();
        self
    }

    /// Convert screenshots to grayscale.
    #[must_use]
    pub fn with_grayscale(mut self, grayscale: bool) -> Self {
        self.grayscale = grayscale;
        self
    }

    /// Set the maximum gap between screenshots, in seconds.
    #[must_use]
    pub fn with_max_gap_seconds(mut self, seconds: f64) -> Self {
        self.max_gap_seconds = seconds;
        self
    }

    /// Set the screenshot format.
    #[must_use]
    pub fn with_image_format(mut self, format: ImageFormat) -> Self {
        self.image_format = format;
        self
    }

    /// Set the JPEG quality (2 best to 31 worst).
    #[must_use]
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Use a specific embedded subtitle track.
    #[must_use]
    pub fn with_subtitle_track(mut self, track: Option<usize>) -> Self {
        self.subtitle_track = track;
        self
    }

    /// Overwrite existing output files.
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set the log level of the `ffmpeg` process.
    #[must_use]
    pub fn with_ffmpeg_log_level(mut self, level: FfmpegLogLevel) -> Self {
        self.ffmpeg_log_level = level;
        self
    }

    /// Use a different `ffmpeg` executable.
    #[must_use]
    pub fn with_ffmpeg_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.ffmpeg_program = program.into();
        self
    }

    /// The maximum gap as a [`Duration`].
    ///
    /// # Errors
    ///
    /// Returns [`PictureBookError::InvalidConfiguration`] with key
    /// `"max_gap"` unless the value is finite and greater than zero.
    pub fn max_gap(&self) -> Result<Duration, PictureBookError> {
        let seconds = self.max_gap_seconds;
        let invalid = |reason: String| PictureBookError::InvalidConfiguration {
            key: "max_gap",
            reason,
        };
        if seconds.is_nan() || seconds <= 0.0 {
            return Err(invalid(format!("must be greater than 0, got {seconds}")));
        }
        if !seconds.is_finite() {
            return Err(invalid("must be finite".to_string()));
        }
        let max_gap = Duration::try_from_secs_f64(seconds)
            .map_err(|_| invalid(format!("{seconds}s is too large")))?;
        if max_gap.is_zero() {
            return Err(invalid(format!("{seconds}s is shorter than a nanosecond")));
        }
        Ok(max_gap)
    }

    /// Check every setting.
    ///
    /// # Errors
    ///
    /// Returns [`PictureBookError::InvalidConfiguration`] naming the first
    /// offending key (`"quality"` or `"max_gap"`).
    pub fn validate(&self) -> Result<(), PictureBookError> {
        if !(MIN_JPEG_QUALITY..=MAX_JPEG_QUALITY).contains(&self.quality) {
            return Err(PictureBookError::InvalidConfiguration {
                key: "quality",
                reason: format!(
                    "must be between {MIN_JPEG_QUALITY} and {MAX_JPEG_QUALITY}, got {}",
                    self.quality
                ),
            });
        }
        self.max_gap()?;
        Ok(())
    }
}
