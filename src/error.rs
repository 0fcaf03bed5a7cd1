//! Error types for the `picture-book` crate.
//!
//! This module defines [`PictureBookError`], the unified error type returned
//! by every fallible operation in the crate. Planning errors
//! ([`InvalidSubtitle`](PictureBookError::InvalidSubtitle),
//! [`InvalidConfiguration`](PictureBookError::InvalidConfiguration),
//! [`FrameRateUnavailable`](PictureBookError::FrameRateUnavailable)) are
//! raised before FFmpeg is ever started; the transcoder errors
//! ([`ExternalTool`](PictureBookError::ExternalTool),
//! [`OutputCountMismatch`](PictureBookError::OutputCountMismatch)) only after
//! the single FFmpeg run has returned.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `picture-book` operations.
///
/// Variants carry enough context (the offending subtitle index, the invalid
/// configuration key, or FFmpeg's own diagnostic) to act on the failure
/// without additional logging at the call site.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PictureBookError {
    /// A subtitle entry has inconsistent timing.
    #[error("Invalid subtitle #{index}: {reason}")]
    InvalidSubtitle {
        /// Zero-based position of the entry in the loaded sequence.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// A configuration value is out of range or malformed.
    #[error("Invalid configuration for `{key}`: {reason}")]
    InvalidConfiguration {
        /// Name of the offending setting (e.g. `"max_gap"`, `"quality"`).
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The video has no usable constant frame rate.
    #[error("Frame rate unavailable: {0}")]
    FrameRateUnavailable(String),

    /// The external transcoding process failed to start or exited with an
    /// error.
    #[error("{program} failed: {reason}")]
    ExternalTool {
        /// Program that was invoked.
        program: String,
        /// Exit status and the tail of the tool's diagnostic output.
        reason: String,
    },

    /// The transcoder reported success but the output directory does not
    /// hold the planned number of screenshots.
    #[error("Expected {expected} screenshot(s) but found {actual}")]
    OutputCountMismatch {
        /// Number of frames in the plan.
        expected: usize,
        /// Number of matching files actually produced.
        actual: usize,
    },

    /// The output directory already holds screenshots and overwriting is
    /// disabled.
    #[error("{} already contains {count} screenshot(s); enable overwrite to replace them", .path.display())]
    OutputExists {
        /// The output directory.
        path: PathBuf,
        /// Number of matching files found.
        count: usize,
    },

    /// The media file could not be opened.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::MediaFile::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// The video stream reports zero frames.
    #[error("Video has no frames")]
    EmptyVideo,

    /// The file does not contain a subtitle stream.
    #[error("No subtitle stream found in file")]
    NoSubtitleStream,

    /// Subtitle data could not be decoded.
    #[error("Failed to decode subtitle: {0}")]
    SubtitleDecodeError(String),

    /// A SubRip file could not be parsed.
    #[error("Malformed SubRip data at line {line}: {reason}")]
    SubtitleParse {
        /// One-based line number.
        line: usize,
        /// What could not be parsed.
        reason: String,
    },

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// A produced screenshot could not be read back.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),
}

impl From<FfmpegError> for PictureBookError {
    fn from(error: FfmpegError) -> Self {
        PictureBookError::FfmpegError(error.to_string())
    }
}
