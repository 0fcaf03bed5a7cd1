//! # picture-book
//!
//! Turn a subtitled video into a picture book: one screenshot per line of
//! dialogue, with the subtitle burned in, plus evenly spaced screenshots
//! wherever nobody speaks for a while.
//!
//! `picture-book` decides **which frames** to capture and compiles that
//! selection into a single FFmpeg filter chain, so one `ffmpeg` run writes
//! every screenshot, numbered in capture order. Media probing and subtitle
//! decoding use FFmpeg through the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate.
//!
//! ## Quick Start
//!
//! ### Render a Picture Book
//!
//! ```no_run
//! use picture_book::{PictureBook, PictureBookConfig};
//!
//! let book = PictureBook::new(PictureBookConfig::default());
//! let screenshots = book.render("episode.mkv", "book/").unwrap();
//! println!("{} screenshots", screenshots.len());
//! ```
//!
//! ### Plan Without Running FFmpeg
//!
//! ```
//! use std::time::Duration;
//!
//! use picture_book::{PictureBook, PictureBookConfig, SubtitleEntry, VideoProperties};
//!
//! let book = PictureBook::new(PictureBookConfig::default().with_scale(""));
//! let video = VideoProperties::constant(Duration::from_secs(15), 1.0);
//! let subtitles = vec![
//!     SubtitleEntry::new(Duration::from_secs(1), Duration::from_secs(3), "Hello"),
//!     SubtitleEntry::new(Duration::from_secs(10), Duration::from_secs(12), "Goodbye"),
//! ];
//!
//! let plan = book.plan(subtitles, &video, None).unwrap();
//! assert_eq!(plan.frame_indices(), [0, 2, 6, 11, 14]);
//! assert_eq!(
//!     plan.filter_expression().as_str(),
//!     r"select=eq(n\,0)+eq(n\,2)+eq(n\,6)+eq(n\,11)+eq(n\,14)",
//! );
//! assert_eq!(plan.expected_file_names()[0], "1.jpg");
//! ```
//!
//! ## Features
//!
//! - **Subtitle-driven selection**: one screenshot in the middle of every
//!   subtitle, plus the first and last frame
//! - **Gap filling**: uniformly spaced extra screenshots keep consecutive
//!   captures at most `max_gap` apart
//! - **Single FFmpeg run**: frame selection, subtitle burn-in, scaling and
//!   grayscale in one filter chain
//! - **Subtitle sources**: the video's own subtitle streams (any track), SubRip
//!   files, or any subtitle file FFmpeg can decode
//! - **Output checks**: the screenshot count and every image header are
//!   verified after the run
//! - **Dry runs**: inspect the plan, its frames and its filter chain before
//!   anything is written
//!
//! Only constant-frame-rate video is supported; variable frame rate is
//! detected and rejected.

pub mod config;
mod conversion;
pub mod error;
pub mod ffmpeg;
pub mod filter;
pub mod frame_index;
pub mod invocation;
pub mod media;
pub mod metadata;
pub mod picture_book;
pub mod planner;
pub mod progress;
pub mod subtitle;
pub mod timeline;
pub mod transcode;
pub mod validation;
pub mod variable_framerate;

pub use config::PictureBookConfig;
pub use error::PictureBookError;
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use filter::{
    EXPRESSION_LENGTH_WARNING_THRESHOLD, FilterExpression, FilterExpressionBuilder, StyleOverrides,
};
pub use frame_index::{FrameIndexMapper, to_frame_indices};
pub use invocation::{ImageFormat, OutputPattern, ScreenshotInvocationPlan};
pub use media::MediaFile;
pub use metadata::{FrameRate, MediaMetadata, SubtitleTrackMetadata, VideoMetadata, VideoProperties};
pub use picture_book::{PictureBook, PreparedPlan};
pub use planner::{CaptureReason, CaptureTimestamp, TimestampPlanner};
pub use progress::{NoOpProgress, ProgressCallback, ProgressInfo};
pub use subtitle::{SubtitleEntry, SubtitleHandle, SubtitleSource, load_subtitle_file, parse_srt};
pub use timeline::SubtitleTimeline;
pub use transcode::{FfmpegTranscoder, Transcoder, existing_screenshots, verify_output};
pub use validation::PlanReport;
pub use variable_framerate::VariableFrameRateAnalysis;
