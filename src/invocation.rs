//! The plan handed to the transcoder.
//!
//! A [`ScreenshotInvocationPlan`] holds everything the single FFmpeg run
//! needs: the selected frames, the compiled filter chain, the output naming
//! pattern, and the encoder settings. Building it does no I/O; the plan can
//! be inspected, printed, or turned into a command line.

use std::ffi::OsString;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use std::str::FromStr;

use crate::config::PictureBookConfig;
use crate::conversion;
use crate::error::PictureBookError;
use crate::ffmpeg::FfmpegLogLevel;
use crate::filter::{FilterExpression, FilterExpressionBuilder, StyleOverrides};
use crate::planner::CaptureTimestamp;
use crate::subtitle::SubtitleSource;
use crate::validation::{PlanReport, report_for_plan};

/// Screenshot file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageFormat {
    /// Lossy JPEG; quality set with FFmpeg's `-q:v`.
    #[default]
    Jpeg,
    /// Lossless PNG.
    Png,
}

impl ImageFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        self.to_image_format()
            .extensions_str()
            .first()
            .copied()
            .unwrap_or(match self {
                ImageFormat::Jpeg => "jpg",
                ImageFormat::Png => "png",
            })
    }

    /// The matching [`image::ImageFormat`], used to check produced files.
    pub fn to_image_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
        }
    }

    /// Whether the format is lossy.
    pub fn is_lossy(self) -> bool {
        matches!(self, ImageFormat::Jpeg)
    }
}

impl Display for ImageFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.extension())
    }
}

impl FromStr for ImageFormat {
    type Err = PictureBookError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
            "png" => Ok(ImageFormat::Png),
            other => Err(PictureBookError::InvalidConfiguration {
                key: "image_format",
                reason: format!("unsupported format '{other}' (expected jpg or png)"),
            }),
        }
    }
}

/// Zero-padded, one-based output file naming (`%0Nd.ext`).
///
/// `N` is the number of decimal digits of the screenshot count, so file
/// names sort lexicographically in capture order.
///
/// ```
/// use picture_book::{ImageFormat, OutputPattern};
///
/// let pattern = OutputPattern::new(120, ImageFormat::Jpeg);
/// assert_eq!(pattern.to_string(), "%03d.jpg");
/// assert_eq!(pattern.file_name(7), "007.jpg");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPattern {
    /// Minimum number of digits in a file name.
    pub digits: usize,
    /// File extension without the dot.
    pub extension: &'static str,
}

impl OutputPattern {
    /// Pattern for `frame_count` screenshots.
    pub fn new(frame_count: usize, format: ImageFormat) -> Self {
        Self {
            digits: conversion::decimal_width(frame_count),
            extension: format.extension(),
        }
    }

    /// File name of the `number`-th screenshot (one-based).
    pub fn file_name(&self, number: usize) -> String {
        format!("{number:0width$}.{ext}", width = self.digits, ext = self.extension)
    }

    /// Whether `file_name` could have been produced by this pattern.
    pub fn matches(&self, file_name: &str) -> bool {
        let Some((stem, extension)) = file_name.rsplit_once('.') else {
            return false;
        };
        extension == self.extension
            && stem.len() >= self.digits
            && stem.bytes().all(|byte| byte.is_ascii_digit())
    }
}

impl Display for OutputPattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "%0{}d.{}", self.digits, self.extension)
    }
}

/// Everything one FFmpeg run needs to write the screenshots.
#[derive(Debug, Clone)]
pub struct ScreenshotInvocationPlan {
    timestamps: Vec<CaptureTimestamp>,
    frame_indices: Vec<u64>,
    filter_expression: FilterExpression,
    output_pattern: OutputPattern,
    image_format: ImageFormat,
    quality: u8,
    grayscale: bool,
    style_overrides: StyleOverrides,
    subtitle_source: Option<SubtitleSource>,
}

impl ScreenshotInvocationPlan {
    /// Assemble a plan from planned timestamps and their frame indices.
    ///
    /// Grayscale JPEGs get a `format=gray` filter stage; grayscale PNGs are
    /// written single-channel with `-pix_fmt gray` instead.
    pub fn new(
        timestamps: Vec<CaptureTimestamp>,
        frame_indices: Vec<u64>,
        subtitle_source: Option<SubtitleSource>,
        config: &PictureBookConfig,
    ) -> Self {
        let filter_expression = FilterExpressionBuilder::new(&frame_indices)
            .subtitles(subtitle_source.as_ref())
            .style_overrides(&config.style_overrides)
            .scale(&config.scale)
            .grayscale(config.grayscale && config.image_format.is_lossy())
            .build();
        let output_pattern = OutputPattern::new(frame_indices.len(), config.image_format);

        Self {
            timestamps,
            frame_indices,
            filter_expression,
            output_pattern,
            image_format: config.image_format,
            quality: config.quality,
            grayscale: config.grayscale,
            style_overrides: config.style_overrides.clone(),
            subtitle_source,
        }
    }

    /// Planned timestamps, including those that share a frame.
    pub fn timestamps(&self) -> &[CaptureTimestamp] {
        &self.timestamps
    }

    /// Selected frames, strictly increasing.
    pub fn frame_indices(&self) -> &[u64] {
        &self.frame_indices
    }

    /// Number of screenshots the run will write.
    pub fn frame_count(&self) -> usize {
        self.frame_indices.len()
    }

    /// The `-vf` chain.
    pub fn filter_expression(&self) -> &FilterExpression {
        &self.filter_expression
    }

    /// Output file naming.
    pub fn output_pattern(&self) -> &OutputPattern {
        &self.output_pattern
    }

    /// Screenshot format.
    pub fn image_format(&self) -> ImageFormat {
        self.image_format
    }

    /// JPEG quality (2 best to 31 worst).
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Whether screenshots are grayscale.
    pub fn grayscale(&self) -> bool {
        self.grayscale
    }

    /// Subtitle style overrides.
    pub fn style_overrides(&self) -> &StyleOverrides {
        &self.style_overrides
    }

    /// Where burned-in subtitles come from.
    pub fn subtitle_source(&self) -> Option<&SubtitleSource> {
        self.subtitle_source.as_ref()
    }

    /// File names the run is expected to produce, in capture order.
    pub fn expected_file_names(&self) -> Vec<String> {
        (1..=self.frame_count())
            .map(|number| self.output_pattern.file_name(number))
            .collect()
    }

    /// Arguments for the `ffmpeg` command line (program name excluded).
    pub fn command_arguments(
        &self,
        input: &Path,
        output_dir: &Path,
        log_level: FfmpegLogLevel,
        overwrite: bool,
    ) -> Vec<OsString> {
        let overwrite_flag = if overwrite { "-y" } else { "-n" };
        let mut arguments: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-nostdin".into(),
            "-loglevel".into(),
            log_level.as_cli_arg().into(),
            overwrite_flag.into(),
            "-i".into(),
            input.as_os_str().to_owned(),
            // Only pass the selected frames through, without duplicating
            // them to keep a constant output rate.
            "-fps_mode".into(),
            "vfr".into(),
            "-vf".into(),
            self.filter_expression.as_str().into(),
        ];

        match self.image_format {
            ImageFormat::Jpeg => {
                arguments.push("-q:v".into());
                arguments.push(self.quality.to_string().into());
            }
            ImageFormat::Png if self.grayscale => {
                arguments.push("-pix_fmt".into());
                arguments.push("gray".into());
            }
            ImageFormat::Png => {}
        }

        arguments.extend([
            "-start_number".into(),
            "1".into(),
            "-progress".into(),
            "pipe:1".into(),
            "-nostats".into(),
            output_dir
                .join(self.output_pattern.to_string())
                .into_os_string(),
        ]);
        arguments
    }

    /// Diagnostic summary of the plan.
    pub fn report(&self) -> PlanReport {
        report_for_plan(self)
    }
}
