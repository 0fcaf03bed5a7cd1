//! Running FFmpeg and checking what it wrote.
//!
//! The [`Transcoder`] trait is the seam between planning and the external
//! process: [`FfmpegTranscoder`] spawns the `ffmpeg` command line built by
//! [`ScreenshotInvocationPlan::command_arguments`], reports progress parsed
//! from `-progress pipe:1`, and turns a failed run into
//! [`PictureBookError::ExternalTool`]. [`verify_output`] then checks that
//! exactly the planned screenshots exist.

use std::collections::VecDeque;
use std::ffi::OsStr;
use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::PictureBookConfig;
use crate::error::PictureBookError;
use crate::ffmpeg::FfmpegLogLevel;
use crate::invocation::ScreenshotInvocationPlan;
use crate::progress::{ProgressCallback, ProgressTracker};

/// Lines of FFmpeg's stderr kept for error messages.
const STDERR_TAIL_LINES: usize = 20;

/// Executes a [`ScreenshotInvocationPlan`].
pub trait Transcoder {
    /// Write the screenshots of `plan` for `input` into `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`PictureBookError::ExternalTool`] if the tool cannot be
    /// started or fails.
    fn transcode(
        &self,
        plan: &ScreenshotInvocationPlan,
        input: &Path,
        output_dir: &Path,
        progress: Arc<dyn ProgressCallback>,
    ) -> Result<(), PictureBookError>;
}

/// Runs the `ffmpeg` executable.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
    log_level: FfmpegLogLevel,
    overwrite: bool,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::from_config(&PictureBookConfig::default())
    }
}

impl FfmpegTranscoder {
    /// Take program, log level and overwrite behaviour from `config`.
    pub fn from_config(config: &PictureBookConfig) -> Self {
        Self {
            program: config.ffmpeg_program.clone(),
            log_level: config.ffmpeg_log_level,
            overwrite: config.overwrite,
        }
    }

    /// The executable that will be run.
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn tool_error(&self, reason: String) -> PictureBookError {
        PictureBookError::ExternalTool {
            program: self.program.display().to_string(),
            reason,
        }
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(
        &self,
        plan: &ScreenshotInvocationPlan,
        input: &Path,
        output_dir: &Path,
        progress: Arc<dyn ProgressCallback>,
    ) -> Result<(), PictureBookError> {
        let arguments = plan.command_arguments(input, output_dir, self.log_level, self.overwrite);
        log::debug!(
            "Running {} with {} argument(s), filter expression {} bytes",
            self.program.display(),
            arguments.len(),
            plan.filter_expression().len(),
        );

        let mut child = Command::new(&self.program)
            .args(&arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|error| self.tool_error(format!("could not be started: {error}")))?;

        // stdout carries progress; stderr must be drained concurrently.
        let stderr_reader = child
            .stderr
            .take()
            .map(|stderr| thread::spawn(move || stderr_tail(stderr)));

        let mut tracker = ProgressTracker::new(progress, Some(plan.frame_count() as u64));
        if let Some(stdout) = child.stdout.take() {
            let mut frames_written = 0;
            let mut position = None;
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                match parse_progress_line(&line) {
                    Some(ProgressUpdate::Frame(frame)) => frames_written = frame,
                    Some(ProgressUpdate::OutTime(time)) => position = Some(time),
                    Some(ProgressUpdate::BlockEnd { finished }) => {
                        tracker.update(frames_written, position, finished);
                    }
                    None => {}
                }
            }
        }

        let status = child
            .wait()
            .map_err(|error| self.tool_error(format!("could not be waited on: {error}")))?;
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        tracker.finish();

        if !status.success() {
            let mut reason = format!("exited with {status}");
            if !stderr.is_empty() {
                reason.push_str(":\n");
                reason.push_str(&stderr);
            }
            return Err(self.tool_error(reason));
        }
        if !stderr.is_empty() {
            log::debug!("{} stderr:\n{stderr}", self.program.display());
        }
        log::info!("FFmpeg finished writing {} screenshot(s)", plan.frame_count());
        Ok(())
    }
}

/// Read `stream` to the end, keeping its last lines.
fn stderr_tail<R: Read>(stream: R) -> String {
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    for line in BufReader::new(stream).lines().map_while(Result::ok) {
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    Vec::from(tail).join("\n")
}

/// One interesting line of FFmpeg's `-progress` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressUpdate {
    /// `frame=N`: frames written so far.
    Frame(u64),
    /// `out_time_us=N`: position reached in the input.
    OutTime(Duration),
    /// `progress=continue|end`: the end of one progress block.
    BlockEnd {
        /// Whether this is the last block of the run.
        finished: bool,
    },
}

/// Parse a line of FFmpeg's `-progress` output.
///
/// Lines without a usable value (such as `out_time_us=N/A`) yield `None`.
///
/// ```
/// use std::time::Duration;
///
/// use picture_book::transcode::{ProgressUpdate, parse_progress_line};
///
/// assert_eq!(parse_progress_line("frame=42"), Some(ProgressUpdate::Frame(42)));
/// assert_eq!(
///     parse_progress_line("out_time_us=1500000"),
///     Some(ProgressUpdate::OutTime(Duration::from_millis(1500))),
/// );
/// assert_eq!(parse_progress_line("bitrate=N/A"), None);
/// ```
pub fn parse_progress_line(line: &str) -> Option<ProgressUpdate> {
    let (key, value) = line.trim().split_once('=')?;
    let value = value.trim();
    match key.trim() {
        "frame" => value.parse().ok().map(ProgressUpdate::Frame),
        "out_time_us" => value
            .parse::<u64>()
            .ok()
            .map(|micros| ProgressUpdate::OutTime(Duration::from_micros(micros))),
        "progress" => Some(ProgressUpdate::BlockEnd {
            finished: value == "end",
        }),
        _ => None,
    }
}

/// Check the output of a finished run.
///
/// Counts the files in `output_dir` that match the plan's output pattern and
/// reads each one's image header. Returns the screenshot paths in capture
/// order.
///
/// # Errors
///
/// - [`PictureBookError::OutputCountMismatch`] if the number of matching
///   files differs from the plan.
/// - [`PictureBookError::ImageError`] if a screenshot cannot be read.
pub fn verify_output(
    plan: &ScreenshotInvocationPlan,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, PictureBookError> {
    let produced = existing_screenshots(plan, output_dir)?;
    if produced.len() != plan.frame_count() {
        return Err(PictureBookError::OutputCountMismatch {
            expected: plan.frame_count(),
            actual: produced.len(),
        });
    }

    for path in &produced {
        let (width, height) = image::image_dimensions(path)?;
        log::trace!("{}: {width}x{height}", path.display());
    }
    log::debug!(
        "Verified {} screenshot(s) in {}",
        produced.len(),
        output_dir.display()
    );
    Ok(produced)
}

/// Files in `output_dir` that match the plan's output pattern, sorted.
///
/// A missing directory holds no screenshots.
///
/// # Errors
///
/// Returns [`PictureBookError::IoError`] if the directory cannot be read.
pub fn existing_screenshots(
    plan: &ScreenshotInvocationPlan,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, PictureBookError> {
    if !output_dir.exists() {
        return Ok(Vec::new());
    }

    let pattern = plan.output_pattern();
    let mut screenshots = Vec::new();
    for entry in fs::read_dir(output_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        if path
            .file_name()
            .and_then(OsStr::to_str)
            .is_some_and(|name| pattern.matches(name))
        {
            screenshots.push(path);
        }
    }
    screenshots.sort();
    Ok(screenshots)
}
