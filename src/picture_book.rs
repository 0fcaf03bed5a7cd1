//! The picture-book pipeline.
//!
//! [`PictureBook`] ties the stages together: probe the video, load its
//! subtitles, plan the capture timestamps, map them onto frames, build the
//! filter chain, run FFmpeg once, and verify the screenshots it wrote.
//!
//! The planning half is available without touching the file system through
//! [`PictureBook::plan`], which works from plain [`SubtitleEntry`] values
//! and [`VideoProperties`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::PictureBookConfig;
use crate::error::PictureBookError;
use crate::frame_index::FrameIndexMapper;
use crate::invocation::ScreenshotInvocationPlan;
use crate::media::MediaFile;
use crate::metadata::VideoProperties;
use crate::planner::TimestampPlanner;
use crate::progress::{NoOpProgress, ProgressCallback};
use crate::subtitle::{SubtitleEntry, SubtitleSource, load_subtitle_file};
use crate::timeline::SubtitleTimeline;
use crate::transcode::{FfmpegTranscoder, Transcoder, existing_screenshots, verify_output};

/// A plan together with the facts it was derived from.
#[derive(Debug, Clone)]
pub struct PreparedPlan {
    /// Probed video properties.
    pub video: VideoProperties,
    /// Number of subtitle entries loaded, before normalization.
    pub subtitle_count: usize,
    /// The screenshot plan.
    pub plan: ScreenshotInvocationPlan,
}

/// Turns a subtitled video into a directory of screenshots.
///
/// # Example
///
/// ```no_run
/// use picture_book::{PictureBook, PictureBookConfig};
///
/// let config = PictureBookConfig::new().with_max_gap_seconds(4.0);
/// let screenshots = PictureBook::new(config).render("episode.mkv", "book/")?;
/// println!("wrote {} screenshots", screenshots.len());
/// # Ok::<(), picture_book::PictureBookError>(())
/// ```
pub struct PictureBook<T: Transcoder = FfmpegTranscoder> {
    config: PictureBookConfig,
    transcoder: T,
    progress: Arc<dyn ProgressCallback>,
}

impl PictureBook<FfmpegTranscoder> {
    /// Create a pipeline that runs the `ffmpeg` executable named in
    /// `config`.
    pub fn new(config: PictureBookConfig) -> Self {
        let transcoder = FfmpegTranscoder::from_config(&config);
        Self {
            config,
            transcoder,
            progress: Arc::new(NoOpProgress),
        }
    }
}

impl<T: Transcoder> PictureBook<T> {
    /// Replace the transcoder.
    #[must_use]
    pub fn with_transcoder<U: Transcoder>(self, transcoder: U) -> PictureBook<U> {
        PictureBook {
            config: self.config,
            transcoder,
            progress: self.progress,
        }
    }

    /// Attach a progress callback for the FFmpeg run.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// The configuration.
    pub fn config(&self) -> &PictureBookConfig {
        &self.config
    }

    /// Plan the screenshots for `subtitles` in a video described by
    /// `video`. No I/O.
    ///
    /// `subtitle_source` is where FFmpeg will read the subtitles to burn in;
    /// `None` renders screenshots without subtitles.
    ///
    /// # Errors
    ///
    /// - [`PictureBookError::InvalidConfiguration`] for invalid settings.
    /// - [`PictureBookError::FrameRateUnavailable`] unless the video has a
    ///   constant frame rate.
    /// - [`PictureBookError::InvalidSubtitle`] for an entry whose start is not
    ///   before its end.
    /// - [`PictureBookError::EmptyVideo`] if the video has no frames.
    pub fn plan<I>(
        &self,
        subtitles: I,
        video: &VideoProperties,
        subtitle_source: Option<SubtitleSource>,
    ) -> Result<ScreenshotInvocationPlan, PictureBookError>
    where
        I: IntoIterator<Item = SubtitleEntry>,
    {
        self.config.validate()?;
        let frames_per_second = video.frame_rate.constant()?;
        let planner = TimestampPlanner::for_frame_rate(self.config.max_gap()?, frames_per_second)?;
        let mapper = FrameIndexMapper::new(&video.frame_rate, video.frame_count)?;

        let timeline = SubtitleTimeline::load(subtitles)?;
        let timestamps = planner.plan(&timeline, video.duration);
        let frame_indices = mapper.to_frame_indices(&timestamps);

        Ok(ScreenshotInvocationPlan::new(
            timestamps,
            frame_indices,
            subtitle_source,
            &self.config,
        ))
    }

    /// Probe `video`, load its subtitles, and plan. Does not run FFmpeg.
    ///
    /// With `subtitles` set, entries come from that file (`.srt` parsed
    /// directly, anything else decoded with FFmpeg); otherwise from the
    /// configured embedded track, or the video's default subtitle stream.
    ///
    /// # Errors
    ///
    /// Everything [`plan`](PictureBook::plan) returns, plus
    /// [`PictureBookError::FileOpen`], [`PictureBookError::NoVideoStream`],
    /// [`PictureBookError::NoSubtitleStream`] and subtitle decoding errors.
    pub fn prepare<P: AsRef<Path>>(
        &self,
        video: P,
        subtitles: Option<&Path>,
    ) -> Result<PreparedPlan, PictureBookError> {
        let video = video.as_ref();
        self.config.validate()?;

        let mut media = MediaFile::open(video)?;
        let properties = media.video_properties()?;
        log::info!(
            "Video {}: {:.3}s, {:?}, {} frames",
            video.display(),
            properties.duration.as_secs_f64(),
            properties.frame_rate,
            properties.frame_count,
        );

        let (entries, source) = match subtitles {
            Some(path) => {
                if self.config.subtitle_track.is_some() {
                    log::warn!("Subtitle track ignored; subtitles come from {}", path.display());
                }
                (load_subtitle_file(path)?, SubtitleSource::File(path.to_path_buf()))
            }
            None => {
                let track_index = match self.config.subtitle_track {
                    Some(track_index) => track_index,
                    None => media
                        .default_subtitle_track()
                        .ok_or(PictureBookError::NoSubtitleStream)?,
                };
                let entries = media.subtitle_track(track_index)?.extract()?;
                let source = SubtitleSource::Embedded {
                    video: video.to_path_buf(),
                    track_index,
                };
                (entries, source)
            }
        };
        let subtitle_count = entries.len();
        log::info!("Loaded {subtitle_count} subtitle(s)");

        let plan = self.plan(entries, &properties, Some(source))?;
        Ok(PreparedPlan {
            video: properties,
            subtitle_count,
            plan,
        })
    }

    /// Run `plan` against `video` and verify the output.
    ///
    /// Creates `output_dir` if needed. With overwriting enabled, files named
    /// like screenshots are removed from it before FFmpeg runs. Returns the
    /// screenshot paths in capture order.
    ///
    /// # Errors
    ///
    /// - [`PictureBookError::OutputExists`] if `output_dir` already holds
    ///   files named like screenshots and overwriting is disabled.
    /// - [`PictureBookError::IoError`] if the output directory cannot be
    ///   created or read, or an old screenshot cannot be removed.
    /// - [`PictureBookError::ExternalTool`] if FFmpeg fails.
    /// - [`PictureBookError::OutputCountMismatch`] if FFmpeg wrote a
    ///   different number of screenshots than planned.
    pub fn execute(
        &self,
        plan: &ScreenshotInvocationPlan,
        video: &Path,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, PictureBookError> {
        let existing = existing_screenshots(plan, output_dir)?;
        if !existing.is_empty() {
            if !self.config.overwrite {
                return Err(PictureBookError::OutputExists {
                    path: output_dir.to_path_buf(),
                    count: existing.len(),
                });
            }
            // verify_output must only see this run's files.
            for path in &existing {
                fs::remove_file(path)?;
            }
            log::info!(
                "Removed {} screenshot(s) left in {}",
                existing.len(),
                output_dir.display()
            );
        }
        fs::create_dir_all(output_dir)?;
        log::info!(
            "Extracting {} screenshot(s) into {}",
            plan.frame_count(),
            output_dir.display()
        );
        self.transcoder
            .transcode(plan, video, output_dir, Arc::clone(&self.progress))?;
        verify_output(plan, output_dir)
    }

    /// Render the picture book of `video`, using its own subtitles.
    ///
    /// # Errors
    ///
    /// See [`prepare`](PictureBook::prepare) and
    /// [`execute`](PictureBook::execute).
    pub fn render<P, Q>(&self, video: P, output_dir: Q) -> Result<Vec<PathBuf>, PictureBookError>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        self.render_with_subtitles(video, None, output_dir)
    }

    /// Render the picture book of `video`, optionally with subtitles from a
    /// separate file.
    ///
    /// # Errors
    ///
    /// See [`prepare`](PictureBook::prepare) and
    /// [`execute`](PictureBook::execute).
    pub fn render_with_subtitles<P, Q>(
        &self,
        video: P,
        subtitles: Option<&Path>,
        output_dir: Q,
    ) -> Result<Vec<PathBuf>, PictureBookError>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let prepared = self.prepare(video.as_ref(), subtitles)?;
        self.execute(&prepared.plan, video.as_ref(), output_dir.as_ref())
    }
}
