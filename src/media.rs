//! Media probing through FFmpeg.
//!
//! [`MediaFile`] opens a video once, caches its [`MediaMetadata`], and gives
//! access to subtitle decoding and frame-rate analysis. It is the bridge
//! between a file on disk and the pure planning pipeline, which only sees
//! [`VideoProperties`] and [`SubtitleEntry`](crate::SubtitleEntry) values.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{codec::context::Context as CodecContext, format::context::Input, media::Type};

use crate::{
    conversion,
    error::PictureBookError,
    metadata::{FrameRate, MediaMetadata, SubtitleTrackMetadata, VideoMetadata, VideoProperties},
    subtitle::SubtitleHandle,
    variable_framerate::{VariableFrameRateAnalysis, analyze_variable_framerate_impl},
};

/// An opened media file.
///
/// # Example
///
/// ```no_run
/// use picture_book::{MediaFile, PictureBookError};
///
/// let mut media = MediaFile::open("episode.mkv")?;
/// let properties = media.video_properties()?;
/// println!("{:?} at {:?}", properties.duration, properties.frame_rate);
/// let subtitles = media.subtitle().extract()?;
/// println!("{} subtitles", subtitles.len());
/// # Ok::<(), PictureBookError>(())
/// ```
pub struct MediaFile {
    /// The opened FFmpeg input (demuxer) context.
    pub(crate) input_context: Input,
    /// Cached metadata extracted at open time.
    pub(crate) metadata: MediaMetadata,
    /// Index of the best video stream, if one exists.
    pub(crate) video_stream_index: Option<usize>,
    /// Index of the best subtitle stream, if one exists.
    pub(crate) subtitle_stream_index: Option<usize>,
    /// Indices of all subtitle streams, ordered by track number.
    pub(crate) subtitle_stream_indices: Vec<usize>,
    /// Path to the opened file.
    pub(crate) file_path: PathBuf,
}

impl Debug for MediaFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("MediaFile")
            .field("metadata", &self.metadata)
            .field("video_stream_index", &self.video_stream_index)
            .field("subtitle_stream_index", &self.subtitle_stream_index)
            .field("subtitle_stream_indices", &self.subtitle_stream_indices)
            .field("file_path", &self.file_path)
            .finish_non_exhaustive()
    }
}

impl MediaFile {
    /// Open a media file.
    ///
    /// Initializes FFmpeg (idempotent), opens the file, and caches video and
    /// subtitle stream metadata. Standalone subtitle files (`.ass`, `.vtt`,
    /// …) open fine too; they simply have no video stream.
    ///
    /// # Errors
    ///
    /// Returns [`PictureBookError::FileOpen`] if the file cannot be opened or
    /// its video codec parameters cannot be read.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PictureBookError> {
        let file_path = path.as_ref().to_path_buf();
        log::debug!("Opening media file: {}", file_path.display());

        ffmpeg_next::init().map_err(|error| PictureBookError::FileOpen {
            path: file_path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input_context =
            ffmpeg_next::format::input(&file_path).map_err(|error| PictureBookError::FileOpen {
                path: file_path.clone(),
                reason: error.to_string(),
            })?;

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };
        let format = input_context.format().name().to_string();

        let video_stream_index = input_context
            .streams()
            .best(Type::Video)
            .map(|stream| stream.index());

        let video = match video_stream_index.and_then(|index| input_context.stream(index)) {
            Some(stream) => {
                let index = stream.index();
                let decoder_context = CodecContext::from_parameters(stream.parameters())
                    .map_err(|error| PictureBookError::FileOpen {
                        path: file_path.clone(),
                        reason: format!(
                            "Failed to read video codec parameters for stream {index}: {error}"
                        ),
                    })?;
                let video_decoder = decoder_context.decoder().video().map_err(|error| {
                    PictureBookError::FileOpen {
                        path: file_path.clone(),
                        reason: format!("Failed to create video decoder for stream {index}: {error}"),
                    }
                })?;

                // Average frame rate first, then the stream's base rate.
                let frames_per_second = conversion::rational_to_f64(stream.avg_frame_rate())
                    .or_else(|| conversion::rational_to_f64(stream.rate()))
                    .unwrap_or(0.0);

                let frame_count = if stream.frames() > 0 {
                    stream.frames() as u64
                } else if frames_per_second > 0.0 {
                    (duration.as_secs_f64() * frames_per_second) as u64
                } else {
                    0
                };

                let codec = video_decoder
                    .codec()
                    .map(|codec| codec.name().to_string())
                    .unwrap_or_else(|| "unknown".to_string());

                Some(VideoMetadata {
                    width: video_decoder.width(),
                    height: video_decoder.height(),
                    frames_per_second,
                    frame_count,
                    codec,
                    stream_index: index,
                })
            }
            None => None,
        };

        let subtitle_stream_index = input_context
            .streams()
            .best(Type::Subtitle)
            .map(|stream| stream.index());

        let mut subtitle_stream_indices = Vec::new();
        let mut subtitle_tracks = Vec::new();
        for stream in input_context.streams() {
            if stream.parameters().medium() != Type::Subtitle {
                continue;
            }

            let index = stream.index();
            let track_index = subtitle_stream_indices.len();
            subtitle_stream_indices.push(index);

            let codec = CodecContext::from_parameters(stream.parameters())
                .ok()
                .map(|context| context.id().name().to_string())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| "unknown".to_string());
            let language = stream.metadata().get("language").map(str::to_string);

            subtitle_tracks.push(SubtitleTrackMetadata {
                codec,
                language,
                track_index,
                stream_index: index,
            });
        }

        let metadata = MediaMetadata {
            video,
            subtitle_tracks,
            duration,
            format,
        };

        log::info!(
            "Opened media file: {} (format={}, duration={:.2}s, subtitle_streams={})",
            file_path.display(),
            metadata.format,
            metadata.duration.as_secs_f64(),
            subtitle_stream_indices.len(),
        );
        if let Some(video) = &metadata.video {
            log::debug!(
                "Best video stream: index={}, {}x{}, {:.3} fps, codec={}, {} frames",
                video.stream_index,
                video.width,
                video.height,
                video.frames_per_second,
                video.codec,
                video.frame_count,
            );
        }

        Ok(Self {
            input_context,
            metadata,
            video_stream_index,
            subtitle_stream_index,
            subtitle_stream_indices,
            file_path,
        })
    }

    /// Seek the demuxer back to the start so a full packet scan sees every
    /// packet, whatever ran before it.
    ///
    /// Some subtitle demuxers cannot seek; a freshly opened context is already
    /// at the start, so a failed seek is only logged.
    pub(crate) fn rewind(&mut self) {
        if let Err(error) = self.input_context.seek(0, ..0) {
            log::debug!("Could not rewind {}: {error}", self.file_path.display());
        }
    }

    /// Cached media metadata.
    pub fn metadata(&self) -> &MediaMetadata {
        &self.metadata
    }

    /// Path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Track position of the best subtitle stream, if any.
    ///
    /// This is what FFmpeg's `subtitles` filter picks when no `si` option is
    /// given, so screenshots and planning agree on the track.
    pub fn default_subtitle_track(&self) -> Option<usize> {
        let stream_index = self.subtitle_stream_index?;
        self.subtitle_stream_indices
            .iter()
            .position(|&index| index == stream_index)
    }

    /// Scan packet timestamps of the video stream to detect a variable frame
    /// rate.
    ///
    /// Reads (but does not decode) every packet of the file.
    ///
    /// # Errors
    ///
    /// Returns [`PictureBookError::NoVideoStream`] if there is no video, or
    /// FFmpeg read errors.
    pub fn analyze_variable_framerate(
        &mut self,
    ) -> Result<VariableFrameRateAnalysis, PictureBookError> {
        let index = self
            .video_stream_index
            .ok_or(PictureBookError::NoVideoStream)?;
        analyze_variable_framerate_impl(self, index)
    }

    /// Resolve the scalar properties the planner needs.
    ///
    /// The frame rate is reported as [`FrameRate::Variable`] when the packet
    /// scan finds irregular frame spacing and as [`FrameRate::Unknown`] when
    /// the container reports none; the planner rejects both.
    ///
    /// # Errors
    ///
    /// Returns [`PictureBookError::NoVideoStream`] if the file has no video.
    pub fn video_properties(&mut self) -> Result<VideoProperties, PictureBookError> {
        let video = self
            .metadata
            .video
            .clone()
            .ok_or(PictureBookError::NoVideoStream)?;

        let frame_rate = if video.frames_per_second <= 0.0 {
            FrameRate::Unknown
        } else {
            let analysis = self.analyze_variable_framerate()?;
            if analysis.is_vfr {
                FrameRate::Variable {
                    mean_fps: analysis.mean_fps,
                }
            } else {
                FrameRate::Constant(video.frames_per_second)
            }
        };

        Ok(VideoProperties {
            duration: self.metadata.duration,
            frame_rate,
            frame_count: video.frame_count,
        })
    }

    /// A [`SubtitleHandle`] for the best subtitle stream.
    pub fn subtitle(&mut self) -> SubtitleHandle<'_> {
        let stream_index = self.subtitle_stream_index;
        SubtitleHandle {
            media: self,
            stream_index,
        }
    }

    /// A [`SubtitleHandle`] for a specific subtitle track.
    ///
    /// `track_index` is the zero-based index into
    /// [`MediaMetadata::subtitle_tracks`].
    ///
    /// # Errors
    ///
    /// Returns [`PictureBookError::NoSubtitleStream`] if `track_index` is out
    /// of range.
    pub fn subtitle_track(
        &mut self,
        track_index: usize,
    ) -> Result<SubtitleHandle<'_>, PictureBookError> {
        let stream_index = self
            .subtitle_stream_indices
            .get(track_index)
            .copied()
            .ok_or(PictureBookError::NoSubtitleStream)?;

        Ok(SubtitleHandle {
            media: self,
            stream_index: Some(stream_index),
        })
    }
}
