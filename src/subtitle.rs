//! Subtitle loading.
//!
//! This module turns a subtitle source into plain [`SubtitleEntry`] records:
//!
//! - SubRip (`.srt`) files are parsed directly by [`parse_srt`].
//! - Every other subtitle file FFmpeg can demux (`.ass`, `.ssa`, `.vtt`, …)
//!   and every text subtitle stream embedded in a video is decoded through
//!   [`SubtitleHandle`].
//!
//! [`SubtitleSource`] records where the entries came from, because the
//! burn-in stage of the filter chain must read the very same subtitles.
//!
//! # Example
//!
//! ```no_run
//! use picture_book::{MediaFile, PictureBookError};
//!
//! let mut media = MediaFile::open("input.mkv")?;
//! let entries = media.subtitle().extract()?;
//! for entry in &entries {
//!     println!("[{:?} → {:?}] {}", entry.start, entry.end, entry.text);
//! }
//! # Ok::<(), PictureBookError>(())
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use ffmpeg_next::{Subtitle, codec::context::Context as CodecContext, subtitle::Rect};

use crate::error::PictureBookError;
use crate::media::MediaFile;

/// A single subtitle with its display window.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubtitleEntry {
    /// When the subtitle appears.
    pub start: Duration,
    /// When the subtitle disappears.
    pub end: Duration,
    /// Text content. Formatting tags are kept as-is for SubRip input and
    /// stripped for decoded ASS events.
    pub text: String,
}

impl SubtitleEntry {
    /// Create an entry from durations.
    pub fn new(start: Duration, end: Duration, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Create an entry from second offsets, rejecting negative or
    /// non-finite values.
    ///
    /// `index` is only used to label the error.
    ///
    /// # Errors
    ///
    /// Returns [`PictureBookError::InvalidSubtitle`] if either bound is
    /// negative, NaN, or infinite.
    pub fn from_secs_f64(
        index: usize,
        start: f64,
        end: f64,
        text: impl Into<String>,
    ) -> Result<Self, PictureBookError> {
        let to_duration = |label: &str, seconds: f64| {
            Duration::try_from_secs_f64(seconds).map_err(|_| PictureBookError::InvalidSubtitle {
                index,
                reason: format!("{label} time {seconds} is negative or not a finite number"),
            })
        };
        Ok(Self::new(
            to_duration("start", start)?,
            to_duration("end", end)?,
            text,
        ))
    }

    /// Time between appearance and disappearance.
    pub fn display_duration(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }

    /// The instant halfway through the display window.
    pub fn midpoint(&self) -> Duration {
        self.start + self.display_duration() / 2
    }
}

/// Where the burned-in subtitles are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtitleSource {
    /// A subtitle stream inside the video file itself.
    Embedded {
        /// The video file.
        video: PathBuf,
        /// Zero-based position among the video's subtitle streams.
        track_index: usize,
    },
    /// A standalone subtitle file.
    File(PathBuf),
}

impl SubtitleSource {
    /// The file the `subtitles` filter has to open.
    pub fn path(&self) -> &Path {
        match self {
            SubtitleSource::Embedded { video, .. } => video,
            SubtitleSource::File(path) => path,
        }
    }

    /// Subtitle track to render, for embedded sources.
    pub fn track_index(&self) -> Option<usize> {
        match self {
            SubtitleSource::Embedded { track_index, .. } => Some(*track_index),
            SubtitleSource::File(_) => None,
        }
    }
}

/// Load the entries of a standalone subtitle file.
///
/// Files with an `.srt` extension are parsed with [`parse_srt`]; anything
/// else is opened with FFmpeg and its best subtitle stream is decoded.
///
/// # Errors
///
/// Propagates I/O, parse, and decoding errors.
pub fn load_subtitle_file<P: AsRef<Path>>(path: P) -> Result<Vec<SubtitleEntry>, PictureBookError> {
    let path = path.as_ref();
    let is_srt = path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("srt"));

    if is_srt {
        log::debug!("Parsing SubRip file {}", path.display());
        let content = std::fs::read_to_string(path)?;
        parse_srt(&content)
    } else {
        log::debug!("Decoding subtitle file {} with FFmpeg", path.display());
        MediaFile::open(path)?.subtitle().extract()
    }
}

/// Parse SubRip text into subtitle entries, in file order.
///
/// Cue numbers are optional and ignored. Both `,` and `.` are accepted as the
/// millisecond separator, and anything after the end timestamp on the timing
/// line (position hints) is ignored. Entries are not validated or sorted here;
/// that is [`SubtitleTimeline::load`](crate::SubtitleTimeline::load)'s job.
///
/// # Errors
///
/// - [`PictureBookError::SubtitleParse`] for malformed cue headers or
///   timestamps.
/// - [`PictureBookError::InvalidSubtitle`] for negative timestamps.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// let entries = picture_book::parse_srt("1\n00:00:01,000 --> 00:00:03,500\nHello\n")?;
/// assert_eq!(entries[0].start, Duration::from_secs(1));
/// assert_eq!(entries[0].end, Duration::from_millis(3500));
/// assert_eq!(entries[0].text, "Hello");
/// # Ok::<(), picture_book::PictureBookError>(())
/// ```
pub fn parse_srt(content: &str) -> Result<Vec<SubtitleEntry>, PictureBookError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(number, line)| (number + 1, line.trim_end()))
        .peekable();
    let mut entries = Vec::new();

    loop {
        while lines.next_if(|(_, line)| line.trim().is_empty()).is_some() {}
        let Some((line_number, line)) = lines.next() else {
            break;
        };

        let (timing_line_number, timing_line) = if line.contains("-->") {
            (line_number, line)
        } else {
            if line.trim().parse::<u64>().is_err() {
                return Err(PictureBookError::SubtitleParse {
                    line: line_number,
                    reason: format!("expected a cue number or timing line, found {line:?}"),
                });
            }
            lines.next().ok_or_else(|| PictureBookError::SubtitleParse {
                line: line_number,
                reason: "cue number is not followed by a timing line".to_string(),
            })?
        };

        let (start, end) = parse_timing_line(entries.len(), timing_line_number, timing_line)?;

        let mut text_lines = Vec::new();
        while let Some((_, text)) = lines.next_if(|(_, line)| !line.trim().is_empty()) {
            text_lines.push(text);
        }

        entries.push(SubtitleEntry::new(start, end, text_lines.join("\n")));
    }

    Ok(entries)
}

/// Parse `HH:MM:SS,mmm --> HH:MM:SS,mmm [position hints]`.
fn parse_timing_line(
    entry_index: usize,
    line_number: usize,
    line: &str,
) -> Result<(Duration, Duration), PictureBookError> {
    let (start, rest) = line
        .split_once("-->")
        .ok_or_else(|| PictureBookError::SubtitleParse {
            line: line_number,
            reason: format!("missing `-->` in {line:?}"),
        })?;
    let end = rest.split_whitespace().next().unwrap_or_default();

    let parse = |label: &str, value: &str| {
        let value = value.trim();
        if value.starts_with('-') {
            return Err(PictureBookError::InvalidSubtitle {
                index: entry_index,
                reason: format!("negative {label} time {value}"),
            });
        }
        parse_srt_timestamp(value).ok_or_else(|| PictureBookError::SubtitleParse {
            line: line_number,
            reason: format!("invalid {label} timestamp {value:?}"),
        })
    };

    Ok((parse("start", start)?, parse("end", end)?))
}

/// Parse `HH:MM:SS,mmm` (or with `.`) into a [`Duration`].
fn parse_srt_timestamp(value: &str) -> Option<Duration> {
    let (clock, fraction) = value
        .split_once([',', '.'])
        .unwrap_or((value, "0"));

    let mut parts = clock.split(':');
    let hours: u64 = parts.next()?.trim().parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || minutes >= 60 || seconds >= 60 {
        return None;
    }

    if fraction.is_empty() || fraction.len() > 3 || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    // "5" means 500 ms, "05" means 50 ms.
    let millis: u64 = format!("{fraction:0<3}").parse().ok()?;

    Some(Duration::from_millis(
        ((hours * 60 + minutes) * 60 + seconds) * 1000 + millis,
    ))
}

/// Subtitle stream decoding.
///
/// Obtained via [`MediaFile::subtitle`] or [`MediaFile::subtitle_track`].
/// Only text-based subtitle streams (SubRip, ASS/SSA, WebVTT, mov_text, …)
/// produce entries; bitmap subtitles (PGS, VobSub) carry no text and are
/// skipped.
pub struct SubtitleHandle<'a> {
    pub(crate) media: &'a mut MediaFile,
    /// Which subtitle stream to decode. `None` means "use the best one".
    pub(crate) stream_index: Option<usize>,
}

impl SubtitleHandle<'_> {
    fn resolve_stream_index(&self) -> Result<usize, PictureBookError> {
        self.stream_index
            .or(self.media.subtitle_stream_index)
            .ok_or(PictureBookError::NoSubtitleStream)
    }

    /// Decode every subtitle event of the stream.
    ///
    /// Entries are returned in decode order; sorting and deduplication happen
    /// in [`SubtitleTimeline::load`](crate::SubtitleTimeline::load).
    ///
    /// # Errors
    ///
    /// - [`PictureBookError::NoSubtitleStream`] if no subtitle stream exists.
    /// - [`PictureBookError::SubtitleDecodeError`] if decoding fails.
    /// - [`PictureBookError::InvalidSubtitle`] if an event starts before the
    ///   beginning of the stream.
    pub fn extract(&mut self) -> Result<Vec<SubtitleEntry>, PictureBookError> {
        let subtitle_stream_index = self.resolve_stream_index()?;
        log::debug!("Decoding subtitles from stream {subtitle_stream_index}");
        self.media.rewind();

        let stream = self
            .media
            .input_context
            .stream(subtitle_stream_index)
            .ok_or(PictureBookError::NoSubtitleStream)?;

        let time_base = stream.time_base();
        let decoder_context = CodecContext::from_parameters(stream.parameters())?;
        let mut decoder = decoder_context.decoder().subtitle().map_err(|error| {
            PictureBookError::SubtitleDecodeError(format!(
                "Failed to create subtitle decoder: {error}"
            ))
        })?;

        let to_micros = |pts: i64| -> i64 {
            let numerator = i64::from(time_base.numerator());
            let denominator = i64::from(time_base.denominator().max(1));
            pts.saturating_mul(numerator).saturating_mul(1_000_000) / denominator
        };

        let mut entries = Vec::new();
        let mut skipped = 0_usize;
        let mut subtitle = Subtitle::new();

        for (stream, packet) in self.media.input_context.packets() {
            if stream.index() != subtitle_stream_index {
                continue;
            }

            let got_subtitle = decoder.decode(&packet, &mut subtitle).map_err(|error| {
                PictureBookError::SubtitleDecodeError(format!("Subtitle decode error: {error}"))
            })?;
            if !got_subtitle {
                continue;
            }

            // Subtitle PTS is in AV_TIME_BASE (microseconds); fall back to the
            // packet PTS rescaled from the stream time base.
            let base_micros = subtitle
                .pts()
                .unwrap_or_else(|| to_micros(packet.pts().unwrap_or(0)));
            let start_micros = base_micros + i64::from(subtitle.start()) * 1000;
            let mut end_micros = base_micros + i64::from(subtitle.end()) * 1000;
            if end_micros <= start_micros && packet.duration() > 0 {
                end_micros = start_micros + to_micros(packet.duration());
            }

            let text = subtitle
                .rects()
                .filter_map(|rect| match rect {
                    Rect::Text(text) => Some(text.get().trim().to_string()),
                    Rect::Ass(ass) => Some(strip_ass_tags(ass.get())),
                    _ => None,
                })
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            if text.is_empty() {
                continue;
            }

            if start_micros < 0 {
                return Err(PictureBookError::InvalidSubtitle {
                    index: entries.len(),
                    reason: format!("starts {}µs before the stream", -start_micros),
                });
            }
            if end_micros <= start_micros {
                skipped += 1;
                log::warn!(
                    "Skipping subtitle at {:.3}s without a display duration: {text:?}",
                    start_micros as f64 / 1_000_000.0
                );
                continue;
            }

            entries.push(SubtitleEntry::new(
                Duration::from_micros(start_micros as u64),
                Duration::from_micros(end_micros as u64),
                text,
            ));
        }

        log::debug!(
            "Decoded {} subtitle(s) from stream {subtitle_stream_index} ({skipped} skipped)",
            entries.len()
        );
        Ok(entries)
    }
}

/// Strip ASS/SSA formatting from a decoded event.
///
/// Removes the `Dialogue:` field prefix (or the nine leading fields of the
/// packet form FFmpeg emits), `{\...}` override blocks, and converts `\N`
/// line breaks.
fn strip_ass_tags(input: &str) -> String {
    let fields_to_skip = if input.starts_with("Dialogue:") { 9 } else { 8 };
    let text = input
        .splitn(fields_to_skip + 1, ',')
        .nth(fields_to_skip)
        .unwrap_or(input);

    let mut result = String::with_capacity(text.len());
    let mut in_override = false;
    for c in text.chars() {
        match c {
            '{' if !in_override => in_override = true,
            '}' if in_override => in_override = false,
            _ if !in_override => result.push(c),
            _ => {}
        }
    }

    result
        .replace("\\N", "\n")
        .replace("\\n", "\n")
        .trim()
        .to_string()
}
