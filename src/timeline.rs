//! Normalized subtitle timeline.
//!
//! [`SubtitleTimeline`] is the validated, time-ordered, duplicate-free view of
//! a subtitle track that the planner works from.

use std::collections::HashSet;
use std::time::Duration;

use crate::error::PictureBookError;
use crate::subtitle::SubtitleEntry;

/// Subtitle entries sorted by start time, validated and deduplicated.
///
/// Overlapping entries are kept as independent entries; each one later gets
/// its own midpoint screenshot.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use picture_book::{SubtitleEntry, SubtitleTimeline};
///
/// let secs = Duration::from_secs;
/// let timeline = SubtitleTimeline::load(vec![
///     SubtitleEntry::new(secs(10), secs(12), "b"),
///     SubtitleEntry::new(secs(1), secs(3), "a"),
///     SubtitleEntry::new(secs(1), secs(3), "a"),
/// ])?;
/// assert_eq!(timeline.len(), 2);
/// assert_eq!(timeline.entries()[0].text, "a");
/// # Ok::<(), picture_book::PictureBookError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleTimeline {
    entries: Vec<SubtitleEntry>,
}

impl SubtitleTimeline {
    /// Validate, sort, and deduplicate subtitle entries.
    ///
    /// Sorting is stable on `(start, end)`, so entries with identical timing
    /// keep their input order. Exact `(start, end, text)` duplicates collapse
    /// to their first occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`PictureBookError::InvalidSubtitle`] naming the input position
    /// of the first entry whose start is not before its end.
    pub fn load<I>(entries: I) -> Result<Self, PictureBookError>
    where
        I: IntoIterator<Item = SubtitleEntry>,
    {
        let mut entries: Vec<SubtitleEntry> = entries.into_iter().collect();

        if let Some((index, entry)) = entries
            .iter()
            .enumerate()
            .find(|(_, entry)| entry.start >= entry.end)
        {
            return Err(PictureBookError::InvalidSubtitle {
                index,
                reason: format!(
                    "start ({:?}) must be before end ({:?})",
                    entry.start, entry.end
                ),
            });
        }

        let loaded = entries.len();
        entries.sort_by_key(|entry| (entry.start, entry.end));

        let mut seen = HashSet::with_capacity(entries.len());
        entries.retain(|entry| seen.insert(entry.clone()));

        let overlaps = entries
            .windows(2)
            .filter(|pair| pair[1].start < pair[0].end)
            .count();
        log::debug!(
            "Loaded subtitle timeline: {} entries ({} duplicates removed, {} overlaps)",
            entries.len(),
            loaded - entries.len(),
            overlaps,
        );

        Ok(Self { entries })
    }

    /// The ordered entries.
    pub fn entries(&self) -> &[SubtitleEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the timeline holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Earliest start and latest end, clipped to `[0, video_duration]`.
    ///
    /// `None` for an empty timeline.
    pub fn bounds(&self, video_duration: Duration) -> Option<(Duration, Duration)> {
        let first_start = self.entries.first()?.start;
        let last_end = self.entries.iter().map(|entry| entry.end).max()?;
        Some((
            first_start.min(video_duration),
            last_end.min(video_duration),
        ))
    }
}
