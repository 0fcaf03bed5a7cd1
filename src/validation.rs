//! Diagnostic report for a screenshot plan.
//!
//! [`ScreenshotInvocationPlan::report`](crate::ScreenshotInvocationPlan::report)
//! summarizes what a plan will do before FFmpeg runs: how many screenshots
//! and why, how many timestamps merged onto shared frames, and anything worth
//! a warning.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use picture_book::{
//!     PictureBook, PictureBookConfig, SubtitleEntry, SubtitleSource, VideoProperties,
//! };
//!
//! let book = PictureBook::new(PictureBookConfig::default());
//! let video = VideoProperties::constant(Duration::from_secs(60), 24.0);
//! let subtitles = vec![SubtitleEntry::new(Duration::from_secs(5), Duration::from_secs(8), "Hi")];
//!
//! let source = SubtitleSource::File("episode.srt".into());
//! let plan = book.plan(subtitles, &video, Some(source))?;
//! let report = plan.report();
//! assert!(report.warnings.is_empty());
//! print!("{report}");
//! # Ok::<(), picture_book::PictureBookError>(())
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::filter::EXPRESSION_LENGTH_WARNING_THRESHOLD;
use crate::invocation::ScreenshotInvocationPlan;
use crate::planner::CaptureReason;

/// Summary of a screenshot plan.
#[derive(Debug, Clone, Default)]
pub struct PlanReport {
    /// Informational notices.
    pub info: Vec<String>,
    /// Things that will not stop the run but deserve attention.
    pub warnings: Vec<String>,
}

impl PlanReport {
    /// Whether there are no warnings.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Total number of notices and warnings.
    pub fn issue_count(&self) -> usize {
        self.info.len() + self.warnings.len()
    }
}

impl Display for PlanReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for item in &self.info {
            writeln!(f, "[INFO] {item}")?;
        }
        for item in &self.warnings {
            writeln!(f, "[WARN] {item}")?;
        }
        if self.issue_count() == 0 {
            writeln!(f, "Nothing to report.")?;
        }
        Ok(())
    }
}

pub(crate) fn report_for_plan(plan: &ScreenshotInvocationPlan) -> PlanReport {
    let mut report = PlanReport::default();

    let count = |reason: CaptureReason| {
        plan.timestamps()
            .iter()
            .filter(|timestamp| timestamp.reason == reason)
            .count()
    };
    let midpoints = count(CaptureReason::SubtitleMidpoint);
    let gap_fills = count(CaptureReason::GapFill);
    let bounds = count(CaptureReason::VideoStart) + count(CaptureReason::VideoEnd);

    report.info.push(format!(
        "{} screenshot(s): {midpoints} subtitle midpoint(s), {gap_fills} gap fill(s), {bounds} video start/end",
        plan.frame_count(),
    ));

    let collapsed = plan.timestamps().len() - plan.frame_count();
    if collapsed > 0 {
        report.info.push(format!(
            "{collapsed} timestamp(s) fell on an already selected frame"
        ));
    }

    report.info.push(format!(
        "Output files: {} ({} to {})",
        plan.output_pattern(),
        plan.output_pattern().file_name(1),
        plan.output_pattern().file_name(plan.frame_count().max(1)),
    ));

    let expression_length = plan.filter_expression().len();
    report
        .info
        .push(format!("Filter expression: {expression_length} bytes"));
    if plan.filter_expression().exceeds_length_warning() {
        report.warnings.push(format!(
            "Filter expression is {expression_length} bytes, over the \
             {EXPRESSION_LENGTH_WARNING_THRESHOLD}-byte command-line limit of some platforms"
        ));
    }

    if midpoints == 0 {
        report
            .warnings
            .push("No subtitle falls inside the video; only start, end and gap-fill frames".to_string());
    }

    if plan.subtitle_source().is_none() {
        report
            .warnings
            .push("No subtitle source; screenshots will have no burned-in subtitles".to_string());
    }

    report
}
