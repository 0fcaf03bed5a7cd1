//! Transcoder and output verification tests.
//!
//! A fake transcoder stands in for FFmpeg and writes small images straight
//! into a temporary directory.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{GrayImage, RgbImage};
use picture_book::transcode::{ProgressUpdate, parse_progress_line};
use picture_book::{
    FfmpegTranscoder, ImageFormat, PictureBook, PictureBookConfig, PictureBookError,
    ProgressCallback, ProgressInfo, ScreenshotInvocationPlan, SubtitleEntry, SubtitleSource,
    Transcoder, VideoProperties, existing_screenshots, verify_output,
};

/// Writes `missing` fewer screenshots than planned.
struct FakeTranscoder {
    missing: usize,
}

impl FakeTranscoder {
    fn new(missing: usize) -> Self {
        Self { missing }
    }
}

impl Transcoder for FakeTranscoder {
    fn transcode(
        &self,
        plan: &ScreenshotInvocationPlan,
        _input: &Path,
        output_dir: &Path,
        progress: Arc<dyn ProgressCallback>,
    ) -> Result<(), PictureBookError> {
        let names = plan.expected_file_names();
        let written = names.len().saturating_sub(self.missing);
        for (position, name) in names.iter().take(written).enumerate() {
            RgbImage::new(4, 4).save(output_dir.join(name))?;
            progress.on_progress(&ProgressInfo {
                current: position as u64 + 1,
                total: Some(names.len() as u64),
                percentage: None,
                elapsed: Duration::ZERO,
                estimated_remaining: None,
                current_timestamp: None,
                finished: position + 1 == written,
            });
        }
        Ok(())
    }
}

#[derive(Default)]
struct RecordingProgress {
    seen: Mutex<Vec<(u64, bool)>>,
}

impl RecordingProgress {
    fn counts(&self) -> Vec<u64> {
        self.seen.lock().unwrap().iter().map(|&(current, _)| current).collect()
    }
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.seen.lock().unwrap().push((info.current, info.finished));
    }
}

/// Write screenshots `1..=count` as if an earlier run had left them behind.
fn leave_old_screenshots(output_dir: &Path, count: usize) {
    for number in 1..=count {
        RgbImage::new(2, 2)
            .save(output_dir.join(format!("{number}.jpg")))
            .unwrap();
    }
}

/// An executable shell script standing in for `ffmpeg`.
#[cfg(unix)]
fn fake_ffmpeg(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-ffmpeg");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn scenario_plan(book: &PictureBook<impl Transcoder>) -> ScreenshotInvocationPlan {
    let video = VideoProperties::constant(Duration::from_secs(15), 1.0);
    let subtitles = vec![
        SubtitleEntry::new(Duration::from_secs(1), Duration::from_secs(3), "a"),
        SubtitleEntry::new(Duration::from_secs(10), Duration::from_secs(12), "b"),
    ];
    book.plan(
        subtitles,
        &video,
        Some(SubtitleSource::File(PathBuf::from("subs.srt"))),
    )
    .unwrap()
}

#[test]
fn complete_output_is_accepted() {
    let output = tempfile::tempdir().expect("Failed to create temp dir");
    let progress = Arc::new(RecordingProgress::default());
    let book = PictureBook::new(PictureBookConfig::default())
        .with_transcoder(FakeTranscoder::new(0))
        .with_progress(progress.clone());
    let plan = scenario_plan(&book);

    let screenshots = book
        .execute(&plan, Path::new("in.mkv"), output.path())
        .unwrap();

    let names: Vec<String> = screenshots
        .iter()
        .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, plan.expected_file_names());
    assert_eq!(progress.counts(), [1, 2, 3, 4, 5]);
}

#[test]
fn one_missing_screenshot_fails_the_run() {
    let output = tempfile::tempdir().expect("Failed to create temp dir");
    let book =
        PictureBook::new(PictureBookConfig::default()).with_transcoder(FakeTranscoder::new(1));
    let plan = scenario_plan(&book);

    let result = book.execute(&plan, Path::new("in.mkv"), output.path());

    match result {
        Err(PictureBookError::OutputCountMismatch { expected, actual }) => {
            assert_eq!(expected, 5);
            assert_eq!(actual, 4);
        }
        other => panic!("Expected OutputCountMismatch, got {other:?}"),
    }
}

#[test]
fn output_directory_is_created() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let nested = root.path().join("book").join("chapter-1");
    let book =
        PictureBook::new(PictureBookConfig::default()).with_transcoder(FakeTranscoder::new(0));
    let plan = scenario_plan(&book);

    book.execute(&plan, Path::new("in.mkv"), &nested).unwrap();
    assert!(nested.join("1.jpg").is_file());
}

#[test]
fn invalid_quality_fails_planning() {
    let book = PictureBook::new(PictureBookConfig::default().with_quality(1))
        .with_transcoder(FakeTranscoder::new(0));
    let video = VideoProperties::constant(Duration::from_secs(15), 1.0);

    let result = book.plan(Vec::new(), &video, None);
    assert!(matches!(
        result,
        Err(PictureBookError::InvalidConfiguration { key: "quality", .. })
    ));
}

#[test]
fn unrelated_files_are_ignored() {
    let output = tempfile::tempdir().expect("Failed to create temp dir");
    std::fs::write(output.path().join("notes.txt"), "not a screenshot").unwrap();
    std::fs::create_dir(output.path().join("01.jpg")).unwrap();
    GrayImage::new(2, 2).save(output.path().join("cover.png")).unwrap();

    let book =
        PictureBook::new(PictureBookConfig::default()).with_transcoder(FakeTranscoder::new(0));
    let plan = scenario_plan(&book);
    let screenshots = book
        .execute(&plan, Path::new("in.mkv"), output.path())
        .unwrap();
    assert_eq!(screenshots.len(), 5);
}

#[test]
fn existing_screenshots_need_overwrite() {
    let output = tempfile::tempdir().expect("Failed to create temp dir");
    RgbImage::new(4, 4).save(output.path().join("3.jpg")).unwrap();

    let book =
        PictureBook::new(PictureBookConfig::default()).with_transcoder(FakeTranscoder::new(0));
    let plan = scenario_plan(&book);
    match book.execute(&plan, Path::new("in.mkv"), output.path()) {
        Err(PictureBookError::OutputExists { path, count }) => {
            assert_eq!(path, output.path());
            assert_eq!(count, 1);
        }
        other => panic!("Expected OutputExists, got {other:?}"),
    }

    let book = PictureBook::new(PictureBookConfig::default().with_overwrite(true))
        .with_transcoder(FakeTranscoder::new(0));
    assert_eq!(
        book.execute(&plan, Path::new("in.mkv"), output.path())
            .unwrap()
            .len(),
        5
    );
}

#[test]
fn overwrite_removes_more_old_screenshots_than_planned() {
    let output = tempfile::tempdir().expect("Failed to create temp dir");
    leave_old_screenshots(output.path(), 7);

    let book = PictureBook::new(PictureBookConfig::default().with_overwrite(true))
        .with_transcoder(FakeTranscoder::new(0));
    let plan = scenario_plan(&book);
    let screenshots = book
        .execute(&plan, Path::new("in.mkv"), output.path())
        .unwrap();

    assert_eq!(screenshots.len(), 5);
    assert!(!output.path().join("6.jpg").exists());
    assert!(!output.path().join("7.jpg").exists());
}

#[test]
fn old_screenshots_do_not_hide_a_missing_one() {
    let output = tempfile::tempdir().expect("Failed to create temp dir");
    leave_old_screenshots(output.path(), 5);

    let book = PictureBook::new(PictureBookConfig::default().with_overwrite(true))
        .with_transcoder(FakeTranscoder::new(1));
    let plan = scenario_plan(&book);

    match book.execute(&plan, Path::new("in.mkv"), output.path()) {
        Err(PictureBookError::OutputCountMismatch { expected, actual }) => {
            assert_eq!(expected, 5);
            assert_eq!(actual, 4);
        }
        other => panic!("Expected OutputCountMismatch, got {other:?}"),
    }
    assert!(!output.path().join("5.jpg").exists());
}

#[test]
fn missing_directory_has_no_screenshots() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let book =
        PictureBook::new(PictureBookConfig::default()).with_transcoder(FakeTranscoder::new(0));
    let plan = scenario_plan(&book);
    assert!(existing_screenshots(&plan, &root.path().join("nope")).unwrap().is_empty());
}

#[test]
fn unreadable_screenshot_is_an_error() {
    let output = tempfile::tempdir().expect("Failed to create temp dir");
    let book = PictureBook::new(PictureBookConfig::default().with_image_format(ImageFormat::Png))
        .with_transcoder(FakeTranscoder::new(0));
    let plan = scenario_plan(&book);
    for name in plan.expected_file_names() {
        std::fs::write(output.path().join(name), b"definitely not a png").unwrap();
    }

    let result = verify_output(&plan, output.path());
    assert!(matches!(result, Err(PictureBookError::ImageError(_))));
}

#[test]
fn ffmpeg_that_cannot_start_is_reported() {
    let output = tempfile::tempdir().expect("Failed to create temp dir");
    let config = PictureBookConfig::default().with_ffmpeg_program("picture-book-no-such-ffmpeg");
    let book = PictureBook::new(config);
    let plan = scenario_plan(&book);

    let result = book.execute(&plan, Path::new("in.mkv"), output.path());
    match result {
        Err(PictureBookError::ExternalTool { program, .. }) => {
            assert_eq!(program, "picture-book-no-such-ffmpeg");
        }
        other => panic!("Expected ExternalTool, got {other:?}"),
    }
}

#[cfg(unix)]
#[test]
fn ffmpeg_failure_reports_status_and_stderr() {
    let scripts = tempfile::tempdir().expect("Failed to create temp dir");
    let output = tempfile::tempdir().expect("Failed to create temp dir");
    let program = fake_ffmpeg(
        scripts.path(),
        "echo 'Error initializing complex filters.' >&2\nexit 3",
    );
    let book = PictureBook::new(PictureBookConfig::default().with_ffmpeg_program(&program));
    let plan = scenario_plan(&book);

    match book.execute(&plan, Path::new("in.mkv"), output.path()) {
        Err(PictureBookError::ExternalTool { program: name, reason }) => {
            assert_eq!(name, program.display().to_string());
            assert!(reason.contains("exit status: 3"), "{reason}");
            assert!(reason.contains("Error initializing complex filters."), "{reason}");
        }
        other => panic!("Expected ExternalTool, got {other:?}"),
    }
}

#[cfg(unix)]
#[test]
fn end_of_progress_is_the_final_report() {
    let scripts = tempfile::tempdir().expect("Failed to create temp dir");
    let output = tempfile::tempdir().expect("Failed to create temp dir");
    let program = fake_ffmpeg(
        scripts.path(),
        "printf 'frame=2\\nprogress=continue\\nframe=5\\nprogress=end\\n'",
    );
    let config = PictureBookConfig::default().with_ffmpeg_program(&program);
    let book = PictureBook::new(config.clone());
    let plan = scenario_plan(&book);

    let progress = Arc::new(RecordingProgress::default());
    FfmpegTranscoder::from_config(&config)
        .transcode(&plan, Path::new("in.mkv"), output.path(), progress.clone())
        .unwrap();

    assert_eq!(*progress.seen.lock().unwrap(), [(2, false), (5, true)]);
}

#[test]
fn progress_lines() {
    assert_eq!(parse_progress_line("frame=7"), Some(ProgressUpdate::Frame(7)));
    assert_eq!(
        parse_progress_line("out_time_us=2500000"),
        Some(ProgressUpdate::OutTime(Duration::from_millis(2500)))
    );
    assert_eq!(parse_progress_line("out_time_us=N/A"), None);
    assert_eq!(
        parse_progress_line("progress=continue"),
        Some(ProgressUpdate::BlockEnd { finished: false })
    );
    assert_eq!(
        parse_progress_line("progress=end"),
        Some(ProgressUpdate::BlockEnd { finished: true })
    );
    assert_eq!(parse_progress_line("fps=0.00"), None);
    assert_eq!(parse_progress_line("garbage"), None);
}
