//! Screenshot invocation plan tests.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use picture_book::{
    FfmpegLogLevel, ImageFormat, OutputPattern, PictureBook, PictureBookConfig, SubtitleEntry,
    SubtitleSource, VideoProperties,
};

fn strings(arguments: &[OsString]) -> Vec<String> {
    arguments
        .iter()
        .map(|argument| argument.to_string_lossy().into_owned())
        .collect()
}

fn scenario_plan(config: PictureBookConfig) -> picture_book::ScreenshotInvocationPlan {
    let video = VideoProperties::constant(Duration::from_secs(15), 1.0);
    let subtitles = vec![
        SubtitleEntry::new(Duration::from_secs(1), Duration::from_secs(3), "a"),
        SubtitleEntry::new(Duration::from_secs(10), Duration::from_secs(12), "b"),
    ];
    PictureBook::new(config)
        .plan(
            subtitles,
            &video,
            Some(SubtitleSource::File(PathBuf::from("subs.srt"))),
        )
        .unwrap()
}

#[test]
fn output_pattern_width_follows_frame_count() {
    assert_eq!(OutputPattern::new(0, ImageFormat::Jpeg).to_string(), "%01d.jpg");
    assert_eq!(OutputPattern::new(9, ImageFormat::Jpeg).to_string(), "%01d.jpg");
    assert_eq!(OutputPattern::new(10, ImageFormat::Png).to_string(), "%02d.png");
    assert_eq!(OutputPattern::new(999, ImageFormat::Png).to_string(), "%03d.png");
    assert_eq!(OutputPattern::new(1000, ImageFormat::Jpeg).to_string(), "%04d.jpg");
}

#[test]
fn output_pattern_matches_its_own_names() {
    let pattern = OutputPattern::new(120, ImageFormat::Jpeg);
    assert!(pattern.matches("001.jpg"));
    assert!(pattern.matches(&pattern.file_name(120)));
    assert!(!pattern.matches("01.jpg"));
    assert!(!pattern.matches("001.png"));
    assert!(!pattern.matches("cover.jpg"));
    assert!(!pattern.matches("001"));
}

#[test]
fn expected_names_sort_in_capture_order() {
    let plan = scenario_plan(PictureBookConfig::default());
    let names = plan.expected_file_names();

    assert_eq!(names, ["1.jpg", "2.jpg", "3.jpg", "4.jpg", "5.jpg"]);
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(sorted, names);
}

#[test]
fn jpeg_command_line() {
    let plan = scenario_plan(PictureBookConfig::default().with_quality(5));
    let arguments = plan.command_arguments(
        Path::new("in.mkv"),
        Path::new("out"),
        FfmpegLogLevel::Error,
        false,
    );
    let expected_output = Path::new("out").join("%01d.jpg");

    assert_eq!(
        strings(&arguments),
        [
            "-hide_banner",
            "-nostdin",
            "-loglevel",
            "error",
            "-n",
            "-i",
            "in.mkv",
            "-fps_mode",
            "vfr",
            "-vf",
            r"select=eq(n\,0)+eq(n\,2)+eq(n\,6)+eq(n\,11)+eq(n\,14),subtitles=subs.srt,scale=640:-1",
            "-q:v",
            "5",
            "-start_number",
            "1",
            "-progress",
            "pipe:1",
            "-nostats",
            &*expected_output.to_string_lossy(),
        ]
    );
}

#[test]
fn grayscale_jpeg_uses_format_filter() {
    let plan = scenario_plan(PictureBookConfig::default().with_grayscale(true));
    let arguments = strings(&plan.command_arguments(
        Path::new("in.mkv"),
        Path::new("out"),
        FfmpegLogLevel::Quiet,
        true,
    ));

    assert!(plan.filter_expression().as_str().ends_with(",format=gray"));
    assert!(arguments.contains(&"-y".to_string()));
    assert!(!arguments.contains(&"-pix_fmt".to_string()));
}

#[test]
fn grayscale_png_is_single_channel() {
    let plan = scenario_plan(
        PictureBookConfig::default()
            .with_image_format(ImageFormat::Png)
            .with_grayscale(true),
    );
    let arguments = strings(&plan.command_arguments(
        Path::new("in.mkv"),
        Path::new("out"),
        FfmpegLogLevel::Error,
        false,
    ));

    assert!(!plan.filter_expression().as_str().contains("format=gray"));
    let pix_fmt = arguments.iter().position(|a| a == "-pix_fmt").unwrap();
    assert_eq!(arguments[pix_fmt + 1], "gray");
    assert!(!arguments.contains(&"-q:v".to_string()));
    assert!(arguments.last().unwrap().ends_with("%01d.png"));
}

#[test]
fn color_png_has_no_format_flags() {
    let plan = scenario_plan(PictureBookConfig::default().with_image_format(ImageFormat::Png));
    let arguments = strings(&plan.command_arguments(
        Path::new("in.mkv"),
        Path::new("out"),
        FfmpegLogLevel::Error,
        false,
    ));
    assert!(!arguments.contains(&"-pix_fmt".to_string()));
    assert!(!arguments.contains(&"-q:v".to_string()));
}

#[test]
fn plan_keeps_configuration() {
    let config = PictureBookConfig::default()
        .with_style_overrides("Outline=3".parse().unwrap())
        .with_quality(9);
    let plan = scenario_plan(config);

    assert_eq!(plan.frame_count(), 5);
    assert_eq!(plan.timestamps().len(), 5);
    assert_eq!(plan.quality(), 9);
    assert_eq!(plan.image_format(), ImageFormat::Jpeg);
    assert_eq!(plan.style_overrides().get("Outline"), Some("3"));
    assert!(plan.filter_expression().as_str().contains(":force_style=Outline=3"));
}

#[test]
fn report_counts_reasons() {
    let plan = scenario_plan(PictureBookConfig::default());
    let report = plan.report();

    assert!(report.is_clean(), "unexpected warnings: {report}");
    assert!(report.info[0].contains("5 screenshot(s)"));
    assert!(report.info[0].contains("2 subtitle midpoint(s)"));
    assert!(report.info[0].contains("1 gap fill(s)"));
    assert!(report.to_string().contains("[INFO]"));
}

#[test]
fn report_warns_about_long_expressions() {
    let video = VideoProperties::constant(Duration::from_secs(20_000), 25.0);
    let plan = PictureBook::new(PictureBookConfig::default().with_max_gap_seconds(2.0))
        .plan(
            Vec::new(),
            &video,
            Some(SubtitleSource::File(PathBuf::from("subs.srt"))),
        )
        .unwrap();
    let report = plan.report();

    assert!(plan.filter_expression().exceeds_length_warning());
    assert!(report.warnings.iter().any(|w| w.contains("bytes")));
}

#[test]
fn image_format_names() {
    assert_eq!("jpg".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
    assert_eq!("JPEG".parse::<ImageFormat>().unwrap(), ImageFormat::Jpeg);
    assert_eq!("png".parse::<ImageFormat>().unwrap(), ImageFormat::Png);
    assert!("webp".parse::<ImageFormat>().is_err());
    assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
    assert_eq!(ImageFormat::Png.to_string(), "png");
}
