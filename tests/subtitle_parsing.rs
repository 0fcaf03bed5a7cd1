//! SubRip parsing and subtitle file loading tests.

use std::time::Duration;

use picture_book::{PictureBookError, SubtitleEntry, load_subtitle_file, parse_srt};

const EPISODE: &str = "\u{feff}1
00:00:01,000 --> 00:00:03,000
Where were you?

2
00:00:10,000 --> 00:00:12,250 X1:40 X2:600 Y1:20 Y2:50
<i>Out.</i>
Just out.
";

#[test]
fn parses_cues_in_file_order() {
    let entries = parse_srt(EPISODE).unwrap();

    assert_eq!(
        entries,
        [
            SubtitleEntry::new(
                Duration::from_secs(1),
                Duration::from_secs(3),
                "Where were you?"
            ),
            SubtitleEntry::new(
                Duration::from_secs(10),
                Duration::from_millis(12_250),
                "<i>Out.</i>\nJust out."
            ),
        ]
    );
}

#[test]
fn cue_numbers_are_optional() {
    let entries = parse_srt("00:00:01,000 --> 00:00:02,000\nA\n\n00:00:05,000 --> 00:00:06,000\nB\n")
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].text, "B");
}

#[test]
fn windows_line_endings_and_extra_blank_lines() {
    let entries = parse_srt("\r\n\r\n1\r\n00:00:01,000 --> 00:00:02,000\r\nHi\r\n\r\n\r\n").unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].text, "Hi");
}

#[test]
fn fraction_variants() {
    let entries = parse_srt(
        "1\n00:00:01.5 --> 00:00:02.05\nshort fractions\n\n2\n01:02:03 --> 01:02:04,001\nno fraction\n",
    )
    .unwrap();

    assert_eq!(entries[0].start, Duration::from_millis(1_500));
    assert_eq!(entries[0].end, Duration::from_millis(2_050));
    assert_eq!(entries[1].start, Duration::from_secs(3_723));
    assert_eq!(entries[1].end, Duration::from_millis(3_724_001));
}

#[test]
fn cue_without_text() {
    let entries = parse_srt("1\n00:00:01,000 --> 00:00:02,000\n\n2\n00:00:03,000 --> 00:00:04,000\nB\n")
        .unwrap();
    assert_eq!(entries[0].text, "");
    assert_eq!(entries[1].text, "B");
}

#[test]
fn empty_input() {
    assert!(parse_srt("").unwrap().is_empty());
    assert!(parse_srt("\u{feff}\n\n").unwrap().is_empty());
}

#[test]
fn malformed_input_reports_the_line() {
    let cases = [
        ("hello\n", 1),
        ("1\n00:00:01,000 -> 00:00:02,000\nA\n", 2),
        ("1\n00:00:01,000 --> 00:61:02,000\nA\n", 2),
        ("1\n00:00:01,0000 --> 00:00:02,000\nA\n", 2),
        ("1\n00:00:01,000 --> 00:00:02,000\nA\n\n2\n", 5),
    ];
    for (content, expected_line) in cases {
        match parse_srt(content) {
            Err(PictureBookError::SubtitleParse { line, .. }) => {
                assert_eq!(line, expected_line, "wrong line for {content:?}");
            }
            other => panic!("Expected SubtitleParse for {content:?}, got {other:?}"),
        }
    }
}

#[test]
fn negative_timestamp_is_an_invalid_subtitle() {
    let result = parse_srt(
        "1\n00:00:01,000 --> 00:00:02,000\nA\n\n2\n-00:00:01,000 --> 00:00:02,000\nB\n",
    );
    assert!(matches!(
        result,
        Err(PictureBookError::InvalidSubtitle { index: 1, .. })
    ));
}

#[test]
fn midpoint_and_display_duration() {
    let entry = SubtitleEntry::new(Duration::from_secs(10), Duration::from_secs(13), "x");
    assert_eq!(entry.display_duration(), Duration::from_secs(3));
    assert_eq!(entry.midpoint(), Duration::from_millis(11_500));
}

#[test]
fn load_srt_file() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("episode.SRT");
    std::fs::write(&path, EPISODE).unwrap();

    let entries = load_subtitle_file(&path).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].text, "Where were you?");
}

#[test]
fn load_missing_srt_file() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let result = load_subtitle_file(dir.path().join("missing.srt"));
    assert!(matches!(result, Err(PictureBookError::IoError(_))));
}
