//! Frame index mapping tests.

use std::time::Duration;

use picture_book::{
    CaptureReason, CaptureTimestamp, FrameIndexMapper, FrameRate, PictureBookError,
    SubtitleTimeline, TimestampPlanner, to_frame_indices,
};

fn at(seconds: f64) -> CaptureTimestamp {
    CaptureTimestamp::new(
        Duration::from_secs_f64(seconds),
        CaptureReason::SubtitleMidpoint,
    )
}

#[test]
fn midpoints_on_the_same_frame_appear_once() {
    let mapper = FrameIndexMapper::new(&FrameRate::Constant(1.0), 100).unwrap();
    let indices = mapper.to_frame_indices(&[at(0.0), at(2.2), at(2.9), at(7.5)]);
    assert_eq!(indices, [0, 2, 7]);
}

#[test]
fn floor_of_time_times_rate() {
    let mapper = FrameIndexMapper::new(&FrameRate::Constant(24.0), 10_000).unwrap();
    assert_eq!(mapper.frame_index(&at(0.0)), 0);
    assert_eq!(mapper.frame_index(&at(1.0)), 24);
    assert_eq!(mapper.frame_index(&at(2.99)), 71);
    assert_eq!(mapper.frame_index(&at(10.5)), 252);
}

#[test]
fn video_end_lands_on_the_last_ntsc_frame() {
    let fps = 30_000.0 / 1_001.0;
    let empty = SubtitleTimeline::load(Vec::new()).unwrap();
    let planner = TimestampPlanner::for_frame_rate(Duration::from_secs(600), fps).unwrap();

    // 300 and 1799 frames at 30000/1001 last 10.01s and 60.0266...s.
    for (frames, duration) in [
        (300, Duration::from_millis(10_010)),
        (1_799, Duration::from_nanos(60_026_633_333)),
    ] {
        let plan = planner.plan(&empty, duration);
        let indices = to_frame_indices(&plan, &FrameRate::Constant(fps), frames).unwrap();
        assert_eq!(indices.last(), Some(&(frames - 1)), "{frames} frames");
    }
}

#[test]
fn clamped_to_last_frame() {
    let mapper = FrameIndexMapper::new(&FrameRate::Constant(25.0), 50).unwrap();
    assert_eq!(mapper.last_frame(), 49);
    assert_eq!(
        mapper.to_frame_indices(&[at(1.0), at(1.99), at(2.5), at(60.0)]),
        [25, 49]
    );
}

#[test]
fn output_is_strictly_increasing() {
    let mapper = FrameIndexMapper::new(&FrameRate::Constant(29.97), 100_000).unwrap();
    let timestamps: Vec<CaptureTimestamp> = (0..500).map(|i| at(i as f64 * 0.37)).collect();
    let indices = mapper.to_frame_indices(&timestamps);

    assert!(indices.len() <= timestamps.len());
    assert!(indices.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn empty_input() {
    let indices = to_frame_indices(&[], &FrameRate::Constant(25.0), 10).unwrap();
    assert!(indices.is_empty());
}

#[test]
fn variable_frame_rate_is_rejected() {
    let result = FrameIndexMapper::new(&FrameRate::Variable { mean_fps: 24.5 }, 100);
    assert!(matches!(
        result,
        Err(PictureBookError::FrameRateUnavailable(_))
    ));
}

#[test]
fn unknown_or_invalid_frame_rate_is_rejected() {
    for frame_rate in [
        FrameRate::Unknown,
        FrameRate::Constant(0.0),
        FrameRate::Constant(-25.0),
        FrameRate::Constant(f64::NAN),
    ] {
        assert!(matches!(
            to_frame_indices(&[at(1.0)], &frame_rate, 100),
            Err(PictureBookError::FrameRateUnavailable(_))
        ));
    }
}

#[test]
fn video_without_frames_is_rejected() {
    assert!(matches!(
        FrameIndexMapper::new(&FrameRate::Constant(25.0), 0),
        Err(PictureBookError::EmptyVideo)
    ));
}
