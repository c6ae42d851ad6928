use glam::DVec2;

use super::*;
use crate::capillary::Side;
use crate::image::MemoryFrameSource;
use crate::test_utils::{init_tracing, textured_frame, vertical_capillary, FlakySource};

fn exact_config() -> TrackerConfig {
    TrackerConfig {
        correlation: PhaseCorrelationConfig {
            use_windowing: false,
            subpixel: SubpixelMethod::None,
            min_peak_value: 0.0,
        },
        ..Default::default()
    }
}

fn roi() -> Polyline {
    Polyline::line(DVec2::new(45.0, 25.0), DVec2::new(45.0, 55.0))
}

#[test]
fn test_identical_frames_do_not_move() {
    let frame = textured_frame(128, 96, (0, 0));
    let step = track_step(&roi(), &frame, &frame, &TrackerConfig::default());

    assert_eq!(step.outcome, TrackOutcome::Tracked);
    assert!(step.translation.length() < 1e-6, "{:?}", step.translation);
    assert!(step.roi.approx_eq(&roi(), 1e-6));
}

#[test]
fn test_translation_is_recovered() {
    let previous = textured_frame(128, 96, (0, 0));
    let current = textured_frame(128, 96, (3, -2));

    let step = track_step(&roi(), &previous, &current, &exact_config());

    assert_eq!(step.outcome, TrackOutcome::Tracked);
    assert_eq!(step.translation, DVec2::new(3.0, -2.0));
    assert!(step.roi.approx_eq(&roi().translated(DVec2::new(3.0, -2.0)), 1e-9));
}

#[test]
fn test_subpixel_stays_close_on_integer_shift() {
    let previous = textured_frame(128, 96, (0, 0));
    let current = textured_frame(128, 96, (-4, 1));

    let step = track_step(&roi(), &previous, &current, &TrackerConfig::default());

    assert_eq!(step.outcome, TrackOutcome::Tracked);
    assert!(
        step.translation.distance(DVec2::new(-4.0, 1.0)) < 0.5,
        "{:?}",
        step.translation
    );
}

#[test]
fn test_small_crop_copies_roi_forward() {
    let previous = textured_frame(24, 12, (0, 0));
    let current = textured_frame(24, 12, (2, 0));
    let small = Polyline::line(DVec2::new(10.0, 2.0), DVec2::new(10.0, 8.0));

    let step = track_step(&small, &previous, &current, &exact_config());

    assert_eq!(step.outcome, TrackOutcome::CropTooSmall);
    assert_eq!(step.roi, small);
    assert_eq!(step.translation, DVec2::ZERO);
}

#[test]
fn test_unusable_frames_fail_softly() {
    let previous = textured_frame(128, 96, (0, 0));
    let other_size = textured_frame(100, 96, (0, 0));
    let step = track_step(&roi(), &previous, &other_size, &exact_config());
    assert_eq!(step.outcome, TrackOutcome::Failed);
    assert_eq!(step.roi, roi());

    let config = TrackerConfig {
        channel: 2,
        ..exact_config()
    };
    let step = track_step(&roi(), &previous, &previous, &config);
    assert_eq!(step.outcome, TrackOutcome::Failed);
}

#[test]
fn test_forward_tracking_chains_steps() {
    init_tracing();
    let frames = (0..4).map(|t| textured_frame(96, 64, (t, 0))).collect();
    let source = MemoryFrameSource::new(frames, 1_000);
    let mut caps = vec![vertical_capillary("1L", Side::Left, 1, 40.0, 15.0, 45.0)];

    let map = track_capillaries(
        &mut caps,
        &source,
        0..=3,
        Direction::Forward,
        &exact_config(),
        &FixedDecision(MismatchDecision::Abort),
        &StopFlag::new(),
    )
    .unwrap();

    assert_eq!(map.len(), 4);
    assert_eq!(caps[0].along_t.len(), 4);
    for t in 0..4 {
        let x = caps[0].polyline_at(t).unwrap().points()[0].x;
        assert_eq!(x, 40.0 + t as f64, "frame {t}");
        let tracked = map[&t][0].as_ref().unwrap();
        assert_eq!(tracked.points()[0].x, 40.0 + t as f64);
    }
}

#[test]
fn test_missing_frame_copies_forward() {
    let frames = vec![
        textured_frame(96, 64, (0, 0)),
        textured_frame(96, 64, (1, 0)),
        textured_frame(96, 64, (2, 0)),
    ];
    let source = FlakySource {
        inner: MemoryFrameSource::new(frames, 1_000),
        broken: 1,
    };
    let mut caps = vec![vertical_capillary("1L", Side::Left, 1, 40.0, 15.0, 45.0)];

    track_capillaries(
        &mut caps,
        &source,
        0..=2,
        Direction::Forward,
        &exact_config(),
        &FixedDecision(MismatchDecision::Abort),
        &StopFlag::new(),
    )
    .unwrap();

    let starts: Vec<usize> = caps[0].along_t.iter().map(|e| e.start).collect();
    assert_eq!(starts, vec![0, 2], "no new geometry at the unreadable frame");
    assert_eq!(caps[0].polyline_at(2).unwrap().points()[0].x, 42.0);
}

fn backward_setup() -> (Vec<Capillary>, MemoryFrameSource) {
    let frames = (0..6).map(|_| textured_frame(64, 64, (0, 0))).collect();
    let source = MemoryFrameSource::new(frames, 1_000);
    let mut cap = vertical_capillary("1L", Side::Left, 1, 20.0, 10.0, 40.0);
    cap.along_t.insert(AlongT::new(
        5,
        Polyline::new(vec![
            DVec2::new(20.0, 10.0),
            DVec2::new(20.0, 25.0),
            DVec2::new(20.0, 40.0),
        ]),
    ));
    (vec![cap], source)
}

#[test]
fn test_backward_mismatch_abort() {
    let (mut caps, source) = backward_setup();

    let result = track_capillaries(
        &mut caps,
        &source,
        0..=5,
        Direction::Backward,
        &TrackerConfig::default(),
        &FixedDecision(MismatchDecision::Abort),
        &StopFlag::new(),
    );

    match result {
        Err(Error::TrackingAborted { capillary, mismatch }) => {
            assert_eq!(capillary, "1L");
            assert_eq!(mismatch.current_points, 3);
            assert_eq!(mismatch.reference_points, 2);
        }
        other => panic!("expected abort, got {other:?}"),
    }
    assert_eq!(caps[0].along_t.len(), 2, "geometry untouched");
}

#[test]
fn test_backward_mismatch_resample() {
    let (mut caps, source) = backward_setup();

    let map = track_capillaries(
        &mut caps,
        &source,
        0..=5,
        Direction::Backward,
        &TrackerConfig::default(),
        &FixedDecision(MismatchDecision::Resample),
        &StopFlag::new(),
    )
    .unwrap();

    assert_eq!(map[&0][0].as_ref().unwrap().point_count(), 2);
    assert_eq!(caps[0].along_t.len(), 2, "resampled ROI matches the earlier geometry");
}

#[test]
fn test_backward_mismatch_continue_with_callback() {
    let (mut caps, source) = backward_setup();
    let resolver = |capillary: &Capillary, mismatch: &LengthMismatch| {
        assert_eq!(capillary.name, "1L");
        assert!(mismatch.to_string().contains("3 points"));
        MismatchDecision::ContinueAnyway
    };

    track_capillaries(
        &mut caps,
        &source,
        0..=5,
        Direction::Backward,
        &TrackerConfig::default(),
        &resolver,
        &StopFlag::new(),
    )
    .unwrap();

    assert_eq!(caps[0].along_t.len(), 6);
    assert_eq!(caps[0].polyline_at(0).unwrap().point_count(), 3);
}

#[test]
fn test_stop_flag_cancels_between_steps() {
    let (mut caps, source) = backward_setup();
    let stop = StopFlag::new();
    stop.request_stop();

    let result = track_capillaries(
        &mut caps,
        &source,
        0..=4,
        Direction::Forward,
        &TrackerConfig::default(),
        &FixedDecision(MismatchDecision::Abort),
        &stop,
    );
    assert!(matches!(result, Err(Error::Cancelled { stage: "tracking" })));
}

#[test]
fn test_length_tolerance() {
    let a = Polyline::line(DVec2::ZERO, DVec2::new(0.0, 100.0));
    let b = Polyline::line(DVec2::ZERO, DVec2::new(0.0, 104.0));
    assert!(check_length(&b, &a, LengthTolerance::Pixels(5.0)).is_none());
    assert!(check_length(&b, &a, LengthTolerance::Pixels(3.0)).is_some());
    assert!(check_length(&b, &a, LengthTolerance::Relative(0.05)).is_none());
    assert!(check_length(&b, &a, LengthTolerance::Relative(0.01)).is_some());
}
