use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::capillary::Side;
use crate::image::MemoryFrameSource;
use crate::kymograph::{build_kymographs, KymographConfig};
use crate::test_utils::{frames_from_fn, init_tracing, vertical_capillary, FlakySource};
use crate::timing::BinTiming;

/// Capillary whose kymograph is a step edge: rows at or below `edges[t]` are bright.
fn step_capillary(edges: &[usize], height: usize) -> Capillary {
    let kymograph = RasterImage::from_fn(edges.len(), height, 1, |x, y, _| {
        if y >= edges[x] {
            200.0
        } else {
            10.0
        }
    });
    with_kymograph(kymograph)
}

fn with_kymograph(kymograph: RasterImage) -> Capillary {
    let mut cap = vertical_capillary("1L", Side::Left, 1, 0.0, 0.0, 1.0);
    cap.kymograph = Some(kymograph);
    cap
}

fn config(jitter: usize) -> LevelConfig {
    LevelConfig {
        threshold: 128.0,
        jitter,
        ..Default::default()
    }
}

fn tops(cap: &Capillary) -> Vec<f64> {
    cap.measures.top_raw.as_ref().unwrap().values().to_vec()
}

#[test]
fn test_top_follows_step_edge() {
    init_tracing();
    let edges = [12, 11, 11, 9, 8, 8, 10];
    let mut caps = vec![step_capillary(&edges, 20)];

    let report = detect_levels(&mut caps, &config(3)).unwrap();

    assert_eq!(report.completed, 1);
    let expected: Vec<f64> = edges.iter().map(|&e| e as f64).collect();
    assert_eq!(tops(&caps[0]), expected);
    let bottom = caps[0].measures.bottom.as_ref().unwrap();
    assert!(bottom.values().iter().all(|&b| b == 19.0));
}

#[test]
fn test_jump_is_limited_to_jitter() {
    let edges = [15, 15, 5, 5, 5, 5, 5, 5];
    let mut caps = vec![step_capillary(&edges, 20)];

    detect_levels(&mut caps, &config(2)).unwrap();

    // The window never reaches the new edge in one step; the top walks up.
    assert_eq!(tops(&caps[0]), vec![15.0, 15.0, 13.0, 11.0, 9.0, 7.0, 5.0, 5.0]);
}

#[test]
fn test_downward_jump_is_limited_to_jitter() {
    let edges = [5, 5, 15, 15, 15, 15, 15, 15, 15, 15];
    let mut caps = vec![step_capillary(&edges, 20)];

    detect_levels(&mut caps, &config(2)).unwrap();

    // The edge is found below the window and the top walks down towards it.
    assert_eq!(
        tops(&caps[0]),
        vec![5.0, 5.0, 7.0, 9.0, 11.0, 13.0, 15.0, 15.0, 15.0, 15.0]
    );
}

#[test]
fn test_continuity_on_random_edges() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..20 {
        let jitter = rng.random_range(1..5);
        let edges: Vec<usize> = (0..40).map(|_| rng.random_range(2..38)).collect();
        let mut kymo = step_capillary(&edges, 40).kymograph.unwrap();
        // blank out a few columns to exercise the fallback path
        for _ in 0..5 {
            let x = rng.random_range(0..40);
            for y in 0..40 {
                kymo.set_pixel(x, y, 0, 0.0);
            }
        }
        let mut caps = vec![with_kymograph(kymo)];

        detect_levels(&mut caps, &config(jitter)).unwrap();

        let tops = tops(&caps[0]);
        for pair in tops.windows(2) {
            assert!(
                (pair[1] - pair[0]).abs() <= jitter as f64,
                "jump {} -> {} exceeds jitter {jitter}",
                pair[0],
                pair[1]
            );
        }
    }
}

#[test]
fn test_invalid_column_repeats_previous() {
    let mut kymo = step_capillary(&[6, 6, 6, 6], 12).kymograph.unwrap();
    for y in 0..12 {
        kymo.set_pixel(2, y, 0, 0.0);
    }
    let mut caps = vec![with_kymograph(kymo)];

    detect_levels(&mut caps, &config(3)).unwrap();

    assert_eq!(tops(&caps[0]), vec![6.0; 4]);
    assert_eq!(caps[0].measures.bottom.as_ref().unwrap().get(2), Some(11.0));
}

#[test]
fn test_invalid_first_column_takes_first_valid_level() {
    // Column 0 is blank; the edge of the others is far below any jitter window
    // around the top of the search rectangle.
    let kymo = RasterImage::from_fn(3, 20, 1, |x, y, _| {
        if x > 0 && y >= 12 {
            200.0
        } else {
            0.0
        }
    });
    let mut caps = vec![with_kymograph(kymo)];

    detect_levels(&mut caps, &config(3)).unwrap();

    assert_eq!(tops(&caps[0]), vec![12.0; 3]);
    assert_eq!(caps[0].measures.bottom.as_ref().unwrap().values(), &[19.0; 3]);
}

#[test]
fn test_all_invalid_columns_use_search_bounds() {
    let kymo = RasterImage::from_fn(2, 10, 1, |_, _, _| 0.0);
    let mut caps = vec![with_kymograph(kymo)];
    let config = LevelConfig {
        row_range: Some((2, 8)),
        ..config(3)
    };

    detect_levels(&mut caps, &config).unwrap();

    assert_eq!(tops(&caps[0]), vec![2.0, 2.0]);
    assert_eq!(caps[0].measures.bottom.as_ref().unwrap().values(), &[8.0, 8.0]);
}

#[test]
fn test_failed_first_bin_keeps_deep_edge() {
    let frames = frames_from_fn(8, 32, 6, |_, y, _| if y >= 15 { 200.0 } else { 10.0 });
    let source = FlakySource {
        inner: MemoryFrameSource::new(frames, 1_000),
        broken: 0,
    };
    let mut caps = vec![vertical_capillary("1L", Side::Left, 1, 3.0, 0.0, 29.0)];
    let kymo_config = KymographConfig { mask_radius: 0.0 };

    let report =
        build_kymographs(&mut caps, &source, &BinTiming::new(0, 5_000, 1_000), &kymo_config)
            .unwrap();
    assert_eq!(report.failed, 1);
    detect_levels(&mut caps, &config(3)).unwrap();

    assert_eq!(tops(&caps[0]), vec![15.0; 6]);
}

#[test]
fn test_less_than_comparison() {
    let kymo = RasterImage::from_fn(3, 10, 1, |_, y, _| if y >= 4 { 5.0 } else { 200.0 });
    let mut caps = vec![with_kymograph(kymo)];
    let config = LevelConfig {
        threshold: 50.0,
        comparison: Comparison::LessThan,
        ..config(3)
    };

    detect_levels(&mut caps, &config).unwrap();
    assert_eq!(tops(&caps[0]), vec![4.0; 3]);
}

#[test]
fn test_right_to_left_order() {
    let edges = [2, 8, 8, 8];
    let mut caps = vec![step_capillary(&edges, 12)];
    let config = LevelConfig {
        order: ColumnOrder::RightToLeft,
        ..config(2)
    };

    detect_levels(&mut caps, &config).unwrap();

    // scanning starts at the right, so the jump is limited at column 0
    assert_eq!(tops(&caps[0]), vec![6.0, 8.0, 8.0, 8.0]);
}

#[test]
fn test_column_range_merges_into_existing() {
    let mut cap = step_capillary(&[5, 5, 4, 4, 5, 5], 12);
    cap.measures.top_raw = Some(Level2D::from_values(0, vec![5.0, 5.0, 7.0, 7.0, 5.0, 5.0]));
    cap.measures.bottom = Some(Level2D::from_values(0, vec![11.0; 6]));
    let mut caps = vec![cap];
    let config = LevelConfig {
        column_range: Some((2, 3)),
        ..config(3)
    };

    detect_levels(&mut caps, &config).unwrap();

    assert_eq!(tops(&caps[0]), vec![5.0, 5.0, 4.0, 4.0, 5.0, 5.0]);
    assert_eq!(caps[0].measures.top_raw.as_ref().unwrap().first_index(), 0);
}

#[test]
fn test_column_range_is_seeded_from_existing_top() {
    // The edge at column 1 is far from the existing top; seeding limits the jump.
    let mut cap = step_capillary(&[3, 10, 10, 10, 10], 14);
    cap.measures.top_raw = Some(Level2D::from_values(0, vec![3.0; 5]));
    let mut caps = vec![cap];
    let config = LevelConfig {
        column_range: Some((1, 4)),
        ..config(2)
    };

    detect_levels(&mut caps, &config).unwrap();

    assert_eq!(tops(&caps[0]), vec![3.0, 5.0, 7.0, 9.0, 10.0]);
}

#[test]
fn test_column_range_past_kymograph_is_reported() {
    let mut caps = vec![step_capillary(&[4, 4, 4, 4], 10)];
    let config = LevelConfig {
        column_range: Some((10, 12)),
        ..config(2)
    };

    let report = detect_levels(&mut caps, &config).unwrap();
    assert_eq!(report.failed, 1);
    assert!(caps[0].measures.top_raw.is_none());

    let plane = caps[0].kymograph.as_ref().unwrap().plane(0).clone();
    let err = detect_on_planes(&caps[0], &plane, None, &config).err().unwrap();
    assert!(
        matches!(err, Error::ColumnRangeOutside { first: 10, width: 4, .. }),
        "{err}"
    );
}

#[test]
fn test_refinement_best_score() {
    // red has the edge at row 5, green peaks at row 7
    let kymo = RasterImage::from_fn(3, 16, 3, |_, y, c| match c {
        0 => {
            if y >= 5 {
                200.0
            } else {
                0.0
            }
        }
        1 => 100.0 - 10.0 * (y as f32 - 7.0).abs(),
        _ => 0.0,
    });
    let mut caps = vec![with_kymograph(kymo)];
    let config = LevelConfig {
        transform: ImageTransform::Red,
        refinement: Some(RefinementConfig {
            transform: ImageTransform::Green,
            jitter: 3,
            policy: RefinePolicy::BestScore {
                mode: ScoreMode::Max,
            },
        }),
        ..config(10)
    };

    detect_levels(&mut caps, &config).unwrap();
    assert_eq!(tops(&caps[0]), vec![7.0; 3]);
}

#[test]
fn test_refinement_first_crossing_outside_window_keeps_top() {
    let kymo = RasterImage::from_fn(2, 16, 3, |_, y, c| match c {
        0 if y >= 5 => 200.0,
        1 if y >= 12 => 200.0,
        _ => 0.0,
    });
    let mut caps = vec![with_kymograph(kymo)];
    let config = LevelConfig {
        transform: ImageTransform::Red,
        refinement: Some(RefinementConfig {
            transform: ImageTransform::Green,
            jitter: 2,
            policy: RefinePolicy::FirstCrossing {
                threshold: 100.0,
                comparison: Comparison::GreaterThan,
            },
        }),
        ..config(10)
    };

    detect_levels(&mut caps, &config).unwrap();
    assert_eq!(tops(&caps[0]), vec![5.0, 5.0]);
}

#[test]
fn test_unavailable_transform_skips_only_that_capillary() {
    let gray = step_capillary(&[4, 4], 10);
    let mut rgb = with_kymograph(RasterImage::from_fn(2, 10, 3, |_, y, _| {
        if y >= 4 {
            200.0
        } else {
            0.0
        }
    }));
    rgb.name = "1R".to_string();
    let mut caps = vec![gray, rgb];
    let config = LevelConfig {
        transform: ImageTransform::Red,
        ..config(3)
    };

    let report = detect_levels(&mut caps, &config).unwrap();

    assert_eq!(report.completed, 1);
    assert_eq!(report.failed, 1);
    assert!(caps[0].measures.top_raw.is_none());
    assert_eq!(tops(&caps[1]), vec![4.0, 4.0]);
}

#[test]
fn test_missing_kymograph_fails_that_capillary() {
    let mut bare = vertical_capillary("2L", Side::Left, 2, 0.0, 0.0, 1.0);
    bare.kymograph = None;
    let mut caps = vec![bare, step_capillary(&[3], 8)];

    let report = detect_levels(&mut caps, &config(2)).unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(tops(&caps[1]), vec![3.0]);
}

#[test]
fn test_frame_profiles_match_kymograph_levels() {
    let frames = frames_from_fn(16, 24, 8, |_, y, t| 20.0 * (y + t) as f32);
    let source = MemoryFrameSource::new(frames, 1_000);
    let timing = BinTiming::new(0, 7_000, 1_000);
    let kymo_config = KymographConfig { mask_radius: 0.0 };
    let level_config = config(2);

    let mut from_kymo = vec![vertical_capillary("1L", Side::Left, 1, 4.0, 0.0, 20.0)];
    build_kymographs(&mut from_kymo, &source, &timing, &kymo_config).unwrap();
    detect_levels(&mut from_kymo, &level_config).unwrap();

    let mut from_frames = vec![vertical_capillary("1L", Side::Left, 1, 4.0, 0.0, 20.0)];
    let report =
        detect_levels_from_frames(&mut from_frames, &source, &timing, &kymo_config, &level_config)
            .unwrap();

    assert_eq!(report.completed, 8);
    assert!(from_frames[0].kymograph.is_none(), "no kymograph is built");
    assert_eq!(tops(&from_frames[0]), tops(&from_kymo[0]));
    assert_eq!(
        tops(&from_frames[0]),
        vec![7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0, 0.0]
    );
}

#[test]
fn test_frame_profiles_skip_unavailable_transform() {
    let frames = frames_from_fn(8, 8, 2, |_, y, _| y as f32);
    let source = MemoryFrameSource::new(frames, 1_000);
    let mut caps = vec![vertical_capillary("1L", Side::Left, 1, 2.0, 0.0, 7.0)];
    let config = LevelConfig {
        transform: ImageTransform::G2MinusRb,
        ..config(2)
    };

    let report = detect_levels_from_frames(
        &mut caps,
        &source,
        &BinTiming::new(0, 1_000, 1_000),
        &KymographConfig::default(),
        &config,
    )
    .unwrap();

    assert_eq!(report.failed, 0, "frames themselves were fine");
    assert!(caps[0].measures.top_raw.is_none());
}
