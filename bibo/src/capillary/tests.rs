use glam::DVec2;

use super::*;
use crate::mask::MaskGeometry;
use crate::measure::Level2D;

fn line(x: f64) -> Polyline {
    Polyline::line(DVec2::new(x, 0.0), DVec2::new(x, 9.0))
}

#[test]
fn test_insert_keeps_order_and_replaces() {
    let mut list = AlongTList::default();
    list.insert(AlongT::new(10, line(1.0)));
    list.insert(AlongT::new(0, line(0.0)));
    list.insert(AlongT::new(5, line(2.0)));
    list.insert(AlongT::new(5, line(3.0)));

    let starts: Vec<_> = list.iter().map(|e| e.start).collect();
    assert_eq!(starts, vec![0, 5, 10]);
    assert_eq!(list.get(1).map(|e| e.polyline.points()[0].x), Some(3.0));
}

#[test]
fn test_at_finds_covering_interval() {
    let mut list = AlongTList::default();
    list.insert(AlongT::new(3, line(0.0)));
    list.insert(AlongT::new(7, line(1.0)));

    assert!(list.at(2).is_none(), "no entry before the first start");
    assert_eq!(list.at(3).map(|e| e.start), Some(3));
    assert_eq!(list.at(6).map(|e| e.start), Some(3));
    assert_eq!(list.at(7).map(|e| e.start), Some(7));
    assert_eq!(list.at(1000).map(|e| e.start), Some(7));
}

#[test]
fn test_interval_is_half_open() {
    let mut list = AlongTList::default();
    list.insert(AlongT::new(0, line(0.0)));
    list.insert(AlongT::new(4, line(1.0)));
    assert_eq!(list.interval(0), Some((0, Some(4))));
    assert_eq!(list.interval(1), Some((4, None)));
    assert_eq!(list.interval(2), None);
}

#[test]
fn test_rebuild_masks_and_height() {
    let mut list = AlongTList::default();
    list.insert(AlongT::new(0, line(0.0)));
    list.insert(AlongT::new(
        2,
        Polyline::line(DVec2::new(1.0, 0.0), DVec2::new(1.0, 4.0)),
    ));
    assert_eq!(list.max_mask_count(), 0);

    list.rebuild_masks(&MaskGeometry::new(16, 16, 0.0));
    assert_eq!(list.get(0).map(|e| e.masks.len()), Some(10));
    assert_eq!(list.get(1).map(|e| e.masks.len()), Some(5));
    assert_eq!(list.max_mask_count(), 10);
}

#[test]
fn test_truncate_after() {
    let mut list = AlongTList::default();
    for start in [0, 2, 4, 6] {
        list.insert(AlongT::new(start, line(start as f64)));
    }
    list.truncate_after(3);
    assert_eq!(list.len(), 2);
}

#[test]
fn test_capillary_defaults() {
    let cap = Capillary::new("1L", Side::Left, 1, line(0.0));
    assert_eq!(cap.along_t.len(), 1);
    assert!(!cap.is_control());
    assert!(cap.with_fly_count(0).is_control());
    assert_eq!(Side::Right.to_string(), "R");
}

#[test]
fn test_ul_per_px() {
    let cap = Capillary::new("1L", Side::Left, 1, line(0.0));
    assert_eq!(cap.ul_per_px(), None);
    let cap = cap.with_volume(5.0, 100.0);
    assert_eq!(cap.ul_per_px(), Some(0.05));
}

#[test]
fn test_measures_top_prefers_corrected() {
    let mut measures = CapillaryMeasures {
        top_raw: Some(Level2D::from_values(0, vec![1.0])),
        ..Default::default()
    };
    assert_eq!(measures.top().and_then(|l| l.get(0)), Some(1.0));
    measures.top_corrected = Some(Level2D::from_values(0, vec![2.0]));
    assert_eq!(measures.top().and_then(|l| l.get(0)), Some(2.0));
}
