// core/tests/test_metrics.rs
mod common;

use std::collections::BTreeSet;

use common::{close, seg};
use foillab_core::metrics::{compute_metrics, compute_metrics_with, vmg_knots, MetricsConfig};
use foillab_core::models::{Confidence, Direction, Segment, Tack};
use foillab_core::wind::{apply_wind, assess_wind};

const COS45: f64 = std::f64::consts::FRAC_1_SQRT_2;

fn session() -> Vec<Segment> {
    vec![
        seg(0, 45.0, 10.0, 100.0),
        seg(1, 315.0, 6.0, 300.0),
        seg(2, 180.0, 15.0, 500.0),
    ]
}

fn ids(v: &[usize]) -> BTreeSet<usize> {
    v.iter().copied().collect()
}

#[test]
fn vmg_is_signed_projection_on_the_wind_axis() {
    assert!(close(vmg_knots(10.0, 45.0), 10.0 * COS45, 1e-12));
    assert!(close(vmg_knots(10.0, 0.0), 10.0, 1e-12));
    assert!(close(vmg_knots(10.0, 90.0), 0.0, 1e-12));
    assert!(vmg_knots(10.0, 150.0) < 0.0, "running away from the wind is negative");
}

#[test]
fn aggregates_cover_active_upwind_legs() {
    let segs = session();
    let (wind, _) = assess_wind(&segs, 0.0).unwrap();
    let m = compute_metrics(&segs, &wind, None);

    assert_eq!(m.wind_direction, 0.0);
    assert_eq!(m.confidence, wind.confidence);
    assert_eq!(m.segments.len(), 3);
    assert_eq!((m.active_segments, m.upwind_segments, m.downwind_segments), (3, 2, 1));
    assert_eq!((m.port_segments, m.starboard_segments), (1, 1));
    assert!(close(m.total_distance_meters, 900.0, 1e-9));
    assert!(close(m.max_speed_knots, 16.0, 1e-9));

    // (10*100 + 6*300) / 400
    assert!(close(m.avg_upwind_speed_knots, 7.0, 1e-9), "avg upwind {}", m.avg_upwind_speed_knots);
    assert!(close(m.avg_upwind_angle.unwrap(), 45.0, 1e-9));
    assert!(close(m.session_vmg_knots.unwrap(), 7.0 * COS45, 1e-9));

    let best = m.best_vmg.unwrap();
    assert_eq!(best.segment_id, 0);
    assert!(close(best.vmg_knots, 10.0 * COS45, 1e-9));

    let port = m.best_port.unwrap();
    assert_eq!((port.segment_id, port.speed_knots), (0, 10.0));
    let stbd = m.best_starboard.unwrap();
    assert_eq!(stbd.segment_id, 1);

    let downwind = &m.segments[2];
    assert_eq!(downwind.direction, Direction::Downwind);
    assert!(close(downwind.vmg_knots, -15.0, 1e-9));
}

#[test]
fn toggling_a_leg_changes_the_weighted_average() {
    let segs = session();
    let (wind, _) = assess_wind(&segs, 0.0).unwrap();

    let without_b = compute_metrics(&segs, &wind, Some(&ids(&[0, 2])));
    assert!(close(without_b.avg_upwind_speed_knots, 10.0, 1e-9));
    assert_eq!(without_b.active_segments, 2);
    assert!(without_b.best_starboard.is_none());
    assert!(!without_b.segments[1].active, "inactive legs stay listed, flagged");
    assert!(close(without_b.segments[1].vmg_knots, 6.0 * COS45, 1e-9));

    let without_a = compute_metrics(&segs, &wind, Some(&ids(&[1, 2])));
    assert!(close(without_a.avg_upwind_speed_knots, 6.0, 1e-9));
}

#[test]
fn nothing_active_gives_neutral_values() {
    let segs = session();
    let (wind, _) = assess_wind(&segs, 0.0).unwrap();
    let m = compute_metrics(&segs, &wind, Some(&BTreeSet::new()));

    assert_eq!(m.active_segments, 0);
    assert_eq!(m.avg_upwind_speed_knots, 0.0);
    assert!(m.session_vmg_knots.is_none());
    assert!(m.best_vmg.is_none());
    assert!(m.representative_vmg_knots.is_none());
    assert_eq!(m.total_distance_meters, 0.0);
}

#[test]
fn empty_session_gives_zero_metrics() {
    let (wind, _) = assess_wind(&[], 90.0).unwrap();
    let m = compute_metrics(&[], &wind, None);
    assert_eq!(m.confidence, Confidence::None);
    assert!(m.segments.is_empty());
    assert_eq!(m.avg_upwind_speed_knots, 0.0);
    assert_eq!(m.max_speed_knots, 0.0);
}

#[test]
fn angles_come_from_the_estimate_not_stale_annotations() {
    let segs = session();
    // annotate for an easterly, then score against a northerly
    let stale = apply_wind(&segs, 90.0).unwrap();
    let (north, _) = assess_wind(&segs, 0.0).unwrap();

    let m = compute_metrics(&stale, &north, None);
    assert!(close(m.segments[0].angle_to_wind, 45.0, 1e-9));
    assert_eq!(m.segments[0].tack, Tack::Port);
    assert_eq!(m.segments[2].direction, Direction::Downwind);
    assert_eq!(m, compute_metrics(&segs, &north, None));
}

#[test]
fn representative_vmg_uses_top_k_legs() {
    let segs = vec![
        seg(0, 45.0, 10.0, 100.0),
        seg(1, 45.0, 6.0, 100.0),
        seg(2, 45.0, 2.0, 100.0),
        seg(3, 45.0, 8.0, 100.0),
    ];
    let (wind, _) = assess_wind(&segs, 0.0).unwrap();

    let m = compute_metrics(&segs, &wind, None);
    // 10, 8 and 6 kn at 45°
    assert!(close(m.representative_vmg_knots.unwrap(), 8.0 * COS45, 1e-9));

    let top1 = compute_metrics_with(&segs, &wind, None, &MetricsConfig { top_k: 1 });
    assert!(close(top1.representative_vmg_knots.unwrap(), 10.0 * COS45, 1e-9));
}

#[test]
fn repeated_calls_are_identical() {
    let segs = session();
    let (wind, _) = assess_wind(&segs, 12.5).unwrap();
    let active = ids(&[0, 1]);
    let a = compute_metrics(&segs, &wind, Some(&active));
    let b = compute_metrics(&segs, &wind, Some(&active));
    assert_eq!(a, b);
}

#[test]
fn zero_top_k_is_rejected_by_validate() {
    assert!(MetricsConfig { top_k: 0 }.validate().is_err());
    assert!(MetricsConfig::default().validate().is_ok());
}
