// core/tests/test_analyze_session.rs
mod common;

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Duration, Utc};

use common::{close, close_deg, default_params, t0, track, zigzag};
use foillab_core::analyze_session::{analyze_session, AnalyzeInputs};
use foillab_core::error::AnalysisError;
use foillab_core::geo::angle_to_wind;
use foillab_core::metrics::MetricsConfig;
use foillab_core::models::{Confidence, Direction};
use foillab_core::telemetry::AnalysisTelemetry;
use foillab_core::weather::{CachedWindSeed, StaticWindSeed, WindSeedProvider};
use foillab_core::wind::EstimatorConfig;

/// Beat up on 45°/315°, then run back down on 180°.
fn race() -> Vec<foillab_core::models::TrackPoint> {
    track(&[
        (45.0, 12.0, 60),
        (315.0, 12.0, 60),
        (45.0, 12.0, 60),
        (315.0, 12.0, 60),
        (180.0, 18.0, 60),
    ])
}

#[test]
fn pipeline_finds_legs_wind_and_metrics() {
    let pts = race();
    let mut params = default_params();
    params.initial_wind_direction = 10.0;

    let out = analyze_session(AnalyzeInputs::new(&pts, params)).unwrap();

    assert_eq!(out.segments.len(), 5);
    assert!(close_deg(out.wind.direction, 0.0, 0.1), "wind {}", out.wind.direction);
    assert_eq!(out.wind.confidence, Confidence::High);
    assert_eq!(out.metrics.upwind_segments, 4);
    assert_eq!(out.metrics.downwind_segments, 1);
    assert_eq!(out.segments[4].direction, Some(Direction::Downwind));
    assert!(close(out.metrics.avg_upwind_speed_knots, 12.0, 0.05));
    assert_eq!(out.distribution.as_ref().map(|d| d.count), Some(5));
    assert_eq!(out.parameters, params);
}

#[test]
fn manual_wind_recomputes_everything() {
    let pts = race();
    let out = analyze_session(AnalyzeInputs::new(&pts, default_params())).unwrap();
    let manual = out.with_manual_wind(90.0).unwrap();

    assert_eq!(manual.wind.direction, 90.0);
    assert_eq!(manual.wind.iterations, 0);
    assert_eq!(manual.metrics.wind_direction, 90.0);
    assert_eq!(manual.segments.len(), out.segments.len());
    for (s, m) in manual.segments.iter().zip(&manual.metrics.segments) {
        let expected = angle_to_wind(s.bearing, 90.0);
        assert!(close(s.angle_to_wind.unwrap(), expected, 1e-9), "segment {}", s.id);
        assert!(close(m.angle_to_wind, expected, 1e-9), "metrics for segment {}", s.id);
    }
    assert!(out.with_manual_wind(361.0).is_err());
}

#[test]
fn active_subset_only_touches_metrics() {
    let pts = race();
    let out = analyze_session(AnalyzeInputs::new(&pts, default_params())).unwrap();
    let first_two: BTreeSet<usize> = [0, 1].into_iter().collect();
    let sub = out.with_active(Some(first_two.clone()));

    assert_eq!(sub.segments, out.segments);
    assert_eq!(sub.wind, out.wind);
    assert_eq!(sub.metrics.active_segments, 2);
    assert_eq!(sub.active_ids, Some(first_two));
    assert_eq!(sub.with_active(None).metrics, out.metrics);
}

#[test]
fn seed_provider_overrides_parameter_seed() {
    let pts = race();
    let mut params = default_params();
    // from 200 only the run south is upwind, so the loop has nothing to balance
    params.initial_wind_direction = 200.0;

    let stuck = analyze_session(AnalyzeInputs::new(&pts, params)).unwrap();
    assert_eq!(stuck.wind.direction, 200.0);

    let seed = StaticWindSeed { direction: Some(350.0) };
    let mut inputs = AnalyzeInputs::new(&pts, params);
    inputs.wind_seed = Some(&seed);
    let seeded = analyze_session(inputs).unwrap();
    assert_eq!(seeded.wind.initial_direction, 350.0);
    assert!(close_deg(seeded.wind.direction, 0.0, 0.1), "wind {}", seeded.wind.direction);

    let silent = StaticWindSeed { direction: None };
    let mut inputs = AnalyzeInputs::new(&pts, params);
    inputs.wind_seed = Some(&silent);
    assert_eq!(analyze_session(inputs).unwrap().wind.initial_direction, 200.0);
}

struct CountingSeed {
    calls: AtomicUsize,
}

impl WindSeedProvider for CountingSeed {
    fn wind_seed(&self, _start_time: DateTime<Utc>, _lat: f64, _lon: f64) -> Option<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Some(5.0)
    }
}

#[test]
fn cached_seed_hits_backing_provider_once_per_cell() {
    let telemetry = AnalysisTelemetry::new().unwrap();
    let cached = CachedWindSeed::new(CountingSeed { calls: AtomicUsize::new(0) }).with_telemetry(&telemetry);

    assert_eq!(cached.wind_seed(t0(), 59.9012, 10.7034), Some(5.0));
    assert_eq!(cached.wind_seed(t0() + Duration::minutes(20), 59.9008, 10.7029), Some(5.0));
    assert_eq!(cached.wind_seed(t0() + Duration::hours(3), 59.9012, 10.7034), Some(5.0));

    assert_eq!(telemetry.wind_seed_cache_hit_total.get(), 1);
    assert_eq!(telemetry.wind_seed_cache_miss_total.get(), 2);
}

#[test]
fn telemetry_counts_runs_and_segments() {
    let pts = zigzag(4, 60);
    let telemetry = AnalysisTelemetry::new().unwrap();
    let mut inputs = AnalyzeInputs::new(&pts, default_params());
    inputs.telemetry = Some(&telemetry);
    analyze_session(inputs.clone()).unwrap();
    analyze_session(inputs).unwrap();

    assert_eq!(telemetry.runs_total.get(), 2);
    assert_eq!(telemetry.segments_committed_total.get(), 8);
    assert_eq!(telemetry.wind_iterations.get_sample_count(), 2);
    assert!(telemetry.render().contains("foillab_analysis_runs_total 2"));
}

#[test]
fn time_window_limits_the_legs_seen_by_the_estimator() {
    let pts = race();
    let mut inputs = AnalyzeInputs::new(&pts, default_params());
    inputs.time_end = Some(t0() + Duration::seconds(100));
    let out = analyze_session(inputs).unwrap();
    assert_eq!(out.segments.len(), 2);
    assert_eq!(out.wind.total_segments, 2);

    let mut inputs = AnalyzeInputs::new(&pts, default_params());
    inputs.time_start = Some(t0() + Duration::seconds(200));
    inputs.time_end = Some(t0());
    assert!(analyze_session(inputs).is_err());
}

#[test]
fn short_sessions_keep_their_thresholds_when_scaling() {
    let pts = race();
    let mut inputs = AnalyzeInputs::new(&pts, default_params());
    inputs.scale_for_track = true;
    let out = analyze_session(inputs).unwrap();
    assert_eq!(out.parameters, default_params());

    let long = default_params().scaled_for_track(4.0 * 3600.0);
    assert!(close(long.min_duration, 20.0, 1e-9), "x2 at four hours");
    assert!(close(default_params().scaled_for_track(100.0 * 3600.0).min_distance, 150.0, 1e-9));
}

#[test]
fn empty_track_is_a_quiet_result() {
    let out = analyze_session(AnalyzeInputs::new(&[], default_params())).unwrap();
    assert!(out.segments.is_empty());
    assert_eq!(out.wind.confidence, Confidence::None);
    assert_eq!(out.metrics.avg_upwind_speed_knots, 0.0);
    assert!(out.distribution.is_none());
}

#[test]
fn manual_wind_keeps_the_session_leg_filters() {
    // port legs at 40° and 80°, starboard legs at 40° off a northerly
    let legs: Vec<_> = [40.0, 80.0, 320.0, 80.0, 40.0, 80.0, 320.0, 80.0, 40.0, 320.0]
        .iter()
        .map(|&b| (b, 12.0, 60))
        .collect();
    let pts = track(&legs);
    let mut inputs = AnalyzeInputs::new(&pts, default_params());
    inputs.estimator = EstimatorConfig {
        best_attempts_fraction: Some(0.4),
        ..EstimatorConfig::default()
    };
    let out = analyze_session(inputs).unwrap();
    assert_eq!(out.segments.len(), 10);
    assert_eq!(out.wind.confidence, Confidence::High);

    let same = out.with_manual_wind(out.wind.direction).unwrap();
    assert_eq!(same.estimator_config, out.estimator_config);
    assert_eq!(same.wind.port_average_angle, out.wind.port_average_angle);
    assert_eq!(same.wind.starboard_average_angle, out.wind.starboard_average_angle);
    assert_eq!(same.wind.confidence, Confidence::High);
}

#[test]
fn rejects_zero_top_k() {
    let pts = race();
    let mut inputs = AnalyzeInputs::new(&pts, default_params());
    inputs.metrics = MetricsConfig { top_k: 0 };
    assert!(matches!(
        analyze_session(inputs),
        Err(AnalysisError::InvalidParameter { name: "top_k", .. })
    ));
}
