// core/tests/common/mod.rs
// Synthetic tracks: 1 Hz points sailed leg by leg on a flat-earth step.
#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};

use foillab_core::geo::{EARTH_RADIUS_M, KNOTS_PER_MS};
use foillab_core::models::{AnalysisParameters, Segment, TrackPoint};

pub fn knots_to_ms(v_kn: f64) -> f64 {
    v_kn / KNOTS_PER_MS
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// One leg: (bearing, speed in knots, seconds).
pub type Leg = (f64, f64, usize);

pub fn track(legs: &[Leg]) -> Vec<TrackPoint> {
    let (mut lat, mut lon) = (59.90, 10.70);
    let mut out = Vec::new();
    let mut sec = 0i64;
    for &(bearing, speed, secs) in legs {
        for _ in 0..secs {
            out.push(TrackPoint {
                time: t0() + Duration::seconds(sec),
                latitude: lat,
                longitude: lon,
                speed_knots: speed,
                bearing,
            });
            let d = knots_to_ms(speed);
            let b = bearing.to_radians();
            lat += (d * b.cos() / EARTH_RADIUS_M).to_degrees();
            lon += (d * b.sin() / (EARTH_RADIUS_M * lat.to_radians().cos())).to_degrees();
            sec += 1;
        }
    }
    out
}

/// Upwind zigzag with the wind from north: `n` legs alternating 45° / 315°.
pub fn zigzag(n: usize, secs: usize) -> Vec<TrackPoint> {
    let legs: Vec<Leg> = (0..n)
        .map(|i| if i % 2 == 0 { (45.0, 12.0, secs) } else { (315.0, 12.0, secs) })
        .collect();
    track(&legs)
}

pub fn params(angle_tolerance: f64, min_duration: f64, min_distance: f64, min_speed: f64) -> AnalysisParameters {
    AnalysisParameters {
        angle_tolerance,
        min_duration,
        min_distance,
        min_speed,
        initial_wind_direction: 0.0,
    }
}

pub fn default_params() -> AnalysisParameters {
    params(15.0, 10.0, 50.0, 5.0)
}

/// Bare segment as the detector would emit it (no wind annotation).
pub fn seg(id: usize, bearing: f64, speed_knots: f64, distance_meters: f64) -> Segment {
    let duration = if speed_knots > 0.0 {
        distance_meters / knots_to_ms(speed_knots)
    } else {
        0.0
    };
    let start = t0() + Duration::seconds(id as i64 * 600);
    Segment {
        id,
        start_index: id * 100,
        end_index: id * 100 + 50,
        start_time: start,
        end_time: start + Duration::milliseconds((duration * 1000.0) as i64),
        duration_seconds: duration,
        distance_meters,
        avg_speed_knots: speed_knots,
        max_speed_knots: speed_knots + 1.0,
        bearing,
        point_count: 51,
        tack: None,
        direction: None,
        angle_to_wind: None,
    }
}

pub fn close(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() < eps
}

/// Angular closeness, so 359.9 and 0.0 compare equal.
pub fn close_deg(a: f64, b: f64, eps: f64) -> bool {
    foillab_core::geo::signed_angle_diff(a, b).abs() < eps
}
