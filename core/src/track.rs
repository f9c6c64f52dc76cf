// core/src/track.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::geo::{haversine_m, initial_bearing_deg, ms_to_knots};
use crate::models::TrackPoint;
use crate::smoothing::median3;

/// A bare position fix, before speed and bearing are known.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
}

fn check_coords(index: usize, lat: f64, lon: f64) -> Result<()> {
    if !(lat.is_finite() && (-90.0..=90.0).contains(&lat)) {
        return Err(AnalysisError::InvalidTrack {
            index,
            reason: format!("latitude {lat} outside [-90, 90]"),
        });
    }
    if !(lon.is_finite() && (-180.0..=180.0).contains(&lon)) {
        return Err(AnalysisError::InvalidTrack {
            index,
            reason: format!("longitude {lon} outside [-180, 180]"),
        });
    }
    Ok(())
}

fn check_order(index: usize, prev: DateTime<Utc>, cur: DateTime<Utc>) -> Result<()> {
    if cur <= prev {
        return Err(AnalysisError::InvalidTrack {
            index,
            reason: format!("timestamp {cur} does not follow {prev}"),
        });
    }
    Ok(())
}

/// Contract check for a point stream: finite values, strictly increasing time.
pub fn validate_points(points: &[TrackPoint]) -> Result<()> {
    for (i, p) in points.iter().enumerate() {
        check_coords(i, p.latitude, p.longitude)?;
        if !(p.speed_knots.is_finite() && p.speed_knots >= 0.0) {
            return Err(AnalysisError::InvalidTrack {
                index: i,
                reason: format!("speed {} is not a non-negative number", p.speed_knots),
            });
        }
        if !p.bearing.is_finite() {
            return Err(AnalysisError::InvalidTrack {
                index: i,
                reason: "bearing is not finite".into(),
            });
        }
        if i > 0 {
            check_order(i, points[i - 1].time, p.time)?;
        }
    }
    Ok(())
}

/// Turns raw fixes into track points.
///
/// Bearing of each point is the course to the next fix (the last point
/// repeats the previous course). Speed is distance over elapsed time,
/// then median-filtered to knock out single-fix GPS jumps.
pub fn derive_points(fixes: &[Fix]) -> Result<Vec<TrackPoint>> {
    for (i, f) in fixes.iter().enumerate() {
        check_coords(i, f.latitude, f.longitude)?;
        if i > 0 {
            check_order(i, fixes[i - 1].time, f.time)?;
        }
    }
    if fixes.len() < 2 {
        return Ok(fixes
            .iter()
            .map(|f| TrackPoint {
                time: f.time,
                latitude: f.latitude,
                longitude: f.longitude,
                speed_knots: 0.0,
                bearing: 0.0,
            })
            .collect());
    }

    let mut bearings = Vec::with_capacity(fixes.len());
    let mut speeds = Vec::with_capacity(fixes.len());
    for w in fixes.windows(2) {
        let (a, b) = (&w[0], &w[1]);
        let dist = haversine_m(a.latitude, a.longitude, b.latitude, b.longitude);
        let dt = (b.time - a.time).num_milliseconds() as f64 / 1000.0;
        bearings.push(initial_bearing_deg(a.latitude, a.longitude, b.latitude, b.longitude));
        speeds.push(ms_to_knots(dist / dt));
    }
    // final point has no successor
    bearings.push(bearings[bearings.len() - 1]);
    speeds.push(speeds[speeds.len() - 1]);

    let speeds = median3(&speeds);

    Ok(fixes
        .iter()
        .zip(bearings.into_iter().zip(speeds))
        .map(|(f, (bearing, speed_knots))| TrackPoint {
            time: f.time,
            latitude: f.latitude,
            longitude: f.longitude,
            speed_knots,
            bearing,
        })
        .collect())
}

pub fn track_duration_seconds(points: &[TrackPoint]) -> f64 {
    match (points.first(), points.last()) {
        (Some(a), Some(b)) => (b.time - a.time).num_milliseconds() as f64 / 1000.0,
        _ => 0.0,
    }
}
