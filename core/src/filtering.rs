// core/src/filtering.rs
// Time and area filters, applied after detection and before wind estimation
// so the estimate only sees the chosen part of the session.
use chrono::{DateTime, Utc};
use log::info;

use crate::error::{AnalysisError, Result};
use crate::models::{Segment, TrackPoint};

/// Keeps segments overlapping `[start, end]`. Either bound may be open.
pub fn filter_by_time(
    segments: &[Segment],
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<Vec<Segment>> {
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(AnalysisError::InvalidFilter(format!(
                "time range start {s} is after end {e}"
            )));
        }
    }
    let kept: Vec<Segment> = segments
        .iter()
        .filter(|seg| start.map_or(true, |s| seg.end_time >= s))
        .filter(|seg| end.map_or(true, |e| seg.start_time <= e))
        .cloned()
        .collect();
    info!("time filter: {} -> {} segments", segments.len(), kept.len());
    Ok(kept)
}

fn check_bounds(name: &str, (lo, hi): (f64, f64), limit: f64) -> Result<()> {
    if !(lo.is_finite() && hi.is_finite()) || lo < -limit || hi > limit {
        return Err(AnalysisError::InvalidFilter(format!(
            "{name} bounds ({lo}, {hi}) must lie within [-{limit}, {limit}]"
        )));
    }
    if lo > hi {
        return Err(AnalysisError::InvalidFilter(format!("{name} min {lo} exceeds max {hi}")));
    }
    Ok(())
}

/// Keeps segments with at least one of their points inside the box.
pub fn filter_by_bounds(
    segments: &[Segment],
    points: &[TrackPoint],
    lat_bounds: Option<(f64, f64)>,
    lon_bounds: Option<(f64, f64)>,
) -> Result<Vec<Segment>> {
    if lat_bounds.is_none() && lon_bounds.is_none() {
        return Ok(segments.to_vec());
    }
    let (lat_min, lat_max) = lat_bounds.unwrap_or((-90.0, 90.0));
    let (lon_min, lon_max) = lon_bounds.unwrap_or((-180.0, 180.0));
    check_bounds("latitude", (lat_min, lat_max), 90.0)?;
    check_bounds("longitude", (lon_min, lon_max), 180.0)?;

    let inside = |p: &TrackPoint| {
        (lat_min..=lat_max).contains(&p.latitude) && (lon_min..=lon_max).contains(&p.longitude)
    };

    let kept: Vec<Segment> = segments
        .iter()
        .filter(|seg| {
            points
                .get(seg.start_index..=seg.end_index)
                .map_or(false, |pts| pts.iter().any(inside))
        })
        .cloned()
        .collect();
    info!(
        "area filter ({lat_min:.4},{lon_min:.4})-({lat_max:.4},{lon_max:.4}): {} -> {} segments",
        segments.len(),
        kept.len()
    );
    Ok(kept)
}
