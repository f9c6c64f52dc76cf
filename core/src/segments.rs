// core/src/segments.rs
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geo::{haversine_m, ms_to_knots, signed_angle_diff, BearingAccumulator};
use crate::models::{AnalysisParameters, Segment, TrackPoint};
use crate::track::validate_points;

/// Open run of points sharing a heading.
#[derive(Debug, Clone)]
struct Candidate {
    start: usize,
    last: usize,
    bearings: BearingAccumulator,
    distance_m: f64,
    max_speed: f64,
    speed_sum: f64,
}

impl Candidate {
    fn open(index: usize, p: &TrackPoint) -> Self {
        let mut bearings = BearingAccumulator::new();
        bearings.push(p.bearing);
        Self {
            start: index,
            last: index,
            bearings,
            distance_m: 0.0,
            max_speed: p.speed_knots,
            speed_sum: p.speed_knots,
        }
    }

    fn mean_bearing(&self, points: &[TrackPoint]) -> f64 {
        // opposite bearings can cancel; fall back to the anchor
        self.bearings.mean().unwrap_or(points[self.start].bearing)
    }

    fn fold(&mut self, index: usize, points: &[TrackPoint]) {
        let (prev, p) = (&points[self.last], &points[index]);
        self.distance_m += haversine_m(prev.latitude, prev.longitude, p.latitude, p.longitude);
        self.bearings.push(p.bearing);
        self.max_speed = self.max_speed.max(p.speed_knots);
        self.speed_sum += p.speed_knots;
        self.last = index;
    }

    /// Returns the committed segment, or None if the run is too short.
    fn close(self, id: usize, points: &[TrackPoint], params: &AnalysisParameters) -> Option<Segment> {
        if self.last <= self.start {
            return None;
        }
        let (first, last) = (&points[self.start], &points[self.last]);
        let duration = (last.time - first.time).num_milliseconds() as f64 / 1000.0;

        if duration < params.min_duration || self.distance_m < params.min_distance {
            debug!(
                "dropping candidate {}..={} ({:.1}s, {:.1}m)",
                self.start, self.last, duration, self.distance_m
            );
            return None;
        }

        let n = self.bearings.count();
        let avg_speed_knots = if duration > 0.0 {
            ms_to_knots(self.distance_m / duration)
        } else {
            self.speed_sum / n as f64
        };

        Some(Segment {
            id,
            start_index: self.start,
            end_index: self.last,
            start_time: first.time,
            end_time: last.time,
            duration_seconds: duration,
            distance_meters: self.distance_m,
            avg_speed_knots,
            max_speed_knots: self.max_speed,
            bearing: self.mean_bearing(points),
            point_count: n,
            tack: None,
            direction: None,
            angle_to_wind: None,
        })
    }
}

/// Splits a point stream into legs of consistent heading.
///
/// Points slower than `min_speed` are skipped without closing the open leg.
/// A point whose bearing deviates from the leg's running circular mean by
/// more than `angle_tolerance` closes the leg and anchors a new one.
/// Closed legs shorter than `min_duration` or `min_distance` are dropped
/// and their points are not reassigned.
///
/// Thresholds are used as given; see [`AnalysisParameters::scaled_for_track`]
/// for the long-session policy.
pub fn detect_segments(points: &[TrackPoint], params: &AnalysisParameters) -> Result<Vec<Segment>> {
    params.validate()?;
    validate_points(points)?;

    if points.len() < 2 {
        debug!("{} point(s), nothing to segment", points.len());
        return Ok(Vec::new());
    }

    let mut committed: Vec<Segment> = Vec::new();
    let mut open: Option<Candidate> = None;
    let mut skipped_slow = 0usize;

    for (i, p) in points.iter().enumerate() {
        if p.speed_knots < params.min_speed {
            skipped_slow += 1;
            continue;
        }

        let extends = match &open {
            Some(c) => signed_angle_diff(p.bearing, c.mean_bearing(points)).abs() <= params.angle_tolerance,
            None => false,
        };

        if extends {
            if let Some(c) = open.as_mut() {
                c.fold(i, points);
            }
        } else {
            if let Some(c) = open.take() {
                if let Some(seg) = c.close(committed.len(), points, params) {
                    committed.push(seg);
                }
            }
            open = Some(Candidate::open(i, p));
        }
    }

    if let Some(c) = open.take() {
        if let Some(seg) = c.close(committed.len(), points, params) {
            committed.push(seg);
        }
    }

    if committed.is_empty() {
        warn!(
            "no segments met min_duration={}s / min_distance={}m ({} points, {} below {} kn)",
            params.min_duration, params.min_distance, points.len(), skipped_slow, params.min_speed
        );
    } else {
        info!(
            "detected {} segments from {} points (tolerance={}°, {} slow points skipped)",
            committed.len(), points.len(), params.angle_tolerance, skipped_slow
        );
    }

    Ok(committed)
}

/// Summary statistics over a set of segments, for debugging and reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentDistribution {
    pub count: usize,
    pub total_distance_m: f64,
    pub total_duration_s: f64,
    pub mean_distance_m: f64,
    pub mean_duration_s: f64,
    pub mean_speed_knots: f64,
    pub distance_range: (f64, f64),
    pub duration_range: (f64, f64),
    pub speed_range: (f64, f64),
}

fn range(xs: impl Iterator<Item = f64>) -> (f64, f64) {
    xs.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| (lo.min(x), hi.max(x)))
}

pub fn segment_distribution(segments: &[Segment]) -> Option<SegmentDistribution> {
    if segments.is_empty() {
        return None;
    }
    let n = segments.len() as f64;
    let total_distance_m: f64 = segments.iter().map(|s| s.distance_meters).sum();
    let total_duration_s: f64 = segments.iter().map(|s| s.duration_seconds).sum();
    let speed_sum: f64 = segments.iter().map(|s| s.avg_speed_knots).sum();

    Some(SegmentDistribution {
        count: segments.len(),
        total_distance_m,
        total_duration_s,
        mean_distance_m: total_distance_m / n,
        mean_duration_s: total_duration_s / n,
        mean_speed_knots: speed_sum / n,
        distance_range: range(segments.iter().map(|s| s.distance_meters)),
        duration_range: range(segments.iter().map(|s| s.duration_seconds)),
        speed_range: range(segments.iter().map(|s| s.avg_speed_knots)),
    })
}
