// core/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// One GPS fix with pre-computed speed and course over ground.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub speed_knots: f64,
    /// Compass bearing of travel, 0–360
    pub bearing: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tack {
    Port,
    Starboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Upwind,
    Downwind,
}

/// A leg sailed on a steady heading.
///
/// Created by the segment detector; `tack`, `direction` and `angle_to_wind`
/// stay `None` until a wind direction has been applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Ordinal among committed segments; the identity used for active sets.
    pub id: usize,
    pub start_index: usize,
    pub end_index: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: f64,
    pub distance_meters: f64,
    pub avg_speed_knots: f64,
    pub max_speed_knots: f64,
    /// Circular mean of the member points' bearings
    pub bearing: f64,
    pub point_count: usize,

    #[serde(default)]
    pub tack: Option<Tack>,
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default)]
    pub angle_to_wind: Option<f64>,
}

impl Segment {
    pub fn is_upwind(&self) -> bool {
        self.direction == Some(Direction::Upwind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Confidence {
    None,
    Low,
    Medium,
    High,
}

/// Result of the wind balancing loop.
///
/// `confidence` grades how evenly the two tacks point, not how close
/// `direction` is to the true wind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindEstimate {
    /// Degrees the wind blows from, [0, 360)
    pub direction: f64,
    pub confidence: Confidence,
    pub port_average_angle: Option<f64>,
    pub starboard_average_angle: Option<f64>,
    pub total_segments: usize,
    pub port_segments: usize,
    pub starboard_segments: usize,
    pub initial_direction: f64,
    /// Number of wind adjustments applied
    pub iterations: usize,
    pub converged: bool,
}

/// Segment detection thresholds. The core invents no defaults for these.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParameters {
    /// Degrees
    pub angle_tolerance: f64,
    /// Seconds
    pub min_duration: f64,
    /// Meters
    pub min_distance: f64,
    /// Knots
    pub min_speed: f64,
    /// Degrees, wind-from
    pub initial_wind_direction: f64,
}

/// Tracks shorter than this keep their base thresholds.
pub const SCALING_REFERENCE_SECS: f64 = 3600.0;
pub const MAX_THRESHOLD_SCALE: f64 = 3.0;

impl AnalysisParameters {
    /// Threshold checks for the segment detector. The wind seed is checked
    /// separately by the estimator.
    pub fn validate(&self) -> Result<()> {
        if !(self.angle_tolerance.is_finite() && self.angle_tolerance > 0.0 && self.angle_tolerance <= 180.0) {
            return Err(AnalysisError::InvalidParameter {
                name: "angle_tolerance",
                value: self.angle_tolerance,
                reason: "must be in (0, 180] degrees",
            });
        }
        if !(self.min_speed.is_finite() && self.min_speed > 0.0) {
            return Err(AnalysisError::InvalidParameter {
                name: "min_speed",
                value: self.min_speed,
                reason: "must be a positive speed in knots",
            });
        }
        if !(self.min_duration.is_finite() && self.min_duration >= 0.0) {
            return Err(AnalysisError::InvalidParameter {
                name: "min_duration",
                value: self.min_duration,
                reason: "must be a non-negative number of seconds",
            });
        }
        if !(self.min_distance.is_finite() && self.min_distance >= 0.0) {
            return Err(AnalysisError::InvalidParameter {
                name: "min_distance",
                value: self.min_distance,
                reason: "must be a non-negative number of meters",
            });
        }
        Ok(())
    }

    /// Adaptive thresholds for long sessions: beyond one hour, min_duration
    /// and min_distance grow with sqrt(duration / 1h), capped at 3x.
    pub fn scaled_for_track(&self, track_duration_secs: f64) -> Self {
        let factor = if track_duration_secs.is_finite() && track_duration_secs > SCALING_REFERENCE_SECS {
            (track_duration_secs / SCALING_REFERENCE_SECS).sqrt().min(MAX_THRESHOLD_SCALE)
        } else {
            1.0
        };
        Self {
            min_duration: self.min_duration * factor,
            min_distance: self.min_distance * factor,
            ..*self
        }
    }
}

pub fn validate_wind_direction(direction: f64) -> Result<f64> {
    if direction.is_finite() && (0.0..360.0).contains(&direction) {
        Ok(direction)
    } else {
        Err(AnalysisError::InvalidWindDirection(direction))
    }
}
