// core/src/wind.rs
use log::{debug, info, warn};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::geo::{angle_to_wind, normalize_deg, signed_angle_diff};
use crate::models::{validate_wind_direction, Confidence, Direction, Segment, Tack, WindEstimate};

/// Legs at or below this angle to the wind count as upwind.
pub const UPWIND_LIMIT_DEG: f64 = 90.0;
pub const HIGH_CONFIDENCE_TACK_DIFF_DEG: f64 = 10.0;
pub const MEDIUM_CONFIDENCE_TACK_DIFF_DEG: f64 = 20.0;
/// The best-attempts filter never keeps fewer legs than this per tack.
pub const BEST_ATTEMPTS_MIN_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Safety bound on the balancing loop
    pub max_iterations: usize,
    /// Stop once the proposed adjustment is smaller than this (degrees)
    pub convergence_threshold_deg: f64,
    /// Use only the tightest fraction of each tack's upwind legs for the medians
    pub best_attempts_fraction: Option<f64>,
    /// Upwind legs closer to the wind than this (degrees) are treated as GPS
    /// or segmentation artefacts and left out of the medians
    pub suspicious_angle_threshold: Option<f64>,
    /// Upwind legs shorter than this (meters) are left out of the medians
    pub min_segment_distance: Option<f64>,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            convergence_threshold_deg: 0.5,
            best_attempts_fraction: None,
            suspicious_angle_threshold: None,
            min_segment_distance: None,
        }
    }
}

impl EstimatorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(AnalysisError::InvalidParameter {
                name: "max_iterations",
                value: 0.0,
                reason: "must allow at least one iteration",
            });
        }
        if !(self.convergence_threshold_deg.is_finite() && self.convergence_threshold_deg > 0.0) {
            return Err(AnalysisError::InvalidParameter {
                name: "convergence_threshold_deg",
                value: self.convergence_threshold_deg,
                reason: "must be a positive number of degrees",
            });
        }
        if let Some(f) = self.best_attempts_fraction {
            if !(f.is_finite() && f > 0.0 && f <= 1.0) {
                return Err(AnalysisError::InvalidParameter {
                    name: "best_attempts_fraction",
                    value: f,
                    reason: "must be in (0, 1]",
                });
            }
        }
        if let Some(a) = self.suspicious_angle_threshold {
            if !(a.is_finite() && (0.0..UPWIND_LIMIT_DEG).contains(&a)) {
                return Err(AnalysisError::InvalidParameter {
                    name: "suspicious_angle_threshold",
                    value: a,
                    reason: "must be in [0, 90) degrees",
                });
            }
        }
        if let Some(d) = self.min_segment_distance {
            if !(d.is_finite() && d >= 0.0) {
                return Err(AnalysisError::InvalidParameter {
                    name: "min_segment_distance",
                    value: d,
                    reason: "must be a non-negative number of meters",
                });
            }
        }
        Ok(())
    }

    /// Whether an upwind leg may feed the tack medians.
    fn is_reliable(&self, angle_to_wind: f64, distance_meters: f64) -> bool {
        self.suspicious_angle_threshold.map_or(true, |a| angle_to_wind >= a)
            && self.min_segment_distance.map_or(true, |d| distance_meters >= d)
    }
}

/// Port when the heading lies clockwise of the wind axis (wind over the
/// port side), starboard otherwise.
pub fn tack_for(bearing: f64, wind_from: f64) -> Tack {
    if signed_angle_diff(bearing, wind_from) >= 0.0 {
        Tack::Port
    } else {
        Tack::Starboard
    }
}

pub fn direction_for(angle_to_wind: f64) -> Direction {
    if angle_to_wind <= UPWIND_LIMIT_DEG {
        Direction::Upwind
    } else {
        Direction::Downwind
    }
}

/// Copy of `segment` with every wind-derived field recomputed for `wind_from`.
pub fn classify(segment: &Segment, wind_from: f64) -> Segment {
    let angle = angle_to_wind(segment.bearing, wind_from);
    Segment {
        angle_to_wind: Some(angle),
        direction: Some(direction_for(angle)),
        tack: Some(tack_for(segment.bearing, wind_from)),
        ..segment.clone()
    }
}

fn annotate(segments: &[Segment], wind_from: f64) -> Vec<Segment> {
    segments.iter().map(|s| classify(s, wind_from)).collect()
}

fn median(mut xs: Vec<f64>) -> Option<f64> {
    if xs.is_empty() {
        return None;
    }
    xs.sort_by_key(|x| OrderedFloat(*x));
    let n = xs.len();
    if n % 2 == 1 {
        Some(xs[n / 2])
    } else {
        Some((xs[n / 2 - 1] + xs[n / 2]) / 2.0)
    }
}

/// Tightest `max(3, floor(n * fraction))` angles; all of them when n <= 3.
fn best_attempts(mut angles: Vec<f64>, fraction: Option<f64>) -> Vec<f64> {
    let Some(f) = fraction else { return angles };
    let n = angles.len();
    if n <= BEST_ATTEMPTS_MIN_COUNT {
        return angles;
    }
    let keep = BEST_ATTEMPTS_MIN_COUNT.max((n as f64 * f).floor() as usize);
    angles.sort_by_key(|x| OrderedFloat(*x));
    angles.truncate(keep);
    angles
}

#[derive(Debug, Clone, Copy)]
struct TackBalance {
    port_angle: Option<f64>,
    starboard_angle: Option<f64>,
    port_count: usize,
    starboard_count: usize,
}

impl TackBalance {
    /// Counts cover every upwind leg; the medians only the reliable ones.
    fn measure(annotated: &[Segment], config: &EstimatorConfig) -> Self {
        let mut port = Vec::new();
        let mut starboard = Vec::new();
        let (mut port_count, mut starboard_count) = (0usize, 0usize);
        let mut dropped = 0usize;
        for s in annotated.iter().filter(|s| s.is_upwind()) {
            let (Some(angle), Some(tack)) = (s.angle_to_wind, s.tack) else { continue };
            let (angles, count) = match tack {
                Tack::Port => (&mut port, &mut port_count),
                Tack::Starboard => (&mut starboard, &mut starboard_count),
            };
            *count += 1;
            if config.is_reliable(angle, s.distance_meters) {
                angles.push(angle);
            } else {
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!("{dropped} suspicious or short upwind leg(s) left out of the medians");
        }
        Self {
            port_angle: median(best_attempts(port, config.best_attempts_fraction)),
            starboard_angle: median(best_attempts(starboard, config.best_attempts_fraction)),
            port_count,
            starboard_count,
        }
    }

    fn confidence(&self) -> Confidence {
        match (self.port_angle, self.starboard_angle) {
            (Some(p), Some(s)) => {
                let diff = (p - s).abs();
                if diff < HIGH_CONFIDENCE_TACK_DIFF_DEG {
                    Confidence::High
                } else if diff < MEDIUM_CONFIDENCE_TACK_DIFF_DEG {
                    Confidence::Medium
                } else {
                    Confidence::Low
                }
            }
            (None, None) => Confidence::None,
            _ => Confidence::Low,
        }
    }
}

/// [`estimate_wind_with`] using the default configuration.
pub fn estimate_wind(segments: &[Segment], initial_direction: f64) -> Result<(WindEstimate, Vec<Segment>)> {
    estimate_wind_with(segments, initial_direction, &EstimatorConfig::default())
}

/// Refines a wind direction until port and starboard upwind legs point
/// equally high.
///
/// Every pass reclassifies all legs against the current estimate, takes the
/// median angle per tack and rotates the wind by half their difference. The
/// loop stops when that rotation drops below the convergence threshold (the
/// final sub-threshold rotation is not applied, so feeding the result back in
/// is a fixed point), when one tack has no upwind legs, or at
/// `max_iterations`. Hitting the bound is not an error.
///
/// Known limitation: tracks with several heading clusters admit more than
/// one balanced direction, and the loop settles on the one nearest the seed.
/// A `High` confidence means the tacks balance, not that the wind is right;
/// a poor seed can land more than 100° off.
pub fn estimate_wind_with(
    segments: &[Segment],
    initial_direction: f64,
    config: &EstimatorConfig,
) -> Result<(WindEstimate, Vec<Segment>)> {
    let initial = validate_wind_direction(initial_direction)?;
    config.validate()?;

    let mut wind = initial;
    let mut iterations = 0usize;
    let mut converged = false;

    for pass in 0..config.max_iterations {
        let annotated = annotate(segments, wind);
        let balance = TackBalance::measure(&annotated, config);

        let (Some(port), Some(starboard)) = (balance.port_angle, balance.starboard_angle) else {
            debug!(
                "pass {}: port={} starboard={} upwind legs, nothing to balance",
                pass + 1, balance.port_count, balance.starboard_count
            );
            converged = true;
            break;
        };

        let adjustment = (port - starboard) / 2.0;
        debug!(
            "pass {}: wind={:.1}° port={:.1}° starboard={:.1}° adjustment={:+.2}°",
            pass + 1, wind, port, starboard, adjustment
        );

        if adjustment.abs() < config.convergence_threshold_deg {
            converged = true;
            break;
        }
        wind = normalize_deg(wind + adjustment);
        iterations += 1;
    }

    if !converged {
        warn!(
            "wind estimate did not settle within {} iterations, keeping {:.1}°",
            config.max_iterations, wind
        );
    }

    let annotated = annotate(segments, wind);
    let balance = TackBalance::measure(&annotated, config);
    let estimate = WindEstimate {
        direction: wind,
        confidence: balance.confidence(),
        port_average_angle: balance.port_angle,
        starboard_average_angle: balance.starboard_angle,
        total_segments: segments.len(),
        port_segments: balance.port_count,
        starboard_segments: balance.starboard_count,
        initial_direction: initial,
        iterations,
        converged,
    };

    info!(
        "wind {:.1}° -> {:.1}° after {} adjustment(s), confidence {:?}",
        initial, estimate.direction, iterations, estimate.confidence
    );
    Ok((estimate, annotated))
}

/// Re-annotates every segment for a caller-chosen wind direction.
pub fn apply_wind(segments: &[Segment], direction: f64) -> Result<Vec<Segment>> {
    let wind = validate_wind_direction(direction)?;
    Ok(annotate(segments, wind))
}

/// [`assess_wind_with`] using the default configuration.
pub fn assess_wind(segments: &[Segment], direction: f64) -> Result<(WindEstimate, Vec<Segment>)> {
    assess_wind_with(segments, direction, &EstimatorConfig::default())
}

/// Statistics for a fixed wind direction, without running the balancing loop.
/// Leg filters in `config` apply exactly as in [`estimate_wind_with`], so
/// assessing an estimate's own direction reproduces its tack angles.
pub fn assess_wind_with(
    segments: &[Segment],
    direction: f64,
    config: &EstimatorConfig,
) -> Result<(WindEstimate, Vec<Segment>)> {
    let wind = validate_wind_direction(direction)?;
    config.validate()?;
    let annotated = annotate(segments, wind);
    let balance = TackBalance::measure(&annotated, config);
    Ok((
        WindEstimate {
            direction: wind,
            confidence: balance.confidence(),
            port_average_angle: balance.port_angle,
            starboard_average_angle: balance.starboard_angle,
            total_segments: segments.len(),
            port_segments: balance.port_count,
            starboard_segments: balance.starboard_count,
            initial_direction: wind,
            iterations: 0,
            converged: true,
        },
        annotated,
    ))
}
