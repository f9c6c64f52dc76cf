use std::cmp::Reverse;
use std::collections::BTreeSet;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::models::{Confidence, Direction, Segment, Tack, WindEstimate};
use crate::wind::classify;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// How many of the best-VMG legs make up the representative VMG
    pub top_k: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

impl MetricsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(AnalysisError::InvalidParameter {
                name: "top_k",
                value: 0.0,
                reason: "representative VMG needs at least one leg",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentMetrics {
    pub segment_id: usize,
    pub active: bool,
    pub angle_to_wind: f64,
    pub direction: Direction,
    pub tack: Tack,
    /// speed * cos(angle to wind); negative when sailing away from the wind
    pub vmg_knots: f64,
    pub distance_meters: f64,
    pub avg_speed_knots: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VmgPick {
    pub segment_id: usize,
    pub vmg_knots: f64,
    pub angle_to_wind: f64,
}

/// Tightest upwind angle sailed on one tack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TackBest {
    pub segment_id: usize,
    pub angle_to_wind: f64,
    pub speed_knots: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub wind_direction: f64,
    pub confidence: Confidence,
    pub segments: Vec<SegmentMetrics>,

    // everything below covers active segments only
    pub active_segments: usize,
    pub upwind_segments: usize,
    pub downwind_segments: usize,
    /// Upwind legs per tack
    pub port_segments: usize,
    pub starboard_segments: usize,
    pub total_distance_meters: f64,
    pub max_speed_knots: f64,
    /// Distance-weighted over upwind legs, 0 when there are none
    pub avg_upwind_speed_knots: f64,
    pub avg_upwind_angle: Option<f64>,
    /// Distance-weighted VMG over all upwind legs
    pub session_vmg_knots: Option<f64>,
    pub best_vmg: Option<VmgPick>,
    /// Distance-weighted VMG over the top-K upwind legs by VMG
    pub representative_vmg_knots: Option<f64>,
    pub best_port: Option<TackBest>,
    pub best_starboard: Option<TackBest>,
}

pub fn vmg_knots(speed_knots: f64, angle_to_wind_deg: f64) -> f64 {
    speed_knots * angle_to_wind_deg.to_radians().cos()
}

/// Σ(v·w)/Σw; plain mean if every weight is zero; None for no input.
fn weighted_mean(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.is_empty() {
        return None;
    }
    let w_sum: f64 = pairs.iter().map(|(_, w)| w).sum();
    if w_sum > 0.0 {
        Some(pairs.iter().map(|(v, w)| v * w).sum::<f64>() / w_sum)
    } else {
        Some(pairs.iter().map(|(v, _)| v).sum::<f64>() / pairs.len() as f64)
    }
}

fn best_on_tack(upwind: &[&SegmentMetrics], tack: Tack) -> Option<TackBest> {
    upwind
        .iter()
        .filter(|m| m.tack == tack)
        .min_by_key(|m| (OrderedFloat(m.angle_to_wind), m.segment_id))
        .map(|m| TackBest {
            segment_id: m.segment_id,
            angle_to_wind: m.angle_to_wind,
            speed_knots: m.avg_speed_knots,
        })
}

/// [`compute_metrics_with`] using the default configuration.
pub fn compute_metrics(
    segments: &[Segment],
    wind: &WindEstimate,
    active_ids: Option<&BTreeSet<usize>>,
) -> SessionMetrics {
    compute_metrics_with(segments, wind, active_ids, &MetricsConfig::default())
}

/// Per-leg VMG plus session aggregates over the active legs.
///
/// Angles are recomputed from `wind.direction` rather than read from the
/// segments' annotations. `active_ids = None` means every segment is active.
/// The result depends only on the inputs; repeated calls are bit-identical.
/// This function does not validate `config`; a `top_k` of 0 is treated as 1
/// (the session pipeline rejects it up front via [`MetricsConfig::validate`]).
pub fn compute_metrics_with(
    segments: &[Segment],
    wind: &WindEstimate,
    active_ids: Option<&BTreeSet<usize>>,
    config: &MetricsConfig,
) -> SessionMetrics {
    let per_segment: Vec<SegmentMetrics> = segments
        .iter()
        .map(|s| {
            let c = classify(s, wind.direction);
            let angle = c.angle_to_wind.unwrap_or_default();
            SegmentMetrics {
                segment_id: s.id,
                active: active_ids.map_or(true, |ids| ids.contains(&s.id)),
                angle_to_wind: angle,
                direction: c.direction.unwrap_or(Direction::Downwind),
                tack: c.tack.unwrap_or(Tack::Port),
                vmg_knots: vmg_knots(s.avg_speed_knots, angle),
                distance_meters: s.distance_meters,
                avg_speed_knots: s.avg_speed_knots,
            }
        })
        .collect();

    let active: Vec<&SegmentMetrics> = per_segment.iter().filter(|m| m.active).collect();
    let upwind: Vec<&SegmentMetrics> = active
        .iter()
        .copied()
        .filter(|m| m.direction == Direction::Upwind)
        .collect();

    let speed_pairs: Vec<(f64, f64)> = upwind.iter().map(|m| (m.avg_speed_knots, m.distance_meters)).collect();
    let vmg_pairs: Vec<(f64, f64)> = upwind.iter().map(|m| (m.vmg_knots, m.distance_meters)).collect();
    let angle_sum: f64 = upwind.iter().map(|m| m.angle_to_wind).sum();

    // highest VMG first, ties by id for a stable order
    let mut ranked = upwind.clone();
    ranked.sort_by_key(|m| (Reverse(OrderedFloat(m.vmg_knots)), m.segment_id));

    let best_vmg = ranked.first().map(|m| VmgPick {
        segment_id: m.segment_id,
        vmg_knots: m.vmg_knots,
        angle_to_wind: m.angle_to_wind,
    });
    let top: Vec<(f64, f64)> = ranked
        .iter()
        .take(config.top_k.max(1))
        .map(|m| (m.vmg_knots, m.distance_meters))
        .collect();

    SessionMetrics {
        wind_direction: wind.direction,
        confidence: wind.confidence,
        active_segments: active.len(),
        upwind_segments: upwind.len(),
        downwind_segments: active.len() - upwind.len(),
        port_segments: upwind.iter().filter(|m| m.tack == Tack::Port).count(),
        starboard_segments: upwind.iter().filter(|m| m.tack == Tack::Starboard).count(),
        total_distance_meters: active.iter().map(|m| m.distance_meters).sum(),
        max_speed_knots: segments
            .iter()
            .zip(&per_segment)
            .filter(|(_, m)| m.active)
            .map(|(s, _)| s.max_speed_knots)
            .fold(0.0, f64::max),
        avg_upwind_speed_knots: weighted_mean(&speed_pairs).unwrap_or(0.0),
        avg_upwind_angle: (!upwind.is_empty()).then(|| angle_sum / upwind.len() as f64),
        session_vmg_knots: weighted_mean(&vmg_pairs),
        best_vmg,
        representative_vmg_knots: weighted_mean(&top),
        best_port: best_on_tack(&upwind, Tack::Port),
        best_starboard: best_on_tack(&upwind, Tack::Starboard),
        segments: per_segment,
    }
}
