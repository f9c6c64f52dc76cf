// core/src/analyze_session.rs
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::filtering::{filter_by_bounds, filter_by_time};
use crate::geo::normalize_deg;
use crate::metrics::{compute_metrics_with, MetricsConfig, SessionMetrics};
use crate::models::{AnalysisParameters, Segment, TrackPoint, WindEstimate};
use crate::segments::{detect_segments, segment_distribution, SegmentDistribution};
use crate::telemetry::AnalysisTelemetry;
use crate::track::track_duration_seconds;
use crate::weather::WindSeedProvider;
use crate::wind::{assess_wind_with, estimate_wind_with, EstimatorConfig};

#[derive(Clone)]
pub struct AnalyzeInputs<'a> {
    pub points: &'a [TrackPoint],
    pub parameters: AnalysisParameters,
    /// Seed lookup; falls back to `parameters.initial_wind_direction`
    pub wind_seed: Option<&'a dyn WindSeedProvider>,
    pub estimator: EstimatorConfig,
    pub metrics: MetricsConfig,
    /// Apply the long-session threshold policy before detection
    pub scale_for_track: bool,

    // --- optional segment filters ---
    pub time_start: Option<DateTime<Utc>>,
    pub time_end: Option<DateTime<Utc>>,
    pub lat_bounds: Option<(f64, f64)>,
    pub lon_bounds: Option<(f64, f64)>,

    /// None => all segments active
    pub active_ids: Option<BTreeSet<usize>>,
    pub telemetry: Option<&'a AnalysisTelemetry>,
}

impl<'a> AnalyzeInputs<'a> {
    pub fn new(points: &'a [TrackPoint], parameters: AnalysisParameters) -> Self {
        Self {
            points,
            parameters,
            wind_seed: None,
            estimator: EstimatorConfig::default(),
            metrics: MetricsConfig::default(),
            scale_for_track: false,
            time_start: None,
            time_end: None,
            lat_bounds: None,
            lon_bounds: None,
            active_ids: None,
            telemetry: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionAnalysis {
    /// Thresholds actually used (after optional scaling)
    pub parameters: AnalysisParameters,
    pub segments: Vec<Segment>,
    pub wind: WindEstimate,
    pub metrics: SessionMetrics,
    pub distribution: Option<SegmentDistribution>,
    pub active_ids: Option<BTreeSet<usize>>,
    pub metrics_config: MetricsConfig,
    /// Leg filters used for the estimate; manual overrides reuse them
    #[serde(default)]
    pub estimator_config: EstimatorConfig,
}

impl SessionAnalysis {
    /// Same legs under a wind chosen by the caller: every segment is
    /// re-annotated and all metrics recomputed.
    pub fn with_manual_wind(&self, direction: f64) -> Result<Self> {
        let (wind, segments) = assess_wind_with(&self.segments, direction, &self.estimator_config)?;
        let metrics = compute_metrics_with(&segments, &wind, self.active_ids.as_ref(), &self.metrics_config);
        info!("manual wind override {:.1}° -> {:.1}°", self.wind.direction, wind.direction);
        Ok(Self {
            segments,
            wind,
            metrics,
            ..self.clone()
        })
    }

    /// Metrics for a different active subset; segments and wind are untouched.
    pub fn with_active(&self, active_ids: Option<BTreeSet<usize>>) -> Self {
        let metrics = compute_metrics_with(&self.segments, &self.wind, active_ids.as_ref(), &self.metrics_config);
        Self {
            metrics,
            active_ids,
            ..self.clone()
        }
    }
}

fn resolve_seed(inputs: &AnalyzeInputs) -> f64 {
    let fallback = inputs.parameters.initial_wind_direction;
    let (Some(provider), Some(first)) = (inputs.wind_seed, inputs.points.first()) else {
        return fallback;
    };
    match provider.wind_seed(first.time, first.latitude, first.longitude) {
        Some(d) if d.is_finite() => normalize_deg(d),
        Some(d) => {
            warn!("wind seed provider returned {d}, using {fallback}°");
            fallback
        }
        None => fallback,
    }
}

/// Points -> segments -> wind estimate -> metrics.
pub fn analyze_session(inputs: AnalyzeInputs) -> Result<SessionAnalysis> {
    inputs.metrics.validate()?;
    let parameters = if inputs.scale_for_track {
        inputs.parameters.scaled_for_track(track_duration_seconds(inputs.points))
    } else {
        inputs.parameters
    };

    // 1. legs
    let mut segments = detect_segments(inputs.points, &parameters)?;

    // 2. optional filters
    if inputs.time_start.is_some() || inputs.time_end.is_some() {
        segments = filter_by_time(&segments, inputs.time_start, inputs.time_end)?;
    }
    if inputs.lat_bounds.is_some() || inputs.lon_bounds.is_some() {
        segments = filter_by_bounds(&segments, inputs.points, inputs.lat_bounds, inputs.lon_bounds)?;
    }

    // 3. wind
    let seed = resolve_seed(&inputs);
    let (wind, segments) = estimate_wind_with(&segments, seed, &inputs.estimator)?;

    // 4. metrics
    let metrics = compute_metrics_with(&segments, &wind, inputs.active_ids.as_ref(), &inputs.metrics);

    if let Some(t) = inputs.telemetry {
        t.runs_total.inc();
        t.segments_committed_total.inc_by(segments.len() as u64);
        t.wind_iterations.observe(wind.iterations as f64);
        if !wind.converged {
            t.wind_non_converged_total.inc();
        }
    }

    info!(
        "session: {} points, {} segments, wind {:.1}° ({:?})",
        inputs.points.len(),
        segments.len(),
        wind.direction,
        wind.confidence
    );

    Ok(SessionAnalysis {
        parameters,
        distribution: segment_distribution(&segments),
        segments,
        wind,
        metrics,
        active_ids: inputs.active_ids,
        metrics_config: inputs.metrics,
        estimator_config: inputs.estimator,
    })
}
