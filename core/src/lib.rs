// core/src/lib.rs
// Track analysis for sailing sessions: split a GPS track into steady legs,
// infer the wind from how the tacks point, then score the legs by VMG.

pub mod analyze_session;
pub mod cli;
pub mod error;
pub mod filtering;
pub mod geo;
pub mod metrics;
pub mod models;
pub mod segments;
pub mod smoothing;
pub mod storage;
pub mod telemetry;
pub mod track;
pub mod weather;
pub mod wind;

pub use analyze_session::{analyze_session, AnalyzeInputs, SessionAnalysis};
pub use error::{AnalysisError, Result};
pub use metrics::{compute_metrics, compute_metrics_with, MetricsConfig, SessionMetrics};
pub use models::{AnalysisParameters, Confidence, Direction, Segment, Tack, TrackPoint, WindEstimate};
pub use segments::detect_segments;
pub use storage::{load_parameters, load_points_csv, save_parameters, save_report};
pub use wind::{apply_wind, assess_wind, assess_wind_with, estimate_wind, estimate_wind_with, EstimatorConfig};
