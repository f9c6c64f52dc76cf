// core/src/error.rs
use thiserror::Error;

/// Errors raised at the boundary of the analysis core.
///
/// "Not enough data" is never an error here: empty segment lists and
/// `Confidence::None` are ordinary results.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("wind direction must be a finite value in [0, 360), got {0}")]
    InvalidWindDirection(f64),

    #[error("invalid track point at index {index}: {reason}")]
    InvalidTrack { index: usize, reason: String },

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error at `{path}`: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<serde_json::Error> for AnalysisError {
    fn from(source: serde_json::Error) -> Self {
        AnalysisError::Json {
            path: String::from("."),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
