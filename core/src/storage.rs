use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::info;
use serde::Deserialize;

use crate::analyze_session::SessionAnalysis;
use crate::error::{AnalysisError, Result};
use crate::models::{AnalysisParameters, TrackPoint};
use crate::track::{derive_points, validate_points, Fix};

fn json_error(err: serde_path_to_error::Error<serde_json::Error>) -> AnalysisError {
    AnalysisError::Json {
        path: err.path().to_string(),
        source: err.into_inner(),
    }
}

/// Reads analysis thresholds from a JSON file and validates them.
/// Errors carry the JSON path of the offending field.
pub fn load_parameters<P: AsRef<Path>>(path: P) -> Result<AnalysisParameters> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;
    let de = &mut serde_json::Deserializer::from_str(&contents);
    let params: AnalysisParameters = serde_path_to_error::deserialize(de).map_err(json_error)?;
    params.validate()?;
    info!("parameters loaded from {}", path.display());
    Ok(params)
}

/// Writes parameters as pretty JSON.
pub fn save_parameters<P: AsRef<Path>>(params: &AnalysisParameters, path: P) -> Result<()> {
    let json = serde_json::to_string_pretty(params)?;
    std::fs::write(path.as_ref(), json)?;
    info!("parameters saved to {}", path.as_ref().display());
    Ok(())
}

pub fn save_report<P: AsRef<Path>>(analysis: &SessionAnalysis, path: P) -> Result<()> {
    let json = serde_json::to_string_pretty(analysis)?;
    std::fs::write(path.as_ref(), json)?;
    info!(
        "report with {} segments saved to {}",
        analysis.segments.len(),
        path.as_ref().display()
    );
    Ok(())
}

#[derive(Debug, Deserialize)]
struct PointRow {
    time: DateTime<Utc>,
    #[serde(alias = "lat")]
    latitude: f64,
    #[serde(alias = "lon")]
    longitude: f64,
    #[serde(default, alias = "speed")]
    speed_knots: Option<f64>,
    #[serde(default, alias = "course")]
    bearing: Option<f64>,
}

/// Loads a point CSV with header `time,latitude,longitude[,speed_knots,bearing]`.
///
/// When every row carries speed and bearing they are used as-is; otherwise
/// both are derived from the positions.
pub fn load_points_csv<P: AsRef<Path>>(path: P) -> Result<Vec<TrackPoint>> {
    let path = path.as_ref();
    let mut rdr = csv::Reader::from_reader(BufReader::new(File::open(path)?));
    let rows = rdr
        .deserialize::<PointRow>()
        .collect::<std::result::Result<Vec<_>, csv::Error>>()?;

    let complete = !rows.is_empty() && rows.iter().all(|r| r.speed_knots.is_some() && r.bearing.is_some());
    let points = if complete {
        let pts: Vec<TrackPoint> = rows
            .iter()
            .map(|r| TrackPoint {
                time: r.time,
                latitude: r.latitude,
                longitude: r.longitude,
                speed_knots: r.speed_knots.unwrap_or_default(),
                bearing: r.bearing.unwrap_or_default(),
            })
            .collect();
        validate_points(&pts)?;
        pts
    } else {
        let fixes: Vec<Fix> = rows
            .iter()
            .map(|r| Fix {
                time: r.time,
                latitude: r.latitude,
                longitude: r.longitude,
            })
            .collect();
        derive_points(&fixes)?
    };

    info!(
        "{} points loaded from {} ({})",
        points.len(),
        path.display(),
        if complete { "speed/bearing from file" } else { "speed/bearing derived" }
    );
    Ok(points)
}
