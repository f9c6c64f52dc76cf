// core/src/bin/foillab.rs
use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use foillab_core::analyze_session::{analyze_session, AnalyzeInputs};
use foillab_core::cli::render_report;
use foillab_core::models::AnalysisParameters;
use foillab_core::storage::{load_parameters, load_points_csv, save_report};
use foillab_core::telemetry::AnalysisTelemetry;

#[derive(Parser, Debug)]
#[command(author, version, about = "Leg detection, wind estimation and VMG for a sailing track", long_about = None)]
struct Args {
    /// Point CSV: time,latitude,longitude[,speed_knots,bearing]
    points: PathBuf,

    /// Parameter JSON; flags below override single fields
    #[arg(long)]
    params: Option<PathBuf>,

    /// Wind seed in degrees (direction the wind blows from)
    #[arg(long)]
    wind: Option<f64>,

    /// Bearing tolerance within a leg (degrees)
    #[arg(long)]
    angle_tolerance: Option<f64>,

    /// Shortest leg kept (seconds)
    #[arg(long)]
    min_duration: Option<f64>,

    /// Shortest leg kept (meters)
    #[arg(long)]
    min_distance: Option<f64>,

    /// Points slower than this are ignored (knots)
    #[arg(long)]
    min_speed: Option<f64>,

    /// Segment ids to leave out of the session metrics
    #[arg(long, num_args = 1..)]
    exclude: Vec<usize>,

    /// Also write the full analysis as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Grow min duration/distance for sessions longer than an hour
    #[arg(long)]
    scale_for_track: bool,

    /// Dump prometheus counters after the report
    #[arg(long)]
    metrics: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

// Starting thresholds when no parameter file is given
const CLI_DEFAULTS: AnalysisParameters = AnalysisParameters {
    angle_tolerance: 25.0,
    min_duration: 15.0,
    min_distance: 75.0,
    min_speed: 8.0,
    initial_wind_direction: 90.0,
};

fn resolve_parameters(args: &Args) -> Result<AnalysisParameters> {
    let mut params = match &args.params {
        Some(path) => load_parameters(path).with_context(|| format!("reading parameters {}", path.display()))?,
        None => CLI_DEFAULTS,
    };
    if let Some(v) = args.angle_tolerance {
        params.angle_tolerance = v;
    }
    if let Some(v) = args.min_duration {
        params.min_duration = v;
    }
    if let Some(v) = args.min_distance {
        params.min_distance = v;
    }
    if let Some(v) = args.min_speed {
        params.min_speed = v;
    }
    if let Some(v) = args.wind {
        params.initial_wind_direction = v;
    }
    params.validate().context("invalid parameters")?;
    Ok(params)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let params = resolve_parameters(&args)?;
    let points = load_points_csv(&args.points).with_context(|| format!("loading {}", args.points.display()))?;
    if points.is_empty() {
        bail!("{} contains no points", args.points.display());
    }

    let telemetry = AnalysisTelemetry::new().context("registering metrics")?;

    let mut inputs = AnalyzeInputs::new(&points, params);
    inputs.scale_for_track = args.scale_for_track;
    inputs.telemetry = Some(&telemetry);

    let analysis = analyze_session(inputs).context("analysis failed")?;
    let analysis = if args.exclude.is_empty() {
        analysis
    } else {
        let excluded: BTreeSet<usize> = args.exclude.iter().copied().collect();
        let active = analysis
            .segments
            .iter()
            .map(|s| s.id)
            .filter(|id| !excluded.contains(id))
            .collect();
        info!("excluding segments {:?}", excluded);
        analysis.with_active(Some(active))
    };

    print!("{}", render_report(&analysis));

    if let Some(out) = &args.json {
        save_report(&analysis, out).with_context(|| format!("writing {}", out.display()))?;
    }
    if args.metrics {
        print!("\n{}", telemetry.render());
    }
    Ok(())
}
