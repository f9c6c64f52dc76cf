use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};

/// Prometheus counters for the session pipeline.
///
/// Owned by the caller and passed in by reference; the analysis functions
/// themselves hold no global state.
#[derive(Clone)]
pub struct AnalysisTelemetry {
    registry: Registry,
    pub runs_total: IntCounter,
    pub segments_committed_total: IntCounter,
    pub wind_non_converged_total: IntCounter,
    pub wind_seed_cache_hit_total: IntCounter,
    pub wind_seed_cache_miss_total: IntCounter,
    pub wind_iterations: Histogram,
}

impl AnalysisTelemetry {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let runs_total = IntCounter::new("foillab_analysis_runs_total", "Completed session analyses")?;
        let segments_committed_total =
            IntCounter::new("foillab_segments_committed_total", "Segments committed by the detector")?;
        let wind_non_converged_total = IntCounter::new(
            "foillab_wind_non_converged_total",
            "Wind estimates that hit the iteration bound",
        )?;
        let wind_seed_cache_hit_total =
            IntCounter::new("foillab_wind_seed_cache_hit_total", "Wind seed lookups served from cache")?;
        let wind_seed_cache_miss_total =
            IntCounter::new("foillab_wind_seed_cache_miss_total", "Wind seed lookups passed to the provider")?;
        let wind_iterations = Histogram::with_opts(
            HistogramOpts::new("foillab_wind_iterations", "Wind adjustments applied per estimate")
                .buckets(vec![0.0, 1.0, 2.0, 3.0, 5.0, 8.0, 13.0, 20.0]),
        )?;

        registry.register(Box::new(runs_total.clone()))?;
        registry.register(Box::new(segments_committed_total.clone()))?;
        registry.register(Box::new(wind_non_converged_total.clone()))?;
        registry.register(Box::new(wind_seed_cache_hit_total.clone()))?;
        registry.register(Box::new(wind_seed_cache_miss_total.clone()))?;
        registry.register(Box::new(wind_iterations.clone()))?;

        Ok(Self {
            registry,
            runs_total,
            segments_committed_total,
            wind_non_converged_total,
            wind_seed_cache_hit_total,
            wind_seed_cache_miss_total,
            wind_iterations,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Text exposition format, for dumping after a batch run.
    pub fn render(&self) -> String {
        use prometheus::Encoder;
        let mut buf = Vec::new();
        let encoder = prometheus::TextEncoder::new();
        if encoder.encode(&self.registry.gather(), &mut buf).is_err() {
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}
