use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use log::debug;
use ordered_float::OrderedFloat;

use crate::telemetry::AnalysisTelemetry;

/// Source of an initial wind direction for a session (e.g. a historical
/// weather lookup). The estimate is only a seed; the balancing loop refines it.
pub trait WindSeedProvider {
    /// Degrees the wind blew from at the session start, if known.
    fn wind_seed(&self, start_time: DateTime<Utc>, lat: f64, lon: f64) -> Option<f64>;
}

/// Fixed seed, for tests and for callers that already know the wind.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticWindSeed {
    pub direction: Option<f64>,
}

impl WindSeedProvider for StaticWindSeed {
    fn wind_seed(&self, _start_time: DateTime<Utc>, _lat: f64, _lon: f64) -> Option<f64> {
        self.direction
    }
}

type SeedKey = (OrderedFloat<f64>, OrderedFloat<f64>, i64);

/// Memoizes another provider per ~1 km cell and hour, so batch runs over
/// sessions from the same spot hit the backing lookup once.
pub struct CachedWindSeed<P> {
    inner: P,
    cache: Arc<Mutex<HashMap<SeedKey, Option<f64>>>>,
    telemetry: Option<AnalysisTelemetry>,
}

impl<P: WindSeedProvider> CachedWindSeed<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: Arc::new(Mutex::new(HashMap::new())),
            telemetry: None,
        }
    }

    pub fn with_telemetry(mut self, telemetry: &AnalysisTelemetry) -> Self {
        self.telemetry = Some(telemetry.clone());
        self
    }

    fn key(start_time: DateTime<Utc>, lat: f64, lon: f64) -> SeedKey {
        let cell = |x: f64| OrderedFloat((x * 100.0).round() / 100.0);
        (cell(lat), cell(lon), start_time.timestamp().div_euclid(3600))
    }
}

impl<P: WindSeedProvider> WindSeedProvider for CachedWindSeed<P> {
    fn wind_seed(&self, start_time: DateTime<Utc>, lat: f64, lon: f64) -> Option<f64> {
        let key = Self::key(start_time, lat, lon);
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(hit) = cache.get(&key) {
            if let Some(t) = &self.telemetry {
                t.wind_seed_cache_hit_total.inc();
            }
            return *hit;
        }

        let fetched = self.inner.wind_seed(start_time, lat, lon);
        debug!("wind seed lookup ({lat:.2}, {lon:.2}) -> {fetched:?}");
        cache.insert(key, fetched);
        if let Some(t) = &self.telemetry {
            t.wind_seed_cache_miss_total.inc();
        }
        fetched
    }
}
