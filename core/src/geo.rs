// core/src/geo.rs
// Circular arithmetic for bearings plus great-circle helpers.
// All angles are compass degrees; wind directions use the meteorological
// convention (the direction the wind blows FROM).

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
pub const KNOTS_PER_MS: f64 = 1.94384;
pub const FULL_CIRCLE_DEG: f64 = 360.0;

// --- RoundTo trait (used by the report renderer) ---
pub trait RoundTo {
    fn round_to(self, dp: u32) -> f64;
}

impl RoundTo for f64 {
    #[inline]
    fn round_to(self, dp: u32) -> f64 {
        if dp == 0 { return self.round(); }
        let factor = 10_f64.powi(dp as i32);
        (self * factor).round() / factor
    }
}

/// Normalize to [0, 360)
pub fn normalize_deg(d: f64) -> f64 {
    let mut x = d % FULL_CIRCLE_DEG;
    if x < 0.0 {
        x += FULL_CIRCLE_DEG;
    }
    // -1e-15 % 360 + 360 rounds to 360.0
    if x >= FULL_CIRCLE_DEG {
        x -= FULL_CIRCLE_DEG;
    }
    x
}

/// `a - b` folded into (-180, 180].
pub fn signed_angle_diff(a: f64, b: f64) -> f64 {
    let d = normalize_deg(a - b);
    if d > 180.0 { d - FULL_CIRCLE_DEG } else { d }
}

/// Smallest angle between a heading and the wind source, in [0, 180].
pub fn angle_to_wind(bearing_deg: f64, wind_from_deg: f64) -> f64 {
    signed_angle_diff(bearing_deg, wind_from_deg).abs()
}

/// Running vector sum of bearings. Never averages raw degrees, so 359° and
/// 1° mean 0°, not 180°.
#[derive(Debug, Clone, Copy, Default)]
pub struct BearingAccumulator {
    sin_sum: f64,
    cos_sum: f64,
    count: usize,
}

impl BearingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bearing_deg: f64) {
        let r = bearing_deg.to_radians();
        self.sin_sum += r.sin();
        self.cos_sum += r.cos();
        self.count += 1;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// None when empty or when the bearings cancel out exactly.
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 || self.sin_sum.hypot(self.cos_sum) < 1e-9 {
            return None;
        }
        Some(normalize_deg(self.sin_sum.atan2(self.cos_sum).to_degrees()))
    }
}

pub fn circular_mean_deg<I>(bearings: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let mut acc = BearingAccumulator::new();
    for b in bearings {
        acc.push(b);
    }
    acc.mean()
}

/// Great-circle distance in meters.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (p1, p2) = (lat1.to_radians(), lat2.to_radians());
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + p1.cos() * p2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Initial compass bearing from point 1 towards point 2.
pub fn initial_bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (p1, p2) = (lat1.to_radians(), lat2.to_radians());
    let dlambda = (lon2 - lon1).to_radians();
    let x = dlambda.sin() * p2.cos();
    let y = p1.cos() * p2.sin() - p1.sin() * p2.cos() * dlambda.cos();
    normalize_deg(x.atan2(y).to_degrees())
}

pub fn ms_to_knots(v_ms: f64) -> f64 {
    v_ms * KNOTS_PER_MS
}
