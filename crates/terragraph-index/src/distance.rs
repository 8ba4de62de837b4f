//! Distance functions over `[longitude, latitude]` degree pairs.
//!
//! Two metrics are provided:
//!
//! - [`haversine`]: great-circle distance on a sphere of radius
//!   [`EARTH_RADIUS_KM`]. This is the metric used by [`crate::around`]
//!   and by every tolerance comparison downstream.
//! - [`CheapRuler`]: a local equirectangular approximation on the WGS84
//!   ellipsoid, accurate for city-scale distances around a reference
//!   latitude and several times faster than haversine.
//!
//! All results are in kilometers.

/// Mean Earth radius used by the great-circle metric, in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// WGS84 equatorial radius in kilometers.
const WGS84_RADIUS_KM: f64 = 6378.137;

/// WGS84 flattening.
const WGS84_FLATTENING: f64 = 1.0 / 298.257_223_563;

/// Haversine of an angle in radians: `sin²(θ / 2)`.
#[must_use]
pub fn haversin(theta: f64) -> f64 {
    let s = (theta / 2.0).sin();
    s * s
}

/// Great-circle distance between two `[lng, lat]` points, in kilometers.
///
/// Symmetric, and zero for identical inputs.
///
/// # Examples
///
/// ```
/// use terragraph_index::distance::haversine;
///
/// let paris = [2.3522, 48.8566];
/// let london = [-0.1278, 51.5074];
/// assert!((haversine(paris, london) - 343.55).abs() < 0.05);
/// ```
#[must_use]
pub fn haversine(a: [f64; 2], b: [f64; 2]) -> f64 {
    let [lng1, lat1] = a;
    let [lng2, lat2] = b;
    let h = haversin((lat2 - lat1).to_radians())
        + lat1.to_radians().cos() * lat2.to_radians().cos() * haversin((lng2 - lng1).to_radians());
    2.0 * EARTH_RADIUS_KM * h.clamp(0.0, 1.0).sqrt().asin()
}

/// Fast planar distance approximation around a reference latitude.
///
/// Precomputes kilometers-per-degree multipliers for longitude and
/// latitude on the WGS84 ellipsoid. Longitude differences are wrapped
/// into `[-180, 180]` so points on either side of the antimeridian
/// measure as neighbors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheapRuler {
    kx: f64,
    ky: f64,
}

impl CheapRuler {
    /// Create a ruler for measurements near `latitude` (degrees).
    #[must_use]
    pub fn new(latitude: f64) -> Self {
        let e2 = WGS84_FLATTENING * (2.0 - WGS84_FLATTENING);
        let m = WGS84_RADIUS_KM.to_radians();
        let coslat = latitude.to_radians().cos();
        let w2 = 1.0 / (1.0 - e2 * (1.0 - coslat * coslat));
        let w = w2.sqrt();
        Self {
            kx: m * w * coslat,
            ky: m * w * w2 * (1.0 - e2),
        }
    }

    /// Approximate distance between two `[lng, lat]` points, in kilometers.
    #[must_use]
    pub fn distance(&self, a: [f64; 2], b: [f64; 2]) -> f64 {
        let dx = wrap_longitude(a[0] - b[0]) * self.kx;
        let dy = (a[1] - b[1]) * self.ky;
        dx.hypot(dy)
    }
}

/// Wrap a longitude difference into `[-180, 180)`. Non-finite input
/// yields NaN.
fn wrap_longitude(degrees: f64) -> f64 {
    (degrees + 180.0).rem_euclid(360.0) - 180.0
}
