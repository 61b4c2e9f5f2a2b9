use serde::{Deserialize, Serialize};

use super::units::rad_to_deg;
use crate::lenient;

/// Latitude/longitude in degrees.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    #[serde(deserialize_with = "lenient::f64", default = "lenient::nan")]
    pub lat: f64,
    #[serde(deserialize_with = "lenient::f64", default = "lenient::nan")]
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// Geographic position: degrees for lat/lon, feet for altitude.
///
/// Values coming off the wire may carry non-finite components (missing or
/// non-numeric fields deserialize to NaN); [`GeoPosition::merge`] is the
/// only way such a value reaches tracked state.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    #[serde(deserialize_with = "lenient::f64", default = "lenient::nan")]
    pub lat: f64,
    #[serde(deserialize_with = "lenient::f64", default = "lenient::nan")]
    pub lon: f64,
    #[serde(deserialize_with = "lenient::f64", default = "lenient::nan")]
    pub alt: f64,
}

impl GeoPosition {
    pub const ORIGIN: GeoPosition = GeoPosition {
        lat: 0.0,
        lon: 0.0,
        alt: 0.0,
    };

    pub fn new(lat: f64, lon: f64, alt: f64) -> Self {
        Self { lat, lon, alt }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite() && self.alt.is_finite()
    }

    pub fn lat_lon(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }

    pub fn with_alt(self, alt: f64) -> Self {
        Self { alt, ..self }
    }

    pub fn offset(self, dlat: f64, dlon: f64) -> Self {
        Self {
            lat: self.lat + dlat,
            lon: self.lon + dlon,
            alt: self.alt,
        }
    }

    /// Copies every finite component of `update`, keeping the previous value
    /// for the others. Returns `false` if any component was rejected.
    pub fn merge(&mut self, update: GeoPosition) -> bool {
        merge_component(&mut self.lat, update.lat)
            & merge_component(&mut self.lon, update.lon)
            & merge_component(&mut self.alt, update.alt)
    }

    /// Builds a position from `update`, filling rejected components from `fallback`.
    pub fn sanitized(update: GeoPosition, fallback: GeoPosition) -> (GeoPosition, bool) {
        let mut pos = fallback;
        let ok = pos.merge(update);
        (pos, ok)
    }
}

impl From<LatLon> for GeoPosition {
    fn from(ll: LatLon) -> Self {
        GeoPosition::new(ll.lat, ll.lon, 0.0)
    }
}

/// Velocity in aircraft-local axes: x east, y north, z up.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    #[serde(deserialize_with = "lenient::f64", default = "lenient::nan")]
    pub x: f64,
    #[serde(deserialize_with = "lenient::f64", default = "lenient::nan")]
    pub y: f64,
    #[serde(deserialize_with = "lenient::f64", default = "lenient::nan")]
    pub z: f64,
}

impl Velocity {
    pub const ZERO: Velocity = Velocity {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Heading in degrees, clockwise from north: `atan2(x, y)`.
    pub fn heading_deg(&self) -> f64 {
        rad_to_deg(self.x.atan2(self.y))
    }

    pub fn merge(&mut self, update: Velocity) -> bool {
        merge_component(&mut self.x, update.x)
            & merge_component(&mut self.y, update.y)
            & merge_component(&mut self.z, update.z)
    }
}

fn merge_component(current: &mut f64, update: f64) -> bool {
    if update.is_finite() {
        *current = update;
        true
    } else {
        false
    }
}
