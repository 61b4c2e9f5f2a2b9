use foundation::math::LatLon;

/// Camera state of the globe.
///
/// `range` is the eye distance in globe units; the airspace converts it to a
/// nautical-mile scale through its calibration constant.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Navigator {
    pub range: f64,
    pub look_at: LatLon,
    /// Degrees, clockwise from north.
    pub heading: f64,
    /// Degrees from nadir; 0 is a top-down view.
    pub tilt: f64,
}

impl Default for Navigator {
    fn default() -> Self {
        Self {
            range: 0.0,
            look_at: LatLon::new(0.0, 0.0),
            heading: 0.0,
            tilt: 0.0,
        }
    }
}
