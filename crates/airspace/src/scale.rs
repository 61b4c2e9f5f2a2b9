use tracing::warn;

use crate::config::ScaleCalibration;

/// Keeps the NMI scale in step with the navigator range.
///
/// The scale is always derived from the range the renderer reports back,
/// so it reflects the zoom that actually took effect.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleSynchronizer {
    calibration: ScaleCalibration,
    zoom_nmi: f64,
    scale_nmi: f64,
}

impl ScaleSynchronizer {
    pub fn new(calibration: ScaleCalibration, initial_nmi: f64) -> Self {
        Self {
            calibration,
            zoom_nmi: initial_nmi,
            scale_nmi: initial_nmi,
        }
    }

    pub fn scale_for_range(&self, range: f64) -> f64 {
        self.calibration.nmi_for_range(range)
    }

    /// Records a zoom request and returns the navigator range for it, or
    /// `None` if `nmi` is not a positive finite number.
    pub fn request(&mut self, nmi: f64) -> Option<f64> {
        if !nmi.is_finite() || nmi <= 0.0 {
            warn!(nmi, "ignoring invalid zoom level");
            return None;
        }
        self.zoom_nmi = nmi;
        Some(self.calibration.range_for_nmi(nmi))
    }

    /// Recomputes the scale from the range now in effect.
    pub fn observe_range(&mut self, range: f64) -> f64 {
        self.scale_nmi = self.scale_for_range(range);
        self.scale_nmi
    }

    /// Last requested zoom level.
    pub fn zoom_nmi(&self) -> f64 {
        self.zoom_nmi
    }

    /// Scale currently applied to every aircraft.
    pub fn scale_nmi(&self) -> f64 {
        self.scale_nmi
    }

    pub fn calibration(&self) -> ScaleCalibration {
        self.calibration
    }
}
