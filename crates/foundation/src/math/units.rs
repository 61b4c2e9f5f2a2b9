/// One nautical mile spans one arc-minute of latitude.
pub const NMI_PER_DEGREE: f64 = 60.0;

pub fn nmi_to_degrees(nmi: f64) -> f64 {
    nmi / NMI_PER_DEGREE
}

pub fn rad_to_deg(rad: f64) -> f64 {
    rad * 180.0 / std::f64::consts::PI
}
