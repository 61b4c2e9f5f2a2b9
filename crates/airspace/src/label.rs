use foundation::math::GeoPosition;
use render::{Color, LayerId, Renderable, RenderableId, Renderer, TextOffset, TextRenderable};

use crate::config::LabelConfig;

pub const CLIMB_GLYPH: &str = "⇧";
pub const DESCEND_GLYPH: &str = "⇩";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LabelSide {
    Above,
    Below,
}

impl LabelSide {
    pub fn opposite(self) -> Self {
        match self {
            LabelSide::Above => LabelSide::Below,
            LabelSide::Below => LabelSide::Above,
        }
    }

    pub fn offset(self, config: &LabelConfig) -> TextOffset {
        let y = match self {
            LabelSide::Above => config.above_offset_y,
            LabelSide::Below => config.below_offset_y,
        };
        TextOffset::new(config.offset_x, y)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AltitudeLabel {
    pub text: String,
    pub side: LabelSide,
}

/// Relative altitude in hundreds of feet, truncated towards zero.
pub fn relative_hundreds(alt: f64, reference_alt: f64) -> i64 {
    ((alt - reference_alt) / 100.0).trunc() as i64
}

/// `" 00"`, `"+05"`, `"-12"`: sign plus at least two digits.
pub fn format_relative(hundreds: i64) -> String {
    match hundreds {
        0 => " 00".to_string(),
        h if h > 0 => format!("+{h:02}"),
        h => format!("-{:02}", h.unsigned_abs()),
    }
}

/// Climb or descend glyph, only outside the `(-threshold, threshold)` dead-band.
pub fn climb_glyph(vertical_speed: f64, threshold: f64) -> Option<&'static str> {
    if !vertical_speed.is_finite() || vertical_speed.abs() < threshold {
        return None;
    }
    if vertical_speed > 0.0 {
        Some(CLIMB_GLYPH)
    } else if vertical_speed < 0.0 {
        Some(DESCEND_GLYPH)
    } else {
        None
    }
}

pub fn altitude_label(
    alt: f64,
    reference_alt: Option<f64>,
    vertical_speed: Option<f64>,
    config: &LabelConfig,
) -> AltitudeLabel {
    let (mut text, side) = match reference_alt {
        Some(reference) => {
            let hundreds = relative_hundreds(alt, reference);
            let side = if hundreds >= 0 {
                LabelSide::Above
            } else {
                LabelSide::Below
            };
            (format_relative(hundreds), side)
        }
        None => (format!("{}ft", alt.floor()), LabelSide::Above),
    };
    if let Some(glyph) = vertical_speed.and_then(|vz| climb_glyph(vz, config.climb_threshold)) {
        text.push_str(glyph);
    }
    AltitudeLabel { text, side }
}

/// The call sign sits opposite the altitude label.
pub fn call_sign_side(alt: f64, reference_alt: Option<f64>) -> LabelSide {
    let hundreds = relative_hundreds(alt, reference_alt.unwrap_or(0.0));
    if hundreds < 0 {
        LabelSide::Above
    } else {
        LabelSide::Below
    }
}

/// Inputs needed to (re)draw both text renderables of one aircraft.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelState<'a> {
    pub anchor: GeoPosition,
    pub alt: f64,
    pub reference_alt: Option<f64>,
    pub vertical_speed: Option<f64>,
    pub call_sign: &'a str,
    pub color: Color,
    pub label_enabled: bool,
    pub call_sign_enabled: bool,
}

/// Relative-altitude label and call-sign label of one aircraft.
#[derive(Debug)]
pub struct AircraftLabels {
    layer: LayerId,
    altitude: (RenderableId, TextRenderable),
    call_sign: (RenderableId, TextRenderable),
    removed: bool,
}

impl AircraftLabels {
    pub fn create(
        layer: LayerId,
        state: &LabelState<'_>,
        config: &LabelConfig,
        renderer: &mut dyn Renderer,
    ) -> Self {
        let (altitude, call_sign) = Self::texts(state, config);
        let altitude_id = renderer.add(layer, Renderable::Text(altitude.clone()));
        let call_sign_id = renderer.add(layer, Renderable::Text(call_sign.clone()));
        Self {
            layer,
            altitude: (altitude_id, altitude),
            call_sign: (call_sign_id, call_sign),
            removed: false,
        }
    }

    fn texts(state: &LabelState<'_>, config: &LabelConfig) -> (TextRenderable, TextRenderable) {
        let label = altitude_label(state.alt, state.reference_alt, state.vertical_speed, config);
        let altitude = TextRenderable {
            position: state.anchor,
            text: label.text,
            color: state.color,
            font_size_px: config.label_font_px,
            bold: true,
            offset: label.side.offset(config),
            enabled: state.label_enabled,
        };
        let call_sign = TextRenderable {
            position: state.anchor,
            text: state.call_sign.to_string(),
            color: state.color,
            font_size_px: config.call_sign_font_px,
            bold: true,
            offset: call_sign_side(state.alt, state.reference_alt).offset(config),
            enabled: state.call_sign_enabled,
        };
        (altitude, call_sign)
    }

    /// Recomputes text, placement, colour and visibility; only changed
    /// renderables are pushed to the renderer.
    pub fn refresh(&mut self, state: &LabelState<'_>, config: &LabelConfig, renderer: &mut dyn Renderer) {
        if self.removed {
            return;
        }
        let (altitude, call_sign) = Self::texts(state, config);
        for ((id, current), next) in [(&mut self.altitude, altitude), (&mut self.call_sign, call_sign)] {
            if *current != next {
                *current = next;
                renderer.update(*id, &Renderable::Text(current.clone()));
            }
        }
    }

    pub fn set_enabled(&mut self, label: bool, call_sign: bool, renderer: &mut dyn Renderer) {
        if self.removed {
            return;
        }
        for ((id, current), enabled) in [(&mut self.altitude, label), (&mut self.call_sign, call_sign)] {
            if current.enabled != enabled {
                current.enabled = enabled;
                renderer.set_enabled(*id, enabled);
            }
        }
    }

    pub fn remove(&mut self, renderer: &mut dyn Renderer) {
        if self.removed {
            return;
        }
        renderer.remove(self.layer, self.altitude.0);
        renderer.remove(self.layer, self.call_sign.0);
        self.removed = true;
    }

    pub fn altitude_text(&self) -> &TextRenderable {
        &self.altitude.1
    }

    pub fn call_sign_text(&self) -> &TextRenderable {
        &self.call_sign.1
    }
}
