use std::collections::BTreeMap;
use std::path::Path;

use foundation::math::{GeoPosition, LatLon};
use render::{Color, Rotation};
use serde::{Deserialize, Serialize};

use crate::error::{AirspaceError, Result};
use crate::symbology::SymbolKind;

/// Relationship between the navigator range and the NMI scale shown on screen.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleCalibration {
    pub reference_range: f64,
    pub reference_nmi: f64,
}

impl Default for ScaleCalibration {
    fn default() -> Self {
        Self {
            reference_range: 32_000.0,
            reference_nmi: 5.0,
        }
    }
}

impl ScaleCalibration {
    pub fn widescreen() -> Self {
        Self {
            reference_range: 45_000.0,
            reference_nmi: 5.0,
        }
    }

    pub fn range_per_nmi(&self) -> f64 {
        self.reference_range / self.reference_nmi
    }

    pub fn nmi_for_range(&self, range: f64) -> f64 {
        range / self.range_per_nmi()
    }

    pub fn range_for_nmi(&self, nmi: f64) -> f64 {
        nmi * self.range_per_nmi()
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// Top-down map with flat collada symbols.
    #[default]
    Flat,
    /// Tilted view with drone models.
    Perspective,
}

/// One model file plus the corrections needed to orient and size it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSpec {
    pub file: String,
    #[serde(default)]
    pub rotation: Rotation,
    pub scale: f64,
}

impl AssetSpec {
    pub fn new(file: impl Into<String>, rotation: Rotation, scale: f64) -> Self {
        Self {
            file: file.into(),
            rotation,
            scale,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolAssets {
    pub ownship: AssetSpec,
    pub alert: AssetSpec,
    pub target: AssetSpec,
    pub traffic_avoid: AssetSpec,
    pub traffic_monitor: AssetSpec,
}

const COLLADA_SCALE: f64 = 1100.0 / 5.0;
const DRONE_SCALE: f64 = 0.4;

impl SymbolAssets {
    pub fn flat() -> Self {
        let spec = |kind: SymbolKind| {
            AssetSpec::new(format!("{}.dae", kind.name()), Rotation::default(), COLLADA_SCALE)
        };
        Self {
            ownship: spec(SymbolKind::Ownship),
            alert: spec(SymbolKind::Alert),
            target: spec(SymbolKind::Target),
            traffic_avoid: spec(SymbolKind::TrafficAvoid),
            traffic_monitor: spec(SymbolKind::TrafficMonitor),
        }
    }

    pub fn perspective() -> Self {
        let drone = |colour: &str| {
            AssetSpec::new(
                format!("parrot-drone-{colour}.dae"),
                Rotation::new(180.0, 185.0, 180.0),
                DRONE_SCALE,
            )
        };
        Self {
            ownship: drone("blue"),
            alert: drone("red"),
            target: drone("white"),
            traffic_avoid: drone("yellow"),
            traffic_monitor: drone("yellow"),
        }
    }

    pub fn get(&self, kind: SymbolKind) -> &AssetSpec {
        match kind {
            SymbolKind::Ownship => &self.ownship,
            SymbolKind::Alert => &self.alert,
            SymbolKind::Target => &self.target,
            SymbolKind::TrafficAvoid => &self.traffic_avoid,
            SymbolKind::TrafficMonitor => &self.traffic_monitor,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub offset_x: f64,
    pub above_offset_y: f64,
    pub below_offset_y: f64,
    /// Vertical speed magnitude at which a climb/descend glyph is shown.
    /// Compared against `velocity.z` as-is, whatever unit the feed uses.
    pub climb_threshold: f64,
    pub label_font_px: f32,
    pub call_sign_font_px: f32,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            offset_x: 18.0,
            above_offset_y: -16.0,
            below_offset_y: 42.0,
            climb_threshold: 50.0,
            label_font_px: 18.0,
            call_sign_font_px: 14.0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardConfig {
    pub size_nmi: f64,
    pub opacity: f32,
    pub color: Color,
    pub altitude_offset_ft: f64,
}

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            size_nmi: 1.0,
            opacity: 0.4,
            color: Color::rgb(1.0, 0.54, 0.0),
            altitude_offset_ft: 100.0,
        }
    }
}

impl HazardConfig {
    pub fn interior(&self) -> Color {
        self.color.with_alpha(self.opacity)
    }

    /// Sector size for one LoS update: `requested` when it is a positive
    /// finite NMI value, the configured size otherwise.
    pub fn sector_size(&self, requested: Option<f64>) -> f64 {
        requested
            .filter(|nmi| nmi.is_finite() && *nmi > 0.0)
            .unwrap_or(self.size_nmi)
    }
}

/// Everything the airspace display needs to know up front.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AirspaceConfig {
    pub scale: ScaleCalibration,
    pub initial_zoom_nmi: f64,
    pub ownship: GeoPosition,
    pub ownship_call_sign: String,
    pub call_sign_visible: bool,
    pub traffic_visible: bool,
    /// Shows the ownship symbol; otherwise it only anchors the map.
    pub gods_view: bool,
    pub view: ViewMode,
    /// Overrides the asset table implied by `view`.
    pub symbols: Option<SymbolAssets>,
    pub labels: LabelConfig,
    pub hazard: HazardConfig,
    pub render_altitude_divisor: f64,
    pub locations: BTreeMap<String, LatLon>,
}

impl Default for AirspaceConfig {
    fn default() -> Self {
        Self {
            scale: ScaleCalibration::default(),
            initial_zoom_nmi: 5.0,
            ownship: GeoPosition::new(37.0298687, -76.3452218, 0.0),
            ownship_call_sign: "ownship".to_string(),
            call_sign_visible: false,
            traffic_visible: true,
            gods_view: false,
            view: ViewMode::Flat,
            symbols: None,
            labels: LabelConfig::default(),
            hazard: HazardConfig::default(),
            render_altitude_divisor: 4.0,
            locations: default_locations(),
        }
    }
}

fn default_locations() -> BTreeMap<String, LatLon> {
    [
        ("hampton", 37.0298687, -76.3452218),
        ("nyc", 40.7128, -74.0060),
        ("norfolk", 36.8508, -76.2859),
        ("newportnews", 37.0871, -76.4730),
        ("fishermanisland", 37.0929, -75.9635),
        ("virginiabeach", 36.8529, -75.9780),
        ("poquoson", 37.1224, -76.3458),
        ("chesapeake", 36.7682, -76.2875),
        ("portsmouth", 36.8354, -76.2983),
        ("suffolk", 36.7282, -76.5836),
    ]
    .into_iter()
    .map(|(name, lat, lon)| (name.to_string(), LatLon::new(lat, lon)))
    .collect()
}

fn location_key(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

impl AirspaceConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| AirspaceError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Altitude at which models are drawn so they stay in the camera's view.
    pub fn render_altitude(&self, alt_ft: f64) -> f64 {
        if self.render_altitude_divisor > 0.0 {
            alt_ft / self.render_altitude_divisor
        } else {
            alt_ft
        }
    }

    /// Named location lookup; case and whitespace are ignored.
    pub fn location(&self, name: &str) -> Option<LatLon> {
        let key = location_key(name);
        self.locations
            .iter()
            .find(|(k, _)| location_key(k) == key)
            .map(|(_, ll)| *ll)
    }

    pub fn symbol_assets(&self) -> SymbolAssets {
        match (&self.symbols, self.view) {
            (Some(custom), _) => custom.clone(),
            (None, ViewMode::Flat) => SymbolAssets::flat(),
            (None, ViewMode::Perspective) => SymbolAssets::perspective(),
        }
    }
}
