use foundation::lenient;
use foundation::math::{GeoPosition, Velocity};
use serde::{Deserialize, Serialize};

use crate::symbology::SymbolSelector;

/// One traffic aircraft as delivered by the per-step feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficDescriptor {
    pub s: GeoPosition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v: Option<Velocity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<SymbolSelector>,
    #[serde(rename = "callSign", default, skip_serializing_if = "Option::is_none")]
    pub call_sign: Option<String>,
}

impl TrafficDescriptor {
    pub fn new(s: GeoPosition) -> Self {
        Self {
            s,
            v: None,
            symbol: None,
            call_sign: None,
        }
    }

    pub fn with_velocity(mut self, v: Velocity) -> Self {
        self.v = Some(v);
        self
    }

    pub fn with_symbol(mut self, symbol: impl Into<SymbolSelector>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn with_call_sign(mut self, call_sign: impl Into<String>) -> Self {
        self.call_sign = Some(call_sign.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LosSectorRecord {
    #[serde(deserialize_with = "lenient::f64", default = "lenient::nan")]
    pub lat: f64,
    #[serde(deserialize_with = "lenient::f64", default = "lenient::nan")]
    pub lon: f64,
    #[serde(deserialize_with = "lenient::f64", default = "lenient::nan")]
    pub alt: f64,
    #[serde(default)]
    pub los: bool,
}

/// Conflict sectors for the traffic aircraft at the same index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LosRegion {
    #[serde(default)]
    pub ac: String,
    #[serde(default)]
    pub sectors: Option<Vec<LosSectorRecord>>,
}

impl LosRegion {
    /// Centres of the sectors flagged as in conflict, in feed order.
    pub fn conflict_centers(&self) -> Vec<GeoPosition> {
        self.sectors
            .iter()
            .flatten()
            .filter(|s| s.los)
            .map(|s| GeoPosition::new(s.lat, s.lon, s.alt))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{LosRegion, TrafficDescriptor};
    use crate::symbology::{SymbolKind, SymbolSelector};
    use foundation::math::GeoPosition;
    use pretty_assertions::assert_eq;

    #[test]
    fn descriptor_from_feed_json() {
        let d: TrafficDescriptor = serde_json::from_str(
            r#"{"s":{"lat":37,"lon":-76,"alt":4000},"v":{"x":100,"y":100,"z":0},
                "symbol":"daa-target","callSign":"AC1"}"#,
        )
        .unwrap();
        assert_eq!(d.s, GeoPosition::new(37.0, -76.0, 4000.0));
        assert_eq!(d.symbol, Some(SymbolSelector::Kind(SymbolKind::Target)));
        assert_eq!(d.call_sign.as_deref(), Some("AC1"));

        let bare: TrafficDescriptor = serde_json::from_str(r#"{"s":{"lat":36,"lon":-75,"alt":3500}}"#).unwrap();
        assert_eq!(bare.v, None);
        assert_eq!(bare.symbol, None);
        assert_eq!(bare.call_sign, None);
    }

    #[test]
    fn only_conflicting_sectors_count() {
        let region: LosRegion = serde_json::from_str(
            r#"{"ac":"AC1","sectors":[
                {"lat":"37.0","lon":"-76.0","alt":"4000","los":true},
                {"lat":37.1,"lon":-76.0,"alt":4000,"los":false},
                {"lat":37.2,"lon":-76.0,"alt":4000,"los":true}]}"#,
        )
        .unwrap();
        let centers = region.conflict_centers();
        assert_eq!(centers.len(), 2);
        assert_eq!(centers[0], GeoPosition::new(37.0, -76.0, 4000.0));
        assert!(LosRegion::default().conflict_centers().is_empty());
    }
}
