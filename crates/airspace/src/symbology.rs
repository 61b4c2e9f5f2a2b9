use std::fmt;
use std::str::FromStr;

use render::Color;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// The five alert-driven aircraft symbols.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    #[serde(rename = "daa-ownship")]
    Ownship,
    #[serde(rename = "daa-alert")]
    Alert,
    #[serde(rename = "daa-target")]
    Target,
    #[serde(rename = "daa-traffic-avoid")]
    TrafficAvoid,
    #[serde(rename = "daa-traffic-monitor")]
    TrafficMonitor,
}

impl SymbolKind {
    /// Every entity owns one symbol per kind, created in this order.
    pub const ALL: [SymbolKind; 5] = [
        SymbolKind::Ownship,
        SymbolKind::Alert,
        SymbolKind::Target,
        SymbolKind::TrafficAvoid,
        SymbolKind::TrafficMonitor,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SymbolKind::Ownship => "daa-ownship",
            SymbolKind::Alert => "daa-alert",
            SymbolKind::Target => "daa-target",
            SymbolKind::TrafficAvoid => "daa-traffic-avoid",
            SymbolKind::TrafficMonitor => "daa-traffic-monitor",
        }
    }

    /// Alert level to symbol: 1 avoid, 2 monitor, 3 alert, anything else target.
    pub fn from_alert(level: i64) -> Self {
        match level {
            1 => SymbolKind::TrafficAvoid,
            2 => SymbolKind::TrafficMonitor,
            3 => SymbolKind::Alert,
            _ => SymbolKind::Target,
        }
    }

    pub fn color(&self) -> Color {
        match self {
            SymbolKind::Ownship => Color::CYAN,
            SymbolKind::Alert => Color::RED,
            SymbolKind::Target => Color::WHITE,
            SymbolKind::TrafficAvoid | SymbolKind::TrafficMonitor => Color::YELLOW,
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised symbol name {0:?}")]
pub struct UnknownSymbol(pub String);

impl FromStr for SymbolKind {
    type Err = UnknownSymbol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SymbolKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| UnknownSymbol(s.to_string()))
    }
}

/// How a traffic record asks for its symbol: by name or by alert level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SymbolSelector {
    Kind(SymbolKind),
    Alert(f64),
    Unknown(String),
}

impl SymbolSelector {
    pub fn resolve(&self) -> SymbolKind {
        match self {
            SymbolSelector::Kind(kind) => *kind,
            SymbolSelector::Alert(level) => SymbolKind::from_alert(level.trunc() as i64),
            SymbolSelector::Unknown(name) => {
                warn!(symbol = %name, "unrecognised symbol name, using daa-target");
                SymbolKind::Target
            }
        }
    }
}

impl From<SymbolKind> for SymbolSelector {
    fn from(kind: SymbolKind) -> Self {
        SymbolSelector::Kind(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::{SymbolKind, SymbolSelector};

    #[test]
    fn alert_table() {
        assert_eq!(SymbolKind::from_alert(0), SymbolKind::Target);
        assert_eq!(SymbolKind::from_alert(1), SymbolKind::TrafficAvoid);
        assert_eq!(SymbolKind::from_alert(2), SymbolKind::TrafficMonitor);
        assert_eq!(SymbolKind::from_alert(3), SymbolKind::Alert);
        assert_eq!(SymbolKind::from_alert(-1), SymbolKind::Target);
        assert_eq!(SymbolKind::from_alert(42), SymbolKind::Target);
    }

    #[test]
    fn names_parse_back() {
        for kind in SymbolKind::ALL {
            assert_eq!(kind.name().parse::<SymbolKind>(), Ok(kind));
        }
        assert!("daa-unknown".parse::<SymbolKind>().is_err());
    }

    #[test]
    fn selector_accepts_names_levels_and_garbage() {
        let s: SymbolSelector = serde_json::from_str(r#""daa-alert""#).unwrap();
        assert_eq!(s.resolve(), SymbolKind::Alert);
        let s: SymbolSelector = serde_json::from_str("2").unwrap();
        assert_eq!(s.resolve(), SymbolKind::TrafficMonitor);
        let s: SymbolSelector = serde_json::from_str(r#""plane""#).unwrap();
        assert_eq!(s, SymbolSelector::Unknown("plane".into()));
        assert_eq!(s.resolve(), SymbolKind::Target);
    }
}
