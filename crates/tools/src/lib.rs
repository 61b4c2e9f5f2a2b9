//! Drives an [`Airspace`] from a recorded per-step feed.

use std::collections::BTreeSet;
use std::io::BufRead;

use airspace::{Airspace, AirspaceConfig, Location, LosRegion, SymbolKind, TrafficDescriptor};
use foundation::math::{GeoPosition, Velocity};
use render::{AssetError, AssetLoader, AssetTicket, ModelHandle, QueuedLoader, RecordingRenderer};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error(transparent)]
    Airspace(#[from] airspace::AirspaceError),
    #[error("cannot read feed: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {source}")]
    Step {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnshipUpdate {
    #[serde(default)]
    pub s: Option<GeoPosition>,
    #[serde(default)]
    pub v: Option<Velocity>,
}

/// One line of the feed. Every field is optional and an absent field
/// leaves the corresponding state alone. `traffic` distinguishes absent
/// (unchanged) from `null` or `[]`, which both clear all traffic.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub ownship: Option<OwnshipUpdate>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub traffic: Option<Option<Vec<TrafficDescriptor>>>,
    #[serde(default)]
    pub los: Option<Vec<LosRegion>>,
    /// LoS sector size in NMI for this step's `los`.
    #[serde(default, rename = "losNmi")]
    pub los_nmi: Option<f64>,
    #[serde(default)]
    pub zoom: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default, rename = "goTo")]
    pub go_to: Option<Location>,
}

/// Marks a key that is present, so `null` reaches the caller as `Some(None)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AircraftSummary {
    pub call_sign: String,
    pub symbol: Option<SymbolKind>,
    pub label: Option<String>,
    pub hazard_sectors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepSummary {
    pub step: usize,
    pub scale_nmi: f64,
    pub renderables: usize,
    pub traffic: Vec<AircraftSummary>,
}

/// Settles tickets straight away, failing the files it was told to fail.
#[derive(Debug, Default)]
pub struct InstantLoader {
    queue: QueuedLoader,
    failing: BTreeSet<String>,
}

impl InstantLoader {
    pub fn new(failing: impl IntoIterator<Item = String>) -> Self {
        Self {
            queue: QueuedLoader::new(),
            failing: failing.into_iter().collect(),
        }
    }

    fn drain(&mut self) -> Vec<(AssetTicket, Result<ModelHandle, AssetError>)> {
        self.queue
            .drain()
            .into_iter()
            .map(|(ticket, file)| {
                let outcome = if self.failing.contains(&file) {
                    Err(AssetError::NotFound(file))
                } else {
                    Ok(ModelHandle(ticket.0))
                };
                (ticket, outcome)
            })
            .collect()
    }
}

impl AssetLoader for InstantLoader {
    fn load(&mut self, file: &str) -> AssetTicket {
        self.queue.load(file)
    }
}

pub struct Replay {
    airspace: Airspace<RecordingRenderer, InstantLoader>,
    steps: usize,
}

impl Replay {
    pub fn new(config: AirspaceConfig, loader: InstantLoader) -> Result<Self, ReplayError> {
        let mut replay = Self {
            airspace: Airspace::new(RecordingRenderer::new(), loader, config)?,
            steps: 0,
        };
        replay.settle();
        Ok(replay)
    }

    fn settle(&mut self) {
        for (ticket, outcome) in self.airspace.loader_mut().drain() {
            self.airspace.complete_load(ticket, outcome);
        }
    }

    pub fn apply(&mut self, step: &Step) -> StepSummary {
        if let Some(ownship) = &step.ownship {
            if let Some(s) = ownship.s {
                if let Err(err) = self.airspace.set_ownship_position(s) {
                    warn!(error = %err, "ownship position rejected");
                }
            }
            if let Some(v) = ownship.v {
                self.airspace.set_ownship_velocity(v);
            }
        }
        if let Some(location) = &step.go_to {
            if let Err(err) = self.airspace.go_to(location.clone()) {
                warn!(error = %err, "goTo rejected");
            }
        }
        if let Some(deg) = step.heading {
            self.airspace.set_ownship_heading(deg, true);
        }
        if let Some(traffic) = &step.traffic {
            self.airspace.set_traffic(traffic.as_deref());
        }
        if let Some(los) = &step.los {
            self.airspace.set_los(los, step.los_nmi);
        }
        if let Some(nmi) = step.zoom {
            self.airspace.set_zoom_level(nmi);
        }
        self.settle();
        self.steps += 1;
        self.summary()
    }

    pub fn summary(&self) -> StepSummary {
        let traffic = self
            .airspace
            .traffic()
            .map(|t| AircraftSummary {
                call_sign: t.call_sign().to_string(),
                symbol: t.visible_symbols().first().copied(),
                label: t.labels().map(|l| l.altitude_text().text.clone()),
                hazard_sectors: t.hazard().len(),
            })
            .collect();
        StepSummary {
            step: self.steps,
            scale_nmi: self.airspace.current_scale(),
            renderables: self.airspace.renderer().len(),
            traffic,
        }
    }

    pub fn airspace(&self) -> &Airspace<RecordingRenderer, InstantLoader> {
        &self.airspace
    }
}

/// Replays a JSON-lines feed, handing each step's summary to `emit`.
/// Blank lines are skipped.
pub fn replay_feed(
    replay: &mut Replay,
    feed: impl BufRead,
    mut emit: impl FnMut(&StepSummary),
) -> Result<usize, ReplayError> {
    let mut applied = 0;
    for (idx, line) in feed.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let step: Step =
            serde_json::from_str(&line).map_err(|source| ReplayError::Step { line: idx + 1, source })?;
        let summary = replay.apply(&step);
        debug!(step = summary.step, traffic = summary.traffic.len(), "step applied");
        emit(&summary);
        applied += 1;
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FEED: &str = r#"
{"ownship":{"s":{"lat":37,"lon":-76,"alt":4000}},"traffic":[{"s":{"lat":37,"lon":-76,"alt":4000},"v":{"x":100,"y":100,"z":0},"symbol":"daa-target","callSign":"AC1"}]}
{"traffic":[{"s":{"lat":37,"lon":-76,"alt":4000},"v":{"x":100,"y":100,"z":0},"symbol":"daa-alert","callSign":"AC1"},{"s":{"lat":36,"lon":-75,"alt":3500},"v":{"x":50,"y":50,"z":60},"callSign":"AC2"}],"los":[{"ac":"AC1","sectors":[{"lat":37,"lon":-76,"alt":4000,"los":true}]}],"zoom":10}
"#;

    #[test]
    fn replays_feed_step_by_step() {
        let mut replay = Replay::new(AirspaceConfig::default(), InstantLoader::default()).unwrap();
        let mut summaries = Vec::new();
        let n = replay_feed(&mut replay, FEED.as_bytes(), |s| summaries.push(s.clone())).unwrap();
        assert_eq!(n, 2);

        let first = &summaries[0];
        assert_eq!(first.traffic.len(), 1);
        assert_eq!(first.traffic[0].symbol, Some(SymbolKind::Target));
        assert_eq!(first.traffic[0].label.as_deref(), Some(" 00"));

        let second = &summaries[1];
        assert_eq!(second.scale_nmi, 10.0);
        assert_eq!(second.traffic[0].symbol, Some(SymbolKind::Alert));
        assert_eq!(second.traffic[0].hazard_sectors, 1);
        assert_eq!(second.traffic[1].symbol, Some(SymbolKind::Target));
        assert_eq!(second.traffic[1].label.as_deref(), Some("-05⇧"));
    }

    #[test]
    fn failing_assets_hide_symbol() {
        let loader = InstantLoader::new(["daa-alert.dae".to_string()]);
        let mut replay = Replay::new(AirspaceConfig::default(), loader).unwrap();
        replay_feed(&mut replay, FEED.as_bytes(), |_| {}).unwrap();
        let summary = replay.summary();
        assert_eq!(summary.traffic[0].symbol, None);
        assert_eq!(summary.traffic[1].symbol, Some(SymbolKind::Target));
    }

    #[test]
    fn bad_line_reports_its_number() {
        let mut replay = Replay::new(AirspaceConfig::default(), InstantLoader::default()).unwrap();
        let err = replay_feed(&mut replay, "{}\n{\"zoom\": [\n".as_bytes(), |_| {}).unwrap_err();
        assert!(matches!(err, ReplayError::Step { line: 2, .. }));
        assert_eq!(replay.summary().step, 1);
    }

    #[test]
    fn absent_traffic_keeps_scene_and_null_clears_it() {
        let mut replay = Replay::new(AirspaceConfig::default(), InstantLoader::default()).unwrap();
        let feed = format!("{}\n{{\"zoom\": 10}}\n", FEED.trim().lines().next().unwrap());
        replay_feed(&mut replay, feed.as_bytes(), |_| {}).unwrap();
        let summary = replay.summary();
        assert_eq!(summary.scale_nmi, 10.0);
        assert_eq!(summary.traffic.len(), 1);

        replay_feed(&mut replay, "{\"traffic\": null}\n".as_bytes(), |_| {}).unwrap();
        assert!(replay.summary().traffic.is_empty());
    }

    #[test]
    fn los_nmi_sizes_sectors() {
        let step: Step = serde_json::from_str(
            r#"{"traffic":[{"s":{"lat":37,"lon":-76,"alt":4000}}],
                "los":[{"ac":"AC1","sectors":[{"lat":37,"lon":-76,"alt":4000,"los":true}]}],
                "losNmi":3}"#,
        )
        .unwrap();
        assert_eq!(step.los_nmi, Some(3.0));
        let mut replay = Replay::new(AirspaceConfig::default(), InstantLoader::default()).unwrap();
        replay.apply(&step);

        let airspace = replay.airspace();
        let id = airspace.traffic().next().unwrap().hazard().sectors()[0].id();
        let mesh = airspace.renderer().renderable(id).unwrap().as_mesh().unwrap();
        assert!((mesh.positions[1].lat - (37.0 + 3.0 / 120.0)).abs() < 1e-12);
    }
}
