use std::collections::BTreeMap;

use foundation::arena::Arena;
use foundation::math::{GeoPosition, LatLon, Velocity};
use render::{AssetLoader, AssetOutcome, AssetTicket, LayerId, Renderer};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::aircraft::{AircraftHandle, AircraftInit, AircraftLayers, DrawContext, TrackedAircraft};
use crate::config::{AirspaceConfig, ViewMode};
use crate::error::{AirspaceError, Result};
use crate::reconcile;
use crate::scale::ScaleSynchronizer;
use crate::symbology::SymbolKind;
use crate::traffic::{LosRegion, TrafficDescriptor};

pub const LOS_LAYER: &str = "LoS Layer";
pub const TRAFFIC_LAYER: &str = "Aircraft Layer";
pub const OWNSHIP_LAYER: &str = "Ownship Layer";
pub const TEXT_LAYER: &str = "Aircraft Text Layer";

const PERSPECTIVE_TILT_DEG: f64 = 55.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AirspaceLayers {
    pub hazard: LayerId,
    pub traffic: LayerId,
    pub ownship: LayerId,
    pub labels: LayerId,
}

/// A place on the map: a configured name or explicit coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Location {
    Named(String),
    Position(GeoPosition),
}

impl From<&str> for Location {
    fn from(name: &str) -> Self {
        Location::Named(name.to_string())
    }
}

impl From<GeoPosition> for Location {
    fn from(pos: GeoPosition) -> Self {
        Location::Position(pos)
    }
}

impl From<LatLon> for Location {
    fn from(ll: LatLon) -> Self {
        Location::Position(GeoPosition::new(ll.lat, ll.lon, f64::NAN))
    }
}

/// The ownship, the traffic list and everything they draw.
///
/// Per-step updates are synchronous and never fail; model loads are the
/// only asynchronous part and come back through [`Airspace::complete_load`].
pub struct Airspace<R: Renderer, L: AssetLoader> {
    renderer: R,
    loader: L,
    config: AirspaceConfig,
    layers: AirspaceLayers,
    aircraft: Arena<TrackedAircraft>,
    ownship: AircraftHandle,
    traffic: Vec<AircraftHandle>,
    /// Removed aircraft still waiting on model loads.
    retired: Vec<AircraftHandle>,
    tickets: BTreeMap<AssetTicket, (AircraftHandle, SymbolKind)>,
    scale: ScaleSynchronizer,
    traffic_visible: bool,
    call_sign_visible: bool,
}

fn create_layer(renderer: &mut dyn Renderer, layer: &'static str) -> Result<LayerId> {
    renderer.create_layer(layer).map_err(|source| {
        error!(layer, error = %source, "cannot create render layer");
        AirspaceError::LayerUnavailable { layer, source }
    })
}

impl<R: Renderer, L: AssetLoader> Airspace<R, L> {
    /// Creates the render layers and the ownship, then centres the map on it.
    pub fn new(mut renderer: R, mut loader: L, config: AirspaceConfig) -> Result<Self> {
        let layers = AirspaceLayers {
            hazard: create_layer(&mut renderer, LOS_LAYER)?,
            traffic: create_layer(&mut renderer, TRAFFIC_LAYER)?,
            ownship: create_layer(&mut renderer, OWNSHIP_LAYER)?,
            labels: create_layer(&mut renderer, TEXT_LAYER)?,
        };

        let init = AircraftInit {
            call_sign: config.ownship_call_sign.clone(),
            position: config.ownship,
            velocity: None,
            symbol: SymbolKind::Ownship,
            layers: AircraftLayers {
                symbols: layers.ownship,
                labels: layers.labels,
                hazard: layers.hazard,
            },
            with_labels: config.view == ViewMode::Perspective,
        };
        let mut ctx = DrawContext {
            renderer: &mut renderer,
            config: &config,
            reference_alt: None,
        };
        let (mut ownship, tickets) = TrackedAircraft::create(init, &mut ctx, &mut loader);
        if config.gods_view {
            ownship.reveal(&mut renderer);
        } else {
            ownship.hide(&mut renderer);
        }
        if config.call_sign_visible {
            ownship.reveal_call_sign(&mut renderer);
        }

        let mut aircraft = Arena::new();
        let ownship_pos = ownship.position();
        let ownship = AircraftHandle(aircraft.insert(ownship));
        let tickets = tickets
            .into_iter()
            .map(|(kind, ticket)| (ticket, (ownship, kind)))
            .collect();

        let scale = ScaleSynchronizer::new(config.scale, config.initial_zoom_nmi);
        let mut airspace = Self {
            renderer,
            loader,
            layers,
            aircraft,
            ownship,
            traffic: Vec::new(),
            retired: Vec::new(),
            tickets,
            scale,
            traffic_visible: config.traffic_visible,
            call_sign_visible: config.call_sign_visible,
            config,
        };
        airspace.renderer.navigator_mut().look_at = ownship_pos.lat_lon();
        if airspace.config.view == ViewMode::Perspective {
            airspace.renderer.navigator_mut().tilt = PERSPECTIVE_TILT_DEG;
        }
        let initial_zoom = airspace.config.initial_zoom_nmi;
        if !airspace.set_zoom_level(initial_zoom) {
            warn!(nmi = initial_zoom, "invalid initial zoom, using calibration reference");
            let reference = airspace.config.scale.reference_nmi;
            airspace.set_zoom_level(reference);
        }
        info!(view = ?airspace.config.view, "airspace ready");
        Ok(airspace)
    }

    fn reference_alt(&self, handle: AircraftHandle) -> Option<f64> {
        let reference = self.aircraft.get(handle.0)?.reference()?;
        self.aircraft.get(reference.0).map(|a| a.position().alt)
    }

    fn with_aircraft<T>(
        &mut self,
        handle: AircraftHandle,
        f: impl FnOnce(&mut TrackedAircraft, &mut DrawContext<'_>) -> T,
    ) -> Option<T> {
        let reference_alt = self.reference_alt(handle);
        let aircraft = self.aircraft.get_mut(handle.0)?;
        let mut ctx = DrawContext {
            renderer: &mut self.renderer,
            config: &self.config,
            reference_alt,
        };
        Some(f(aircraft, &mut ctx))
    }

    fn spawn(&mut self, init: AircraftInit, reference: Option<AircraftHandle>) -> AircraftHandle {
        let reference_alt = reference
            .and_then(|r| self.aircraft.get(r.0))
            .map(|a| a.position().alt);
        let mut ctx = DrawContext {
            renderer: &mut self.renderer,
            config: &self.config,
            reference_alt,
        };
        let (mut aircraft, tickets) = TrackedAircraft::create(init, &mut ctx, &mut self.loader);
        aircraft.set_reference(reference);
        let handle = AircraftHandle(self.aircraft.insert(aircraft));
        for (kind, ticket) in tickets {
            self.tickets.insert(ticket, (handle, kind));
        }
        handle
    }

    fn retire(&mut self, handle: AircraftHandle) {
        let Some(aircraft) = self.aircraft.get_mut(handle.0) else {
            return;
        };
        aircraft.remove(&mut self.renderer);
        if aircraft.is_settled() {
            self.aircraft.remove(handle.0);
        } else {
            self.retired.push(handle);
        }
    }

    fn apply_visibility(
        aircraft: &mut TrackedAircraft,
        renderer: &mut dyn Renderer,
        traffic_visible: bool,
        call_sign_visible: bool,
    ) {
        if call_sign_visible {
            aircraft.reveal_call_sign(renderer);
        } else {
            aircraft.hide_call_sign(renderer);
        }
        if traffic_visible {
            aircraft.reveal(renderer);
        } else {
            aircraft.hide(renderer);
        }
    }

    /// Reconciles the traffic list with this step's descriptors. `None` is
    /// the same as an empty list. Indices are preserved; the list only
    /// grows or shrinks at the tail. Redraws once.
    pub fn set_traffic(&mut self, traffic: Option<&[TrafficDescriptor]>) {
        let traffic = traffic.unwrap_or_default();
        let plan = reconcile::plan(self.traffic.len(), traffic.len());
        let nmi = self.scale.scale_nmi();
        let ownship = self.ownship;
        let (traffic_visible, call_sign_visible) = (self.traffic_visible, self.call_sign_visible);

        let removed: Vec<AircraftHandle> = self.traffic.drain(plan.remove.clone()).collect();
        for handle in removed {
            self.retire(handle);
        }

        for i in plan.update.clone() {
            let desc = &traffic[i];
            let handle = self.traffic[i];
            if let Some(aircraft) = self.aircraft.get_mut(handle.0) {
                aircraft.set_reference(Some(ownship));
            }
            self.with_aircraft(handle, |aircraft, ctx| {
                aircraft.set_position_and_velocity(Some(desc.s), desc.v, ctx);
                if let Some(symbol) = &desc.symbol {
                    aircraft.select_symbol(symbol.resolve(), ctx);
                }
                if let Some(call_sign) = &desc.call_sign {
                    aircraft.set_call_sign(call_sign.as_str(), ctx);
                }
                aircraft.set_scale(nmi, ctx.renderer);
                Self::apply_visibility(aircraft, ctx.renderer, traffic_visible, call_sign_visible);
            });
        }

        for i in plan.create.clone() {
            let desc = &traffic[i];
            let init = AircraftInit {
                call_sign: desc
                    .call_sign
                    .clone()
                    .unwrap_or_else(|| format!("target-{i}")),
                position: desc.s,
                velocity: desc.v,
                symbol: desc
                    .symbol
                    .as_ref()
                    .map_or(SymbolKind::Target, |s| s.resolve()),
                layers: AircraftLayers {
                    symbols: self.layers.traffic,
                    labels: self.layers.labels,
                    hazard: self.layers.hazard,
                },
                with_labels: true,
            };
            let handle = self.spawn(init, Some(ownship));
            self.with_aircraft(handle, |aircraft, ctx| {
                aircraft.set_scale(nmi, ctx.renderer);
                Self::apply_visibility(aircraft, ctx.renderer, traffic_visible, call_sign_visible);
            });
            self.traffic.push(handle);
        }

        if !plan.is_noop() {
            debug!(
                removed = plan.remove.len(),
                updated = plan.update.len(),
                created = plan.create.len(),
                "traffic reconciled"
            );
        }
        self.renderer.redraw();
    }

    /// Rebuilds hazard regions from per-aircraft conflict data, matched by
    /// index. Aircraft beyond the end of `regions` keep their current region;
    /// a region without sectors clears it. Sectors are `size_nmi` wide, or
    /// the configured size when that is absent or not a positive number.
    pub fn set_los(&mut self, regions: &[LosRegion], size_nmi: Option<f64>) {
        let handles: Vec<AircraftHandle> = self.traffic.iter().take(regions.len()).copied().collect();
        for (handle, region) in handles.into_iter().zip(regions) {
            let centers = region.conflict_centers();
            self.with_aircraft(handle, |aircraft, ctx| aircraft.set_los(&centers, size_nmi, ctx));
        }
        self.renderer.redraw();
    }

    pub fn show_traffic(&mut self, visible: bool) {
        self.traffic_visible = visible;
        self.for_each_traffic(|aircraft, renderer| {
            if visible {
                aircraft.reveal(renderer);
            } else {
                aircraft.hide(renderer);
            }
        });
        self.renderer.redraw();
    }

    pub fn show_call_sign(&mut self, visible: bool) {
        self.call_sign_visible = visible;
        self.for_each_traffic(|aircraft, renderer| {
            if visible {
                aircraft.reveal_call_sign(renderer);
            } else {
                aircraft.hide_call_sign(renderer);
            }
        });
        self.renderer.redraw();
    }

    /// Shows or hides the conflict regions of every traffic aircraft.
    pub fn show_los(&mut self, visible: bool) {
        self.for_each_traffic(|aircraft, renderer| {
            if visible {
                aircraft.reveal_los(renderer);
            } else {
                aircraft.hide_los(renderer);
            }
        });
        self.renderer.redraw();
    }

    /// Removes the conflict regions of every traffic aircraft.
    pub fn clear_los(&mut self) {
        self.for_each_traffic(|aircraft, renderer| aircraft.remove_los(renderer));
        self.renderer.redraw();
    }

    fn for_each_traffic(&mut self, mut f: impl FnMut(&mut TrackedAircraft, &mut dyn Renderer)) {
        for handle in &self.traffic {
            if let Some(aircraft) = self.aircraft.get_mut(handle.0) {
                f(aircraft, &mut self.renderer);
            }
        }
    }

    fn named(&self, name: &str) -> Result<LatLon> {
        self.config.location(name).ok_or_else(|| {
            warn!(location = %name, "unknown location");
            AirspaceError::UnknownLocation(name.to_string())
        })
    }

    /// Moves the ownship. Named locations keep the current altitude.
    pub fn set_ownship_position(&mut self, location: impl Into<Location>) -> Result<()> {
        let position = match location.into() {
            Location::Position(pos) => pos,
            Location::Named(name) => {
                let ll = self.named(&name)?;
                let alt = self.ownship().map_or(0.0, |o| o.position().alt);
                GeoPosition::new(ll.lat, ll.lon, alt)
            }
        };
        self.with_aircraft(self.ownship, |ownship, ctx| {
            ownship.set_position_and_velocity(Some(position), None, ctx);
        });
        self.refresh_traffic_labels();
        self.renderer.redraw();
        Ok(())
    }

    pub fn set_ownship_velocity(&mut self, velocity: Velocity) {
        self.with_aircraft(self.ownship, |ownship, ctx| {
            ownship.set_position_and_velocity(None, Some(velocity), ctx);
        });
        self.renderer.redraw();
    }

    /// Rotates the map to `deg`. Unless `north_up`, the ownship symbol
    /// turns with it.
    pub fn set_ownship_heading(&mut self, deg: f64, north_up: bool) {
        if !deg.is_finite() {
            warn!(deg, "non-finite ownship heading ignored");
            return;
        }
        self.renderer.navigator_mut().heading = deg;
        if !north_up {
            self.with_aircraft(self.ownship, |ownship, ctx| ownship.set_heading(-deg, ctx.renderer));
        }
        self.renderer.redraw();
    }

    pub fn ownship_heading(&self) -> f64 {
        self.renderer.navigator().heading
    }

    fn refresh_traffic_labels(&mut self) {
        let handles = self.traffic.clone();
        for handle in handles {
            self.with_aircraft(handle, |aircraft, ctx| aircraft.refresh_labels(ctx));
        }
    }

    /// Centres the map on `location` without moving the ownship.
    pub fn go_to(&mut self, location: impl Into<Location>) -> Result<()> {
        let center = match location.into() {
            Location::Position(pos) => pos.lat_lon(),
            Location::Named(name) => self.named(&name)?,
        };
        self.recenter(center);
        Ok(())
    }

    /// Moves the navigator look-at point; non-finite components are ignored.
    pub fn recenter(&mut self, center: LatLon) {
        let look_at = &mut self.renderer.navigator_mut().look_at;
        if center.lat.is_finite() {
            look_at.lat = center.lat;
        }
        if center.lon.is_finite() {
            look_at.lon = center.lon;
        }
        self.renderer.redraw();
    }

    /// Zooms the map so it spans `nmi`. Returns `false`, changing nothing,
    /// if `nmi` is not a positive number.
    pub fn set_zoom_level(&mut self, nmi: f64) -> bool {
        let Some(range) = self.scale.request(nmi) else {
            return false;
        };
        self.renderer.navigator_mut().range = range;
        self.renderer.redraw();
        let effective = self.renderer.navigator().range;
        self.propagate_scale(effective);
        self.renderer.redraw();
        true
    }

    pub fn zoom_level(&self) -> f64 {
        self.scale.zoom_nmi()
    }

    /// Call after the renderer changed the range on its own (wheel, pinch).
    pub fn on_zoom_gesture(&mut self) {
        let range = self.renderer.navigator().range;
        self.propagate_scale(range);
        self.renderer.redraw();
    }

    pub fn current_scale(&self) -> f64 {
        self.scale.scale_nmi()
    }

    fn propagate_scale(&mut self, range: f64) {
        let nmi = self.scale.observe_range(range);
        let handles: Vec<AircraftHandle> = std::iter::once(self.ownship)
            .chain(self.traffic.iter().copied())
            .collect();
        for handle in handles {
            if let Some(aircraft) = self.aircraft.get_mut(handle.0) {
                aircraft.set_scale(nmi, &mut self.renderer);
            }
        }
        debug!(nmi, range, "scale updated");
    }

    /// Delivers the outcome of a model load started by this airspace.
    pub fn complete_load(&mut self, ticket: AssetTicket, outcome: AssetOutcome) {
        let Some((handle, kind)) = self.tickets.remove(&ticket) else {
            warn!(%ticket, "completion for unknown asset ticket ignored");
            return;
        };
        let Some(settled) = self.with_aircraft(handle, |aircraft, ctx| {
            aircraft.on_symbol_settled(kind, outcome, ctx);
            aircraft.is_settled()
        }) else {
            warn!(%ticket, aircraft = %handle, "completion for freed aircraft ignored");
            return;
        };
        match self.retired.iter().position(|h| *h == handle) {
            Some(idx) => {
                if settled {
                    self.retired.swap_remove(idx);
                    self.aircraft.remove(handle.0);
                    debug!(aircraft = %handle, "retired aircraft freed");
                }
            }
            None => self.renderer.redraw(),
        }
    }

    /// Removes everything this airspace drew and hands back its renderer
    /// and loader. Loads still in flight are abandoned.
    pub fn teardown(mut self) -> (R, L) {
        let handles: Vec<AircraftHandle> = self.traffic.drain(..).chain([self.ownship]).collect();
        for handle in handles {
            if let Some(aircraft) = self.aircraft.get_mut(handle.0) {
                aircraft.remove(&mut self.renderer);
            }
        }
        if !self.tickets.is_empty() {
            debug!(pending = self.tickets.len(), "abandoning in-flight loads");
        }
        self.renderer.redraw();
        (self.renderer, self.loader)
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    pub fn config(&self) -> &AirspaceConfig {
        &self.config
    }

    pub fn layers(&self) -> AirspaceLayers {
        self.layers
    }

    pub fn ownship_handle(&self) -> AircraftHandle {
        self.ownship
    }

    pub fn ownship(&self) -> Option<&TrackedAircraft> {
        self.aircraft.get(self.ownship.0)
    }

    pub fn aircraft(&self, handle: AircraftHandle) -> Option<&TrackedAircraft> {
        self.aircraft.get(handle.0)
    }

    pub fn traffic_handles(&self) -> &[AircraftHandle] {
        &self.traffic
    }

    pub fn traffic(&self) -> impl Iterator<Item = &TrackedAircraft> {
        self.traffic.iter().filter_map(|h| self.aircraft.get(h.0))
    }

    pub fn traffic_len(&self) -> usize {
        self.traffic.len()
    }

    /// Live plus retired aircraft still held in memory.
    pub fn aircraft_count(&self) -> usize {
        self.aircraft.len()
    }

    pub fn is_traffic_visible(&self) -> bool {
        self.traffic_visible
    }

    pub fn is_call_sign_visible(&self) -> bool {
        self.call_sign_visible
    }

    pub fn pending_loads(&self) -> usize {
        self.tickets.len()
    }

    /// True once every model load issued so far has settled.
    pub fn is_settled(&self) -> bool {
        self.tickets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbology::SymbolSelector;
    use crate::traffic::LosSectorRecord;
    use pretty_assertions::assert_eq;
    use render::{AssetError, ModelHandle, QueuedLoader, RecordingRenderer};

    type TestAirspace = Airspace<RecordingRenderer, QueuedLoader>;

    fn airspace() -> TestAirspace {
        Airspace::new(RecordingRenderer::new(), QueuedLoader::new(), AirspaceConfig::default()).unwrap()
    }

    fn settle_all(a: &mut TestAirspace) {
        for (ticket, _) in a.loader_mut().drain() {
            a.complete_load(ticket, Ok(ModelHandle(ticket.0)));
        }
    }

    fn ac1(symbol: SymbolKind) -> TrafficDescriptor {
        TrafficDescriptor::new(GeoPosition::new(37.0, -76.0, 4000.0))
            .with_velocity(Velocity::new(100.0, 100.0, 0.0))
            .with_symbol(symbol)
            .with_call_sign("AC1")
    }

    fn ac2() -> TrafficDescriptor {
        TrafficDescriptor::new(GeoPosition::new(36.0, -75.0, 3500.0))
            .with_velocity(Velocity::new(50.0, 50.0, 60.0))
            .with_call_sign("AC2")
    }

    fn many(n: usize) -> Vec<TrafficDescriptor> {
        (0..n)
            .map(|i| TrafficDescriptor::new(GeoPosition::new(37.0 + i as f64 * 0.01, -76.0, 3000.0)))
            .collect()
    }

    #[test]
    fn construction_creates_layers_and_hidden_ownship() {
        let a = airspace();
        let r = a.renderer();
        for name in [LOS_LAYER, TRAFFIC_LAYER, OWNSHIP_LAYER, TEXT_LAYER] {
            assert!(r.layer_named(name).is_some(), "{name}");
        }
        assert_eq!(r.navigator().look_at, LatLon::new(37.0298687, -76.3452218));
        assert_eq!(r.navigator().range, 32_000.0);
        assert_eq!(r.navigator().tilt, 0.0);
        assert_eq!(a.zoom_level(), 5.0);
        assert_eq!(a.pending_loads(), 5);
        let ownship = a.ownship().unwrap();
        assert!(!ownship.is_visible());
        assert!(ownship.labels().is_none());
    }

    #[test]
    fn missing_layer_is_fatal() {
        let renderer = RecordingRenderer::new().with_unavailable_layer(TEXT_LAYER);
        let err = Airspace::new(renderer, QueuedLoader::new(), AirspaceConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, AirspaceError::LayerUnavailable { layer: TEXT_LAYER, .. }));
    }

    #[test]
    fn perspective_view_tilts_and_labels_ownship() {
        let config = AirspaceConfig {
            view: ViewMode::Perspective,
            gods_view: true,
            ..AirspaceConfig::default()
        };
        let mut a = Airspace::new(RecordingRenderer::new(), QueuedLoader::new(), config).unwrap();
        assert_eq!(a.renderer().navigator().tilt, 55.0);
        assert!(a.loader().pending().all(|(_, f)| f.starts_with("parrot-drone-")));
        settle_all(&mut a);
        let ownship = a.ownship().unwrap();
        assert_eq!(ownship.visible_symbols(), vec![SymbolKind::Ownship]);
        assert_eq!(ownship.labels().unwrap().altitude_text().text, "0ft");
    }

    #[test]
    fn reuses_existing_entity_and_appends_new_one() {
        let mut a = airspace();
        settle_all(&mut a);
        a.set_traffic(Some(&[ac1(SymbolKind::Target)][..]));
        settle_all(&mut a);
        let first = a.traffic_handles()[0];
        assert_eq!(
            a.aircraft(first).unwrap().visible_symbols(),
            vec![SymbolKind::Target]
        );

        a.set_traffic(Some(&[ac1(SymbolKind::Alert), ac2()][..]));
        assert_eq!(a.traffic_len(), 2);
        assert_eq!(a.traffic_handles()[0], first);
        // only the new aircraft loads models
        assert_eq!(a.loader().len(), 5);
        let reused = a.aircraft(first).unwrap();
        assert_eq!(reused.visible_symbols(), vec![SymbolKind::Alert]);
        assert_eq!(reused.call_sign(), "AC1");

        let second = a.aircraft(a.traffic_handles()[1]).unwrap();
        assert_eq!(second.selected(), SymbolKind::Target);
        assert_eq!(second.call_sign(), "AC2");
        settle_all(&mut a);
        let second = a.aircraft(a.traffic_handles()[1]).unwrap();
        assert_eq!(second.visible_symbols(), vec![SymbolKind::Target]);
        assert_eq!(second.labels().unwrap().altitude_text().text, "+35⇧");
    }

    #[test]
    fn count_follows_input_and_indices_are_stable() {
        let mut a = airspace();
        for n in [0, 1, 7, 50, 50, 3, 0] {
            let before: Vec<AircraftHandle> = a.traffic_handles().to_vec();
            a.set_traffic(Some(&many(n)[..]));
            assert_eq!(a.traffic_len(), n);
            let kept = before.len().min(n);
            assert_eq!(&a.traffic_handles()[..kept], &before[..kept]);
        }
        a.set_traffic(Some(&many(4)[..]));
        a.set_traffic(None);
        assert_eq!(a.traffic_len(), 0);
        a.set_traffic(Some(&many(0)[..]));
        assert_eq!(a.traffic_len(), 0);
    }

    #[test]
    fn one_redraw_per_step() {
        let mut a = airspace();
        let before = a.renderer().redraw_count();
        a.set_traffic(Some(&many(10)[..]));
        assert_eq!(a.renderer().redraw_count(), before + 1);
        a.set_traffic(Some(&many(3)[..]));
        assert_eq!(a.renderer().redraw_count(), before + 2);
    }

    #[test]
    fn default_call_signs_are_positional() {
        let mut a = airspace();
        a.set_traffic(Some(&many(3)[..]));
        let names: Vec<&str> = a.traffic().map(|t| t.call_sign()).collect();
        assert_eq!(names, vec!["target-0", "target-1", "target-2"]);

        // a reused aircraft keeps its call sign and symbol when the feed omits them
        let mut step = many(1);
        step[0] = step[0].clone().with_symbol(SymbolSelector::Alert(3.0));
        a.set_traffic(Some(&step[..]));
        a.set_traffic(Some(&many(1)[..]));
        let first = a.traffic().next().unwrap();
        assert_eq!(first.call_sign(), "target-0");
        assert_eq!(first.selected(), SymbolKind::Alert);
    }

    #[test]
    fn selection_during_load_replays_without_flicker() {
        let mut a = airspace();
        a.set_traffic(Some(&[ac1(SymbolKind::Target)][..]));
        a.set_traffic(Some(&[ac1(SymbolKind::TrafficMonitor)][..]));
        let handle = a.traffic_handles()[0];
        for (ticket, _) in a.loader_mut().drain() {
            a.complete_load(ticket, Ok(ModelHandle(ticket.0)));
            let visible = a.aircraft(handle).unwrap().visible_symbols();
            assert!(visible.is_empty() || visible == vec![SymbolKind::TrafficMonitor]);
        }
        assert_eq!(
            a.aircraft(handle).unwrap().visible_symbols(),
            vec![SymbolKind::TrafficMonitor]
        );
        assert!(a.is_settled());
    }

    #[test]
    fn at_most_one_symbol_visible_per_aircraft() {
        let mut a = airspace();
        a.set_traffic(Some(&many(5)[..]));
        settle_all(&mut a);
        for level in 0..5 {
            let step: Vec<TrafficDescriptor> = many(5)
                .into_iter()
                .map(|d| d.with_symbol(SymbolSelector::Alert(level as f64)))
                .collect();
            a.set_traffic(Some(&step[..]));
            for t in a.traffic() {
                assert_eq!(t.visible_symbols(), vec![SymbolKind::from_alert(level)]);
            }
        }
    }

    #[test]
    fn traffic_labels_follow_ownship_altitude() {
        let mut a = airspace();
        a.set_ownship_position(GeoPosition::new(37.0, -76.0, 4000.0)).unwrap();
        a.set_traffic(Some(&[ac1(SymbolKind::Target)][..]));
        let label = |a: &TestAirspace| {
            a.traffic().next().unwrap().labels().unwrap().altitude_text().text.clone()
        };
        assert_eq!(label(&a), " 00");

        a.set_ownship_position(GeoPosition::new(37.0, -76.0, 4500.0)).unwrap();
        assert_eq!(label(&a), "-05");
        let call_sign = a.traffic().next().unwrap().labels().unwrap().call_sign_text().clone();
        assert_eq!(call_sign.text, "AC1");
        assert_eq!(call_sign.offset.y_px, -16.0);

        a.set_ownship_position("Norfolk").unwrap();
        assert_eq!(a.ownship().unwrap().position(), GeoPosition::new(36.8508, -76.2859, 4500.0));
        assert_eq!(label(&a), "-05");
    }

    #[test]
    fn unknown_location_changes_nothing() {
        let mut a = airspace();
        let before = a.ownship().unwrap().position();
        let err = a.set_ownship_position("Atlantis").unwrap_err();
        assert!(matches!(err, AirspaceError::UnknownLocation(ref n) if n == "Atlantis"));
        assert_eq!(a.ownship().unwrap().position(), before);
        assert!(a.go_to("Atlantis").is_err());
    }

    #[test]
    fn go_to_moves_map_not_ownship() {
        let mut a = airspace();
        let ownship = a.ownship().unwrap().position();
        a.go_to("NYC").unwrap();
        assert_eq!(a.renderer().navigator().look_at, LatLon::new(40.7128, -74.0060));
        assert_eq!(a.ownship().unwrap().position(), ownship);

        a.recenter(LatLon::new(f64::NAN, -75.0));
        assert_eq!(a.renderer().navigator().look_at, LatLon::new(40.7128, -75.0));
    }

    #[test]
    fn los_regions_replace_and_clear() {
        let mut a = airspace();
        a.set_traffic(Some(&many(2)[..]));
        let sector = |los| LosSectorRecord { lat: 37.0, lon: -76.0, alt: 3000.0, los };
        let region = LosRegion {
            ac: "target-0".into(),
            sectors: Some(vec![sector(true), sector(false), sector(true)]),
        };
        a.set_los(&[region.clone()], None);
        let hazard = a.layers().hazard;
        assert_eq!(a.traffic().next().unwrap().hazard().len(), 2);
        assert_eq!(a.renderer().layer_len(hazard), 2);

        a.show_los(false);
        assert!(a.renderer().collect().in_layer(hazard).next().is_none());
        a.show_los(true);
        assert_eq!(a.renderer().collect().in_layer(hazard).count(), 2);

        let cleared = LosRegion { sectors: None, ..region };
        a.set_los(&[cleared.clone()], None);
        a.set_los(&[cleared], None);
        assert_eq!(a.renderer().layer_len(hazard), 0);
        a.set_los(&[], None);
        a.clear_los();
        assert_eq!(a.renderer().layer_len(hazard), 0);
    }

    #[test]
    fn zoom_rescales_every_aircraft() {
        let mut a = airspace();
        a.set_traffic(Some(&many(2)[..]));
        settle_all(&mut a);
        assert!(a.set_zoom_level(10.0));
        assert_eq!(a.renderer().navigator().range, 64_000.0);
        assert_eq!(a.zoom_level(), 10.0);
        assert_eq!(a.current_scale(), 10.0);
        for t in a.traffic().chain(a.ownship()) {
            for kind in SymbolKind::ALL {
                let model = t.symbol(kind).unwrap().model().unwrap();
                assert_eq!(model.scale, 2200.0, "{} {kind}", t.call_sign());
            }
        }
        assert_eq!(a.ownship().unwrap().scale_nmi(), 10.0);

        assert!(!a.set_zoom_level(0.0));
        assert!(!a.set_zoom_level(f64::NAN));
        assert_eq!(a.zoom_level(), 10.0);

        a.renderer_mut().navigator_mut().range = 16_000.0;
        a.on_zoom_gesture();
        assert_eq!(a.current_scale(), 2.5);
        assert_eq!(a.zoom_level(), 10.0);
        assert!(a.traffic().all(|t| t.scale_nmi() == 2.5));
    }

    #[test]
    fn los_sector_size_applies_per_call() {
        let mut a = airspace();
        a.set_traffic(Some(&[ac1(SymbolKind::Alert)][..]));
        let region = LosRegion {
            ac: "AC1".into(),
            sectors: Some(vec![LosSectorRecord { lat: 37.0, lon: -76.0, alt: 4100.0, los: true }]),
        };
        let corner_lat = |a: &TestAirspace| {
            let id = a.traffic().next().unwrap().hazard().sectors()[0].id();
            a.renderer().renderable(id).unwrap().as_mesh().unwrap().positions[1].lat
        };

        a.set_los(&[region.clone()], Some(2.0));
        assert!((corner_lat(&a) - (37.0 + 1.0 / 60.0)).abs() < 1e-12);
        a.set_los(&[region], None);
        assert!((corner_lat(&a) - (37.0 + 1.0 / 120.0)).abs() < 1e-12);
    }

    #[test]
    fn shrinking_while_loading_frees_after_settle() {
        let mut a = airspace();
        settle_all(&mut a);
        a.set_traffic(Some(&many(3)[..]));
        a.set_traffic(Some(&many(1)[..]));
        assert_eq!(a.traffic_len(), 1);
        assert_eq!(a.aircraft_count(), 4);
        settle_all(&mut a);
        assert_eq!(a.aircraft_count(), 2);
        assert_eq!(a.renderer().layer_len(a.layers().traffic), 5);
        assert_eq!(a.renderer().layer_len(a.layers().labels), 2);
    }

    #[test]
    fn failed_loads_leave_entity_usable() {
        let mut a = airspace();
        a.set_traffic(Some(&[ac1(SymbolKind::Target)][..]));
        for (ticket, file) in a.loader_mut().drain() {
            let outcome = if file == "daa-target.dae" {
                Err(AssetError::Malformed { file, reason: "bad mesh".into() })
            } else {
                Ok(ModelHandle(ticket.0))
            };
            a.complete_load(ticket, outcome);
        }
        let t = a.traffic().next().unwrap();
        assert!(t.visible_symbols().is_empty());
        assert_eq!(t.load_progress().failed, 1);

        a.set_traffic(Some(&[ac1(SymbolKind::Alert)][..]));
        assert_eq!(a.traffic().next().unwrap().visible_symbols(), vec![SymbolKind::Alert]);
    }

    #[test]
    fn visibility_flags_apply_to_all_traffic() {
        let mut a = airspace();
        a.set_traffic(Some(&many(2)[..]));
        settle_all(&mut a);
        a.show_call_sign(true);
        assert!(a.traffic().all(|t| t.labels().unwrap().call_sign_text().enabled));
        a.show_traffic(false);
        assert!(a.traffic().all(|t| t.visible_symbols().is_empty()));
        assert!(a.traffic().all(|t| !t.labels().unwrap().call_sign_text().enabled));

        a.set_traffic(Some(&many(3)[..]));
        settle_all(&mut a);
        assert!(a.traffic().all(|t| !t.is_visible() && t.is_call_sign_visible()));
        a.show_traffic(true);
        assert!(a.traffic().all(|t| t.visible_symbols() == vec![SymbolKind::Target]));
    }

    #[test]
    fn ownship_heading_rotates_map_and_symbol() {
        let mut a = airspace();
        settle_all(&mut a);
        a.set_ownship_heading(30.0, true);
        assert_eq!(a.ownship_heading(), 30.0);
        let rotation = |a: &TestAirspace| {
            a.ownship().unwrap().symbol(SymbolKind::Ownship).unwrap().model().unwrap().rotation.z
        };
        assert_eq!(rotation(&a), 0.0);
        a.set_ownship_heading(30.0, false);
        assert_eq!(rotation(&a), 30.0);
    }

    #[test]
    fn stray_tickets_are_ignored() {
        let mut a = airspace();
        let redraws = a.renderer().redraw_count();
        a.complete_load(AssetTicket(999), Ok(ModelHandle(1)));
        assert_eq!(a.renderer().redraw_count(), redraws);
        assert_eq!(a.pending_loads(), 5);
    }

    #[test]
    fn teardown_removes_everything() {
        let mut a = airspace();
        a.set_traffic(Some(&[ac1(SymbolKind::Target), ac2()][..]));
        a.set_los(&[LosRegion {
            ac: "AC1".into(),
            sectors: Some(vec![LosSectorRecord { lat: 37.0, lon: -76.0, alt: 4000.0, los: true }]),
        }], Some(2.0));
        settle_all(&mut a);
        assert!(!a.renderer().is_empty());
        let (renderer, loader) = a.teardown();
        assert!(renderer.is_empty());
        assert!(loader.is_empty());
    }
}
