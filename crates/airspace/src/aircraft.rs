use std::collections::BTreeMap;

use foundation::handles::Handle;
use foundation::math::{GeoPosition, Velocity};
use render::{AssetLoader, AssetOutcome, AssetTicket, LayerId, Renderer};
use tracing::{debug, warn};

use crate::config::{AirspaceConfig, ViewMode};
use crate::hazard::HazardRegion;
use crate::label::{AircraftLabels, LabelState};
use crate::symbol::{LoadState, RenderableSymbol};
use crate::symbology::SymbolKind;

/// Non-owning reference to an aircraft held by the airspace.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AircraftHandle(pub Handle);

impl std::fmt::Display for AircraftHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "aircraft#{}", self.0)
    }
}

/// Everything an aircraft needs to push state to the renderer.
pub struct DrawContext<'a> {
    pub renderer: &'a mut dyn Renderer,
    pub config: &'a AirspaceConfig,
    /// Altitude of the reference aircraft, when it still exists.
    pub reference_alt: Option<f64>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AircraftLayers {
    pub symbols: LayerId,
    pub labels: LayerId,
    pub hazard: LayerId,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct LoadProgress {
    pub pending: usize,
    pub loaded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AircraftInit {
    pub call_sign: String,
    pub position: GeoPosition,
    pub velocity: Option<Velocity>,
    pub symbol: SymbolKind,
    pub layers: AircraftLayers,
    /// The ownship carries no labels in the flat view.
    pub with_labels: bool,
}

/// One aircraft on the map: a palette of five symbols of which at most one
/// is shown, two labels, and an optional hazard region.
///
/// Selection is tracked in three parts: `selected` is what the feed asked
/// for, `shown` is the symbol currently revealed (if any), and
/// `pending_selection` is a request waiting for its symbol to load. Only
/// `shown` is ever made visible.
#[derive(Debug)]
pub struct TrackedAircraft {
    call_sign: String,
    position: GeoPosition,
    velocity: Option<Velocity>,
    heading: Option<f64>,
    symbols: BTreeMap<SymbolKind, RenderableSymbol>,
    selected: SymbolKind,
    pending_selection: Option<SymbolKind>,
    shown: Option<SymbolKind>,
    visible: bool,
    call_sign_visible: bool,
    scale_nmi: f64,
    view: ViewMode,
    layers: AircraftLayers,
    labels: Option<AircraftLabels>,
    hazard: HazardRegion,
    reference: Option<AircraftHandle>,
    removed: bool,
}

impl TrackedAircraft {
    /// Registers the aircraft and starts loading all five symbols.
    /// Returns the tickets the caller must later settle.
    pub fn create(
        init: AircraftInit,
        ctx: &mut DrawContext<'_>,
        loader: &mut dyn AssetLoader,
    ) -> (Self, Vec<(SymbolKind, AssetTicket)>) {
        let (position, ok) = GeoPosition::sanitized(init.position, GeoPosition::ORIGIN);
        if !ok {
            warn!(call_sign = %init.call_sign, position = ?init.position, "non-finite initial position");
        }
        let velocity = init.velocity.map(|v| {
            let mut clean = Velocity::ZERO;
            if !clean.merge(v) {
                warn!(call_sign = %init.call_sign, ?v, "non-finite initial velocity");
            }
            clean
        });
        let heading = velocity.map(|v| v.heading_deg());
        let render_pos = render_position(ctx.config, position);
        let assets = ctx.config.symbol_assets();

        let mut tickets = Vec::with_capacity(SymbolKind::ALL.len());
        let mut symbols = BTreeMap::new();
        for kind in SymbolKind::ALL {
            let mut symbol = RenderableSymbol::new(
                kind,
                assets.get(kind).clone(),
                init.layers.symbols,
                format!("{} {}", init.call_sign, kind),
                render_pos,
            );
            if let Some(h) = heading {
                symbol.set_heading(-h, ctx.renderer);
            }
            tickets.push((kind, symbol.load(loader)));
            symbols.insert(kind, symbol);
        }

        let mut aircraft = Self {
            call_sign: init.call_sign,
            position,
            velocity,
            heading,
            symbols,
            selected: init.symbol,
            pending_selection: Some(init.symbol),
            shown: None,
            visible: false,
            call_sign_visible: false,
            scale_nmi: ctx.config.initial_zoom_nmi,
            view: ctx.config.view,
            layers: init.layers,
            labels: None,
            hazard: HazardRegion::empty(init.layers.hazard),
            reference: None,
            removed: false,
        };
        aircraft.apply_scale(ctx.renderer);
        if init.with_labels {
            let state = aircraft.label_state(ctx);
            let labels =
                AircraftLabels::create(init.layers.labels, &state, &ctx.config.labels, ctx.renderer);
            aircraft.labels = Some(labels);
        }
        debug!(call_sign = %aircraft.call_sign, symbol = %aircraft.selected, "aircraft created");
        (aircraft, tickets)
    }

    /// Either argument may be omitted; non-finite components keep their
    /// previous value.
    pub fn set_position_and_velocity(
        &mut self,
        position: Option<GeoPosition>,
        velocity: Option<Velocity>,
        ctx: &mut DrawContext<'_>,
    ) {
        if let Some(update) = position {
            if !self.position.merge(update) {
                warn!(call_sign = %self.call_sign, ?update, "non-finite position ignored");
            }
            let render_pos = render_position(ctx.config, self.position);
            for symbol in self.symbols.values_mut() {
                symbol.set_position(render_pos, ctx.renderer);
            }
            if self.view == ViewMode::Perspective {
                self.apply_scale(ctx.renderer);
            }
        }
        if let Some(update) = velocity {
            let mut v = self.velocity.unwrap_or(Velocity::ZERO);
            if !v.merge(update) {
                warn!(call_sign = %self.call_sign, ?update, "non-finite velocity ignored");
            }
            self.velocity = Some(v);
            let heading = v.heading_deg();
            self.heading = Some(heading);
            for symbol in self.symbols.values_mut() {
                symbol.set_heading(-heading, ctx.renderer);
            }
        }
        self.refresh_labels(ctx);
    }

    /// Rotates every symbol to `deg`, independent of velocity.
    pub fn set_heading(&mut self, deg: f64, renderer: &mut dyn Renderer) {
        if !deg.is_finite() {
            warn!(call_sign = %self.call_sign, deg, "non-finite heading ignored");
            return;
        }
        self.heading = Some(deg);
        for symbol in self.symbols.values_mut() {
            symbol.set_heading(-deg, renderer);
        }
    }

    /// Makes `kind` the displayed symbol, now if it is loaded, otherwise
    /// once its load settles. Labels take the colour of the shown symbol,
    /// so they switch together with it.
    pub fn select_symbol(&mut self, kind: SymbolKind, ctx: &mut DrawContext<'_>) {
        self.selected = kind;
        let state = self
            .symbols
            .get(&kind)
            .map_or(LoadState::Disposed, |s| s.state());
        match state {
            LoadState::Pending => self.pending_selection = Some(kind),
            LoadState::Loaded => {
                self.pending_selection = None;
                self.show(Some(kind), ctx.renderer);
            }
            LoadState::Failed | LoadState::Disposed => {
                debug!(call_sign = %self.call_sign, symbol = %kind, "selected symbol unavailable");
                self.pending_selection = None;
                self.show(None, ctx.renderer);
            }
        }
        self.refresh_labels(ctx);
    }

    fn show(&mut self, kind: Option<SymbolKind>, renderer: &mut dyn Renderer) {
        if self.shown != kind {
            if let Some(old) = self.shown.and_then(|k| self.symbols.get_mut(&k)) {
                old.hide(renderer);
            }
            self.shown = kind;
        }
        let visible = self.visible;
        if let Some(symbol) = kind.and_then(|k| self.symbols.get_mut(&k)) {
            if visible {
                symbol.reveal(renderer);
            } else {
                symbol.hide(renderer);
            }
        }
    }

    /// Delivers a load outcome to the symbol of `kind`, replaying a
    /// selection that was waiting on it.
    pub fn on_symbol_settled(
        &mut self,
        kind: SymbolKind,
        outcome: AssetOutcome,
        ctx: &mut DrawContext<'_>,
    ) -> LoadState {
        let Some(symbol) = self.symbols.get_mut(&kind) else {
            return LoadState::Disposed;
        };
        let state = symbol.settle(outcome, ctx.renderer);
        if self.pending_selection == Some(kind) && state.is_settled() {
            self.pending_selection = None;
            match state {
                LoadState::Loaded => self.show(Some(kind), ctx.renderer),
                _ => self.show(None, ctx.renderer),
            }
            self.refresh_labels(ctx);
        }
        state
    }

    /// Map scale in NMI. The perspective view sizes drones by altitude instead.
    pub fn set_scale(&mut self, nmi: f64, renderer: &mut dyn Renderer) {
        if !nmi.is_finite() {
            warn!(call_sign = %self.call_sign, nmi, "non-finite scale ignored");
            return;
        }
        self.scale_nmi = nmi;
        self.apply_scale(renderer);
    }

    fn apply_scale(&mut self, renderer: &mut dyn Renderer) {
        let factor = if self.position.alt > 300.0 {
            self.position.alt / 100.0
        } else {
            1.0
        };
        for symbol in self.symbols.values_mut() {
            match self.view {
                ViewMode::Flat => symbol.set_scale(self.scale_nmi, renderer),
                ViewMode::Perspective => {
                    let scale = symbol.asset().scale * factor;
                    symbol.set_model_scale(scale, renderer);
                }
            }
        }
    }

    pub fn reveal(&mut self, renderer: &mut dyn Renderer) {
        self.set_visible(true, renderer);
    }

    pub fn hide(&mut self, renderer: &mut dyn Renderer) {
        self.set_visible(false, renderer);
    }

    fn set_visible(&mut self, visible: bool, renderer: &mut dyn Renderer) {
        self.visible = visible;
        if let Some(symbol) = self.shown.and_then(|k| self.symbols.get_mut(&k)) {
            if visible {
                symbol.reveal(renderer);
            } else {
                symbol.hide(renderer);
            }
        }
        self.sync_label_visibility(renderer);
    }

    pub fn reveal_call_sign(&mut self, renderer: &mut dyn Renderer) {
        self.call_sign_visible = true;
        self.sync_label_visibility(renderer);
    }

    pub fn hide_call_sign(&mut self, renderer: &mut dyn Renderer) {
        self.call_sign_visible = false;
        self.sync_label_visibility(renderer);
    }

    fn sync_label_visibility(&mut self, renderer: &mut dyn Renderer) {
        let (label, call_sign) = (self.visible, self.visible && self.call_sign_visible);
        if let Some(labels) = &mut self.labels {
            labels.set_enabled(label, call_sign, renderer);
        }
    }

    pub fn set_call_sign(&mut self, call_sign: impl Into<String>, ctx: &mut DrawContext<'_>) {
        let call_sign = call_sign.into();
        if call_sign != self.call_sign {
            self.call_sign = call_sign;
            self.refresh_labels(ctx);
        }
    }

    pub fn set_reference(&mut self, reference: Option<AircraftHandle>) {
        self.reference = reference;
    }

    fn label_state<'a>(&'a self, ctx: &DrawContext<'_>) -> LabelState<'a> {
        LabelState {
            anchor: render_position(ctx.config, self.position),
            alt: self.position.alt,
            reference_alt: ctx.reference_alt,
            vertical_speed: self.velocity.map(|v| v.z),
            call_sign: &self.call_sign,
            color: self.shown.unwrap_or(self.selected).color(),
            label_enabled: self.visible,
            call_sign_enabled: self.visible && self.call_sign_visible,
        }
    }

    /// Recomputes label text and placement against `ctx.reference_alt`.
    pub fn refresh_labels(&mut self, ctx: &mut DrawContext<'_>) {
        let Some(mut labels) = self.labels.take() else {
            return;
        };
        let state = self.label_state(ctx);
        labels.refresh(&state, &ctx.config.labels, ctx.renderer);
        self.labels = Some(labels);
    }

    /// Replaces the hazard region with one sector per centre and shows it.
    /// Non-finite centre components fall back to this aircraft's position;
    /// `size_nmi` falls back to the configured sector size.
    pub fn set_los(
        &mut self,
        centers: &[GeoPosition],
        size_nmi: Option<f64>,
        ctx: &mut DrawContext<'_>,
    ) {
        self.hazard.remove(ctx.renderer);
        let centers: Vec<GeoPosition> = centers
            .iter()
            .map(|c| {
                let (center, ok) = GeoPosition::sanitized(*c, self.position);
                if !ok {
                    warn!(call_sign = %self.call_sign, sector = ?c, "non-finite LoS sector centre");
                }
                center
            })
            .collect();
        let config = ctx.config;
        self.hazard = HazardRegion::build(
            self.layers.hazard,
            &self.call_sign,
            &centers,
            config.hazard.sector_size(size_nmi),
            &config.hazard,
            |alt| config.render_altitude(alt),
            ctx.renderer,
        );
        self.hazard.reveal(ctx.renderer);
    }

    pub fn reveal_los(&mut self, renderer: &mut dyn Renderer) {
        self.hazard.reveal(renderer);
    }

    pub fn hide_los(&mut self, renderer: &mut dyn Renderer) {
        self.hazard.hide(renderer);
    }

    pub fn remove_los(&mut self, renderer: &mut dyn Renderer) {
        self.hazard.remove(renderer);
    }

    /// Takes everything this aircraft drew off the map. Symbols still
    /// loading are disposed when their load settles.
    pub fn remove(&mut self, renderer: &mut dyn Renderer) {
        if self.removed {
            return;
        }
        self.removed = true;
        self.pending_selection = None;
        self.shown = None;
        for symbol in self.symbols.values_mut() {
            symbol.remove(renderer);
        }
        if let Some(labels) = &mut self.labels {
            labels.remove(renderer);
        }
        self.hazard.remove(renderer);
        debug!(call_sign = %self.call_sign, "aircraft removed");
    }

    pub fn load_progress(&self) -> LoadProgress {
        self.symbols
            .values()
            .fold(LoadProgress::default(), |mut p, s| {
                match s.state() {
                    LoadState::Pending => p.pending += 1,
                    LoadState::Loaded => p.loaded += 1,
                    LoadState::Failed => p.failed += 1,
                    LoadState::Disposed => {}
                }
                p
            })
    }

    /// True once all five symbol loads have settled.
    pub fn is_settled(&self) -> bool {
        self.symbols.values().all(|s| s.state().is_settled())
    }

    pub fn call_sign(&self) -> &str {
        &self.call_sign
    }

    pub fn position(&self) -> GeoPosition {
        self.position
    }

    pub fn velocity(&self) -> Option<Velocity> {
        self.velocity
    }

    pub fn heading(&self) -> Option<f64> {
        self.heading
    }

    pub fn selected(&self) -> SymbolKind {
        self.selected
    }

    pub fn shown(&self) -> Option<SymbolKind> {
        self.shown
    }

    pub fn pending_selection(&self) -> Option<SymbolKind> {
        self.pending_selection
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_call_sign_visible(&self) -> bool {
        self.call_sign_visible
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn scale_nmi(&self) -> f64 {
        self.scale_nmi
    }

    pub fn reference(&self) -> Option<AircraftHandle> {
        self.reference
    }

    pub fn symbol(&self, kind: SymbolKind) -> Option<&RenderableSymbol> {
        self.symbols.get(&kind)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &RenderableSymbol> {
        self.symbols.values()
    }

    /// Kinds whose model is currently enabled.
    pub fn visible_symbols(&self) -> Vec<SymbolKind> {
        self.symbols
            .values()
            .filter(|s| s.is_visible())
            .map(|s| s.kind())
            .collect()
    }

    pub fn labels(&self) -> Option<&AircraftLabels> {
        self.labels.as_ref()
    }

    pub fn hazard(&self) -> &HazardRegion {
        &self.hazard
    }
}

fn render_position(config: &AirspaceConfig, position: GeoPosition) -> GeoPosition {
    position.with_alt(config.render_altitude(position.alt))
}
