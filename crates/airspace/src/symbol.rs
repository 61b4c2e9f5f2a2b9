use foundation::math::GeoPosition;
use render::{
    AssetLoader, AssetOutcome, AssetTicket, LayerId, ModelRenderable, Renderable, RenderableId,
    Renderer, Rotation,
};
use tracing::{debug, warn};

use crate::config::AssetSpec;
use crate::symbology::SymbolKind;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// Waiting on the asset loader.
    Pending,
    Loaded,
    /// The asset could not be built; the symbol stays invisible.
    Failed,
    Disposed,
}

impl LoadState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, LoadState::Pending)
    }
}

/// Last values asked of a symbol, applied when its model arrives.
#[derive(Debug, Copy, Clone, PartialEq)]
struct Requested {
    position: GeoPosition,
    heading: f64,
    scale: f64,
    visible: bool,
}

/// One model instance bound to one (aircraft, symbol kind) pair.
#[derive(Debug)]
pub struct RenderableSymbol {
    kind: SymbolKind,
    asset: AssetSpec,
    layer: LayerId,
    display_name: String,
    state: LoadState,
    ticket: Option<AssetTicket>,
    requested: Requested,
    remove_requested: bool,
    renderable: Option<(RenderableId, ModelRenderable)>,
}

impl RenderableSymbol {
    pub fn new(
        kind: SymbolKind,
        asset: AssetSpec,
        layer: LayerId,
        display_name: impl Into<String>,
        position: GeoPosition,
    ) -> Self {
        let scale = asset.scale;
        Self {
            kind,
            asset,
            layer,
            display_name: display_name.into(),
            state: LoadState::Pending,
            ticket: None,
            requested: Requested {
                position,
                heading: 0.0,
                scale,
                visible: false,
            },
            remove_requested: false,
            renderable: None,
        }
    }

    /// Asks the loader for the model. Only the first call issues a request.
    pub fn load(&mut self, loader: &mut dyn AssetLoader) -> AssetTicket {
        if let Some(ticket) = self.ticket {
            return ticket;
        }
        let ticket = loader.load(&self.asset.file);
        self.ticket = Some(ticket);
        ticket
    }

    /// Applies the loader's outcome. Returns the resulting state.
    pub fn settle(&mut self, outcome: AssetOutcome, renderer: &mut dyn Renderer) -> LoadState {
        if self.state != LoadState::Pending {
            warn!(symbol = %self.display_name, state = ?self.state, "asset settled twice");
            return self.state;
        }
        if self.remove_requested {
            debug!(symbol = %self.display_name, "asset arrived after removal, discarding");
            self.state = LoadState::Disposed;
            return self.state;
        }
        match outcome {
            Ok(model) => {
                let model = ModelRenderable {
                    model,
                    position: self.requested.position,
                    rotation: self.rotation_for(self.requested.heading),
                    scale: self.requested.scale,
                    enabled: self.requested.visible,
                    display_name: self.display_name.clone(),
                };
                let id = renderer.add(self.layer, Renderable::Model(model.clone()));
                self.renderable = Some((id, model));
                self.state = LoadState::Loaded;
            }
            Err(err) => {
                warn!(symbol = %self.display_name, error = %err, "symbol asset failed to load");
                self.state = LoadState::Failed;
            }
        }
        self.state
    }

    fn rotation_for(&self, heading: f64) -> Rotation {
        Rotation {
            z: self.asset.rotation.z + heading,
            ..self.asset.rotation
        }
    }

    fn push(&self, renderer: &mut dyn Renderer) {
        if let Some((id, model)) = &self.renderable {
            renderer.update(*id, &Renderable::Model(model.clone()));
        }
    }

    pub fn set_position(&mut self, position: GeoPosition, renderer: &mut dyn Renderer) {
        self.requested.position = position;
        if let Some((_, model)) = &mut self.renderable {
            model.position = position;
            self.push(renderer);
        }
    }

    /// Heading in degrees; the asset's own rotation offset is added on top.
    pub fn set_heading(&mut self, heading: f64, renderer: &mut dyn Renderer) {
        self.requested.heading = heading;
        let rotation = self.rotation_for(heading);
        if let Some((_, model)) = &mut self.renderable {
            model.rotation = rotation;
            self.push(renderer);
        }
    }

    /// Scales the model to the current map scale in NMI.
    pub fn set_scale(&mut self, nmi: f64, renderer: &mut dyn Renderer) {
        self.set_model_scale(self.asset.scale * nmi, renderer);
    }

    pub fn set_model_scale(&mut self, scale: f64, renderer: &mut dyn Renderer) {
        self.requested.scale = scale;
        if let Some((_, model)) = &mut self.renderable {
            model.scale = scale;
            self.push(renderer);
        }
    }

    pub fn reveal(&mut self, renderer: &mut dyn Renderer) {
        self.set_visible(true, renderer);
    }

    pub fn hide(&mut self, renderer: &mut dyn Renderer) {
        self.set_visible(false, renderer);
    }

    fn set_visible(&mut self, visible: bool, renderer: &mut dyn Renderer) {
        self.requested.visible = visible;
        if let Some((id, model)) = &mut self.renderable {
            if model.enabled != visible {
                model.enabled = visible;
                renderer.set_enabled(*id, visible);
            }
        }
    }

    /// Removes the model from its layer. Safe to call in any state; a
    /// pending symbol is disposed as soon as its load settles.
    pub fn remove(&mut self, renderer: &mut dyn Renderer) {
        match self.state {
            LoadState::Pending => self.remove_requested = true,
            LoadState::Loaded => {
                if let Some((id, _)) = self.renderable.take() {
                    renderer.remove(self.layer, id);
                }
                self.state = LoadState::Disposed;
            }
            LoadState::Failed => self.state = LoadState::Disposed,
            LoadState::Disposed => {}
        }
    }

    pub fn is_visible(&self) -> bool {
        self.renderable.as_ref().is_some_and(|(_, m)| m.enabled)
    }

    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn ticket(&self) -> Option<AssetTicket> {
        self.ticket
    }

    pub fn renderable_id(&self) -> Option<RenderableId> {
        self.renderable.as_ref().map(|(id, _)| *id)
    }

    pub fn model(&self) -> Option<&ModelRenderable> {
        self.renderable.as_ref().map(|(_, m)| m)
    }

    pub fn position(&self) -> GeoPosition {
        self.requested.position
    }

    pub fn heading(&self) -> f64 {
        self.requested.heading
    }

    pub fn scale(&self) -> f64 {
        self.requested.scale
    }

    pub fn asset(&self) -> &AssetSpec {
        &self.asset
    }
}
