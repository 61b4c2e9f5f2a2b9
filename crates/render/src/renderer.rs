use std::collections::BTreeSet;

use foundation::arena::Arena;
use thiserror::Error;
use tracing::warn;

use crate::layer::LayerId;
use crate::navigator::Navigator;
use crate::renderable::{Renderable, RenderableId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("render layer {0:?} unavailable")]
    LayerUnavailable(String),
    #[error("unknown {0}")]
    UnknownRenderable(RenderableId),
}

/// The primitives the airspace core needs from a globe engine.
///
/// Everything here is synchronous. Renderables must be removed from the
/// same layer they were added to.
pub trait Renderer {
    fn create_layer(&mut self, name: &str) -> Result<LayerId, RenderError>;
    fn add(&mut self, layer: LayerId, renderable: Renderable) -> RenderableId;
    fn update(&mut self, id: RenderableId, renderable: &Renderable);
    fn set_enabled(&mut self, id: RenderableId, enabled: bool);
    fn remove(&mut self, layer: LayerId, id: RenderableId);
    fn redraw(&mut self);
    fn navigator(&self) -> &Navigator;
    fn navigator_mut(&mut self) -> &mut Navigator;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderCommand {
    pub layer: LayerId,
    pub id: RenderableId,
    pub renderable: Renderable,
}

/// Everything that would be drawn, in layer order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RenderFrame {
    pub commands: Vec<RenderCommand>,
}

impl RenderFrame {
    pub fn in_layer(&self, layer: LayerId) -> impl Iterator<Item = &RenderCommand> {
        self.commands.iter().filter(move |c| c.layer == layer)
    }
}

#[derive(Debug)]
struct RecordedLayer {
    id: LayerId,
    name: String,
    members: BTreeSet<RenderableId>,
}

/// In-memory renderer that keeps every renderable it is handed.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    layers: Vec<RecordedLayer>,
    renderables: Arena<(LayerId, Renderable)>,
    navigator: Navigator,
    redraws: u64,
    unavailable: BTreeSet<String>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `create_layer` fail for `name`.
    pub fn with_unavailable_layer(mut self, name: impl Into<String>) -> Self {
        self.unavailable.insert(name.into());
        self
    }

    pub fn redraw_count(&self) -> u64 {
        self.redraws
    }

    pub fn layer_named(&self, name: &str) -> Option<LayerId> {
        self.layers.iter().find(|l| l.name == name).map(|l| l.id)
    }

    pub fn layer_len(&self, layer: LayerId) -> usize {
        self.find_layer(layer).map_or(0, |l| l.members.len())
    }

    pub fn renderable(&self, id: RenderableId) -> Option<&Renderable> {
        self.renderables.get(id.0).map(|(_, r)| r)
    }

    pub fn layer_of(&self, id: RenderableId) -> Option<LayerId> {
        self.renderables.get(id.0).map(|(layer, _)| *layer)
    }

    pub fn len(&self) -> usize {
        self.renderables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderables.is_empty()
    }

    /// Enabled renderables, grouped by layer creation order.
    pub fn collect(&self) -> RenderFrame {
        let mut frame = RenderFrame::default();
        for layer in &self.layers {
            for id in &layer.members {
                let Some((_, renderable)) = self.renderables.get(id.0) else {
                    continue;
                };
                if !renderable.is_enabled() {
                    continue;
                }
                frame.commands.push(RenderCommand {
                    layer: layer.id,
                    id: *id,
                    renderable: renderable.clone(),
                });
            }
        }
        frame
    }

    fn find_layer(&self, layer: LayerId) -> Option<&RecordedLayer> {
        self.layers.iter().find(|l| l.id == layer)
    }
}

impl Renderer for RecordingRenderer {
    fn create_layer(&mut self, name: &str) -> Result<LayerId, RenderError> {
        if self.unavailable.contains(name) {
            return Err(RenderError::LayerUnavailable(name.to_string()));
        }
        let id = LayerId(self.layers.len() as u64 + 1);
        self.layers.push(RecordedLayer {
            id,
            name: name.to_string(),
            members: BTreeSet::new(),
        });
        Ok(id)
    }

    fn add(&mut self, layer: LayerId, renderable: Renderable) -> RenderableId {
        let id = RenderableId(self.renderables.insert((layer, renderable)));
        match self.layers.iter_mut().find(|l| l.id == layer) {
            Some(l) => {
                l.members.insert(id);
            }
            None => warn!(%layer, %id, "renderable added to unknown layer"),
        }
        id
    }

    fn update(&mut self, id: RenderableId, renderable: &Renderable) {
        match self.renderables.get_mut(id.0) {
            Some((_, current)) => *current = renderable.clone(),
            None => warn!(error = %RenderError::UnknownRenderable(id), "update ignored"),
        }
    }

    fn set_enabled(&mut self, id: RenderableId, enabled: bool) {
        match self.renderables.get_mut(id.0) {
            Some((_, current)) => current.set_enabled(enabled),
            None => warn!(error = %RenderError::UnknownRenderable(id), "set_enabled ignored"),
        }
    }

    fn remove(&mut self, layer: LayerId, id: RenderableId) {
        match self.renderables.get(id.0) {
            Some((owner, _)) if *owner != layer => {
                warn!(%id, %layer, owner = %owner, "remove from wrong layer ignored");
                return;
            }
            Some(_) => {}
            None => {
                warn!(error = %RenderError::UnknownRenderable(id), "remove ignored");
                return;
            }
        }
        self.renderables.remove(id.0);
        if let Some(l) = self.layers.iter_mut().find(|l| l.id == layer) {
            l.members.remove(&id);
        }
    }

    fn redraw(&mut self) {
        self.redraws += 1;
    }

    fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    fn navigator_mut(&mut self) -> &mut Navigator {
        &mut self.navigator
    }
}
