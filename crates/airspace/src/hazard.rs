use foundation::math::{GeoPosition, nmi_to_degrees};
use render::{LayerId, Renderable, RenderableId, Renderer, TriangleMesh};
use tracing::debug;

use crate::config::HazardConfig;

/// Flat four-wedge pyramid around one conflict sector.
///
/// Vertices: `0` centre, then the corners `1` NE, `2` NW, `3` SW, `4` SE, all
/// at the centre's altitude. Triangles fan from the centre through adjacent
/// corners; the outline walks the corners and closes back on `1`.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorMesh {
    pub vertices: [GeoPosition; 5],
    pub triangles: [[u32; 3]; 4],
    pub outline: [u32; 5],
}

pub fn build_hazard_sector_mesh(center: GeoPosition, size_nmi: f64) -> SectorMesh {
    let half = nmi_to_degrees(size_nmi) / 2.0;
    SectorMesh {
        vertices: [
            center,
            center.offset(half, half),
            center.offset(half, -half),
            center.offset(-half, -half),
            center.offset(-half, half),
        ],
        triangles: [[0, 1, 2], [0, 2, 3], [0, 3, 4], [0, 4, 1]],
        outline: [1, 2, 3, 4, 1],
    }
}

impl SectorMesh {
    pub fn into_triangle_mesh(self, config: &HazardConfig, display_name: String) -> TriangleMesh {
        TriangleMesh {
            positions: self.vertices.to_vec(),
            indices: self.triangles.iter().flatten().copied().collect(),
            outline_indices: self.outline.to_vec(),
            interior: config.interior(),
            enabled: false,
            display_name,
        }
    }
}

/// One sector's renderable.
#[derive(Debug)]
pub struct HazardSector {
    id: RenderableId,
    enabled: bool,
}

impl HazardSector {
    pub fn enable(&mut self, renderer: &mut dyn Renderer) {
        if !self.enabled {
            self.enabled = true;
            renderer.set_enabled(self.id, true);
        }
    }

    pub fn disable(&mut self, renderer: &mut dyn Renderer) {
        if self.enabled {
            self.enabled = false;
            renderer.set_enabled(self.id, false);
        }
    }

    pub fn remove(self, layer: LayerId, renderer: &mut dyn Renderer) {
        renderer.remove(layer, self.id);
    }

    pub fn id(&self) -> RenderableId {
        self.id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// All conflict sectors currently drawn for one aircraft.
#[derive(Debug)]
pub struct HazardRegion {
    layer: LayerId,
    sectors: Vec<HazardSector>,
}

impl HazardRegion {
    pub fn empty(layer: LayerId) -> Self {
        Self {
            layer,
            sectors: Vec::new(),
        }
    }

    /// Adds one hidden sector of `size_nmi` per centre. `centers` carry the
    /// aircraft altitude; the mesh is lowered by the configured offset and
    /// mapped to render altitude by `render_alt`.
    pub fn build(
        layer: LayerId,
        owner: &str,
        centers: &[GeoPosition],
        size_nmi: f64,
        config: &HazardConfig,
        render_alt: impl Fn(f64) -> f64,
        renderer: &mut dyn Renderer,
    ) -> Self {
        let sectors = centers
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let center = c.with_alt(render_alt(c.alt - config.altitude_offset_ft));
                let mesh = build_hazard_sector_mesh(center, size_nmi)
                    .into_triangle_mesh(config, format!("{owner} LoS {i}"));
                let id = renderer.add(layer, Renderable::Mesh(mesh));
                HazardSector { id, enabled: false }
            })
            .collect::<Vec<_>>();
        debug!(aircraft = %owner, sectors = sectors.len(), size_nmi, "hazard region built");
        Self { layer, sectors }
    }

    pub fn reveal(&mut self, renderer: &mut dyn Renderer) {
        for sector in &mut self.sectors {
            sector.enable(renderer);
        }
    }

    pub fn hide(&mut self, renderer: &mut dyn Renderer) {
        for sector in &mut self.sectors {
            sector.disable(renderer);
        }
    }

    /// Disables and removes every sector; the region is empty afterwards.
    pub fn remove(&mut self, renderer: &mut dyn Renderer) {
        for mut sector in self.sectors.drain(..) {
            sector.disable(renderer);
            sector.remove(self.layer, renderer);
        }
    }

    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    pub fn sectors(&self) -> &[HazardSector] {
        &self.sectors
    }
}
