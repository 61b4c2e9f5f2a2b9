use foundation::handles::Handle;
use foundation::math::GeoPosition;
use serde::{Deserialize, Serialize};

use crate::asset::ModelHandle;

/// Renderer-assigned identity of something added to a layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RenderableId(pub Handle);

impl std::fmt::Display for RenderableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "renderable#{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    #[serde(default = "opaque")]
    pub a: f32,
}

fn opaque() -> f32 {
    1.0
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const YELLOW: Color = Color::rgb(1.0, 1.0, 0.0);
    pub const CYAN: Color = Color::rgb(0.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

/// Model orientation, degrees about each axis.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Rotation {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// An instance of a loaded 3D model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRenderable {
    pub model: ModelHandle,
    pub position: GeoPosition,
    pub rotation: Rotation,
    pub scale: f64,
    pub enabled: bool,
    pub display_name: String,
}

/// Pixel offset of a text anchor; y grows downwards.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOffset {
    pub x_px: f64,
    pub y_px: f64,
}

impl TextOffset {
    pub const fn new(x_px: f64, y_px: f64) -> Self {
        Self { x_px, y_px }
    }
}

/// Geographically anchored text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRenderable {
    pub position: GeoPosition,
    pub text: String,
    pub color: Color,
    pub font_size_px: f32,
    pub bold: bool,
    pub offset: TextOffset,
    pub enabled: bool,
}

/// Indexed triangle mesh with vertices in geographic coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMesh {
    pub positions: Vec<GeoPosition>,
    /// Three indices per triangle.
    pub indices: Vec<u32>,
    pub outline_indices: Vec<u32>,
    pub interior: Color,
    pub enabled: bool,
    pub display_name: String,
}

impl TriangleMesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Renderable {
    Model(ModelRenderable),
    Text(TextRenderable),
    Mesh(TriangleMesh),
}

impl Renderable {
    pub fn is_enabled(&self) -> bool {
        match self {
            Renderable::Model(m) => m.enabled,
            Renderable::Text(t) => t.enabled,
            Renderable::Mesh(m) => m.enabled,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        match self {
            Renderable::Model(m) => m.enabled = enabled,
            Renderable::Text(t) => t.enabled = enabled,
            Renderable::Mesh(m) => m.enabled = enabled,
        }
    }

    pub fn as_model(&self) -> Option<&ModelRenderable> {
        match self {
            Renderable::Model(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextRenderable> {
        match self {
            Renderable::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_mesh(&self) -> Option<&TriangleMesh> {
        match self {
            Renderable::Mesh(m) => Some(m),
            _ => None,
        }
    }
}
