//! Renderer-facing contract of the airspace display.
//!
//! The globe engine itself is opaque: the airspace core only ever talks to
//! it through [`Renderer`] (layers, renderables, redraw, navigator) and
//! [`AssetLoader`] (ticketed model loading). [`RecordingRenderer`] and
//! [`QueuedLoader`] are in-memory implementations for tests and tools.

pub mod asset;
pub mod layer;
pub mod navigator;
pub mod renderable;
pub mod renderer;

pub use asset::*;
pub use layer::*;
pub use navigator::*;
pub use renderable::*;
pub use renderer::*;
