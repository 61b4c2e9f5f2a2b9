pub mod arena;
pub mod handles;
pub mod lenient;
pub mod math;

// Foundation crate: small, well-tested primitives only.
pub use arena::*;
pub use handles::*;
pub use math::*;
