//! Airspace rendering core: tracked aircraft, their symbols and labels,
//! hazard regions, traffic reconciliation and zoom-driven scaling.

pub mod aircraft;
pub mod airspace;
pub mod config;
pub mod error;
pub mod hazard;
pub mod label;
pub mod reconcile;
pub mod scale;
pub mod symbol;
pub mod symbology;
pub mod traffic;

pub use aircraft::*;
pub use airspace::*;
pub use config::*;
pub use error::*;
pub use hazard::*;
pub use label::*;
pub use scale::*;
pub use symbol::*;
pub use symbology::*;
pub use traffic::*;
