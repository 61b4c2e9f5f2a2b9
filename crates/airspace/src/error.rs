use std::path::PathBuf;

use render::RenderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AirspaceError {
    /// The renderer could not provide one of the airspace layers. Nothing can
    /// be drawn without them, so this only ever surfaces from construction.
    #[error("cannot create {layer}: {source}")]
    LayerUnavailable {
        layer: &'static str,
        #[source]
        source: RenderError,
    },
    #[error("unknown location {0:?}")]
    UnknownLocation(String),
    #[error("invalid airspace configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("cannot read airspace configuration {}: {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = AirspaceError> = std::result::Result<T, E>;
