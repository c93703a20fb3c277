//! Error type for canvas operations.

use pgm_render::RenderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("rendering engine error: {0}")]
    Render(#[from] RenderError),

    #[error("invalid host payload: {0}")]
    Input(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("event encoding failed: {0}")]
    Encode(String),
}

pub type Result<T, E = CanvasError> = std::result::Result<T, E>;
