//! Error types for skein_canvas

use skein_core::ReactiveError;
use thiserror::Error;

/// Errors raised while binding a node tree to a canvas surface
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CanvasError {
    /// `subscribe` was called before a surface was attached
    #[error("canvas surface is not ready")]
    SurfaceNotReady,

    /// The reactive graph refused an operation
    #[error(transparent)]
    Reactive(#[from] ReactiveError),
}

/// Result type for skein_canvas operations
pub type Result<T> = std::result::Result<T, CanvasError>;
