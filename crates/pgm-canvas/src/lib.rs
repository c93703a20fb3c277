//! Canvas core for a directed-graphical-model editor.
//!
//! Keeps a stateful rendering graph in step with an externally owned element
//! list, maps pointer coordinates into model space, and turns raw interaction
//! callbacks into a handful of domain events for the model layer.

pub mod bridge;
pub mod canvas;
pub mod config;
pub mod error;
pub mod events;
pub mod input;
pub mod sync;
pub mod viewport;

pub use bridge::{DropEffect, EventBridge};
pub use canvas::Canvas;
pub use config::{CanvasConfig, InteractionMode, ZoomControlsPlacement};
pub use error::CanvasError;
pub use events::{DomainEvent, TapEvent};
pub use input::{DragPayload, RawEvent};
pub use sync::{SyncReport, reconcile};
pub use viewport::{ViewportController, ZoomLimits};
