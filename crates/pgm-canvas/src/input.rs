//! Raw interaction events.
//!
//! Adapters for a concrete rendering engine and host container translate
//! their native callbacks (tap, drag, compound drop, context-menu remove,
//! HTML drag-and-drop, zoom) into `RawEvent`s for the event bridge.

use pgm_core::{ElementId, NodeType, Position};
use serde_json::Value;

/// A low-level interaction callback.
#[derive(Debug, Clone, PartialEq)]
pub enum RawEvent {
    /// Tap or click anywhere on the canvas, in container coordinates.
    Tap { rendered: Position },

    /// A node is being dragged; `position` is its model-space position.
    NodeDrag { id: ElementId, position: Position },

    /// A drag ended with the node entering or leaving a plate.
    CompoundDrop {
        moved: ElementId,
        new_parent: Option<ElementId>,
        old_parent: Option<ElementId>,
    },

    /// The engine's drag-and-drop extension reports a plate left empty.
    PlateEmptied { plate: ElementId },

    /// Context-menu "remove" on an element.
    Remove { id: ElementId },

    /// A palette item was released over the container.
    Drop {
        /// Pointer position in client (page) coordinates.
        client: Position,
        /// Top-left corner of the container in client coordinates.
        container_origin: Position,
        payload: DragPayload,
    },

    /// The engine's zoom changed, whatever the cause.
    ZoomChanged { level: f64 },
}

/// Data transferred with an external drag, as the container received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragPayload(String);

impl DragPayload {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn raw(&self) -> &str {
        &self.0
    }

    /// The palette kind this payload names, if it is one of the five node
    /// kinds. Accepts a bare kind (`"observed"`) or a JSON object carrying
    /// `nodeType` or `type`.
    pub fn node_type(&self) -> Option<NodeType> {
        let raw = self.0.trim();
        if raw.starts_with('{') {
            let value: Value = serde_json::from_str(raw).ok()?;
            let kind = value
                .get("nodeType")
                .or_else(|| value.get("type"))
                .and_then(Value::as_str)?;
            return kind.parse().ok();
        }
        raw.parse().ok()
    }
}

impl From<&str> for DragPayload {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}
