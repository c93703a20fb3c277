//! Domain events emitted to the model layer.

use crate::error::{CanvasError, Result};
use pgm_core::{ElementId, NodeType, Position};
use serde::{Deserialize, Serialize};

/// Payload of a canvas tap: where it happened and what it hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TapEvent {
    /// Container coordinates.
    pub rendered: Position,
    /// Model-space coordinates.
    pub model: Position,
    /// Element under the pointer; `None` for empty canvas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ElementId>,
}

/// Intention-revealing events consumed by the model layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum DomainEvent {
    CanvasTap(TapEvent),

    /// A node was dropped into or out of a plate.
    #[serde(rename_all = "camelCase")]
    NodeMoved {
        node_id: ElementId,
        position: Position,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_id: Option<ElementId>,
    },

    /// A palette item was dropped onto the canvas.
    #[serde(rename_all = "camelCase")]
    NodeDropped {
        node_type: NodeType,
        position: Position,
    },

    #[serde(rename_all = "camelCase")]
    PlateEmptied { plate_id: ElementId },

    #[serde(rename_all = "camelCase")]
    ElementRemove { element_id: ElementId },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::CanvasTap(_) => "canvas-tap",
            DomainEvent::NodeMoved { .. } => "node-moved",
            DomainEvent::NodeDropped { .. } => "node-dropped",
            DomainEvent::PlateEmptied { .. } => "plate-emptied",
            DomainEvent::ElementRemove { .. } => "element-remove",
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CanvasError::Encode(e.to_string()))
    }

    /// Compact encoding for binary host channels.
    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        rmp_serde::to_vec_named(self).map_err(|e| CanvasError::Encode(e.to_string()))
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self> {
        rmp_serde::from_slice(bytes).map_err(|e| CanvasError::Encode(e.to_string()))
    }
}
