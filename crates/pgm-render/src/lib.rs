//! Rendering-graph capability interface.
//!
//! The canvas never talks to a concrete rendering/layout library. Everything
//! it needs from one is expressed by the [`RenderGraph`] trait: element
//! add/remove/query, positions and compound parents, batched mutation,
//! pan/zoom, selection. [`MemoryGraph`] is a headless implementation backed
//! by `petgraph`, used by tests and by hosts without a visual engine.

pub mod hit;
pub mod memory;

pub use hit::Bounds;
pub use memory::{MemoryGraph, Mutation, RenderedElement};

use pgm_core::{ElementId, Position, RenderData};
use std::fmt;
use thiserror::Error;

/// Whether a rendering element mirrors a node or an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Node,
    Edge,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Node => f.write_str("node"),
            ElementKind::Edge => f.write_str("edge"),
        }
    }
}

/// Failures reported by a rendering engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("unknown element `{0}`")]
    UnknownElement(ElementId),

    #[error("element `{0}` already exists")]
    DuplicateElement(ElementId),

    #[error("edge `{edge}` references missing node `{node}`")]
    MissingEndpoint { edge: ElementId, node: ElementId },

    #[error("placing `{node}` inside `{parent}` would make containment cycle")]
    ContainmentCycle { node: ElementId, parent: ElementId },

    #[error("`{id}` is not a {expected}")]
    WrongKind { id: ElementId, expected: ElementKind },

    /// Any other failure raised by a host engine adapter.
    #[error("rendering engine failure: {0}")]
    Engine(String),
}

/// The operations the canvas core needs from a stateful rendering graph.
///
/// Positions are model-space. Parent references are compound containment:
/// a node has at most one parent, and the parent must itself be a node.
pub trait RenderGraph {
    // ── Element queries ──

    fn contains(&self, id: ElementId) -> bool;

    /// Ids of every rendered element, nodes and edges.
    fn ids(&self) -> Vec<ElementId>;

    fn kind_of(&self, id: ElementId) -> Option<ElementKind>;

    fn data(&self, id: ElementId) -> Option<&RenderData>;

    fn position(&self, id: ElementId) -> Option<Position>;

    fn parent(&self, id: ElementId) -> Option<ElementId>;

    fn endpoints(&self, id: ElementId) -> Option<(ElementId, ElementId)>;

    // ── Element mutation ──

    fn add_node(
        &mut self,
        id: ElementId,
        data: RenderData,
        position: Position,
        parent: Option<ElementId>,
    ) -> Result<(), RenderError>;

    fn add_edge(
        &mut self,
        id: ElementId,
        data: RenderData,
        source: ElementId,
        target: ElementId,
    ) -> Result<(), RenderError>;

    /// Remove an element. Removing a node also removes its incident edges
    /// and detaches (but keeps) its children.
    fn remove(&mut self, id: ElementId) -> Result<(), RenderError>;

    fn set_data(&mut self, id: ElementId, data: RenderData) -> Result<(), RenderError>;

    fn set_position(&mut self, id: ElementId, position: Position) -> Result<(), RenderError>;

    /// Detach from the current container and attach to `parent` (or to no
    /// container) in one step.
    fn set_parent(&mut self, id: ElementId, parent: Option<ElementId>) -> Result<(), RenderError>;

    fn reconnect(
        &mut self,
        id: ElementId,
        source: ElementId,
        target: ElementId,
    ) -> Result<(), RenderError>;

    // ── Batching ──

    /// Start grouping mutations; nothing is observable until `end_batch`.
    fn begin_batch(&mut self);

    /// Commit the current batch as one observable change.
    fn end_batch(&mut self);

    /// Discard every mutation since `begin_batch`.
    fn abort_batch(&mut self);

    // ── Viewport ──

    fn zoom(&self) -> f64;

    fn pan(&self) -> Position;

    /// Set the zoom level keeping `rendered` (container coordinates) fixed.
    fn set_zoom_at(&mut self, level: f64, rendered: Position);

    /// Container width and height in rendered pixels.
    fn viewport_size(&self) -> (f64, f64);

    /// Pan and zoom so every element is visible, leaving `padding` pixels.
    fn fit(&mut self, padding: f64);

    /// Bounds the engine clamps every zoom change to, gestures included.
    fn set_zoom_limits(&mut self, min: f64, max: f64);

    // ── Selection ──

    fn select(&mut self, id: ElementId) -> Result<(), RenderError>;

    fn unselect_all(&mut self);

    fn selected(&self) -> Vec<ElementId>;

    // ── Spatial queries ──

    /// Topmost element under a model-space point.
    fn element_at(&self, model: Position) -> Option<ElementId>;
}
