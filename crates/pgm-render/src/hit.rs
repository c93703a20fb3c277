//! Hit testing: model point → element lookup.
//!
//! Paint order is plates at the back, then edges, then leaf nodes on top.
//! Hit testing walks that order in reverse so the front-most element wins.
//! Within each layer, children are tested before their containers and later
//! siblings before earlier ones.

use crate::memory::GraphState;
use petgraph::stable_graph::NodeIndex;
use pgm_core::{ElementId, NodeType, Position};
use serde::Serialize;

/// Half the side of the square a leaf node occupies, in model units.
pub const NODE_HALF_EXTENT: f64 = 30.0;

/// Gap between a plate's border and the children it encloses.
pub const PLATE_PADDING: f64 = 20.0;

/// Distance from an edge's centerline that still counts as a hit.
pub const EDGE_HIT_TOLERANCE: f64 = 4.0;

/// Axis-aligned box in model space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn around(center: Position, half: f64) -> Self {
        Self {
            x: center.x - half,
            y: center.y - half,
            width: half * 2.0,
            height: half * 2.0,
        }
    }

    pub fn contains(&self, p: Position) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Bounds {
            x,
            y,
            width: (self.x + self.width).max(other.x + other.width) - x,
            height: (self.y + self.height).max(other.y + other.height) - y,
        }
    }

    pub fn expand(&self, by: f64) -> Bounds {
        Bounds {
            x: self.x - by,
            y: self.y - by,
            width: self.width + by * 2.0,
            height: self.height + by * 2.0,
        }
    }
}

fn is_plate(state: &GraphState, idx: NodeIndex) -> bool {
    state.graph[idx].data.node_type() == Some(NodeType::Plate)
}

/// Bounds of a node. A plate with children spans them plus padding; any
/// other node (and an empty plate) is a square around its position.
pub(crate) fn node_bounds(state: &GraphState, idx: NodeIndex) -> Bounds {
    let own = Bounds::around(state.graph[idx].position, NODE_HALF_EXTENT);
    if !is_plate(state, idx) {
        return own;
    }
    state
        .children(idx)
        .into_iter()
        .map(|child| node_bounds(state, child))
        .reduce(|acc, b| acc.union(&b))
        .map(|children| children.expand(PLATE_PADDING))
        .unwrap_or(own)
}

/// Bounds of everything rendered, or `None` for an empty graph.
pub(crate) fn content_bounds(state: &GraphState) -> Option<Bounds> {
    state
        .roots()
        .into_iter()
        .map(|idx| node_bounds(state, idx))
        .reduce(|acc, b| acc.union(&b))
}

/// Find the front-most element at model point `p`.
pub(crate) fn hit_test(state: &GraphState, p: Position) -> Option<ElementId> {
    let roots = state.roots();

    for &idx in roots.iter().rev() {
        if let Some(hit) = hit_leaf(state, idx, p) {
            return Some(hit);
        }
    }

    if let Some(hit) = hit_edge(state, p) {
        return Some(hit);
    }

    for &idx in roots.iter().rev() {
        if let Some(hit) = hit_plate(state, idx, p) {
            return Some(hit);
        }
    }

    None
}

fn hit_leaf(state: &GraphState, idx: NodeIndex, p: Position) -> Option<ElementId> {
    for &child in state.children(idx).iter().rev() {
        if let Some(hit) = hit_leaf(state, child, p) {
            return Some(hit);
        }
    }
    if !is_plate(state, idx) && node_bounds(state, idx).contains(p) {
        return Some(state.graph[idx].id);
    }
    None
}

fn hit_plate(state: &GraphState, idx: NodeIndex, p: Position) -> Option<ElementId> {
    for &child in state.children(idx).iter().rev() {
        if let Some(hit) = hit_plate(state, child, p) {
            return Some(hit);
        }
    }
    if is_plate(state, idx) && node_bounds(state, idx).contains(p) {
        return Some(state.graph[idx].id);
    }
    None
}

fn hit_edge(state: &GraphState, p: Position) -> Option<ElementId> {
    state
        .edges()
        .into_iter()
        .rev()
        .find(|(_, source, target)| {
            let a = state.graph[*source].position;
            let b = state.graph[*target].position;
            distance_to_segment(p, a, b) <= EDGE_HIT_TOLERANCE
        })
        .map(|(edge, ..)| edge.id)
}

fn distance_to_segment(p: Position, a: Position, b: Position) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let (cx, cy) = (a.x + t * dx, a.y + t * dy);
    ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt()
}
