//! Declarative graph element model.
//!
//! A graphical model is delivered to the canvas as an ordered list of
//! `GraphElement`s: typed nodes (optionally nested in plates) and edges
//! between them. The list is owned by the host model layer and is never
//! mutated here. `RenderData` is the payload mirrored onto the rendering
//! graph for each element.

use crate::id::ElementId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

// ─── Node kinds ──────────────────────────────────────────────────────────

/// The five kinds of node a graphical model can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Random variable drawn from a distribution.
    Stochastic,
    /// Variable computed from its parents.
    Deterministic,
    /// Fixed hyperparameter.
    Constant,
    /// Stochastic variable with observed data.
    Observed,
    /// Containment group for repeated structure.
    Plate,
}

impl NodeType {
    /// Every kind the palette can drop onto the canvas, in palette order.
    pub const ALL: [NodeType; 5] = [
        NodeType::Stochastic,
        NodeType::Deterministic,
        NodeType::Constant,
        NodeType::Observed,
        NodeType::Plate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Stochastic => "stochastic",
            NodeType::Deterministic => "deterministic",
            NodeType::Constant => "constant",
            NodeType::Observed => "observed",
            NodeType::Plate => "plate",
        }
    }

    pub fn is_plate(&self) -> bool {
        matches!(self, NodeType::Plate)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeType::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown node type `{s}`"))
    }
}

/// Visual/semantic kind of an edge. Always derived from the target node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipType {
    Stochastic,
    Deterministic,
}

impl RelationshipType {
    /// Stochastic and observed targets make a stochastic edge. Everything
    /// else, including a target that does not exist, is deterministic.
    pub fn for_target(target: Option<NodeType>) -> Self {
        match target {
            Some(NodeType::Stochastic | NodeType::Observed) => RelationshipType::Stochastic,
            _ => RelationshipType::Deterministic,
        }
    }
}

// ─── Geometry ────────────────────────────────────────────────────────────

/// A 2D point. Node positions are in model space; pointer positions are in
/// whatever frame the caller states.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

// ─── Elements ────────────────────────────────────────────────────────────

/// A node of the graphical model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    pub id: ElementId,
    pub node_type: NodeType,
    #[serde(default)]
    pub position: Position,
    /// Containing plate, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ElementId>,
    /// Display metadata (label, distribution, ...). Opaque to the canvas.
    #[serde(flatten)]
    pub metadata: BTreeMap<String, Value>,
}

impl NodeData {
    pub fn new(id: ElementId, node_type: NodeType, position: Position) -> Self {
        Self {
            id,
            node_type,
            position,
            parent_id: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_parent(mut self, parent: ElementId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.metadata
            .insert("label".to_string(), Value::String(label.to_string()));
        self
    }
}

/// A directed dependency between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeData {
    pub id: ElementId,
    pub source_id: ElementId,
    pub target_id: ElementId,
    #[serde(flatten)]
    pub metadata: BTreeMap<String, Value>,
}

impl EdgeData {
    pub fn new(id: ElementId, source_id: ElementId, target_id: ElementId) -> Self {
        Self {
            id,
            source_id,
            target_id,
            metadata: BTreeMap::new(),
        }
    }
}

/// One entry of the declarative element list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GraphElement {
    Node(NodeData),
    Edge(EdgeData),
}

impl GraphElement {
    pub fn id(&self) -> ElementId {
        match self {
            GraphElement::Node(node) => node.id,
            GraphElement::Edge(edge) => edge.id,
        }
    }

    pub fn as_node(&self) -> Option<&NodeData> {
        match self {
            GraphElement::Node(node) => Some(node),
            GraphElement::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&EdgeData> {
        match self {
            GraphElement::Edge(edge) => Some(edge),
            GraphElement::Node(_) => None,
        }
    }
}

impl From<NodeData> for GraphElement {
    fn from(node: NodeData) -> Self {
        GraphElement::Node(node)
    }
}

impl From<EdgeData> for GraphElement {
    fn from(edge: EdgeData) -> Self {
        GraphElement::Edge(edge)
    }
}

// ─── Validation annotations ──────────────────────────────────────────────

/// A single finding from the external validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: None,
        }
    }
}

/// Validation errors keyed by element id, in validator order.
pub type Annotations = HashMap<ElementId, SmallVec<[ValidationError; 2]>>;

/// An element is flagged erroneous iff it has a non-empty annotation entry.
pub fn has_error(annotations: &Annotations, id: ElementId) -> bool {
    annotations.get(&id).is_some_and(|errors| !errors.is_empty())
}

// ─── Rendering payload ───────────────────────────────────────────────────

/// Data payload carried by a rendering element.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderData {
    #[serde(flatten)]
    pub element: GraphElement,
    pub has_error: bool,
    /// Derived edge kind; `None` for nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_type: Option<RelationshipType>,
}

impl RenderData {
    pub fn node(node: &NodeData, has_error: bool) -> Self {
        Self {
            element: GraphElement::Node(node.clone()),
            has_error,
            relationship_type: None,
        }
    }

    pub fn edge(edge: &EdgeData, has_error: bool, relationship: RelationshipType) -> Self {
        Self {
            element: GraphElement::Edge(edge.clone()),
            has_error,
            relationship_type: Some(relationship),
        }
    }

    pub fn node_type(&self) -> Option<NodeType> {
        self.element.as_node().map(|node| node.node_type)
    }
}

// ─── Wire format ─────────────────────────────────────────────────────────

/// Result of parsing the host's element list: the elements that parsed, in
/// list order, and how many entries were dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedElements {
    pub elements: Vec<GraphElement>,
    pub rejected: usize,
}

/// Parse the host's JSON element list one entry at a time.
///
/// An entry that does not form a `GraphElement` (missing or `null` id,
/// unknown `nodeType`, wrong field types) is logged and counted in
/// `rejected`; its siblings are still returned.
///
/// # Errors
/// Returns the serde error message when the payload is not a JSON array.
pub fn parse_elements(json: &str) -> Result<ParsedElements, String> {
    let entries: Vec<Value> =
        serde_json::from_str(json).map_err(|e| format!("invalid element list: {e}"))?;
    let mut parsed = ParsedElements {
        elements: Vec::with_capacity(entries.len()),
        rejected: 0,
    };
    for (index, entry) in entries.into_iter().enumerate() {
        match GraphElement::deserialize(entry) {
            Ok(element) => parsed.elements.push(element),
            Err(e) => {
                log::warn!("PARSE skipping element #{index}: {e}");
                parsed.rejected += 1;
            }
        }
    }
    Ok(parsed)
}

/// Parse the validator's JSON annotation map (`{"id": [{"message": ...}]}`).
///
/// # Errors
/// Returns the serde error message when the payload is not a valid map.
pub fn parse_annotations(json: &str) -> Result<Annotations, String> {
    serde_json::from_str(json).map_err(|e| format!("invalid annotation map: {e}"))
}
