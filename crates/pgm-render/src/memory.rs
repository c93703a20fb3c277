//! Headless rendering graph backed by `petgraph`.
//!
//! Nodes are graph vertices. Compound containment is a `Contains` link from
//! plate to child; model edges are `Edge` links from source to target. Both
//! live in the same `StableDiGraph` so removing a node drops its incident
//! edges and detaches its children in one call, the way a compound-graph
//! rendering engine does.
//!
//! Every mutation is appended to a log so callers can assert exactly which
//! operations a sync pass performed.

use crate::hit;
use crate::{ElementKind, RenderError, RenderGraph};
use log::trace;
use petgraph::Direction;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use pgm_core::{ElementId, Position, RenderData};
use serde::Serialize;
use smallvec::SmallVec;
use std::collections::HashMap;

pub const DEFAULT_MIN_ZOOM: f64 = 0.1;
pub const DEFAULT_MAX_ZOOM: f64 = 2.0;

/// One recorded rendering-graph mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Add(ElementId),
    Remove(ElementId),
    Reposition(ElementId, Position),
    Reparent(ElementId, Option<ElementId>),
    Reconnect(ElementId),
    SetData(ElementId),
}

impl Mutation {
    /// Payload refreshes are unconditional; everything else changes the
    /// graph's shape or layout.
    pub fn is_structural(&self) -> bool {
        !matches!(self, Mutation::SetData(_))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RenderNode {
    pub id: ElementId,
    pub data: RenderData,
    pub position: Position,
    pub selected: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct RenderEdge {
    pub id: ElementId,
    pub data: RenderData,
    pub selected: bool,
}

#[derive(Debug, Clone)]
pub(crate) enum Link {
    Contains,
    Edge(RenderEdge),
}

#[derive(Debug, Clone, Copy)]
enum Handle {
    Node(NodeIndex),
    Edge(EdgeIndex),
}

/// Everything a batch abort has to restore.
#[derive(Debug, Clone, Default)]
pub(crate) struct GraphState {
    pub graph: StableDiGraph<RenderNode, Link>,
    index: HashMap<ElementId, Handle>,
}

impl GraphState {
    fn node_index(&self, id: ElementId) -> Option<NodeIndex> {
        match self.index.get(&id) {
            Some(Handle::Node(idx)) => Some(*idx),
            _ => None,
        }
    }

    fn edge_index(&self, id: ElementId) -> Option<EdgeIndex> {
        match self.index.get(&id) {
            Some(Handle::Edge(idx)) => Some(*idx),
            _ => None,
        }
    }

    fn require_node(&self, id: ElementId) -> Result<NodeIndex, RenderError> {
        match self.index.get(&id) {
            Some(Handle::Node(idx)) => Ok(*idx),
            Some(Handle::Edge(_)) => Err(RenderError::WrongKind {
                id,
                expected: ElementKind::Node,
            }),
            None => Err(RenderError::UnknownElement(id)),
        }
    }

    fn require_edge(&self, id: ElementId) -> Result<EdgeIndex, RenderError> {
        match self.index.get(&id) {
            Some(Handle::Edge(idx)) => Ok(*idx),
            Some(Handle::Node(_)) => Err(RenderError::WrongKind {
                id,
                expected: ElementKind::Edge,
            }),
            None => Err(RenderError::UnknownElement(id)),
        }
    }

    fn endpoint(&self, edge: ElementId, node: ElementId) -> Result<NodeIndex, RenderError> {
        self.node_index(node)
            .ok_or(RenderError::MissingEndpoint { edge, node })
    }

    fn containment_link(&self, idx: NodeIndex) -> Option<EdgeIndex> {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .find(|e| matches!(e.weight(), Link::Contains))
            .map(|e| e.id())
    }

    pub fn parent_index(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.containment_link(idx)
            .and_then(|e| self.graph.edge_endpoints(e))
            .map(|(parent, _)| parent)
    }

    /// Children in insertion order.
    pub fn children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut children: Vec<NodeIndex> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| matches!(e.weight(), Link::Contains))
            .map(|e| e.target())
            .collect();
        children.sort();
        children
    }

    /// Nodes without a container, in insertion order.
    pub fn roots(&self) -> Vec<NodeIndex> {
        let mut roots: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&idx| self.containment_link(idx).is_none())
            .collect();
        roots.sort();
        roots
    }

    /// Model edges with their endpoint indices, in index order.
    pub fn edges(&self) -> Vec<(&RenderEdge, NodeIndex, NodeIndex)> {
        self.graph
            .edge_indices()
            .filter_map(|e| match &self.graph[e] {
                Link::Edge(edge) => {
                    let (source, target) = self.graph.edge_endpoints(e)?;
                    Some((edge, source, target))
                }
                Link::Contains => None,
            })
            .collect()
    }

    fn is_ancestor_or_self(&self, candidate: NodeIndex, mut idx: NodeIndex) -> bool {
        loop {
            if idx == candidate {
                return true;
            }
            match self.parent_index(idx) {
                Some(parent) => idx = parent,
                None => return false,
            }
        }
    }
}

/// Serializable view of one rendering element, for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedElement {
    pub id: ElementId,
    pub kind: ElementKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ElementId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<(ElementId, ElementId)>,
    pub selected: bool,
    pub data: RenderData,
}

/// In-memory [`RenderGraph`] with a mutation log and batch rollback.
#[derive(Debug, Clone)]
pub struct MemoryGraph {
    state: GraphState,
    /// State and log length captured when the outermost batch began.
    snapshot: Option<(GraphState, usize)>,
    batch_depth: usize,
    batch_dirty: bool,
    /// Bumped once per observable change (one per committed batch).
    revision: u64,
    log: Vec<Mutation>,
    zoom: f64,
    pan: Position,
    width: f64,
    height: f64,
    min_zoom: f64,
    max_zoom: f64,
}

impl Default for MemoryGraph {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

impl MemoryGraph {
    /// Empty graph in a container of the given rendered size.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            state: GraphState::default(),
            snapshot: None,
            batch_depth: 0,
            batch_dirty: false,
            revision: 0,
            log: Vec::new(),
            zoom: 1.0,
            pan: Position::ORIGIN,
            width,
            height,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
        }
    }

    /// Engine-side zoom bounds; `set_zoom_at` and `fit` clamp to them.
    pub fn with_zoom_limits(mut self, min: f64, max: f64) -> Self {
        self.set_zoom_limits(min, max);
        self
    }

    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_batching(&self) -> bool {
        self.batch_depth > 0
    }

    pub fn log(&self) -> &[Mutation] {
        &self.log
    }

    /// Drain the mutation log.
    pub fn take_log(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.log)
    }

    pub fn len(&self) -> usize {
        self.state.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.index.is_empty()
    }

    /// Ids of the nodes directly contained in `id`.
    pub fn children_of(&self, id: ElementId) -> Vec<ElementId> {
        self.state
            .node_index(id)
            .map(|idx| {
                self.state
                    .children(idx)
                    .into_iter()
                    .map(|child| self.state.graph[child].id)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every rendering element, sorted by id.
    pub fn snapshot(&self) -> Vec<RenderedElement> {
        let mut out: Vec<RenderedElement> = self
            .state
            .index
            .iter()
            .filter_map(|(&id, handle)| match *handle {
                Handle::Node(idx) => {
                    let node = &self.state.graph[idx];
                    Some(RenderedElement {
                        id,
                        kind: ElementKind::Node,
                        position: Some(node.position),
                        parent: self.state.parent_index(idx).map(|p| self.state.graph[p].id),
                        endpoints: None,
                        selected: node.selected,
                        data: node.data.clone(),
                    })
                }
                Handle::Edge(idx) => {
                    let (edge, endpoints) = self.edge_with_endpoints(idx)?;
                    Some(RenderedElement {
                        id,
                        kind: ElementKind::Edge,
                        position: None,
                        parent: None,
                        endpoints,
                        selected: edge.selected,
                        data: edge.data.clone(),
                    })
                }
            })
            .collect();
        out.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        out
    }

    fn edge_with_endpoints(
        &self,
        idx: EdgeIndex,
    ) -> Option<(&RenderEdge, Option<(ElementId, ElementId)>)> {
        let Link::Edge(edge) = self.state.graph.edge_weight(idx)? else {
            return None;
        };
        let endpoints = self
            .state
            .graph
            .edge_endpoints(idx)
            .map(|(s, t)| (self.state.graph[s].id, self.state.graph[t].id));
        Some((edge, endpoints))
    }

    fn edge_mut(&mut self, idx: EdgeIndex) -> Option<&mut RenderEdge> {
        match self.state.graph.edge_weight_mut(idx) {
            Some(Link::Edge(edge)) => Some(edge),
            _ => None,
        }
    }

    fn record(&mut self, mutation: Mutation) {
        trace!("RENDER {mutation:?}");
        self.log.push(mutation);
        self.changed();
    }

    fn changed(&mut self) {
        if self.batch_depth > 0 {
            self.batch_dirty = true;
        } else {
            self.revision += 1;
        }
    }
}

impl RenderGraph for MemoryGraph {
    fn contains(&self, id: ElementId) -> bool {
        self.state.index.contains_key(&id)
    }

    fn ids(&self) -> Vec<ElementId> {
        let mut ids: Vec<ElementId> = self.state.index.keys().copied().collect();
        ids.sort();
        ids
    }

    fn kind_of(&self, id: ElementId) -> Option<ElementKind> {
        self.state.index.get(&id).map(|handle| match handle {
            Handle::Node(_) => ElementKind::Node,
            Handle::Edge(_) => ElementKind::Edge,
        })
    }

    fn data(&self, id: ElementId) -> Option<&RenderData> {
        match *self.state.index.get(&id)? {
            Handle::Node(idx) => Some(&self.state.graph[idx].data),
            Handle::Edge(idx) => match self.state.graph.edge_weight(idx)? {
                Link::Edge(edge) => Some(&edge.data),
                Link::Contains => None,
            },
        }
    }

    fn position(&self, id: ElementId) -> Option<Position> {
        self.state
            .node_index(id)
            .map(|idx| self.state.graph[idx].position)
    }

    fn parent(&self, id: ElementId) -> Option<ElementId> {
        let idx = self.state.node_index(id)?;
        self.state
            .parent_index(idx)
            .map(|parent| self.state.graph[parent].id)
    }

    fn endpoints(&self, id: ElementId) -> Option<(ElementId, ElementId)> {
        let idx = self.state.edge_index(id)?;
        self.edge_with_endpoints(idx)?.1
    }

    fn add_node(
        &mut self,
        id: ElementId,
        data: RenderData,
        position: Position,
        parent: Option<ElementId>,
    ) -> Result<(), RenderError> {
        if self.contains(id) {
            return Err(RenderError::DuplicateElement(id));
        }
        let parent_idx = parent.map(|p| self.state.require_node(p)).transpose()?;

        let idx = self.state.graph.add_node(RenderNode {
            id,
            data,
            position,
            selected: false,
        });
        if let Some(parent_idx) = parent_idx {
            self.state.graph.add_edge(parent_idx, idx, Link::Contains);
        }
        self.state.index.insert(id, Handle::Node(idx));
        self.record(Mutation::Add(id));
        Ok(())
    }

    fn add_edge(
        &mut self,
        id: ElementId,
        data: RenderData,
        source: ElementId,
        target: ElementId,
    ) -> Result<(), RenderError> {
        if self.contains(id) {
            return Err(RenderError::DuplicateElement(id));
        }
        let source_idx = self.state.endpoint(id, source)?;
        let target_idx = self.state.endpoint(id, target)?;

        let edge = RenderEdge {
            id,
            data,
            selected: false,
        };
        let idx = self
            .state
            .graph
            .add_edge(source_idx, target_idx, Link::Edge(edge));
        self.state.index.insert(id, Handle::Edge(idx));
        self.record(Mutation::Add(id));
        Ok(())
    }

    fn remove(&mut self, id: ElementId) -> Result<(), RenderError> {
        match self.state.index.get(&id).copied() {
            None => Err(RenderError::UnknownElement(id)),
            Some(Handle::Edge(idx)) => {
                self.state.graph.remove_edge(idx);
                self.state.index.remove(&id);
                self.record(Mutation::Remove(id));
                Ok(())
            }
            Some(Handle::Node(idx)) => {
                let incident: SmallVec<[ElementId; 4]> = self
                    .state
                    .graph
                    .edges_directed(idx, Direction::Outgoing)
                    .chain(self.state.graph.edges_directed(idx, Direction::Incoming))
                    .filter_map(|e| match e.weight() {
                        Link::Edge(edge) => Some(edge.id),
                        Link::Contains => None,
                    })
                    .collect();
                for edge_id in incident {
                    // Self-loops show up in both directions.
                    if self.state.index.remove(&edge_id).is_some() {
                        self.record(Mutation::Remove(edge_id));
                    }
                }
                // Drops containment links too: children stay, uncontained.
                self.state.graph.remove_node(idx);
                self.state.index.remove(&id);
                self.record(Mutation::Remove(id));
                Ok(())
            }
        }
    }

    fn set_data(&mut self, id: ElementId, data: RenderData) -> Result<(), RenderError> {
        match self.state.index.get(&id).copied() {
            None => return Err(RenderError::UnknownElement(id)),
            Some(Handle::Node(idx)) => self.state.graph[idx].data = data,
            Some(Handle::Edge(idx)) => {
                if let Some(edge) = self.edge_mut(idx) {
                    edge.data = data;
                }
            }
        }
        self.record(Mutation::SetData(id));
        Ok(())
    }

    fn set_position(&mut self, id: ElementId, position: Position) -> Result<(), RenderError> {
        let idx = self.state.require_node(id)?;
        self.state.graph[idx].position = position;
        self.record(Mutation::Reposition(id, position));
        Ok(())
    }

    fn set_parent(&mut self, id: ElementId, parent: Option<ElementId>) -> Result<(), RenderError> {
        let idx = self.state.require_node(id)?;
        let parent_idx = match parent {
            Some(p) => {
                let p_idx = self.state.require_node(p)?;
                if self.state.is_ancestor_or_self(idx, p_idx) {
                    return Err(RenderError::ContainmentCycle { node: id, parent: p });
                }
                Some(p_idx)
            }
            None => None,
        };

        if let Some(link) = self.state.containment_link(idx) {
            self.state.graph.remove_edge(link);
        }
        if let Some(parent_idx) = parent_idx {
            self.state.graph.add_edge(parent_idx, idx, Link::Contains);
        }
        self.record(Mutation::Reparent(id, parent));
        Ok(())
    }

    fn reconnect(
        &mut self,
        id: ElementId,
        source: ElementId,
        target: ElementId,
    ) -> Result<(), RenderError> {
        let idx = self.state.require_edge(id)?;
        let source_idx = self.state.endpoint(id, source)?;
        let target_idx = self.state.endpoint(id, target)?;

        let Some(link) = self.state.graph.remove_edge(idx) else {
            return Err(RenderError::UnknownElement(id));
        };
        let new_idx = self.state.graph.add_edge(source_idx, target_idx, link);
        self.state.index.insert(id, Handle::Edge(new_idx));
        self.record(Mutation::Reconnect(id));
        Ok(())
    }

    fn begin_batch(&mut self) {
        if self.batch_depth == 0 {
            self.snapshot = Some((self.state.clone(), self.log.len()));
            self.batch_dirty = false;
        }
        self.batch_depth += 1;
    }

    fn end_batch(&mut self) {
        if self.batch_depth == 0 {
            return;
        }
        self.batch_depth -= 1;
        if self.batch_depth == 0 {
            self.snapshot = None;
            if self.batch_dirty {
                self.revision += 1;
            }
            self.batch_dirty = false;
        }
    }

    /// Aborting unwinds every nesting level at once.
    fn abort_batch(&mut self) {
        if self.batch_depth == 0 {
            return;
        }
        self.batch_depth = 0;
        if let Some((state, log_len)) = self.snapshot.take() {
            self.state = state;
            self.log.truncate(log_len);
        }
        self.batch_dirty = false;
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn pan(&self) -> Position {
        self.pan
    }

    fn set_zoom_at(&mut self, level: f64, rendered: Position) {
        if !level.is_finite() || level <= 0.0 {
            return;
        }
        let level = level.clamp(self.min_zoom, self.max_zoom);
        // Model point under `rendered` before the change stays under it after.
        let model_x = (rendered.x - self.pan.x) / self.zoom;
        let model_y = (rendered.y - self.pan.y) / self.zoom;
        self.pan = Position::new(rendered.x - model_x * level, rendered.y - model_y * level);
        self.zoom = level;
        self.changed();
    }

    fn viewport_size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn set_zoom_limits(&mut self, min: f64, max: f64) {
        self.min_zoom = min;
        self.max_zoom = max;
        let clamped = self.zoom.clamp(min, max);
        if clamped != self.zoom {
            let (width, height) = (self.width, self.height);
            self.set_zoom_at(clamped, Position::new(width / 2.0, height / 2.0));
        }
    }

    fn fit(&mut self, padding: f64) {
        let Some(content) = hit::content_bounds(&self.state) else {
            return;
        };
        let avail_w = (self.width - 2.0 * padding).max(1.0);
        let avail_h = (self.height - 2.0 * padding).max(1.0);
        let zoom = (avail_w / content.width.max(1.0))
            .min(avail_h / content.height.max(1.0))
            .clamp(self.min_zoom, self.max_zoom);
        let (cx, cy) = content.center();
        self.zoom = zoom;
        self.pan = Position::new(self.width / 2.0 - cx * zoom, self.height / 2.0 - cy * zoom);
        self.changed();
    }

    fn select(&mut self, id: ElementId) -> Result<(), RenderError> {
        match self.state.index.get(&id).copied() {
            None => return Err(RenderError::UnknownElement(id)),
            Some(Handle::Node(idx)) => self.state.graph[idx].selected = true,
            Some(Handle::Edge(idx)) => {
                if let Some(edge) = self.edge_mut(idx) {
                    edge.selected = true;
                }
            }
        }
        self.changed();
        Ok(())
    }

    fn unselect_all(&mut self) {
        let nodes: Vec<NodeIndex> = self.state.graph.node_indices().collect();
        for idx in nodes {
            self.state.graph[idx].selected = false;
        }
        let links: Vec<EdgeIndex> = self.state.graph.edge_indices().collect();
        for idx in links {
            if let Link::Edge(edge) = &mut self.state.graph[idx] {
                edge.selected = false;
            }
        }
        self.changed();
    }

    fn selected(&self) -> Vec<ElementId> {
        let graph = &self.state.graph;
        let mut ids: Vec<ElementId> = graph
            .node_indices()
            .map(|idx| &graph[idx])
            .filter(|node| node.selected)
            .map(|node| node.id)
            .chain(graph.edge_indices().filter_map(|idx| match &graph[idx] {
                Link::Edge(edge) if edge.selected => Some(edge.id),
                _ => None,
            }))
            .collect();
        ids.sort();
        ids
    }

    fn element_at(&self, model: Position) -> Option<ElementId> {
        hit::hit_test(&self.state, model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgm_core::{EdgeData, NodeData, NodeType, RelationshipType};
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> ElementId {
        ElementId::intern(s)
    }

    fn node_data(name: &str, kind: NodeType) -> RenderData {
        RenderData::node(&NodeData::new(id(name), kind, Position::ORIGIN), false)
    }

    fn edge_data(name: &str, source: &str, target: &str) -> RenderData {
        RenderData::edge(
            &EdgeData::new(id(name), id(source), id(target)),
            false,
            RelationshipType::Deterministic,
        )
    }

    fn add(g: &mut MemoryGraph, name: &str, kind: NodeType, parent: Option<&str>) {
        g.add_node(id(name), node_data(name, kind), Position::ORIGIN, parent.map(id))
            .unwrap();
    }

    #[test]
    fn add_and_query_nodes() {
        let mut g = MemoryGraph::default();
        add(&mut g, "mem_plate", NodeType::Plate, None);
        add(&mut g, "mem_x", NodeType::Observed, Some("mem_plate"));

        assert_eq!(g.len(), 2);
        assert_eq!(g.parent(id("mem_x")), Some(id("mem_plate")));
        assert_eq!(g.children_of(id("mem_plate")), vec![id("mem_x")]);
        assert_eq!(g.kind_of(id("mem_x")), Some(ElementKind::Node));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut g = MemoryGraph::default();
        add(&mut g, "dup", NodeType::Constant, None);
        let err = g
            .add_node(id("dup"), node_data("dup", NodeType::Constant), Position::ORIGIN, None)
            .unwrap_err();
        assert_eq!(err, RenderError::DuplicateElement(id("dup")));
    }

    #[test]
    fn edge_needs_both_endpoints() {
        let mut g = MemoryGraph::default();
        add(&mut g, "ep_a", NodeType::Constant, None);
        let err = g
            .add_edge(id("ep_e"), edge_data("ep_e", "ep_a", "ep_b"), id("ep_a"), id("ep_b"))
            .unwrap_err();
        assert_eq!(
            err,
            RenderError::MissingEndpoint {
                edge: id("ep_e"),
                node: id("ep_b")
            }
        );
    }

    #[test]
    fn removing_node_cascades_edges_and_detaches_children() {
        let mut g = MemoryGraph::default();
        add(&mut g, "rm_plate", NodeType::Plate, None);
        add(&mut g, "rm_child", NodeType::Stochastic, Some("rm_plate"));
        add(&mut g, "rm_other", NodeType::Constant, None);
        g.add_edge(
            id("rm_edge"),
            edge_data("rm_edge", "rm_other", "rm_plate"),
            id("rm_other"),
            id("rm_plate"),
        )
        .unwrap();
        g.take_log();

        g.remove(id("rm_plate")).unwrap();

        assert!(!g.contains(id("rm_plate")));
        assert!(!g.contains(id("rm_edge")));
        assert!(g.contains(id("rm_child")));
        assert_eq!(g.parent(id("rm_child")), None);
        assert_eq!(
            g.take_log(),
            vec![Mutation::Remove(id("rm_edge")), Mutation::Remove(id("rm_plate"))]
        );
    }

    #[test]
    fn reparent_rejects_cycles() {
        let mut g = MemoryGraph::default();
        add(&mut g, "cy_outer", NodeType::Plate, None);
        add(&mut g, "cy_inner", NodeType::Plate, Some("cy_outer"));

        let err = g.set_parent(id("cy_outer"), Some(id("cy_inner"))).unwrap_err();
        assert_eq!(
            err,
            RenderError::ContainmentCycle {
                node: id("cy_outer"),
                parent: id("cy_inner")
            }
        );
        assert!(g.set_parent(id("cy_outer"), Some(id("cy_outer"))).is_err());
    }

    #[test]
    fn reparent_moves_between_containers() {
        let mut g = MemoryGraph::default();
        add(&mut g, "mv_p1", NodeType::Plate, None);
        add(&mut g, "mv_p2", NodeType::Plate, None);
        add(&mut g, "mv_n", NodeType::Stochastic, Some("mv_p1"));

        g.set_parent(id("mv_n"), Some(id("mv_p2"))).unwrap();
        assert_eq!(g.parent(id("mv_n")), Some(id("mv_p2")));
        assert!(g.children_of(id("mv_p1")).is_empty());

        g.set_parent(id("mv_n"), None).unwrap();
        assert_eq!(g.parent(id("mv_n")), None);
    }

    #[test]
    fn reconnect_keeps_payload() {
        let mut g = MemoryGraph::default();
        add(&mut g, "rc_a", NodeType::Constant, None);
        add(&mut g, "rc_b", NodeType::Stochastic, None);
        add(&mut g, "rc_c", NodeType::Observed, None);
        g.add_edge(id("rc_e"), edge_data("rc_e", "rc_a", "rc_b"), id("rc_a"), id("rc_b"))
            .unwrap();

        g.reconnect(id("rc_e"), id("rc_a"), id("rc_c")).unwrap();
        assert_eq!(g.endpoints(id("rc_e")), Some((id("rc_a"), id("rc_c"))));
        assert!(g.data(id("rc_e")).is_some());
    }

    #[test]
    fn batch_commits_as_one_revision() {
        let mut g = MemoryGraph::default();
        let before = g.revision();
        g.begin_batch();
        add(&mut g, "bt_a", NodeType::Constant, None);
        add(&mut g, "bt_b", NodeType::Constant, None);
        assert_eq!(g.revision(), before);
        g.end_batch();
        assert_eq!(g.revision(), before + 1);
    }

    #[test]
    fn abort_restores_state_and_log() {
        let mut g = MemoryGraph::default();
        add(&mut g, "ab_keep", NodeType::Constant, None);
        let log_len = g.log().len();

        g.begin_batch();
        add(&mut g, "ab_new", NodeType::Constant, None);
        g.remove(id("ab_keep")).unwrap();
        g.abort_batch();

        assert!(g.contains(id("ab_keep")));
        assert!(!g.contains(id("ab_new")));
        assert_eq!(g.log().len(), log_len);
        assert!(!g.is_batching());
    }

    #[test]
    fn zoom_keeps_anchor_fixed() {
        let mut g = MemoryGraph::new(800.0, 600.0);
        let anchor = Position::new(400.0, 300.0);
        let model_before = ((anchor.x - g.pan().x) / g.zoom(), (anchor.y - g.pan().y) / g.zoom());

        g.set_zoom_at(1.5, anchor);
        let model_after = ((anchor.x - g.pan().x) / g.zoom(), (anchor.y - g.pan().y) / g.zoom());

        assert!((model_before.0 - model_after.0).abs() < 1e-3);
        assert!((model_before.1 - model_after.1).abs() < 1e-3);
        assert_eq!(g.zoom(), 1.5);
    }

    #[test]
    fn zoom_is_clamped_to_engine_limits() {
        let mut g = MemoryGraph::default();
        g.set_zoom_at(10.0, Position::ORIGIN);
        assert_eq!(g.zoom(), DEFAULT_MAX_ZOOM);
        g.set_zoom_at(0.001, Position::ORIGIN);
        assert_eq!(g.zoom(), DEFAULT_MIN_ZOOM);
    }

    #[test]
    fn fit_centers_content() {
        let mut g = MemoryGraph::new(800.0, 600.0);
        g.add_node(
            id("fit_a"),
            node_data("fit_a", NodeType::Constant),
            Position::new(1000.0, 1000.0),
            None,
        )
        .unwrap();
        g.fit(30.0);

        let center = Position::new(
            1000.0 * g.zoom() + g.pan().x,
            1000.0 * g.zoom() + g.pan().y,
        );
        assert!((center.x - 400.0).abs() < 1e-2);
        assert!((center.y - 300.0).abs() < 1e-2);
    }

    #[test]
    fn selection_flags() {
        let mut g = MemoryGraph::default();
        add(&mut g, "sel_a", NodeType::Constant, None);
        add(&mut g, "sel_b", NodeType::Constant, None);
        g.select(id("sel_a")).unwrap();
        assert_eq!(g.selected(), vec![id("sel_a")]);
        g.unselect_all();
        assert!(g.selected().is_empty());
        assert!(g.select(id("sel_missing")).is_err());
    }

    #[test]
    fn snapshot_serializes() {
        let mut g = MemoryGraph::default();
        add(&mut g, "snap_plate", NodeType::Plate, None);
        add(&mut g, "snap_n", NodeType::Stochastic, Some("snap_plate"));
        let json = serde_json::to_value(g.snapshot()).unwrap();
        let child = json
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["id"] == "snap_n")
            .unwrap();
        assert_eq!(child["parent"], "snap_plate");
        assert_eq!(child["kind"], "node");
        assert_eq!(child["data"]["nodeType"], "stochastic");
    }
}
