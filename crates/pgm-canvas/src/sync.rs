//! Reconciliation: declarative element list → rendering graph.
//!
//! The host hands over the whole element list on every change and has no
//! idea what changed. `reconcile` diffs that list against what the rendering
//! graph currently shows and applies the smallest set of mutations that makes
//! the graph its exact image:
//!
//! 1. Rendering elements whose id is gone (or whose kind flipped between node
//!    and edge) are removed.
//! 2. Every listed element, in list order, is created or refreshed. Payloads
//!    are always rewritten; positions, parents and endpoints only when they
//!    actually differ, so unchanged nodes never move.
//! 3. Parent changes and edges waiting on a node later in the list are
//!    settled at the end of the same batch.
//!
//! The whole pass runs inside one `begin_batch`/`end_batch`. A rendering
//! engine failure aborts the batch so a half-applied sync is never observed.

use log::{debug, warn};
use pgm_core::{
    Annotations, EdgeData, ElementId, GraphElement, NodeData, NodeType, RelationshipType,
    RenderData, has_error,
};
use pgm_render::{ElementKind, RenderError, RenderGraph};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Counts of what one reconciliation pass did to the rendering graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub added: usize,
    pub removed: usize,
    pub repositioned: usize,
    pub reparented: usize,
    pub reconnected: usize,
    /// Listed elements that could not be mirrored (empty or duplicate id,
    /// dangling edge endpoint).
    pub skipped: usize,
}

impl SyncReport {
    /// True when the pass changed nothing but payloads.
    pub fn is_noop(&self) -> bool {
        self.added == 0
            && self.removed == 0
            && self.repositioned == 0
            && self.reparented == 0
            && self.reconnected == 0
    }
}

/// Make `graph` mirror `elements`, flagging elements listed in `annotations`.
///
/// # Errors
/// Returns the first `RenderError` raised by the engine. The batch is
/// aborted before returning, leaving the graph as it was.
pub fn reconcile<G: RenderGraph + ?Sized>(
    graph: &mut G,
    elements: &[GraphElement],
    annotations: &Annotations,
) -> Result<SyncReport, RenderError> {
    let plan = Plan::new(elements);

    graph.begin_batch();
    match apply(graph, &plan, annotations) {
        Ok(report) => {
            graph.end_batch();
            debug!(
                "SYNC {} elements: +{} -{} moved {} reparented {} reconnected {} skipped {}",
                plan.elements.len(),
                report.added,
                report.removed,
                report.repositioned,
                report.reparented,
                report.reconnected,
                report.skipped,
            );
            Ok(report)
        }
        Err(err) => {
            graph.abort_batch();
            warn!("SYNC aborted: {err}");
            Err(err)
        }
    }
}

// ─── Planning ────────────────────────────────────────────────────────────

/// The well-formed part of an element list, with containment resolved.
struct Plan<'a> {
    /// Elements to mirror, in list order.
    elements: Vec<&'a GraphElement>,
    node_types: HashMap<ElementId, NodeType>,
    /// Effective container of every planned node.
    parents: HashMap<ElementId, Option<ElementId>>,
    skipped: usize,
}

impl<'a> Plan<'a> {
    fn new(list: &'a [GraphElement]) -> Self {
        let mut seen = HashSet::with_capacity(list.len());
        let mut skipped = 0;
        let mut candidates = Vec::with_capacity(list.len());

        for element in list {
            let id = element.id();
            if id.is_empty() {
                warn!("SYNC skipping element with empty id");
                skipped += 1;
            } else if !seen.insert(id) {
                warn!("SYNC skipping duplicate element `{id}`");
                skipped += 1;
            } else {
                candidates.push(element);
            }
        }

        let node_types: HashMap<ElementId, NodeType> = candidates
            .iter()
            .filter_map(|element| element.as_node())
            .map(|node| (node.id, node.node_type))
            .collect();

        let mut elements = Vec::with_capacity(candidates.len());
        for element in candidates {
            if let GraphElement::Edge(edge) = element {
                let dangling = [edge.source_id, edge.target_id]
                    .into_iter()
                    .find(|end| !node_types.contains_key(end));
                if let Some(end) = dangling {
                    warn!("SYNC skipping edge `{}`: no node `{end}`", edge.id);
                    skipped += 1;
                    continue;
                }
            }
            elements.push(element);
        }

        let parents = resolve_parents(&elements, &node_types);

        Self {
            elements,
            node_types,
            parents,
            skipped,
        }
    }

    fn parent_of(&self, id: ElementId) -> Option<ElementId> {
        self.parents.get(&id).copied().flatten()
    }

    fn kind_of(element: &GraphElement) -> ElementKind {
        match element {
            GraphElement::Node(_) => ElementKind::Node,
            GraphElement::Edge(_) => ElementKind::Edge,
        }
    }
}

/// A parent must be a listed plate and must not lead back to the node.
/// Anything else is dropped so the node renders uncontained.
fn resolve_parents(
    elements: &[&GraphElement],
    node_types: &HashMap<ElementId, NodeType>,
) -> HashMap<ElementId, Option<ElementId>> {
    let mut parents: HashMap<ElementId, Option<ElementId>> = HashMap::new();
    for node in elements.iter().filter_map(|element| element.as_node()) {
        let parent = node.parent_id.filter(|parent| {
            let is_plate = node_types.get(parent).is_some_and(NodeType::is_plate);
            if !is_plate {
                warn!("SYNC `{}` names `{parent}` as parent, which is not a plate", node.id);
            }
            is_plate
        });
        parents.insert(node.id, parent);
    }

    let cyclic: Vec<ElementId> = parents
        .keys()
        .copied()
        .filter(|&id| {
            let mut current = parents.get(&id).copied().flatten();
            for _ in 0..parents.len() {
                match current {
                    Some(ancestor) if ancestor == id => return true,
                    Some(ancestor) => current = parents.get(&ancestor).copied().flatten(),
                    None => return false,
                }
            }
            false
        })
        .collect();
    for id in cyclic {
        warn!("SYNC containment of `{id}` is cyclic, rendering it uncontained");
        parents.insert(id, None);
    }
    parents
}

// ─── Applying ────────────────────────────────────────────────────────────

fn apply<G: RenderGraph + ?Sized>(
    graph: &mut G,
    plan: &Plan<'_>,
    annotations: &Annotations,
) -> Result<SyncReport, RenderError> {
    let mut report = SyncReport {
        skipped: plan.skipped,
        ..SyncReport::default()
    };

    remove_stale(graph, plan, &mut report)?;

    let mut reparents: Vec<(ElementId, Option<ElementId>)> = Vec::new();
    let mut deferred_edges: Vec<&EdgeData> = Vec::new();

    for element in &plan.elements {
        match element {
            GraphElement::Node(node) => {
                let parent = plan.parent_of(node.id);
                let data = RenderData::node(node, has_error(annotations, node.id));
                if let Some(reparent) = sync_node(graph, node, data, parent, &mut report)? {
                    reparents.push(reparent);
                }
            }
            GraphElement::Edge(edge) => {
                if !sync_edge(graph, plan, edge, annotations, &mut report)? {
                    deferred_edges.push(edge);
                }
            }
        }
    }

    apply_reparents(graph, reparents, &mut report)?;

    for edge in deferred_edges {
        place_edge(graph, plan, edge, annotations, &mut report)?;
    }

    Ok(report)
}

/// Remove everything not in the plan, and anything whose kind changed.
fn remove_stale<G: RenderGraph + ?Sized>(
    graph: &mut G,
    plan: &Plan<'_>,
    report: &mut SyncReport,
) -> Result<(), RenderError> {
    let wanted: HashMap<ElementId, ElementKind> = plan
        .elements
        .iter()
        .map(|element| (element.id(), Plan::kind_of(element)))
        .collect();

    let stale: Vec<ElementId> = graph
        .ids()
        .into_iter()
        .filter(|&id| match (wanted.get(&id), graph.kind_of(id)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(wanted), Some(current)) => *wanted != current,
        })
        .collect();

    // Removing a node cascades to its edges, so re-check before each call.
    for &id in &stale {
        if graph.contains(id) {
            graph.remove(id)?;
        }
    }
    report.removed += stale.len();
    Ok(())
}

/// Create or refresh one node. Returns a containment change to settle once
/// every listed node exists.
fn sync_node<G: RenderGraph + ?Sized>(
    graph: &mut G,
    node: &NodeData,
    data: RenderData,
    parent: Option<ElementId>,
    report: &mut SyncReport,
) -> Result<Option<(ElementId, Option<ElementId>)>, RenderError> {
    if !graph.contains(node.id) {
        // The plate may come later in the list.
        let attach_now = parent.filter(|p| graph.kind_of(*p) == Some(ElementKind::Node));
        graph.add_node(node.id, data, node.position, attach_now)?;
        report.added += 1;
        return Ok((attach_now != parent).then_some((node.id, parent)));
    }

    graph.set_data(node.id, data)?;
    if graph.position(node.id) != Some(node.position) {
        graph.set_position(node.id, node.position)?;
        report.repositioned += 1;
    }
    Ok((graph.parent(node.id) != parent).then_some((node.id, parent)))
}

/// Create or refresh one edge. Returns `false` when an endpoint is not
/// rendered yet and the edge has to wait for the end of the pass.
fn sync_edge<G: RenderGraph + ?Sized>(
    graph: &mut G,
    plan: &Plan<'_>,
    edge: &EdgeData,
    annotations: &Annotations,
    report: &mut SyncReport,
) -> Result<bool, RenderError> {
    if graph.contains(edge.id) {
        graph.set_data(edge.id, edge_data(plan, edge, annotations))?;
    }
    if !endpoints_rendered(graph, edge) {
        return Ok(false);
    }
    place_edge(graph, plan, edge, annotations, report)?;
    Ok(true)
}

/// Add a missing edge, or reconnect an existing one whose endpoints moved.
fn place_edge<G: RenderGraph + ?Sized>(
    graph: &mut G,
    plan: &Plan<'_>,
    edge: &EdgeData,
    annotations: &Annotations,
    report: &mut SyncReport,
) -> Result<(), RenderError> {
    let wanted = (edge.source_id, edge.target_id);
    if !graph.contains(edge.id) {
        let data = edge_data(plan, edge, annotations);
        graph.add_edge(edge.id, data, edge.source_id, edge.target_id)?;
        report.added += 1;
    } else if graph.endpoints(edge.id) != Some(wanted) {
        graph.reconnect(edge.id, edge.source_id, edge.target_id)?;
        report.reconnected += 1;
    }
    Ok(())
}

fn edge_data(plan: &Plan<'_>, edge: &EdgeData, annotations: &Annotations) -> RenderData {
    let relationship = RelationshipType::for_target(plan.node_types.get(&edge.target_id).copied());
    RenderData::edge(edge, has_error(annotations, edge.id), relationship)
}

fn endpoints_rendered<G: RenderGraph + ?Sized>(graph: &G, edge: &EdgeData) -> bool {
    [edge.source_id, edge.target_id]
        .into_iter()
        .all(|end| graph.kind_of(end) == Some(ElementKind::Node))
}

/// Settle containment changes. A node cannot move into its own descendant,
/// so such a move waits until the descendant has been moved out first.
fn apply_reparents<G: RenderGraph + ?Sized>(
    graph: &mut G,
    mut pending: Vec<(ElementId, Option<ElementId>)>,
    report: &mut SyncReport,
) -> Result<(), RenderError> {
    while !pending.is_empty() {
        let before = pending.len();
        let mut blocked = Vec::new();
        for (id, parent) in pending {
            if graph.parent(id) == parent {
                continue;
            }
            if parent.is_some_and(|p| is_ancestor_or_self(graph, id, p)) {
                blocked.push((id, parent));
                continue;
            }
            graph.set_parent(id, parent)?;
            report.reparented += 1;
        }
        if blocked.len() == before {
            let (node, parent) = blocked[0];
            return Err(match parent {
                Some(parent) => RenderError::ContainmentCycle { node, parent },
                None => RenderError::Engine(format!("cannot detach `{node}`")),
            });
        }
        pending = blocked;
    }
    Ok(())
}

fn is_ancestor_or_self<G: RenderGraph + ?Sized>(
    graph: &G,
    candidate: ElementId,
    mut id: ElementId,
) -> bool {
    let mut depth = graph.ids().len();
    loop {
        if id == candidate {
            return true;
        }
        match graph.parent(id) {
            Some(parent) if depth > 0 => {
                id = parent;
                depth -= 1;
            }
            _ => return false,
        }
    }
}
