//! Integration tests: host element list → reconciliation → rendering graph.
//!
//! Runs `reconcile` against the in-memory engine and against a wrapper that
//! fails on a chosen mutation, to check the batch never half-applies.

use pgm_canvas::{SyncReport, reconcile};
use pgm_core::*;
use pgm_render::{ElementKind, MemoryGraph, Mutation, RenderError, RenderGraph};
use pretty_assertions::assert_eq;

// ─── Helpers ─────────────────────────────────────────────────────────────

fn id(s: &str) -> ElementId {
    ElementId::intern(s)
}

fn eight_schools() -> Vec<GraphElement> {
    parse_elements(include_str!("fixtures/eight_schools.json"))
        .expect("fixture parses")
        .elements
}

fn synced(elements: &[GraphElement]) -> MemoryGraph {
    let mut graph = MemoryGraph::default();
    reconcile(&mut graph, elements, &Annotations::new()).expect("initial sync");
    graph.take_log();
    graph
}

fn structural(graph: &mut MemoryGraph) -> Vec<Mutation> {
    graph
        .take_log()
        .into_iter()
        .filter(Mutation::is_structural)
        .collect()
}

fn edit_node(elements: &mut [GraphElement], name: &str, edit: impl FnOnce(&mut NodeData)) {
    let node = elements
        .iter_mut()
        .find_map(|element| match element {
            GraphElement::Node(node) if node.id == id(name) => Some(node),
            _ => None,
        })
        .expect("node in list");
    edit(node);
}

/// Delegates to `MemoryGraph`, failing the `fail_on`-th mutation.
struct FlakyGraph {
    inner: MemoryGraph,
    fail_on: usize,
    mutations: usize,
}

impl FlakyGraph {
    fn new(inner: MemoryGraph, fail_on: usize) -> Self {
        Self {
            inner,
            fail_on,
            mutations: 0,
        }
    }

    fn tick(&mut self) -> Result<(), RenderError> {
        self.mutations += 1;
        if self.mutations == self.fail_on {
            return Err(RenderError::Engine("injected failure".to_string()));
        }
        Ok(())
    }
}

impl RenderGraph for FlakyGraph {
    fn contains(&self, id: ElementId) -> bool {
        self.inner.contains(id)
    }
    fn ids(&self) -> Vec<ElementId> {
        self.inner.ids()
    }
    fn kind_of(&self, id: ElementId) -> Option<ElementKind> {
        self.inner.kind_of(id)
    }
    fn data(&self, id: ElementId) -> Option<&RenderData> {
        self.inner.data(id)
    }
    fn position(&self, id: ElementId) -> Option<Position> {
        self.inner.position(id)
    }
    fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.inner.parent(id)
    }
    fn endpoints(&self, id: ElementId) -> Option<(ElementId, ElementId)> {
        self.inner.endpoints(id)
    }
    fn add_node(
        &mut self,
        id: ElementId,
        data: RenderData,
        position: Position,
        parent: Option<ElementId>,
    ) -> Result<(), RenderError> {
        self.tick()?;
        self.inner.add_node(id, data, position, parent)
    }
    fn add_edge(
        &mut self,
        id: ElementId,
        data: RenderData,
        source: ElementId,
        target: ElementId,
    ) -> Result<(), RenderError> {
        self.tick()?;
        self.inner.add_edge(id, data, source, target)
    }
    fn remove(&mut self, id: ElementId) -> Result<(), RenderError> {
        self.tick()?;
        self.inner.remove(id)
    }
    fn set_data(&mut self, id: ElementId, data: RenderData) -> Result<(), RenderError> {
        self.tick()?;
        self.inner.set_data(id, data)
    }
    fn set_position(&mut self, id: ElementId, position: Position) -> Result<(), RenderError> {
        self.tick()?;
        self.inner.set_position(id, position)
    }
    fn set_parent(&mut self, id: ElementId, parent: Option<ElementId>) -> Result<(), RenderError> {
        self.tick()?;
        self.inner.set_parent(id, parent)
    }
    fn reconnect(
        &mut self,
        id: ElementId,
        source: ElementId,
        target: ElementId,
    ) -> Result<(), RenderError> {
        self.tick()?;
        self.inner.reconnect(id, source, target)
    }
    fn begin_batch(&mut self) {
        self.inner.begin_batch()
    }
    fn end_batch(&mut self) {
        self.inner.end_batch()
    }
    fn abort_batch(&mut self) {
        self.inner.abort_batch()
    }
    fn zoom(&self) -> f64 {
        self.inner.zoom()
    }
    fn pan(&self) -> Position {
        self.inner.pan()
    }
    fn set_zoom_at(&mut self, level: f64, rendered: Position) {
        self.inner.set_zoom_at(level, rendered)
    }
    fn viewport_size(&self) -> (f64, f64) {
        self.inner.viewport_size()
    }
    fn fit(&mut self, padding: f64) {
        self.inner.fit(padding)
    }
    fn set_zoom_limits(&mut self, min: f64, max: f64) {
        self.inner.set_zoom_limits(min, max)
    }
    fn select(&mut self, id: ElementId) -> Result<(), RenderError> {
        self.inner.select(id)
    }
    fn unselect_all(&mut self) {
        self.inner.unselect_all()
    }
    fn selected(&self) -> Vec<ElementId> {
        self.inner.selected()
    }
    fn element_at(&self, model: Position) -> Option<ElementId> {
        self.inner.element_at(model)
    }
}

// ─── Host fixture ────────────────────────────────────────────────────────

#[test]
fn fixture_renders_completely() {
    let elements = eight_schools();
    let mut graph = MemoryGraph::default();
    let report = reconcile(&mut graph, &elements, &Annotations::new()).unwrap();

    assert_eq!(
        report,
        SyncReport {
            added: 10,
            ..SyncReport::default()
        }
    );
    assert_eq!(graph.len(), elements.len());
    assert_eq!(graph.parent(id("theta")), Some(id("schools")));
    assert_eq!(graph.parent(id("mu")), None);
    assert_eq!(graph.endpoints(id("sigma_y")), Some((id("sigma"), id("y"))));

    let relationship = |edge: &str| graph.data(id(edge)).and_then(|d| d.relationship_type);
    assert_eq!(relationship("theta_y"), Some(RelationshipType::Stochastic));
    assert_eq!(relationship("mu_theta"), Some(RelationshipType::Stochastic));
}

#[test]
fn metadata_reaches_the_render_payload() {
    let graph = synced(&eight_schools());
    let data = graph.data(id("mu")).unwrap();
    let node = data.element.as_node().unwrap();
    assert_eq!(
        node.metadata.get("distribution").and_then(|v| v.as_str()),
        Some("Normal(0, 5)")
    );
}

#[test]
fn validator_annotations_from_json() {
    let elements = eight_schools();
    let annotations =
        parse_annotations(r#"{"tau": [{"message": "scale must be positive"}], "y": []}"#).unwrap();
    let mut graph = MemoryGraph::default();
    reconcile(&mut graph, &elements, &annotations).unwrap();

    let flagged: Vec<ElementId> = graph
        .snapshot()
        .into_iter()
        .filter(|element| element.data.has_error)
        .map(|element| element.id)
        .collect();
    assert_eq!(flagged, vec![id("tau")]);
}

// ─── Minimal mutation sets ───────────────────────────────────────────────

#[test]
fn only_the_moved_node_is_repositioned() {
    let mut elements = eight_schools();
    let mut graph = synced(&elements);

    edit_node(&mut elements, "tau", |tau| tau.position = Position::new(520.0, 60.0));
    reconcile(&mut graph, &elements, &Annotations::new()).unwrap();

    assert_eq!(
        structural(&mut graph),
        vec![Mutation::Reposition(id("tau"), Position::new(520.0, 60.0))]
    );
}

#[test]
fn retyped_target_changes_edge_kind_without_structural_churn() {
    let mut elements = eight_schools();
    let mut graph = synced(&elements);

    edit_node(&mut elements, "theta", |theta| theta.node_type = NodeType::Deterministic);
    reconcile(&mut graph, &elements, &Annotations::new()).unwrap();

    assert!(structural(&mut graph).is_empty());
    assert_eq!(
        graph.data(id("mu_theta")).and_then(|d| d.relationship_type),
        Some(RelationshipType::Deterministic)
    );
}

#[test]
fn dropping_the_plate_keeps_its_children() {
    let elements: Vec<GraphElement> = eight_schools()
        .into_iter()
        .filter(|element| element.id() != id("schools"))
        .map(|mut element| {
            if let GraphElement::Node(node) = &mut element {
                node.parent_id = None;
            }
            element
        })
        .collect();
    let mut graph = synced(&eight_schools());

    let report = reconcile(&mut graph, &elements, &Annotations::new()).unwrap();

    assert_eq!(report.removed, 1);
    assert_eq!(report.reparented, 0);
    assert!(!graph.contains(id("schools")));
    for child in ["theta", "sigma", "y"] {
        assert_eq!(graph.parent(id(child)), None, "{child} still contained");
    }
}

#[test]
fn moving_between_plates_is_one_reparent() {
    let mut elements = eight_schools();
    elements.push(NodeData::new(id("groups"), NodeType::Plate, Position::new(700.0, 220.0)).into());
    let mut graph = synced(&elements);

    edit_node(&mut elements, "sigma", |sigma| sigma.parent_id = Some(id("groups")));
    reconcile(&mut graph, &elements, &Annotations::new()).unwrap();

    assert_eq!(
        structural(&mut graph),
        vec![Mutation::Reparent(id("sigma"), Some(id("groups")))]
    );
}

// ─── Failure handling ────────────────────────────────────────────────────

#[test]
fn engine_failure_rolls_back_the_whole_batch() {
    let before = eight_schools();
    let mut after = before.clone();
    edit_node(&mut after, "mu", |mu| mu.position = Position::new(0.0, 0.0));
    edit_node(&mut after, "theta", |theta| theta.parent_id = None);
    after.retain(|element| element.id() != id("tau_theta"));

    let base = synced(&before);
    let expected = base.snapshot();

    for fail_on in 1..=6 {
        let mut graph = FlakyGraph::new(base.clone(), fail_on);
        let result = reconcile(&mut graph, &after, &Annotations::new());

        assert_eq!(
            result,
            Err(RenderError::Engine("injected failure".to_string())),
            "failing mutation #{fail_on}"
        );
        assert!(!graph.inner.is_batching());
        assert_eq!(graph.inner.snapshot(), expected, "failing mutation #{fail_on}");
        assert_eq!(graph.inner.revision(), base.revision());
    }
}

#[test]
fn engine_recovers_after_an_aborted_batch() {
    let elements = eight_schools();
    let mut graph = FlakyGraph::new(MemoryGraph::default(), 3);
    assert!(reconcile(&mut graph, &elements, &Annotations::new()).is_err());
    assert!(graph.inner.is_empty());

    let report = reconcile(&mut graph, &elements, &Annotations::new()).unwrap();
    assert_eq!(report.added, elements.len());
}
