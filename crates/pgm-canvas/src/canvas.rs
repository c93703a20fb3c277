//! The mounted canvas.
//!
//! `Canvas` owns the rendering graph from `mount` to `unmount`. Holding the
//! graph by value means there is no way to reconcile into, or handle events
//! against, a graph that has been torn down.

use crate::bridge::{DropEffect, EventBridge};
use crate::config::{CanvasConfig, ZoomControlsPlacement};
use crate::error::{CanvasError, Result};
use crate::events::DomainEvent;
use crate::input::{DragPayload, RawEvent};
use crate::sync::{SyncReport, reconcile};
use crate::viewport::ViewportController;
use log::debug;
use pgm_core::{Annotations, GraphElement, parse_annotations, parse_elements};
use pgm_render::RenderGraph;

pub struct Canvas<G: RenderGraph> {
    graph: G,
    config: CanvasConfig,
    viewport: ViewportController,
    bridge: EventBridge,
    /// Domain events not yet collected by the host.
    outbox: Vec<DomainEvent>,
}

impl<G: RenderGraph> Canvas<G> {
    /// Attach to a freshly constructed rendering graph. The engine takes its
    /// zoom bounds from `config`.
    ///
    /// # Errors
    /// Returns `CanvasError::Config` if `config` does not validate.
    pub fn mount(mut graph: G, config: CanvasConfig) -> Result<Self> {
        config.validate()?;
        graph.set_zoom_limits(config.zoom.min, config.zoom.max);
        let mut viewport = ViewportController::new(config.zoom);
        viewport.attach(&graph);
        debug!("CANVAS mounted at zoom {}", viewport.zoom());
        Ok(Self {
            bridge: EventBridge::new(config.grid()),
            graph,
            config,
            viewport,
            outbox: Vec::new(),
        })
    }

    /// Detach and hand the rendering graph back for teardown.
    pub fn unmount(self) -> G {
        if !self.outbox.is_empty() {
            debug!("CANVAS unmounted with {} undelivered events", self.outbox.len());
        }
        self.graph
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// Direct engine access for adapters (resizes, external gestures).
    pub fn graph_mut(&mut self) -> &mut G {
        &mut self.graph
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    /// Swap in new host configuration. Grid changes apply to the next
    /// interaction; rendered nodes are not moved.
    ///
    /// # Errors
    /// Returns `CanvasError::Config` and keeps the old config if `config`
    /// does not validate.
    pub fn set_config(&mut self, config: CanvasConfig) -> Result<()> {
        config.validate()?;
        self.graph.set_zoom_limits(config.zoom.min, config.zoom.max);
        self.viewport.set_limits(config.zoom);
        self.viewport.attach(&self.graph);
        *self.bridge.grid_mut() = config.grid();
        self.config = config;
        Ok(())
    }

    pub fn set_grid_enabled(&mut self, enabled: bool) {
        self.config.grid_enabled = enabled;
        let grid = self.bridge.grid_mut();
        if enabled {
            grid.enable();
        } else {
            grid.disable();
        }
    }

    pub fn set_grid_size(&mut self, size: f64) {
        let grid = self.bridge.grid_mut();
        grid.set_grid_size(size);
        self.config.grid_size = grid.grid_size();
    }

    // ─── State in ────────────────────────────────────────────────────────

    /// Bring the rendering graph in line with the host's element list.
    ///
    /// # Errors
    /// Returns `CanvasError::Render` if the engine rejected a mutation; the
    /// graph is left as it was before the call.
    pub fn sync(&mut self, elements: &[GraphElement], annotations: &Annotations) -> Result<SyncReport> {
        Ok(reconcile(&mut self.graph, elements, annotations)?)
    }

    /// `sync` from the host's JSON element list and annotation map.
    /// Entries that do not parse are left out and counted as skipped.
    ///
    /// # Errors
    /// Returns `CanvasError::Input` when the element payload is not a JSON
    /// array or the annotation payload is not a map.
    pub fn sync_json(&mut self, elements: &str, annotations: &str) -> Result<SyncReport> {
        let parsed = parse_elements(elements).map_err(CanvasError::Input)?;
        let annotations = parse_annotations(annotations).map_err(CanvasError::Input)?;
        let mut report = self.sync(&parsed.elements, &annotations)?;
        report.skipped += parsed.rejected;
        Ok(report)
    }

    // ─── Intent out ──────────────────────────────────────────────────────

    /// Feed one raw interaction through the event bridge, queueing any
    /// resulting domain event.
    ///
    /// # Errors
    /// Returns `CanvasError::Render` if a selection update failed.
    pub fn handle(&mut self, event: RawEvent) -> Result<()> {
        if let Some(domain) = self
            .bridge
            .handle(&mut self.graph, &mut self.viewport, event)?
        {
            debug!("CANVAS emit {}", domain.name());
            self.outbox.push(domain);
        }
        Ok(())
    }

    pub fn drag_over(&self, payload: &DragPayload) -> DropEffect {
        self.bridge.drag_over(payload)
    }

    /// Take every queued domain event, oldest first.
    pub fn drain_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.outbox)
    }

    // ─── Viewport ────────────────────────────────────────────────────────

    pub fn zoom(&self) -> f64 {
        self.viewport.zoom()
    }

    pub fn zoom_percent(&self) -> u32 {
        self.viewport.zoom_percent()
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in(&mut self.graph);
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out(&mut self.graph);
    }

    pub fn set_zoom_level(&mut self, level: f64) {
        self.viewport.set_zoom_level(&mut self.graph, level);
    }

    pub fn reset_view(&mut self) {
        self.viewport
            .reset_view(&mut self.graph, self.config.fit_padding);
    }

    // ─── Affordances ─────────────────────────────────────────────────────

    pub fn cursor(&self) -> &'static str {
        self.config.mode.cursor()
    }

    pub fn zoom_controls(&self) -> ZoomControlsPlacement {
        self.config.zoom_controls
    }

    pub fn zoom_controls_visible(&self) -> bool {
        self.config.zoom_controls.is_visible()
    }
}
