//! Event bridge: raw interaction callbacks → domain events.
//!
//! Most raw events map to at most one domain event. Two have side effects
//! on the rendering graph instead: taps update the transient selection, and
//! in-flight drags are held to the grid while snapping is on.

use crate::events::{DomainEvent, TapEvent};
use crate::input::{DragPayload, RawEvent};
use crate::viewport::ViewportController;
use log::{debug, trace};
use pgm_core::{ElementId, GridSnap, Position, to_model_coordinates};
use pgm_render::{RenderError, RenderGraph};

/// Answer to a drag-over: whether the container should accept the drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropEffect {
    Copy,
    None,
}

#[derive(Debug, Clone, Default)]
pub struct EventBridge {
    grid: GridSnap,
}

impl EventBridge {
    pub fn new(grid: GridSnap) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &GridSnap {
        &self.grid
    }

    /// Toggle or resize the grid. Applies from the next interaction on.
    pub fn grid_mut(&mut self) -> &mut GridSnap {
        &mut self.grid
    }

    /// Palette items are accepted; anything else is refused.
    pub fn drag_over(&self, payload: &DragPayload) -> DropEffect {
        match payload.node_type() {
            Some(_) => DropEffect::Copy,
            None => DropEffect::None,
        }
    }

    /// Normalize one raw event.
    ///
    /// # Errors
    /// Only selection updates talk to the engine in a way that can fail; the
    /// error is passed through unchanged.
    pub fn handle<G: RenderGraph + ?Sized>(
        &self,
        graph: &mut G,
        viewport: &mut ViewportController,
        event: RawEvent,
    ) -> Result<Option<DomainEvent>, RenderError> {
        trace!("BRIDGE {event:?}");
        let emitted = match event {
            RawEvent::Tap { rendered } => Some(self.tap(graph, rendered)?),

            RawEvent::NodeDrag { id, position } => {
                self.constrain_drag(graph, id, position)?;
                None
            }

            RawEvent::CompoundDrop {
                moved,
                new_parent,
                old_parent,
            } => match graph.position(moved) {
                Some(position) => {
                    debug!("BRIDGE `{moved}` left {old_parent:?} for {new_parent:?}");
                    Some(DomainEvent::NodeMoved {
                        node_id: moved,
                        position,
                        parent_id: new_parent,
                    })
                }
                None => {
                    debug!("BRIDGE compound drop of unknown node `{moved}` ignored");
                    None
                }
            },

            RawEvent::PlateEmptied { plate } => Some(DomainEvent::PlateEmptied { plate_id: plate }),

            RawEvent::Remove { id } => Some(DomainEvent::ElementRemove { element_id: id }),

            RawEvent::Drop {
                client,
                container_origin,
                payload,
            } => match payload.node_type() {
                Some(node_type) => {
                    let model =
                        to_model_coordinates(client, container_origin, graph.pan(), graph.zoom());
                    Some(DomainEvent::NodeDropped {
                        node_type,
                        position: self.grid.snap(model),
                    })
                }
                None => {
                    debug!("BRIDGE ignoring drop of {:?}", payload.raw());
                    None
                }
            },

            RawEvent::ZoomChanged { level } => {
                viewport.on_zoom_changed(level);
                None
            }
        };
        Ok(emitted)
    }

    /// Select whatever is under the pointer, clearing any previous selection.
    fn tap<G: RenderGraph + ?Sized>(
        &self,
        graph: &mut G,
        rendered: Position,
    ) -> Result<DomainEvent, RenderError> {
        let model = to_model_coordinates(rendered, Position::ORIGIN, graph.pan(), graph.zoom());
        let target = graph.element_at(model);
        graph.unselect_all();
        if let Some(target) = target {
            graph.select(target)?;
        }
        Ok(DomainEvent::CanvasTap(TapEvent {
            rendered,
            model,
            target,
        }))
    }

    fn constrain_drag<G: RenderGraph + ?Sized>(
        &self,
        graph: &mut G,
        id: ElementId,
        position: Position,
    ) -> Result<(), RenderError> {
        if !self.grid.is_active() || !graph.contains(id) {
            return Ok(());
        }
        let snapped = self.grid.snap(position);
        if graph.position(id) != Some(snapped) {
            graph.set_position(id, snapped)?;
        }
        Ok(())
    }
}
