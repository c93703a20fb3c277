//! Zoom control anchored at the viewport center.
//!
//! The controller owns the *reported* zoom level shown by zoom controls. It
//! drives the rendering engine for explicit zoom operations and mirrors the
//! engine's zoom-changed notifications for everything else (pinch, wheel).

use pgm_core::Position;
use pgm_render::RenderGraph;
use serde::{Deserialize, Serialize};

/// Zoom bounds and the multiplicative step used by zoom-in/zoom-out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomLimits {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: 0.1,
            max: 2.0,
            step: 1.2,
        }
    }
}

impl ZoomLimits {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.min > 0.0 && self.min.is_finite()) {
            return Err(format!("zoom min must be positive, got {}", self.min));
        }
        if !(self.max >= self.min && self.max.is_finite()) {
            return Err(format!(
                "zoom max {} must be at least zoom min {}",
                self.max, self.min
            ));
        }
        if !(self.step > 1.0 && self.step.is_finite()) {
            return Err(format!("zoom step must be greater than 1, got {}", self.step));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ViewportController {
    zoom: f64,
    limits: ZoomLimits,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(ZoomLimits::default())
    }
}

impl ViewportController {
    pub fn new(limits: ZoomLimits) -> Self {
        Self { zoom: 1.0, limits }
    }

    /// Adopt the engine's current zoom. Called once on mount.
    pub fn attach<G: RenderGraph + ?Sized>(&mut self, graph: &G) {
        self.zoom = graph.zoom();
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Reported zoom as a whole percentage, for display.
    pub fn zoom_percent(&self) -> u32 {
        (self.zoom * 100.0).round().max(0.0) as u32
    }

    pub fn limits(&self) -> ZoomLimits {
        self.limits
    }

    pub fn set_limits(&mut self, limits: ZoomLimits) {
        self.limits = limits;
    }

    pub fn zoom_in<G: RenderGraph + ?Sized>(&mut self, graph: &mut G) {
        let level = (self.zoom * self.limits.step).min(self.limits.max);
        self.apply(graph, level);
    }

    pub fn zoom_out<G: RenderGraph + ?Sized>(&mut self, graph: &mut G) {
        let level = (self.zoom / self.limits.step).max(self.limits.min);
        self.apply(graph, level);
    }

    /// Direct set from a bounded input control. Not clamped here.
    pub fn set_zoom_level<G: RenderGraph + ?Sized>(&mut self, graph: &mut G, level: f64) {
        self.apply(graph, level);
    }

    /// Fit all content, then report 100% regardless of the fitted scale.
    /// The next zoom notification from the engine brings the reported level
    /// back in line with the real one.
    pub fn reset_view<G: RenderGraph + ?Sized>(&mut self, graph: &mut G, padding: f64) {
        graph.fit(padding);
        self.zoom = 1.0;
    }

    /// Passive mirror of zoom changes that did not originate here.
    pub fn on_zoom_changed(&mut self, level: f64) {
        self.zoom = level;
    }

    fn apply<G: RenderGraph + ?Sized>(&mut self, graph: &mut G, level: f64) {
        let (width, height) = graph.viewport_size();
        graph.set_zoom_at(level, Position::new(width / 2.0, height / 2.0));
        self.zoom = graph.zoom();
    }
}
