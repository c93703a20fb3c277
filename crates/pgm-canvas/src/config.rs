//! Canvas configuration supplied by the host.

use crate::error::{CanvasError, Result};
use crate::viewport::ZoomLimits;
use pgm_core::GridSnap;
use serde::{Deserialize, Serialize};

/// Editing mode selected in the toolbar. Only changes the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InteractionMode {
    #[default]
    Select,
    AddNode,
    AddEdge,
}

impl InteractionMode {
    /// CSS-style cursor name for the canvas container.
    pub fn cursor(&self) -> &'static str {
        match self {
            InteractionMode::Select => "default",
            InteractionMode::AddNode => "crosshair",
            InteractionMode::AddEdge => "cell",
        }
    }
}

/// Where the zoom buttons are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZoomControlsPlacement {
    #[default]
    Default,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Hidden,
}

impl ZoomControlsPlacement {
    pub fn is_visible(&self) -> bool {
        !matches!(self, ZoomControlsPlacement::Hidden)
    }
}

/// Configuration for a mounted `Canvas`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanvasConfig {
    /// Snap dragged and dropped nodes to the grid. Default: **false**.
    pub grid_enabled: bool,

    /// Grid pitch in model units; 0 disables snapping. Default: **20**.
    pub grid_size: f64,

    pub mode: InteractionMode,

    pub zoom_controls: ZoomControlsPlacement,

    pub zoom: ZoomLimits,

    /// Rendered pixels left around content by reset-view. Default: **30**.
    pub fit_padding: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            grid_enabled: false,
            grid_size: 20.0,
            mode: InteractionMode::default(),
            zoom_controls: ZoomControlsPlacement::default(),
            zoom: ZoomLimits::default(),
            fit_padding: 30.0,
        }
    }
}

impl CanvasConfig {
    /// Parse and validate a host JSON config. Missing fields take defaults.
    ///
    /// # Errors
    /// Returns `CanvasError::Config` for malformed JSON or out-of-range values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: CanvasConfig =
            serde_json::from_str(json).map_err(|e| CanvasError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.grid_size >= 0.0 && self.grid_size.is_finite()) {
            return Err(CanvasError::Config(format!(
                "grid size must be a non-negative number, got {}",
                self.grid_size
            )));
        }
        if !(self.fit_padding >= 0.0 && self.fit_padding.is_finite()) {
            return Err(CanvasError::Config(format!(
                "fit padding must be a non-negative number, got {}",
                self.fit_padding
            )));
        }
        self.zoom.validate().map_err(CanvasError::Config)
    }

    pub fn grid(&self) -> GridSnap {
        GridSnap::new(self.grid_enabled, self.grid_size)
    }
}
