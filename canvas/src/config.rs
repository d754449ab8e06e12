//! Per-mount configuration and the page bootstrap payload.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde::{Deserialize, Serialize};

use crate::consts::{CAPTURE_SCALE, SHARP_ZOOM_THRESHOLD};
use crate::error::CanvasError;
use crate::popup::{PanelLayout, PopupLayer};
use crate::scene::PolygonRecord;
use crate::viewport::Viewport;

/// Tunables for one canvas mount. Missing JSON fields take the viewer preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    /// Backing-store pixels per CSS pixel.
    pub device_ratio: u32,
    /// Open panels before the oldest is evicted.
    pub max_panels: usize,
    /// Polygons of the same entity share one panel.
    pub multi_origin: bool,
    pub panel: PanelLayout,
    /// Start with the zoom lock engaged, leaving wheel and touch to the page.
    pub zoom_locked: bool,
    /// Above this scale the full-resolution background is drawn.
    pub sharp_zoom_threshold: f64,
    /// Pixel multiplier requested for screenshot capture.
    pub capture_scale: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self::viewer()
    }
}

impl CanvasConfig {
    /// Read-only site-map viewer.
    #[must_use]
    pub fn viewer() -> Self {
        Self {
            min_scale: 1.0,
            max_scale: 10.0,
            device_ratio: 2,
            max_panels: 5,
            multi_origin: true,
            panel: PanelLayout::default(),
            zoom_locked: true,
            sharp_zoom_threshold: SHARP_ZOOM_THRESHOLD,
            capture_scale: CAPTURE_SCALE,
        }
    }

    /// Back-office polygon editor.
    #[must_use]
    pub fn editor() -> Self {
        Self { min_scale: 0.1, device_ratio: 3, zoom_locked: false, ..Self::viewer() }
    }

    /// Parse a JSON config object.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Json`] if `text` is not a JSON object of config fields.
    pub fn from_json(text: &str) -> Result<Self, CanvasError> {
        let mut config: Self = serde_json::from_str(text)?;
        config.normalize();
        Ok(config)
    }

    /// Repair inconsistent values instead of failing.
    pub fn normalize(&mut self) {
        if self.min_scale.is_nan() || self.min_scale <= 0.0 {
            log::warn!("min_scale {} is not positive, using 0.1", self.min_scale);
            self.min_scale = 0.1;
        }
        if self.max_scale < self.min_scale {
            log::warn!("max_scale {} below min_scale {}, swapping", self.max_scale, self.min_scale);
            std::mem::swap(&mut self.min_scale, &mut self.max_scale);
        }
        self.device_ratio = self.device_ratio.max(1);
        self.max_panels = self.max_panels.max(1);
        self.capture_scale = self.capture_scale.max(1);
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.min_scale, self.max_scale, self.zoom_locked)
    }

    #[must_use]
    pub fn popup_layer(&self) -> PopupLayer {
        PopupLayer::new(self.max_panels, self.multi_origin, self.panel)
    }
}

/// JSON payload the portal page embeds for the viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteMapData {
    #[serde(rename = "imageUrl", alias = "image_url")]
    pub image_url: String,
    #[serde(default)]
    pub polygons: Vec<PolygonRecord>,
    #[serde(default)]
    pub config: CanvasConfig,
}

impl SiteMapData {
    /// Parse the page payload.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Json`] if required fields are missing or mistyped.
    pub fn from_json(text: &str) -> Result<Self, CanvasError> {
        let mut data: Self = serde_json::from_str(text)?;
        data.config.normalize();
        Ok(data)
    }
}
