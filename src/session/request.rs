use std::path::Path;

use anyhow::Context;

use crate::foundation::error::{RaypoolError, RaypoolResult};
use crate::preview::channel::PreviewSender;
use crate::render::renderer::RendererParams;

/// Largest accepted image side, in pixels.
pub const MAX_DIMENSION: u32 = 16_384;

/// One render request. Immutable once handed to a backend.
///
/// Everything but the preview sink can be loaded from JSON; missing fields take the
/// [`Default`] values (320x180, 16 samples, depth 64, scene 0).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderRequest {
    /// Scene selector passed to the renderer.
    pub scene_id: u32,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Samples per pixel for the whole request.
    pub samples_per_pixel: u32,
    /// Maximum trace depth.
    pub max_depth: u32,
    /// Ask the renderer to build an acceleration structure.
    pub accel: bool,
    /// Base noise seed.
    pub seed: u64,
    /// Optional progressive preview sink.
    #[serde(skip)]
    pub preview: Option<PreviewSender>,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self {
            scene_id: 0,
            width: 320,
            height: 180,
            samples_per_pixel: 16,
            max_depth: 64,
            accel: false,
            seed: 0,
            preview: None,
        }
    }
}

impl RenderRequest {
    /// Request for a `width x height` image with the given quality settings.
    pub fn new(width: u32, height: u32, samples_per_pixel: u32, max_depth: u32) -> Self {
        Self {
            width,
            height,
            samples_per_pixel,
            max_depth,
            ..Self::default()
        }
    }

    /// Select a scene.
    pub fn with_scene(mut self, scene_id: u32) -> Self {
        self.scene_id = scene_id;
        self
    }

    /// Toggle the acceleration structure.
    pub fn with_accel(mut self, accel: bool) -> Self {
        self.accel = accel;
        self
    }

    /// Set the base noise seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Attach a preview sink.
    pub fn with_preview(mut self, preview: PreviewSender) -> Self {
        self.preview = Some(preview);
        self
    }

    /// Check the request before anything is dispatched.
    pub fn validate(&self) -> RaypoolResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RaypoolError::validation(format!(
                "image size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(RaypoolError::validation(format!(
                "image size {}x{} exceeds {MAX_DIMENSION}px per side",
                self.width, self.height
            )));
        }
        if self.samples_per_pixel == 0 {
            return Err(RaypoolError::validation("samples_per_pixel must be >= 1"));
        }
        if self.max_depth == 0 {
            return Err(RaypoolError::validation("max_depth must be >= 1"));
        }
        Ok(())
    }

    /// Renderer parameters for the full request.
    pub fn renderer_params(&self) -> RendererParams {
        RendererParams {
            scene_id: self.scene_id,
            width: self.width,
            height: self.height,
            samples_per_pixel: self.samples_per_pixel,
            max_depth: self.max_depth,
            accel: self.accel,
        }
    }

    /// Parse a request from JSON text.
    pub fn from_json(s: &str) -> RaypoolResult<Self> {
        serde_json::from_str(s).map_err(|e| RaypoolError::serde(format!("parse request: {e}")))
    }

    /// Read and parse a request JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> RaypoolResult<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read request '{}'", path.display()))?;
        Self::from_json(&s)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/request.rs"]
mod tests;
