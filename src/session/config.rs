use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::backend::BackendKind;
use crate::foundation::error::{RaypoolError, RaypoolResult};
use crate::session::context::ContextOpts;
use crate::session::request::RenderRequest;

/// JSON run configuration: which backend, how many workers, what to render and where resources
/// live. Every section is optional.
///
/// ```json
/// {
///   "backend": "scanline",
///   "opts": { "workers": 4, "strip_height": 8 },
///   "request": { "width": 320, "height": 180, "samples_per_pixel": 16 },
///   "resources": "assets/"
/// }
/// ```
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Backend to render with.
    pub backend: BackendKind,
    /// Context options.
    pub opts: ContextOpts,
    /// The request.
    pub request: RenderRequest,
    /// Directory loaded as the shared resource set. Relative paths resolve against the config
    /// file's directory when loaded with [`RenderConfig::from_path`].
    pub resources: Option<PathBuf>,
}

impl RenderConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(s: &str) -> RaypoolResult<Self> {
        serde_json::from_str(s).map_err(|e| RaypoolError::serde(format!("parse config: {e}")))
    }

    /// Read and parse a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> RaypoolResult<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let mut cfg = Self::from_json(&s)?;
        if let Some(dir) = cfg.resources.as_mut()
            && dir.is_relative()
            && let Some(base) = path.parent()
        {
            *dir = base.join(&*dir);
        }
        Ok(cfg)
    }

    /// Validate options and request together.
    pub fn validate(&self) -> RaypoolResult<()> {
        self.opts.validate()?;
        self.request.validate()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/config.rs"]
mod tests;
