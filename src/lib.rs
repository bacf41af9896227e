//! raypool schedules expensive per-pixel image synthesis over a fixed pool of workers and
//! composites their partial results.
//!
//! The public API is context-oriented:
//!
//! - Build a [`RenderContext`] from a [`RendererFactory`] and a [`SharedResourceSet`]
//! - Pick a strategy with [`create_backend`] (sample partitioning, pull-based scanlines or a
//!   rayon pool)
//! - Call [`RenderBackend::render_image`] with a [`RenderRequest`], optionally watching progress
//!   through a [`preview_channel`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Render backends.
pub mod backend;
/// Tone mapping, sample aggregation and region compositing.
pub mod composite;
/// Worker pool.
pub mod pool;
/// Progressive preview.
pub mod preview;
/// Renderer contract, shared resources and the built-in procedural renderer.
pub mod render;
/// Work units, partitioners and schedulers.
pub mod schedule;
/// Render context, requests and configuration.
pub mod session;

#[cfg(test)]
#[path = "../tests/unit/support.rs"]
pub(crate) mod test_support;

pub use crate::foundation::core::{FinalImage, RGBA_CHANNELS, Region, RequestId, WorkerId};
pub use crate::foundation::error::{RaypoolError, RaypoolResult};

pub use crate::backend::{
    BackendKind, NativeParallelBackend, RenderBackend, RenderOutput, RenderStats,
    SamplePartitionBackend, ScanlineBackend, create_backend,
};
pub use crate::composite::aggregate::{aggregate_samples, tone_map};
pub use crate::composite::region::{composite_regions, copy_region};
pub use crate::pool::lifecycle::WorkerPool;
pub use crate::preview::canvas::PreviewCanvas;
pub use crate::preview::channel::{PreviewEvent, PreviewReceiver, PreviewSender, preview_channel};
pub use crate::render::renderer::{Renderer, RendererFactory, RendererParams};
pub use crate::render::resources::{
    DirectoryProvider, EmptyProvider, SharedResourceProvider, SharedResourceSet,
};
pub use crate::render::sky::{SkyFactory, SkyScene};
pub use crate::schedule::partition::{
    PartialResult, WorkUnit, partition_samples, partition_scanlines,
};
pub use crate::schedule::queue::WorkQueue;
pub use crate::session::config::RenderConfig;
pub use crate::session::context::{ContextOpts, RenderContext};
pub use crate::session::phase::{PhaseTracker, RequestPhase};
pub use crate::session::request::RenderRequest;
