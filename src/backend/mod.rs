//! Render backends: one capability interface, three scheduling strategies.
//!
//! A backend is chosen once (see [`create_backend`]) and used through [`RenderBackend`]; callers
//! never branch on which one they hold.

use std::time::{Duration, Instant};

use crate::foundation::core::FinalImage;
use crate::foundation::error::RaypoolResult;
use crate::preview::channel::PreviewPublisher;
use crate::session::context::{RenderContext, RequestScope};
use crate::session::phase::RequestPhase;
use crate::session::request::RenderRequest;

/// Rayon-parallel strips without the message-passing pool.
pub mod native;
/// Static sample partitioning.
pub mod sample;
/// Dynamic pull-based scanlines.
pub mod scanline;

pub use native::NativeParallelBackend;
pub use sample::SamplePartitionBackend;
pub use scanline::ScanlineBackend;

/// Which scheduling strategy a backend uses.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Every worker renders the whole frame with a share of the samples.
    #[default]
    SamplePartition,
    /// Workers pull full-quality horizontal strips from a queue.
    Scanline,
    /// Strips rendered on a rayon thread pool.
    NativeParallel,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::SamplePartition => "sample_partition",
            Self::Scanline => "scanline",
            Self::NativeParallel => "native_parallel",
        })
    }
}

/// Counters for one finished render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct RenderStats {
    /// Work units the request was split into.
    pub units_total: usize,
    /// Distinct workers that processed at least one unit.
    pub workers_used: usize,
    /// Preview events delivered.
    pub preview_events: usize,
}

/// Final image plus timing.
#[derive(Clone, Debug)]
pub struct RenderOutput {
    /// The composited image.
    pub image: FinalImage,
    /// Wall time from admission to completion.
    pub elapsed: Duration,
    /// Counters.
    pub stats: RenderStats,
}

impl RenderOutput {
    /// Elapsed wall time in whole milliseconds.
    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }
}

/// Render entry point shared by every strategy.
pub trait RenderBackend: Send {
    /// Strategy implemented by this backend.
    fn kind(&self) -> BackendKind;

    /// Render `request` on `ctx` and return the final image.
    ///
    /// Any failure fails the whole request and no partial image is returned. Preview events
    /// already delivered stay delivered.
    fn render_image(
        &mut self,
        ctx: &mut RenderContext,
        request: &RenderRequest,
    ) -> RaypoolResult<RenderOutput>;
}

/// Construct the backend for `kind`.
pub fn create_backend(kind: BackendKind) -> Box<dyn RenderBackend> {
    match kind {
        BackendKind::SamplePartition => Box::new(SamplePartitionBackend),
        BackendKind::Scanline => Box::new(ScanlineBackend),
        BackendKind::NativeParallel => Box::new(NativeParallelBackend),
    }
}

/// Admission, timing, preview flush and phase bookkeeping around one backend run.
///
/// `run` must leave the tracker in `Aggregating` or `Copying`.
pub(crate) fn drive<F>(
    ctx: &mut RenderContext,
    request: &RenderRequest,
    run: F,
) -> RaypoolResult<RenderOutput>
where
    F: FnOnce(
        &mut RequestScope<'_>,
        &mut PreviewPublisher,
    ) -> RaypoolResult<(FinalImage, RenderStats)>,
{
    request.validate()?;
    let started = Instant::now();
    let mut scope = ctx.begin_request()?;
    let mut publisher = PreviewPublisher::new(request.preview.clone());

    let outcome = run(&mut scope, &mut publisher).and_then(|(image, mut stats)| {
        stats.preview_events = publisher.finish();
        scope.tracker.advance(RequestPhase::Complete)?;
        Ok((image, stats))
    });

    match outcome {
        Ok((image, stats)) => {
            let elapsed = started.elapsed();
            tracing::info!(
                request = %scope.id,
                elapsed_ms = elapsed.as_millis() as u64,
                units = stats.units_total,
                workers = stats.workers_used,
                previews = stats.preview_events,
                "render complete"
            );
            Ok(RenderOutput {
                image,
                elapsed,
                stats,
            })
        }
        Err(e) => {
            tracing::warn!(
                request = %scope.id,
                error = %e,
                previews = publisher.delivered(),
                dropped_previews = publisher.pending(),
                "render failed"
            );
            publisher.discard();
            scope.tracker.fail();
            Err(e)
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/backend/mod.rs"]
mod tests;
