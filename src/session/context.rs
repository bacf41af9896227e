use std::sync::Arc;

use crate::foundation::core::RequestId;
use crate::foundation::error::{RaypoolError, RaypoolResult};
use crate::pool::lifecycle::WorkerPool;
use crate::render::renderer::RendererFactory;
use crate::render::resources::{SharedResourceProvider, SharedResourceSet};
use crate::session::phase::{PhaseTracker, RequestPhase};

/// Context-wide scheduling options.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContextOpts {
    /// Worker count (default: available parallelism).
    pub workers: usize,
    /// Maximum strip height for scanline scheduling (default 16).
    pub strip_height: u32,
    /// Preview channel capacity used by front-ends; `None` means unbounded.
    pub preview_capacity: Option<usize>,
}

impl Default for ContextOpts {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            strip_height: 16,
            preview_capacity: Some(64),
        }
    }
}

impl ContextOpts {
    /// Check option ranges.
    pub fn validate(&self) -> RaypoolResult<()> {
        if self.workers == 0 {
            return Err(RaypoolError::validation("workers must be >= 1"));
        }
        if self.strip_height == 0 {
            return Err(RaypoolError::validation("strip_height must be >= 1"));
        }
        Ok(())
    }
}

/// Owned scheduling context: worker pool, shared resources, renderer factory and options.
///
/// Create one per session and pass it to a [`RenderBackend`](crate::backend::RenderBackend).
/// Only one request runs at a time; a request arriving while units of an earlier one are still
/// running is rejected with [`RaypoolError::Busy`] (see [`RenderContext::settle`]).
pub struct RenderContext {
    factory: Arc<dyn RendererFactory>,
    resources: SharedResourceSet,
    opts: ContextOpts,
    pool: Option<WorkerPool>,
    next_request: u64,
    phase: RequestPhase,
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("opts", &self.opts)
            .field("resources", &self.resources.len())
            .field("pool", &self.pool)
            .field("phase", &self.phase)
            .finish()
    }
}

impl RenderContext {
    /// Validate `opts` and bring up a pool of `opts.workers` workers.
    pub fn new(
        factory: Arc<dyn RendererFactory>,
        resources: SharedResourceSet,
        opts: ContextOpts,
    ) -> RaypoolResult<Self> {
        opts.validate()?;
        let pool = WorkerPool::create(opts.workers, Arc::clone(&factory), &resources)?;
        Ok(Self {
            factory,
            resources,
            opts,
            pool: Some(pool),
            next_request: 0,
            phase: RequestPhase::Idle,
        })
    }

    /// Load resources once from `provider`, then behave like [`RenderContext::new`].
    pub fn with_provider(
        factory: Arc<dyn RendererFactory>,
        provider: &dyn SharedResourceProvider,
        opts: ContextOpts,
    ) -> RaypoolResult<Self> {
        let resources = provider.load()?;
        Self::new(factory, resources, opts)
    }

    /// Resize the pool by tearing it down and creating a new one.
    ///
    /// Also replaces a pool that lost workers, even when `n` is unchanged. If bring-up fails the
    /// context is left without a pool until the next successful call.
    pub fn set_workers(&mut self, n: usize) -> RaypoolResult<()> {
        let healthy = self
            .pool
            .as_ref()
            .is_some_and(|p| p.exited_workers().is_empty());
        if n == self.opts.workers && healthy {
            return Ok(());
        }
        if n == 0 {
            return Err(RaypoolError::validation("workers must be >= 1"));
        }
        let factory = Arc::clone(&self.factory);
        let pool = match self.pool.take() {
            Some(old) => old.recreate(n, factory, &self.resources)?,
            None => WorkerPool::create(n, factory, &self.resources)?,
        };
        self.pool = Some(pool);
        self.opts.workers = n;
        Ok(())
    }

    /// Change the scanline strip height used by later requests.
    pub fn set_strip_height(&mut self, strip_height: u32) -> RaypoolResult<()> {
        if strip_height == 0 {
            return Err(RaypoolError::validation("strip_height must be >= 1"));
        }
        self.opts.strip_height = strip_height;
        Ok(())
    }

    /// Current options.
    pub fn opts(&self) -> &ContextOpts {
        &self.opts
    }

    /// Shared resources every worker received.
    pub fn resources(&self) -> &SharedResourceSet {
        &self.resources
    }

    /// Final phase of the most recent request that got past admission.
    pub fn phase(&self) -> RequestPhase {
        self.phase
    }

    /// The worker pool, if the context is open.
    pub fn pool(&self) -> Option<&WorkerPool> {
        self.pool.as_ref()
    }

    /// Block until units left over from earlier (failed) requests have returned, and discard
    /// them. Returns how many were discarded.
    pub fn settle(&mut self) -> RaypoolResult<usize> {
        let Some(pool) = self.pool.as_mut() else {
            return Ok(0);
        };
        let mut discarded = pool.try_reap().len();
        while pool.busy_count() > 0 {
            let resp = pool.recv()?;
            tracing::debug!(worker = %resp.worker, request = %resp.request, "discard stale unit");
            discarded += 1;
        }
        Ok(discarded)
    }

    /// Tear the pool down. Later requests fail until [`RenderContext::set_workers`] is called.
    pub fn shutdown(&mut self) {
        if let Some(mut pool) = self.pool.take() {
            pool.terminate();
        }
    }

    /// Admit a new request: reap stale responses, refuse if any worker is still busy.
    pub(crate) fn begin_request(&mut self) -> RaypoolResult<RequestScope<'_>> {
        let pool = self.pool.as_mut().ok_or_else(|| {
            RaypoolError::validation("context has been shut down; call set_workers")
        })?;

        for stale in pool.try_reap() {
            tracing::debug!(worker = %stale.worker, request = %stale.request, "discard stale unit");
        }
        if let Some(worker) = pool.exited_workers().first() {
            return Err(RaypoolError::worker(
                *worker,
                "worker thread exited; recreate the pool with set_workers",
            ));
        }
        let busy = pool.busy_requests();
        if !busy.is_empty() {
            return Err(RaypoolError::busy(format!(
                "{} worker(s) still running units of {busy:?}",
                pool.busy_count()
            )));
        }

        self.next_request += 1;
        let id = RequestId(self.next_request);
        Ok(RequestScope {
            id,
            tracker: PhaseTracker::new(id),
            pool,
            opts: &self.opts,
            factory: &self.factory,
            resources: &self.resources,
            last_phase: &mut self.phase,
        })
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Borrowed view of a [`RenderContext`] for the duration of one request.
///
/// The request's final phase is written back to the context when the scope ends.
pub(crate) struct RequestScope<'a> {
    pub(crate) id: RequestId,
    pub(crate) tracker: PhaseTracker,
    pub(crate) pool: &'a mut WorkerPool,
    pub(crate) opts: &'a ContextOpts,
    pub(crate) factory: &'a Arc<dyn RendererFactory>,
    pub(crate) resources: &'a SharedResourceSet,
    last_phase: &'a mut RequestPhase,
}

impl Drop for RequestScope<'_> {
    fn drop(&mut self) {
        *self.last_phase = self.tracker.phase();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/context.rs"]
mod tests;
