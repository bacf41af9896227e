use std::sync::{Arc, mpsc};
use std::time::Duration;

use crate::foundation::core::{RequestId, WorkerId};
use crate::foundation::error::{RaypoolError, RaypoolResult};
use crate::pool::worker::{UnitOrder, UnitResponse, WorkerHandle, WorkerState};
use crate::render::renderer::RendererFactory;
use crate::render::resources::SharedResourceSet;

const LIVENESS_POLL: Duration = Duration::from_millis(50);

/// Fixed-size set of worker threads, each owning one renderer and a copy of the shared resources.
///
/// The pool never resizes in place; use [`WorkerPool::recreate`] to change its size. Dropping the
/// pool terminates every worker.
pub struct WorkerPool {
    workers: Vec<WorkerHandle>,
    responses: mpsc::Receiver<UnitResponse>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers.len())
            .field("busy", &self.busy_count())
            .finish()
    }
}

impl WorkerPool {
    /// Spawn `n` workers and wait until every one of them reports ready.
    ///
    /// If any worker fails to come up, all workers are torn down and
    /// [`RaypoolError::Initialization`] is returned; no partial pool is ever exposed.
    #[tracing::instrument(skip(factory, resources), fields(resources = resources.len()))]
    pub fn create(
        n: usize,
        factory: Arc<dyn RendererFactory>,
        resources: &SharedResourceSet,
    ) -> RaypoolResult<Self> {
        if n == 0 {
            return Err(RaypoolError::validation("worker pool size must be >= 1"));
        }

        let (resp_tx, responses) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let mut pool = Self {
            workers: Vec::with_capacity(n),
            responses,
        };
        for i in 0..n {
            let handle = WorkerHandle::spawn(
                WorkerId(i),
                Arc::clone(&factory),
                resources.clone(),
                resp_tx.clone(),
                ready_tx.clone(),
            )?;
            pool.workers.push(handle);
        }
        drop(resp_tx);
        drop(ready_tx);

        for _ in 0..n {
            let failure = match ready_rx.recv() {
                Ok((_, Ok(()))) => continue,
                Ok((worker, Err(e))) => as_initialization(worker, e),
                Err(_) => {
                    let worker = pool
                        .workers
                        .iter()
                        .find(|w| !w.is_alive())
                        .map_or(WorkerId(0), |w| w.id);
                    RaypoolError::initialization(worker, "worker exited before reporting ready")
                }
            };
            tracing::warn!(error = %failure, "worker pool bring-up failed");
            return Err(failure);
        }

        tracing::info!(workers = n, "worker pool ready");
        Ok(pool)
    }

    /// Terminate this pool completely, then create a new one of size `n`.
    pub fn recreate(
        mut self,
        n: usize,
        factory: Arc<dyn RendererFactory>,
        resources: &SharedResourceSet,
    ) -> RaypoolResult<Self> {
        self.terminate();
        drop(self);
        Self::create(n, factory, resources)
    }

    /// Stop every worker and wait for its thread to exit. Units in flight run to completion first.
    pub fn terminate(&mut self) {
        if self.workers.iter().all(|w| w.state == WorkerState::Exited) {
            return;
        }
        for w in &self.workers {
            w.request_shutdown();
        }
        for w in &mut self.workers {
            w.join();
        }
        tracing::info!(workers = self.workers.len(), "worker pool terminated");
    }

    /// Number of workers.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Return `true` when the pool has no workers (only after a failed bring-up).
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Ids of every worker, in slot order.
    pub fn worker_ids(&self) -> Vec<WorkerId> {
        self.workers.iter().map(|w| w.id).collect()
    }

    /// State of one worker.
    pub fn state(&self, worker: WorkerId) -> Option<WorkerState> {
        self.workers.get(worker.0).map(|w| w.state)
    }

    /// Workers ready for a unit, in slot order.
    pub fn idle_workers(&self) -> Vec<WorkerId> {
        self.workers
            .iter()
            .filter(|w| w.state == WorkerState::Idle)
            .map(|w| w.id)
            .collect()
    }

    /// Workers currently processing a unit.
    pub fn busy_count(&self) -> usize {
        self.workers
            .iter()
            .filter(|w| matches!(w.state, WorkerState::Busy(_)))
            .count()
    }

    /// Workers whose thread is gone; a pool with any of these needs recreating.
    pub fn exited_workers(&self) -> Vec<WorkerId> {
        self.workers
            .iter()
            .filter(|w| w.state == WorkerState::Exited)
            .map(|w| w.id)
            .collect()
    }

    /// Send one unit to an idle worker.
    ///
    /// Dispatching to an unknown or busy worker is a [`RaypoolError::Dispatch`]; a worker whose
    /// thread is gone yields [`RaypoolError::Worker`].
    pub fn dispatch(&mut self, worker: WorkerId, order: UnitOrder) -> RaypoolResult<()> {
        let handle = self
            .workers
            .get_mut(worker.0)
            .ok_or_else(|| RaypoolError::dispatch(format!("unknown worker {worker}")))?;
        match handle.state {
            WorkerState::Idle => {}
            WorkerState::Busy(req) => {
                return Err(RaypoolError::dispatch(format!(
                    "worker {worker} already has a unit of {req} in flight"
                )));
            }
            WorkerState::Exited => {
                return Err(RaypoolError::worker(worker, "worker thread exited"));
            }
        }
        let request = order.request;
        tracing::debug!(%worker, %request, unit = ?order.unit, "dispatch unit");
        if let Err(e) = handle.send(order) {
            handle.state = WorkerState::Exited;
            return Err(e);
        }
        handle.state = WorkerState::Busy(request);
        Ok(())
    }

    /// Block until some busy worker answers.
    ///
    /// A busy worker whose thread has died is reported as [`RaypoolError::Worker`] instead of
    /// waiting forever.
    pub fn recv(&mut self) -> RaypoolResult<UnitResponse> {
        if self.busy_count() == 0 {
            return Err(RaypoolError::dispatch("no units in flight"));
        }
        loop {
            match self.responses.recv_timeout(LIVENESS_POLL) {
                Ok(resp) => {
                    self.mark_idle(resp.worker);
                    return Ok(resp);
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if let Some(dead) = self.mark_dead_workers().first() {
                        return Err(RaypoolError::worker(*dead, "worker thread exited"));
                    }
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    let dead = self.mark_dead_workers();
                    let worker = dead.first().copied().unwrap_or(WorkerId(0));
                    return Err(RaypoolError::worker(worker, "all worker threads exited"));
                }
            }
        }
    }

    /// Collect responses that already arrived without blocking.
    ///
    /// Returned responses are usually leftovers of an earlier, failed request.
    pub fn try_reap(&mut self) -> Vec<UnitResponse> {
        let mut reaped = Vec::new();
        while let Ok(resp) = self.responses.try_recv() {
            self.mark_idle(resp.worker);
            reaped.push(resp);
        }
        self.mark_dead_workers();
        reaped
    }

    /// Requests that still have units running, in id order.
    pub fn busy_requests(&self) -> Vec<RequestId> {
        let mut ids: Vec<RequestId> = self
            .workers
            .iter()
            .filter_map(|w| match w.state {
                WorkerState::Busy(req) => Some(req),
                WorkerState::Idle | WorkerState::Exited => None,
            })
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    fn mark_idle(&mut self, worker: WorkerId) {
        if let Some(w) = self.workers.get_mut(worker.0)
            && matches!(w.state, WorkerState::Busy(_))
        {
            w.state = WorkerState::Idle;
        }
    }

    fn mark_dead_workers(&mut self) -> Vec<WorkerId> {
        let mut dead = Vec::new();
        for w in &mut self.workers {
            if w.state != WorkerState::Exited && !w.is_alive() {
                tracing::warn!(worker = %w.id, "worker thread exited unexpectedly");
                w.join();
                dead.push(w.id);
            }
        }
        dead
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn as_initialization(worker: WorkerId, err: RaypoolError) -> RaypoolError {
    match err {
        e @ RaypoolError::Initialization { .. } => e,
        other => RaypoolError::initialization(worker, other.to_string()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pool/lifecycle.rs"]
mod tests;
