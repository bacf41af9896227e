use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, mpsc};
use std::thread::JoinHandle;

use crate::foundation::core::{RequestId, WorkerId};
use crate::foundation::error::{RaypoolError, RaypoolResult};
use crate::render::renderer::{RendererFactory, RendererParams, RendererSlot};
use crate::render::resources::SharedResourceSet;
use crate::schedule::partition::{PartialResult, WorkUnit};

/// One unit of work addressed to a specific worker.
#[derive(Clone, Debug)]
pub struct UnitOrder {
    /// Request the unit belongs to.
    pub request: RequestId,
    /// What to render.
    pub unit: WorkUnit,
    /// Renderer parameters for this unit (sample budget already adjusted for sample partitions).
    pub params: RendererParams,
    /// Noise seed for this unit.
    pub seed: u64,
}

/// Result of one [`UnitOrder`], sent back to the coordinator.
#[derive(Debug)]
pub struct UnitResponse {
    /// Worker that processed the unit.
    pub worker: WorkerId,
    /// Request the unit belonged to.
    pub request: RequestId,
    /// The unit that was processed.
    pub unit: WorkUnit,
    /// Partial output, or the worker failure.
    pub result: RaypoolResult<PartialResult>,
}

/// Coordinator-side view of a worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    /// Ready for a unit.
    Idle,
    /// Processing one unit of the given request.
    Busy(RequestId),
    /// The worker thread is gone; the pool must be recreated.
    Exited,
}

pub(crate) enum WorkerCommand {
    Render(UnitOrder),
    Shutdown,
}

pub(crate) type ReadyReport = (WorkerId, RaypoolResult<()>);

/// Coordinator-owned handle to one worker thread.
pub(crate) struct WorkerHandle {
    pub(crate) id: WorkerId,
    pub(crate) state: WorkerState,
    tx: mpsc::Sender<WorkerCommand>,
    join: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub(crate) fn spawn(
        id: WorkerId,
        factory: Arc<dyn RendererFactory>,
        resources: SharedResourceSet,
        responses: mpsc::Sender<UnitResponse>,
        ready: mpsc::Sender<ReadyReport>,
    ) -> RaypoolResult<Self> {
        let (tx, rx) = mpsc::channel::<WorkerCommand>();
        let join = std::thread::Builder::new()
            .name(format!("raypool-worker-{}", id.0))
            .spawn(move || run_worker(id, factory, resources, rx, responses, ready))
            .map_err(|e| RaypoolError::initialization(id, format!("spawn worker thread: {e}")))?;
        Ok(Self {
            id,
            state: WorkerState::Idle,
            tx,
            join: Some(join),
        })
    }

    pub(crate) fn send(&self, order: UnitOrder) -> RaypoolResult<()> {
        self.tx
            .send(WorkerCommand::Render(order))
            .map_err(|_| RaypoolError::worker(self.id, "worker thread is not running"))
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }

    /// Ask the thread to stop after its current unit.
    pub(crate) fn request_shutdown(&self) {
        let _ = self.tx.send(WorkerCommand::Shutdown);
    }

    pub(crate) fn join(&mut self) {
        if let Some(join) = self.join.take()
            && join.join().is_err()
        {
            tracing::warn!(worker = %self.id, "worker thread panicked during shutdown");
        }
        self.state = WorkerState::Exited;
    }
}

fn run_worker(
    id: WorkerId,
    factory: Arc<dyn RendererFactory>,
    resources: SharedResourceSet,
    commands: mpsc::Receiver<WorkerCommand>,
    responses: mpsc::Sender<UnitResponse>,
    ready: mpsc::Sender<ReadyReport>,
) {
    let prepared = catch_unwind(AssertUnwindSafe(|| factory.prepare_worker(id, &resources)))
        .unwrap_or_else(|p| {
            Err(RaypoolError::initialization(
                id,
                format!("prepare panicked: {}", panic_message(p.as_ref())),
            ))
        });
    let ok = prepared.is_ok();
    let _ = ready.send((id, prepared));
    drop(ready);
    if !ok {
        return;
    }

    let mut slot = RendererSlot::new();
    while let Ok(cmd) = commands.recv() {
        let order = match cmd {
            WorkerCommand::Render(order) => order,
            WorkerCommand::Shutdown => break,
        };
        let result = execute(id, &mut slot, &*factory, &resources, &order);
        if result.is_err() {
            slot.reset();
        }
        let response = UnitResponse {
            worker: id,
            request: order.request,
            unit: order.unit,
            result,
        };
        if responses.send(response).is_err() {
            break;
        }
    }
}

fn execute(
    id: WorkerId,
    slot: &mut RendererSlot,
    factory: &dyn RendererFactory,
    resources: &SharedResourceSet,
    order: &UnitOrder,
) -> RaypoolResult<PartialResult> {
    let run = || -> RaypoolResult<PartialResult> {
        let renderer = slot.get_or_create(factory, &order.params, resources)?;
        match order.unit {
            WorkUnit::SamplePartition { .. } => {
                renderer.accumulate(order.seed).map(PartialResult::Accumulated)
            }
            WorkUnit::Region(region) => renderer
                .render_region(region, order.seed)
                .map(PartialResult::Rgba8),
        }
    };
    match catch_unwind(AssertUnwindSafe(run)) {
        Ok(Ok(partial)) => Ok(partial),
        Ok(Err(e @ RaypoolError::Worker { .. })) => Err(e),
        Ok(Err(e)) => Err(RaypoolError::worker(id, e.to_string())),
        Err(p) => Err(RaypoolError::worker(
            id,
            format!("renderer panicked: {}", panic_message(p.as_ref())),
        )),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pool/worker.rs"]
mod tests;
