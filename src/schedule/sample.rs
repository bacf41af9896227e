use crate::foundation::core::RequestId;
use crate::foundation::error::{RaypoolError, RaypoolResult};
use crate::foundation::math::worker_seed;
use crate::pool::lifecycle::WorkerPool;
use crate::pool::worker::UnitOrder;
use crate::render::renderer::RendererParams;
use crate::schedule::partition::{PartialResult, WorkUnit, partition_samples, sample_units};
use crate::session::phase::{PhaseTracker, RequestPhase};

/// Static sample-partition schedule: every worker with a non-zero share renders the whole frame
/// once, all units are dispatched up front, and the coordinator waits for every one of them.
///
/// Returns the unnormalized accumulation buffers in completion order. The first worker failure
/// ends the request; units still running are left for the next admission to reap.
pub(crate) fn run_sample_partition(
    pool: &mut WorkerPool,
    request: RequestId,
    params: &RendererParams,
    base_seed: u64,
    tracker: &mut PhaseTracker,
) -> RaypoolResult<Vec<Vec<f32>>> {
    tracker.advance(RequestPhase::Dispatching)?;
    let counts = partition_samples(params.samples_per_pixel, pool.len())?;
    let assigned = sample_units(&counts);

    for &(worker, unit) in &assigned {
        let WorkUnit::SamplePartition { sample_count } = unit else {
            return Err(RaypoolError::dispatch("sample schedule produced a region unit"));
        };
        pool.dispatch(
            worker,
            UnitOrder {
                request,
                unit,
                params: params.with_samples(sample_count),
                seed: worker_seed(base_seed, worker.0),
            },
        )?;
    }
    tracker.advance(RequestPhase::InFlight)?;
    tracing::debug!(%request, units = assigned.len(), ?counts, "sample partitions dispatched");

    let mut partials = Vec::with_capacity(assigned.len());
    while partials.len() < assigned.len() {
        let resp = pool.recv()?;
        if resp.request != request {
            tracing::debug!(worker = %resp.worker, stale = %resp.request, "discard stale unit");
            continue;
        }
        match resp.result {
            Ok(PartialResult::Accumulated(buf)) => partials.push(buf),
            Ok(PartialResult::Rgba8(_)) => {
                return Err(RaypoolError::aggregation_mismatch(format!(
                    "worker {} returned region bytes for a sample partition",
                    resp.worker
                )));
            }
            Err(e) => {
                tracing::warn!(worker = %resp.worker, %request, error = %e, "sample unit failed");
                return Err(e);
            }
        }
    }
    Ok(partials)
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/sample.rs"]
mod tests;
