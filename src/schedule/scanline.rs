use std::sync::Arc;

use crate::foundation::core::{Region, RequestId};
use crate::foundation::error::{RaypoolError, RaypoolResult};
use crate::pool::lifecycle::WorkerPool;
use crate::pool::worker::UnitOrder;
use crate::render::renderer::RendererParams;
use crate::schedule::partition::{PartialResult, WorkUnit, partition_scanlines};
use crate::schedule::queue::WorkQueue;
use crate::session::phase::{PhaseTracker, RequestPhase};

/// A finished strip and its RGBA8 bytes.
pub(crate) type FinishedStrip = (Region, Arc<Vec<u8>>);

/// Dynamic, pull-based scanline schedule.
///
/// Every idle worker gets one strip up front; afterwards the worker whose response arrives is
/// handed the next queued strip, until the queue is empty. `on_strip` sees every strip as soon as
/// it lands, in completion order. Strips are returned for compositing once all have arrived.
pub(crate) fn run_scanlines<F>(
    pool: &mut WorkerPool,
    request: RequestId,
    params: &RendererParams,
    seed: u64,
    strip_height: u32,
    tracker: &mut PhaseTracker,
    mut on_strip: F,
) -> RaypoolResult<Vec<FinishedStrip>>
where
    F: FnMut(Region, &Arc<Vec<u8>>),
{
    tracker.advance(RequestPhase::Dispatching)?;
    let strips = partition_scanlines(params.width, params.height, strip_height)?;
    let total = strips.len();
    let mut queue = WorkQueue::new(strips.into_iter().map(WorkUnit::Region));

    let order = |unit| UnitOrder {
        request,
        unit,
        params: params.clone(),
        seed,
    };

    let idle = pool.idle_workers();
    let first = queue.take(idle.len().min(queue.len()))?;
    for (worker, unit) in idle.into_iter().zip(first) {
        pool.dispatch(worker, order(unit))?;
    }
    tracker.advance(RequestPhase::InFlight)?;
    tracing::debug!(
        %request,
        strips = total,
        in_flight = pool.busy_count(),
        "scanlines dispatched"
    );

    let mut done = Vec::with_capacity(total);
    while done.len() < total {
        let resp = pool.recv()?;
        if resp.request != request {
            tracing::debug!(worker = %resp.worker, stale = %resp.request, "discard stale unit");
            continue;
        }
        let WorkUnit::Region(region) = resp.unit else {
            return Err(RaypoolError::dispatch("scanline schedule received a sample unit"));
        };
        let pixels = match resp.result {
            Ok(PartialResult::Rgba8(px)) if px.len() == region.byte_len() => Arc::new(px),
            Ok(PartialResult::Rgba8(px)) => {
                return Err(RaypoolError::aggregation_mismatch(format!(
                    "strip {region:?} came back with {} bytes, expected {}",
                    px.len(),
                    region.byte_len()
                )));
            }
            Ok(PartialResult::Accumulated(_)) => {
                return Err(RaypoolError::aggregation_mismatch(format!(
                    "worker {} returned an accumulation buffer for strip {region:?}",
                    resp.worker
                )));
            }
            Err(e) => {
                tracing::warn!(worker = %resp.worker, %request, error = %e, "strip failed");
                return Err(e);
            }
        };
        on_strip(region, &pixels);
        done.push((region, pixels));

        if let Some(next) = queue.pop_next() {
            pool.dispatch(resp.worker, order(next))?;
        }
    }
    Ok(done)
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/scanline.rs"]
mod tests;
