use std::collections::VecDeque;

use crate::foundation::error::{RaypoolError, RaypoolResult};
use crate::schedule::partition::WorkUnit;

/// FIFO of pending work units, owned by the coordinator.
#[derive(Clone, Debug, Default)]
pub struct WorkQueue {
    pending: VecDeque<WorkUnit>,
}

impl WorkQueue {
    /// Queue holding `units` in order.
    pub fn new(units: impl IntoIterator<Item = WorkUnit>) -> Self {
        Self {
            pending: units.into_iter().collect(),
        }
    }

    /// Next unit for an idle worker, if any remain.
    pub fn pop_next(&mut self) -> Option<WorkUnit> {
        self.pending.pop_front()
    }

    /// Take exactly `n` units from the front.
    ///
    /// Asking for more units than the queue holds is a scheduling bug and returns
    /// [`RaypoolError::Dispatch`] without consuming anything.
    pub fn take(&mut self, n: usize) -> RaypoolResult<Vec<WorkUnit>> {
        if n > self.pending.len() {
            return Err(RaypoolError::dispatch(format!(
                "requested {n} work units but only {} are queued",
                self.pending.len()
            )));
        }
        Ok(self.pending.drain(..n).collect())
    }

    /// Units still waiting.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Return `true` when no units remain.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/queue.rs"]
mod tests;
