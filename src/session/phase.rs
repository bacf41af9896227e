use crate::foundation::core::RequestId;
use crate::foundation::error::{RaypoolError, RaypoolResult};

/// Lifecycle of one render request.
///
/// `Idle -> Dispatching -> InFlight -> {Aggregating | Copying} -> Complete`, with `Failed`
/// reachable from every non-terminal phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPhase {
    /// Nothing dispatched yet.
    #[default]
    Idle,
    /// Units are being handed to workers.
    Dispatching,
    /// Waiting for workers.
    InFlight,
    /// Combining sample partitions.
    Aggregating,
    /// Copying finished regions into the final buffer.
    Copying,
    /// Final image produced.
    Complete,
    /// A failure ended the request; no final image was produced.
    Failed,
}

impl RequestPhase {
    /// Return `true` for `Complete` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Return `true` when `self -> next` is an allowed edge.
    pub fn can_advance_to(self, next: Self) -> bool {
        use RequestPhase::*;
        match (self, next) {
            (Idle, Dispatching)
            | (Dispatching, InFlight)
            | (InFlight, Aggregating)
            | (InFlight, Copying)
            | (Aggregating, Complete)
            | (Copying, Complete) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Dispatching => "dispatching",
            Self::InFlight => "in_flight",
            Self::Aggregating => "aggregating",
            Self::Copying => "copying",
            Self::Complete => "complete",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Enforces the [`RequestPhase`] edges for one request.
#[derive(Clone, Debug)]
pub struct PhaseTracker {
    request: RequestId,
    phase: RequestPhase,
}

impl PhaseTracker {
    /// Tracker for `request`, starting in `Idle`.
    pub fn new(request: RequestId) -> Self {
        Self {
            request,
            phase: RequestPhase::Idle,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> RequestPhase {
        self.phase
    }

    /// Move to `next`; an edge outside the state machine is a [`RaypoolError::Dispatch`].
    pub fn advance(&mut self, next: RequestPhase) -> RaypoolResult<()> {
        if !self.phase.can_advance_to(next) {
            return Err(RaypoolError::dispatch(format!(
                "{}: invalid phase transition {} -> {next}",
                self.request, self.phase
            )));
        }
        tracing::debug!(request = %self.request, from = %self.phase, to = %next, "phase");
        self.phase = next;
        Ok(())
    }

    /// Mark the request failed. Terminal phases are left unchanged.
    pub fn fail(&mut self) {
        if !self.phase.is_terminal() {
            tracing::debug!(request = %self.request, from = %self.phase, "phase failed");
            self.phase = RequestPhase::Failed;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/phase.rs"]
mod tests;
