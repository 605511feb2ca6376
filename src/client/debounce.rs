use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// A submission is scheduled for `deadline`; further triggers push it back.
    Pending { deadline: Instant },
    /// A request is outstanding; triggers are ignored until it completes.
    InFlight,
}

/// Coalesces submit triggers into at most one outstanding request.
#[derive(Debug, Clone)]
pub struct Debounce {
    window: Duration,
    phase: Phase,
}

impl Debounce {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.phase {
            Phase::Pending { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// Arms or re-arms the deadline. Returns `false` when a request is in flight.
    pub fn trigger(&mut self, now: Instant) -> bool {
        match self.phase {
            Phase::InFlight => false,
            Phase::Idle | Phase::Pending { .. } => {
                self.phase = Phase::Pending {
                    deadline: now + self.window,
                };
                true
            }
        }
    }

    /// Moves to `InFlight` once the deadline has passed. Returns whether it did.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.phase {
            Phase::Pending { deadline } if now >= deadline => {
                self.phase = Phase::InFlight;
                true
            }
            _ => false,
        }
    }

    /// Drops a pending submission without sending it.
    pub fn cancel(&mut self) {
        if let Phase::Pending { .. } = self.phase {
            self.phase = Phase::Idle;
        }
    }

    pub fn complete(&mut self) {
        if self.phase == Phase::InFlight {
            self.phase = Phase::Idle;
        }
    }
}
