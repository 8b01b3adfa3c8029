//! Machine state and the events a step reports.

use crate::domain::{Candidate, CommittedTrade};

/// Memory carried from one tick to the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MachineState {
    #[default]
    Idle,
    Pending(Candidate),
}

impl MachineState {
    pub fn is_idle(&self) -> bool {
        matches!(self, MachineState::Idle)
    }

    pub fn candidate(&self) -> Option<&Candidate> {
        match self {
            MachineState::Idle => None,
            MachineState::Pending(c) => Some(c),
        }
    }
}

/// Which transition fired on a step.
#[derive(Debug, Clone, PartialEq)]
pub enum MachineEvent {
    /// Idle with nothing to do.
    Idle,
    /// Market closed while idle.
    MarketClosed,
    /// Market closed while pending; the candidate is gone, nothing emitted.
    MarketReset { discarded: Candidate },
    /// A new candidate started its dwell.
    Started(Candidate),
    /// A HOLD reading dropped the pending candidate: the object left the
    /// frame or shrank below the area floor.
    Cancelled { discarded: Candidate },
    /// Still pending; `elapsed` since the candidate started.
    Waiting { elapsed: chrono::Duration },
    /// The candidate survived its dwell and became a trade.
    Committed(CommittedTrade),
}

impl MachineEvent {
    /// The trade emitted by this step, if any. At most one per step.
    pub fn trade(&self) -> Option<&CommittedTrade> {
        match self {
            MachineEvent::Committed(trade) => Some(trade),
            _ => None,
        }
    }

    pub fn into_trade(self) -> Option<CommittedTrade> {
        match self {
            MachineEvent::Committed(trade) => Some(trade),
            _ => None,
        }
    }
}
