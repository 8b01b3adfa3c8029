//! Debounce/commit engine: turns per-tick classifications into trades.
//!
//! Each tick runs exactly one transition, checked in this order:
//!
//! 1. Market closed: drop any candidate, go idle
//! 2. Idle with BUY/SELL: start a candidate on a freshly picked symbol
//! 3. Pending with HOLD: drop the candidate
//! 4. Pending past the dwell interval with either side: price it, emit the
//!    trade on the side the candidate started with, go idle
//! 5. Otherwise: keep waiting

pub mod machine;
pub mod state;

pub use machine::{DebounceMachine, TickInput};
pub use state::{MachineEvent, MachineState};
