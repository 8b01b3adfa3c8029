//! The debounce state machine.

use super::state::{MachineEvent, MachineState};
use crate::classifier::classify;
use crate::data::provider::QuoteSource;
use crate::data::universe::SymbolUniverse;
use crate::domain::{Candidate, Classification, CommittedTrade, Point};
use crate::rng::SymbolPicker;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

/// Everything the machine needs to know about one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickInput {
    pub now: DateTime<Utc>,
    pub market_open: bool,
    pub classification: Classification,
    /// Centroid of the located object, recorded on the trade at commit.
    pub centroid: Option<Point>,
    pub frame_width: u32,
}

impl TickInput {
    /// Build the input for a tick, classifying the centroid against the midline.
    pub fn observe(
        now: DateTime<Utc>,
        market_open: bool,
        centroid: Option<Point>,
        frame_width: u32,
    ) -> Self {
        Self {
            now,
            market_open,
            classification: classify(centroid.map(|p| p.x), frame_width),
            centroid,
            frame_width,
        }
    }
}

/// Owns the pending candidate and decides, once per tick, what happens to it.
pub struct DebounceMachine {
    state: MachineState,
    dwell: Duration,
    universe: SymbolUniverse,
    picker: Box<dyn SymbolPicker>,
}

impl DebounceMachine {
    /// Default dwell interval.
    pub fn default_dwell() -> Duration {
        Duration::seconds(5)
    }

    pub fn new(dwell: Duration, universe: SymbolUniverse, picker: Box<dyn SymbolPicker>) -> Self {
        Self {
            state: MachineState::Idle,
            dwell: dwell.max(Duration::zero()),
            universe,
            picker,
        }
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn dwell(&self) -> Duration {
        self.dwell
    }

    pub fn universe(&self) -> &SymbolUniverse {
        &self.universe
    }

    /// Run one transition. The returned event carries the trade, if one was
    /// committed on this tick.
    pub fn step(&mut self, input: &TickInput, quotes: &dyn QuoteSource) -> MachineEvent {
        let state = std::mem::take(&mut self.state);
        let (next, event) = self.transition(state, input, quotes);
        self.state = next;
        event
    }

    fn transition(
        &mut self,
        state: MachineState,
        input: &TickInput,
        quotes: &dyn QuoteSource,
    ) -> (MachineState, MachineEvent) {
        if !input.market_open {
            return match state {
                MachineState::Pending(discarded) => {
                    info!(
                        side = %discarded.side,
                        symbol = %discarded.symbol,
                        "market closed, candidate discarded"
                    );
                    (MachineState::Idle, MachineEvent::MarketReset { discarded })
                }
                MachineState::Idle => (MachineState::Idle, MachineEvent::MarketClosed),
            };
        }

        match (state, input.classification.side()) {
            (MachineState::Idle, None) => (MachineState::Idle, MachineEvent::Idle),

            (MachineState::Idle, Some(side)) => {
                let symbol = self.universe.pick(self.picker.as_mut()).to_string();
                let candidate = Candidate::new(side, symbol, input.now);
                info!(side = %candidate.side, symbol = %candidate.symbol, "candidate started");
                (
                    MachineState::Pending(candidate.clone()),
                    MachineEvent::Started(candidate),
                )
            }

            (MachineState::Pending(discarded), None) => {
                info!(symbol = %discarded.symbol, "object lost, candidate cancelled");
                (MachineState::Idle, MachineEvent::Cancelled { discarded })
            }

            // Crossing the midline keeps the candidate; only HOLD interrupts it.
            (MachineState::Pending(candidate), Some(side)) => {
                if side != candidate.side {
                    debug!(symbol = %candidate.symbol, from = %candidate.side, to = %side, "midline crossed while pending");
                }
                let elapsed = candidate.elapsed(input.now);
                if elapsed < self.dwell {
                    debug!(elapsed_ms = elapsed.num_milliseconds(), "candidate waiting");
                    return (
                        MachineState::Pending(candidate),
                        MachineEvent::Waiting { elapsed },
                    );
                }
                let trade = self.commit(candidate, input, quotes);
                (MachineState::Idle, MachineEvent::Committed(trade))
            }
        }
    }

    fn commit(
        &self,
        candidate: Candidate,
        input: &TickInput,
        quotes: &dyn QuoteSource,
    ) -> CommittedTrade {
        let price = match quotes.last_price(&candidate.symbol) {
            Ok(price) => Some(price),
            Err(e) => {
                warn!(symbol = %candidate.symbol, source = quotes.name(), error = %e, "quote lookup failed, committing without price");
                None
            }
        };

        let trade = CommittedTrade::from_candidate(
            candidate,
            price,
            input.centroid.unwrap_or_default(),
            input.frame_width,
            input.now,
        );
        info!(
            decision = %trade.decision,
            symbol = %trade.stock,
            price = ?trade.price,
            "trade committed"
        );
        trade
    }
}
