//! FinBot core: vision pipeline, decision classifier, market gate, debounce engine.
//!
//! This crate holds everything that decides *whether* a trade happens:
//! - Domain types (frames, masks, candidates, committed trades)
//! - Foreground detection (adaptive background model, HSV color range)
//! - Morphological cleanup and largest-object location
//! - Left/right classification against the frame midline
//! - Exchange-hours gate in the exchange's own timezone
//! - The debounce state machine that turns a stable decision into a trade
//! - Collaborator traits for frames, quotes, and trade sinks

pub mod classifier;
pub mod data;
pub mod domain;
pub mod engine;
pub mod market_hours;
pub mod rng;
pub mod vision;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything the tick loop moves across threads is Send,
    /// and the plain values it reports are also Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Frame>();
        require_sync::<domain::Frame>();
        require_send::<domain::ForegroundMask>();
        require_sync::<domain::ForegroundMask>();
        require_send::<domain::Candidate>();
        require_sync::<domain::Candidate>();
        require_send::<domain::CommittedTrade>();
        require_sync::<domain::CommittedTrade>();

        // Engine
        require_send::<engine::DebounceMachine>();
        require_send::<engine::MachineEvent>();
        require_sync::<engine::MachineEvent>();

        // Vision
        require_send::<vision::MotionDetector>();
        require_send::<vision::ColorDetector>();
        require_send::<vision::ObjectLocator>();
        require_sync::<vision::ObjectLocator>();

        // Collaborators
        require_send::<data::YahooQuoteSource>();
        require_send::<data::ImageDirSource>();
        require_send::<data::MemorySink>();
        require_send::<data::CircuitBreaker>();
        require_sync::<data::CircuitBreaker>();
        require_send::<market_hours::MarketSchedule>();
        require_sync::<market_hours::MarketSchedule>();
    }
}
