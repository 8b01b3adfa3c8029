//! FinBot runner: configuration, trade sinks, and the tracking loop.
//!
//! This crate builds on `finbot-core` to provide:
//! - TOML configuration with defaults for every section
//! - JSONL and Firestore trade sinks
//! - The `Tracker` tick loop and its run summary

pub mod config;
pub mod sink;
pub mod tracker;

pub use config::{ConfigError, TrackerConfig};
pub use sink::{build_sink, FirestoreSink, JsonlSink};
pub use tracker::{RunOptions, RunOutcome, RunSummary, StopReason, TickError, TickReport, Tracker};
