//! Trade sinks: where committed trades end up.

pub mod firestore;
pub mod jsonl;

pub use firestore::FirestoreSink;
pub use jsonl::JsonlSink;

use finbot_core::data::{MemorySink, SinkError, TradeSink};

use crate::config::SinkConfig;

/// Build the sink named by the config.
pub fn build_sink(config: &SinkConfig) -> Result<Box<dyn TradeSink>, SinkError> {
    Ok(match config {
        SinkConfig::Jsonl { path } => Box::new(JsonlSink::new(path.clone())),
        SinkConfig::Firestore(fs) => Box::new(FirestoreSink::new(fs.clone())?),
        SinkConfig::Memory => Box::new(MemorySink::default()),
    })
}
