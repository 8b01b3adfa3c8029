//! Trade sink trait.
//!
//! A sink is an append-only log of committed trades. Delivery is
//! at-most-once: the tracking loop logs a failed append and moves on.

use crate::domain::CommittedTrade;
use thiserror::Error;

/// Acknowledgement of a successful append.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkAck {
    /// Identifier assigned by the store, when it hands one back.
    pub document_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode trade: {0}")]
    Encode(String),

    #[error("document store rejected the write (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("document store unreachable: {0}")]
    Unreachable(String),

    #[error("sink misconfigured: {0}")]
    Config(String),
}

pub trait TradeSink: Send {
    /// Human-readable description of the destination.
    fn describe(&self) -> String;

    /// Append one trade.
    fn append(&mut self, trade: &CommittedTrade) -> Result<SinkAck, SinkError>;
}

/// Keeps every appended trade in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    trades: Vec<CommittedTrade>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trades(&self) -> &[CommittedTrade] {
        &self.trades
    }

    pub fn into_trades(self) -> Vec<CommittedTrade> {
        self.trades
    }
}

impl TradeSink for MemorySink {
    fn describe(&self) -> String {
        "memory".into()
    }

    fn append(&mut self, trade: &CommittedTrade) -> Result<SinkAck, SinkError> {
        self.trades.push(trade.clone());
        Ok(SinkAck {
            document_id: Some(self.trades.len().to_string()),
        })
    }
}
