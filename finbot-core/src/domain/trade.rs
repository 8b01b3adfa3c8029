//! Candidates and committed trades.

use super::{Point, Side};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A decision waiting out its dwell interval before it is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub side: Side,
    pub symbol: String,
    pub started_at: DateTime<Utc>,
}

impl Candidate {
    pub fn new(side: Side, symbol: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            side,
            symbol: symbol.into(),
            started_at,
        }
    }

    /// Time spent pending as of `now`.
    pub fn elapsed(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.started_at
    }
}

/// Lifecycle status stamped on a persisted trade. Only `pending` is ever
/// written here; later transitions belong to the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    #[default]
    Pending,
}

impl TradeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TradeStatus::Pending => "pending",
        }
    }
}

/// A simulated trade, in the record shape the dashboard reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommittedTrade {
    pub decision: Side,
    pub stock: String,
    pub price: Option<f64>,
    pub position_x: u32,
    pub position_y: u32,
    pub canvas_width: u32,
    pub timestamp: DateTime<Utc>,
    pub status: TradeStatus,
}

impl CommittedTrade {
    /// Seal a candidate into a trade. Side and symbol are moved over as-is.
    pub fn from_candidate(
        candidate: Candidate,
        price: Option<f64>,
        position: Point,
        canvas_width: u32,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            decision: candidate.side,
            stock: candidate.symbol,
            price,
            position_x: position.x,
            position_y: position.y,
            canvas_width,
            timestamp,
            status: TradeStatus::Pending,
        }
    }
}
