//! Domain types for finbot

pub mod decision;
pub mod frame;
pub mod mask;
pub mod trade;

pub use decision::{Classification, Side};
pub use frame::{Frame, Point};
pub use mask::ForegroundMask;
pub use trade::{Candidate, CommittedTrade, TradeStatus};

/// Symbol type alias
pub type Symbol = String;
