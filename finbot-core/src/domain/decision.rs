//! Trade sides and per-tick classifications.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of a simulated trade. Serialized as `"BUY"` / `"SELL"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Instantaneous zone reading for a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Buy,
    Sell,
    Hold,
}

impl Classification {
    /// The trade side this reading asks for, `None` for HOLD.
    pub fn side(self) -> Option<Side> {
        match self {
            Classification::Buy => Some(Side::Buy),
            Classification::Sell => Some(Side::Sell),
            Classification::Hold => None,
        }
    }

    pub fn is_hold(self) -> bool {
        self == Classification::Hold
    }
}

impl From<Side> for Classification {
    fn from(side: Side) -> Self {
        match side {
            Side::Buy => Classification::Buy,
            Side::Sell => Classification::Sell,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Buy => write!(f, "BUY"),
            Classification::Sell => write!(f, "SELL"),
            Classification::Hold => write!(f, "HOLD"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&Side::Buy).unwrap(), "\"BUY\"");
        assert_eq!(serde_json::to_string(&Side::Sell).unwrap(), "\"SELL\"");
    }

    #[test]
    fn hold_has_no_side() {
        assert_eq!(Classification::Hold.side(), None);
        assert_eq!(Classification::Buy.side(), Some(Side::Buy));
        assert_eq!(Classification::from(Side::Sell), Classification::Sell);
    }
}
