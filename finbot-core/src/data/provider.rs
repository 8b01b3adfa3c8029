//! Quote source trait and structured error types.
//!
//! The `QuoteSource` trait abstracts over price feeds (Yahoo Finance, fixed
//! tables) so the engine can be tested without a network.

use std::collections::HashMap;
use thiserror::Error;

/// Why a last-price lookup failed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QuoteError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no trades yet today for {symbol}")]
    NoPrice { symbol: String },

    #[error("hard stop: quote provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("quote source disabled")]
    Disabled,

    #[error("quote error: {0}")]
    Other(String),
}

/// Last-traded price lookup.
pub trait QuoteSource: Send {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Most recent traded price for `symbol`.
    fn last_price(&self, symbol: &str) -> Result<f64, QuoteError>;
}

/// Fixed price table. Unknown symbols report `SymbolNotFound`.
#[derive(Debug, Clone, Default)]
pub struct StaticQuotes {
    prices: HashMap<String, f64>,
}

impl StaticQuotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, symbol: &str, price: f64) -> Self {
        self.prices.insert(symbol.to_string(), price);
        self
    }
}

impl QuoteSource for StaticQuotes {
    fn name(&self) -> &str {
        "static"
    }

    fn last_price(&self, symbol: &str) -> Result<f64, QuoteError> {
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| QuoteError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
    }
}

/// Quote source for runs without market data; every lookup fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoQuotes;

impl QuoteSource for NoQuotes {
    fn name(&self) -> &str {
        "none"
    }

    fn last_price(&self, _symbol: &str) -> Result<f64, QuoteError> {
        Err(QuoteError::Disabled)
    }
}
