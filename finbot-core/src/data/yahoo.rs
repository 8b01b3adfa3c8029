//! Yahoo Finance quote source.
//!
//! Reads today's one-minute chart from Yahoo's v8 chart API and reports the
//! last non-empty close, falling back to the `regularMarketPrice` in the chart
//! metadata. Handles rate limiting, retries with exponential backoff, and the
//! circuit breaker.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes; every parse failure surfaces as `ResponseFormatChanged`.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{QuoteError, QuoteSource};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Yahoo Finance last-price lookup.
pub struct YahooQuoteSource {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooQuoteSource {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>, timeout: Duration) -> Result<Self, QuoteError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| QuoteError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            max_retries: 2,
            base_delay: Duration::from_millis(250),
        })
    }

    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    fn chart_url(symbol: &str) -> String {
        format!("https://query2.finance.yahoo.com/v8/finance/chart/{symbol}?range=1d&interval=1m")
    }

    /// Extract the last traded price from a chart payload.
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<f64, QuoteError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => QuoteError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            Some(err) => QuoteError::ResponseFormatChanged(format!("{}: {}", err.code, err.description)),
            None => QuoteError::ResponseFormatChanged("empty result with no error".into()),
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| QuoteError::ResponseFormatChanged("result array is empty".into()))?;

        let last_close = data
            .indicators
            .and_then(|ind| ind.quote.into_iter().next())
            .and_then(|q| q.close.into_iter().rev().flatten().next());
        let meta_price = data.meta.and_then(|m| m.regular_market_price);

        last_close
            .or(meta_price)
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or_else(|| QuoteError::NoPrice {
                symbol: symbol.to_string(),
            })
    }

    fn parse_body(symbol: &str, body: &str) -> Result<f64, QuoteError> {
        let chart: ChartResponse = serde_json::from_str(body).map_err(|e| {
            QuoteError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
        })?;
        Self::parse_response(symbol, chart)
    }

    fn fetch_with_retry(&self, symbol: &str) -> Result<f64, QuoteError> {
        let url = Self::chart_url(symbol);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                std::thread::sleep(self.base_delay * 2u32.pow(attempt - 1));
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(QuoteError::CircuitBreakerTripped);
            }

            let resp = match self.client.get(&url).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    self.circuit_breaker.record_failure();
                    last_error = Some(QuoteError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(QuoteError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();
            if status == reqwest::StatusCode::FORBIDDEN {
                self.circuit_breaker.trip();
                return Err(QuoteError::CircuitBreakerTripped);
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(QuoteError::SymbolNotFound {
                    symbol: symbol.to_string(),
                });
            }
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                let retry_after_secs = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(QuoteError::RateLimited { retry_after_secs });
                continue;
            }
            if !status.is_success() {
                self.circuit_breaker.record_failure();
                last_error = Some(QuoteError::Other(format!("HTTP {status} for {symbol}")));
                continue;
            }

            let body = resp
                .text()
                .map_err(|e| QuoteError::NetworkUnreachable(e.to_string()))?;
            let price = Self::parse_body(symbol, &body)?;
            self.circuit_breaker.record_success();
            debug!(symbol, price, "quote fetched");
            return Ok(price);
        }

        Err(last_error.unwrap_or_else(|| QuoteError::Other("max retries exceeded".into())))
    }
}

impl QuoteSource for YahooQuoteSource {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn last_price(&self, symbol: &str) -> Result<f64, QuoteError> {
        self.fetch_with_retry(symbol)
    }
}
