//! Symbol universe: the tickers a candidate may be assigned.
//!
//! Loaded once at startup and read-only afterwards. Accepted sources:
//! - a CSV table with a `Symbol` column (an S&P 500 constituents export works as-is)
//! - a plain list, one ticker per line, `#` comments allowed
//! - the built-in list of large US names

use crate::rng::SymbolPicker;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("read universe file: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse universe CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("universe CSV has no '{0}' column")]
    MissingColumn(String),

    #[error("universe is empty")]
    Empty,
}

/// Non-empty, de-duplicated list of tradable symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolUniverse {
    symbols: Vec<String>,
}

impl SymbolUniverse {
    /// Trim, drop blanks and duplicates (first occurrence wins).
    pub fn new<I, S>(symbols: I) -> Result<Self, UniverseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for s in symbols {
            let s = s.as_ref().trim();
            if !s.is_empty() && !out.iter().any(|o| o == s) {
                out.push(s.to_string());
            }
        }
        if out.is_empty() {
            return Err(UniverseError::Empty);
        }
        Ok(Self { symbols: out })
    }

    /// Load from a file; `.csv` is read as a table, anything else as a list.
    pub fn from_file(path: &Path) -> Result<Self, UniverseError> {
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        let content = std::fs::read_to_string(path)?;
        if is_csv {
            Self::from_csv(&content, "Symbol")
        } else {
            Self::from_list(&content)
        }
    }

    /// Parse a CSV table and take the named column (header match ignores case).
    pub fn from_csv(content: &str, column: &str) -> Result<Self, UniverseError> {
        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let col = reader
            .headers()?
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(column))
            .ok_or_else(|| UniverseError::MissingColumn(column.to_string()))?;

        let mut symbols = Vec::new();
        for record in reader.records() {
            if let Some(sym) = record?.get(col) {
                symbols.push(sym.to_string());
            }
        }
        Self::new(symbols)
    }

    /// One ticker per line; blank lines and `#` comments are skipped.
    pub fn from_list(content: &str) -> Result<Self, UniverseError> {
        Self::new(
            content
                .lines()
                .map(|l| l.split('#').next().unwrap_or(""))
                .filter(|l| !l.trim().is_empty()),
        )
    }

    /// Built-in list of large, liquid US names and ETFs.
    pub fn default_us() -> Self {
        let symbols = [
            "AAPL", "MSFT", "GOOGL", "AMZN", "NVDA", "META", "AVGO", "CRM", "ADBE", "ORCL", "JNJ",
            "UNH", "PFE", "ABBV", "MRK", "LLY", "JPM", "BAC", "WFC", "GS", "MS", "V", "XOM",
            "CVX", "COP", "WMT", "PG", "KO", "PEP", "COST", "HD", "MCD", "NKE", "SBUX", "SPY",
            "QQQ", "IWM", "DIA",
        ];
        Self {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Never true for a constructed universe.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }

    /// Draw one symbol with the given picker.
    pub fn pick(&self, picker: &mut dyn SymbolPicker) -> &str {
        let idx = picker.pick_index(self.symbols.len()) % self.symbols.len();
        &self.symbols[idx]
    }
}
