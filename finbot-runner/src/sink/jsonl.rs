//! JSONL trade log: one committed trade per line, append-only.
//!
//! Each line is an independent JSON object, so a crash mid-write costs at
//! most the last line and the file can be tailed while the tracker runs.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use finbot_core::data::{SinkAck, SinkError, TradeSink};
use finbot_core::domain::CommittedTrade;

pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every trade back, skipping malformed lines.
    pub fn read_all(&self) -> io::Result<Vec<CommittedTrade>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = io::BufReader::new(fs::File::open(&self.path)?);
        let mut trades = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(trade) = serde_json::from_str::<CommittedTrade>(&line) {
                trades.push(trade);
            }
        }
        Ok(trades)
    }
}

impl TradeSink for JsonlSink {
    fn describe(&self) -> String {
        format!("jsonl:{}", self.path.display())
    }

    fn append(&mut self, trade: &CommittedTrade) -> Result<SinkAck, SinkError> {
        let json = serde_json::to_string(trade).map_err(|e| SinkError::Encode(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{json}")?;
        file.flush()?;

        Ok(SinkAck::default())
    }
}
