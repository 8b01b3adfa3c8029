//! Market hours gate.
//!
//! A pure function of wall-clock time: the exchange is open Monday to Friday
//! between the open and close times (both inclusive) in its own timezone.
//! Nothing is cached, so a boundary crossing is seen on the very next tick.
//! Exchange holidays are not modelled.

use chrono::{DateTime, Datelike, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MarketHoursError {
    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("invalid time of day '{0}' (expected HH:MM or HH:MM:SS)")]
    InvalidTime(String),

    #[error("open time {open} is after close time {close}")]
    OpenAfterClose { open: NaiveTime, close: NaiveTime },
}

/// Regular session of one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketHours {
    tz: Tz,
    open: NaiveTime,
    close: NaiveTime,
}

impl Default for MarketHours {
    fn default() -> Self {
        Self::nyse()
    }
}

impl MarketHours {
    pub fn new(tz: Tz, open: NaiveTime, close: NaiveTime) -> Result<Self, MarketHoursError> {
        if open > close {
            return Err(MarketHoursError::OpenAfterClose { open, close });
        }
        Ok(Self { tz, open, close })
    }

    /// US equities: 09:30–16:00 America/New_York.
    pub fn nyse() -> Self {
        Self {
            tz: chrono_tz::America::New_York,
            open: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default(),
            close: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or_default(),
        }
    }

    /// Parse from config strings, e.g. `("America/New_York", "09:30", "16:00")`.
    pub fn parse(tz: &str, open: &str, close: &str) -> Result<Self, MarketHoursError> {
        let tz: Tz = tz
            .parse()
            .map_err(|_| MarketHoursError::UnknownTimezone(tz.to_string()))?;
        Self::new(tz, parse_time(open)?, parse_time(close)?)
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn open_time(&self) -> NaiveTime {
        self.open
    }

    pub fn close_time(&self) -> NaiveTime {
        self.close
    }

    /// `now` expressed in the exchange timezone.
    pub fn local(&self, now: DateTime<Utc>) -> DateTime<Tz> {
        now.with_timezone(&self.tz)
    }

    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        let local = self.local(now);
        let weekday = local.weekday().number_from_monday();
        let time = local.time();
        weekday <= 5 && time >= self.open && time <= self.close
    }
}

fn parse_time(s: &str) -> Result<NaiveTime, MarketHoursError> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| MarketHoursError::InvalidTime(s.to_string()))
}

/// NYSE regular-session check.
pub fn is_open(now: DateTime<Utc>) -> bool {
    MarketHours::nyse().is_open(now)
}

/// What the tracker consults every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateMode {
    /// Follow the exchange session.
    #[default]
    Exchange,
    /// Ignore the clock (demos, weekend testing).
    AlwaysOpen,
}

/// Market gate used by the tracking loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketSchedule {
    Exchange(MarketHours),
    AlwaysOpen,
}

impl MarketSchedule {
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        match self {
            MarketSchedule::Exchange(hours) => hours.is_open(now),
            MarketSchedule::AlwaysOpen => true,
        }
    }
}
