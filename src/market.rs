//! Market trading hours and the refresh cadence which depends on them.
use anyhow::{Result, ensure};
use chrono::{Datelike, NaiveDateTime, TimeDelta, Timelike, Weekday};
use serde::Deserialize;

/// Hours during which the market is considered open.
///
/// The market is open on weekdays whenever the hour of the day lies between `open_hour` and
/// `close_hour` inclusive, so the defaults of 9 and 17 cover 09:00 to 17:59.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MarketHours {
    /// First hour of the trading day
    pub open_hour: u32,
    /// Last hour of the trading day
    pub close_hour: u32,
}

impl Default for MarketHours {
    fn default() -> Self {
        Self {
            open_hour: 9,
            close_hour: 17,
        }
    }
}

impl MarketHours {
    /// Check that the hours describe a valid trading day
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.open_hour <= self.close_hour && self.close_hour < 24,
            "Invalid market hours: open hour ({}) must not be after close hour ({}), \
            which must be less than 24",
            self.open_hour,
            self.close_hour
        );

        Ok(())
    }

    /// Whether the market is open at `time`
    pub fn is_open(&self, time: NaiveDateTime) -> bool {
        let weekday = !matches!(time.weekday(), Weekday::Sat | Weekday::Sun);
        weekday && (self.open_hour..=self.close_hour).contains(&time.hour())
    }
}

/// How often results are refreshed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Cadence {
    /// Seconds between refreshes while the market is open
    pub open_secs: u32,
    /// Seconds between refreshes while the market is closed
    pub closed_secs: u32,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            open_secs: 60,
            closed_secs: 3600,
        }
    }
}

impl Cadence {
    /// Check that both intervals are non-zero
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.open_secs > 0 && self.closed_secs > 0,
            "Refresh intervals must be greater than zero"
        );

        Ok(())
    }

    /// The interval until the next refresh, for a market which is open or closed
    pub fn interval(&self, open: bool) -> TimeDelta {
        let secs = if open {
            self.open_secs
        } else {
            self.closed_secs
        };
        TimeDelta::seconds(secs.into())
    }
}
