//! Day boundary used to key search records.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use std::fmt::Debug;
use thiserror::Error;

pub trait Clock: Send + Sync + Debug {
    /// Calendar date that new searches are recorded under.
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Error)]
pub enum ClockError {
    #[error("UTC offset of {0} minutes is out of range (must be within ±24h)")]
    OffsetOutOfRange(i32),
}

/// System clock shifted by a fixed UTC offset. An offset of zero gives a
/// UTC day boundary.
#[derive(Debug, Clone, Copy)]
pub struct OffsetClock {
    offset: FixedOffset,
}

impl OffsetClock {
    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    pub fn from_minutes(minutes: i32) -> Result<Self, ClockError> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(|offset| Self { offset })
            .ok_or(ClockError::OffsetOutOfRange(minutes))
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Local calendar date at the instant `now`.
    pub fn date_at(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }
}

impl Clock for OffsetClock {
    fn today(&self) -> NaiveDate {
        self.date_at(Utc::now())
    }
}

/// Always reports the same date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
