use chrono::{DateTime, Duration, Utc};
use std::fmt;

use crate::error::{Error, Result};

/// A half-open booking window `[start, end)`.
///
/// Two windows that only touch at a boundary (`a.end == b.start`) do not overlap,
/// which allows a vehicle or driver to be reused without any gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Zero-length and inverted windows are rejected.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(Error::InvalidTimeWindow { start: start.to_rfc3339(), end: end.to_rfc3339() });
        }
        Ok(TimeWindow { start, end })
    }

    pub fn from_duration(start: DateTime<Utc>, duration: Duration) -> Result<Self> {
        let end = start.checked_add_signed(duration).ok_or_else(|| out_of_range(start, duration))?;
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        overlaps(self, other)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Same duration, starting at `start`.
    pub fn shifted_to(&self, start: DateTime<Utc>) -> Result<TimeWindow> {
        Self::from_duration(start, self.duration())
    }

    /// Window grown by `margin` on both sides.
    pub fn widened(&self, margin: Duration) -> Result<TimeWindow> {
        let start = self.start.checked_sub_signed(margin).ok_or_else(|| out_of_range(self.start, -margin))?;
        let end = self.end.checked_add_signed(margin).ok_or_else(|| out_of_range(self.end, margin))?;
        Self::new(start, end)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.format("%Y-%m-%d %H:%M"), self.end.format("%Y-%m-%d %H:%M"))
    }
}

fn out_of_range(start: DateTime<Utc>, offset: Duration) -> Error {
    Error::TimeOutOfRange { start: start.to_rfc3339(), offset: offset.num_minutes() }
}

pub fn overlaps(a: &TimeWindow, b: &TimeWindow) -> bool {
    a.start < b.end && b.start < a.end
}
