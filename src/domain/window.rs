//! Time-of-day window used to constrain which slots an attempt may book

use std::fmt;

use chrono::NaiveTime;

use crate::error::{Result, SlotbookError};

/// Optional lower and upper bounds on slot times.
///
/// A slot fits when it starts at or after `min` and ends at or before `max`.
/// Either bound may be absent, meaning unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeWindow {
    min: Option<NaiveTime>,
    max: Option<NaiveTime>,
}

impl TimeWindow {
    /// Create a window, rejecting `min > max`
    pub fn new(min: Option<NaiveTime>, max: Option<NaiveTime>) -> Result<Self> {
        if let (Some(lo), Some(hi)) = (min, max)
            && lo > hi
        {
            return Err(SlotbookError::Validation(format!(
                "min_slot_time {} is after max_slot_time {}",
                lo.format("%H:%M"),
                hi.format("%H:%M")
            )));
        }
        Ok(Self { min, max })
    }

    /// A window with no bounds
    pub fn any() -> Self {
        Self::default()
    }

    /// Parse a window from optional `HH:MM` / `HH:MM:SS` strings
    pub fn parse(min: Option<&str>, max: Option<&str>) -> Result<Self> {
        let min = min.map(parse_time_of_day).transpose()?;
        let max = max.map(parse_time_of_day).transpose()?;
        Self::new(min, max)
    }

    pub fn min(&self) -> Option<NaiveTime> {
        self.min
    }

    pub fn max(&self) -> Option<NaiveTime> {
        self.max
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// True if an interval `[start, end]` lies inside the window
    pub fn contains(&self, start: NaiveTime, end: NaiveTime) -> bool {
        self.min.is_none_or(|lo| start >= lo) && self.max.is_none_or(|hi| end <= hi)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lo = self.min.map(|t| t.format("%H:%M").to_string());
        let hi = self.max.map(|t| t.format("%H:%M").to_string());
        write!(
            f,
            "{}-{}",
            lo.as_deref().unwrap_or("any"),
            hi.as_deref().unwrap_or("any")
        )
    }
}

/// Parse `HH:MM` or `HH:MM:SS`
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| SlotbookError::Validation(format!("invalid time of day '{}', expected HH:MM", s)))
}
