//! Bookable slot type
//!
//! A Slot is one discrete bookable interval for an activity at a venue on a date.
//! Slots are created by a BookingClient when it lists availability and are never
//! mutated afterwards.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};

use crate::error::{Result, SlotbookError};

/// A single bookable time interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    /// Venue-local identifier
    id: String,
    /// Calendar date of the slot
    date: NaiveDate,
    /// Start time of day (inclusive)
    start: NaiveTime,
    /// End time of day (exclusive)
    end: NaiveTime,
}

impl Slot {
    /// Create a slot, rejecting empty or inverted intervals
    pub fn new(id: impl Into<String>, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if start >= end {
            return Err(SlotbookError::Validation(format!(
                "slot start {} must be before end {}",
                start.format("%H:%M"),
                end.format("%H:%M")
            )));
        }

        Ok(Self {
            id: id.into(),
            date,
            start,
            end,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    /// True if `next` begins exactly when this slot ends
    pub fn is_followed_by(&self, next: &Slot) -> bool {
        self.end == next.start
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

/// Render a slot list as `17:00-17:40, 17:40-18:20` for logs and reports
pub fn format_slots(slots: &[Slot]) -> String {
    slots.iter().map(Slot::to_string).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_slot_new_valid() {
        let slot = Slot::new("a", date(), hm(17, 0), hm(17, 40)).unwrap();
        assert_eq!(slot.id(), "a");
        assert_eq!(slot.date(), date());
        assert_eq!(slot.start(), hm(17, 0));
        assert_eq!(slot.end(), hm(17, 40));
    }

    #[test]
    fn test_slot_rejects_inverted_interval() {
        let result = Slot::new("a", date(), hm(18, 0), hm(17, 0));
        assert!(matches!(result, Err(SlotbookError::Validation(_))));
    }

    #[test]
    fn test_slot_rejects_empty_interval() {
        assert!(Slot::new("a", date(), hm(18, 0), hm(18, 0)).is_err());
    }

    #[test]
    fn test_is_followed_by() {
        let first = Slot::new("a", date(), hm(17, 0), hm(17, 40)).unwrap();
        let second = Slot::new("b", date(), hm(17, 40), hm(18, 20)).unwrap();
        let gap = Slot::new("c", date(), hm(18, 30), hm(19, 10)).unwrap();

        assert!(first.is_followed_by(&second));
        assert!(!second.is_followed_by(&gap));
        assert!(!second.is_followed_by(&first));
    }

    #[test]
    fn test_display_and_format_slots() {
        let slots = vec![
            Slot::new("a", date(), hm(17, 0), hm(17, 40)).unwrap(),
            Slot::new("b", date(), hm(17, 40), hm(18, 20)).unwrap(),
        ];
        assert_eq!(slots[0].to_string(), "17:00-17:40");
        assert_eq!(format_slots(&slots), "17:00-17:40, 17:40-18:20");
        assert_eq!(format_slots(&[]), "");
    }
}
