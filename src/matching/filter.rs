//! Time-window slot filtering

use crate::domain::{Slot, TimeWindow};

/// Keep the slots that start at or after the window's minimum and end at or
/// before its maximum, preserving order.
pub fn filter_slots(slots: &[Slot], window: &TimeWindow) -> Vec<Slot> {
    slots
        .iter()
        .filter(|slot| window.contains(slot.start(), slot.end()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use proptest::prelude::*;

    fn slot(start: (u32, u32), end: (u32, u32)) -> Slot {
        Slot::new(
            format!("{:02}{:02}", start.0, start.1),
            NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
        )
        .unwrap()
    }

    fn evening() -> Vec<Slot> {
        vec![
            slot((17, 0), (17, 40)),
            slot((17, 40), (18, 20)),
            slot((18, 20), (19, 0)),
            slot((19, 30), (20, 10)),
        ]
    }

    #[test]
    fn test_filter_both_bounds() {
        let window = TimeWindow::parse(Some("18:00"), Some("19:20")).unwrap();
        let filtered = filter_slots(&evening(), &window);
        assert_eq!(filtered, vec![slot((18, 20), (19, 0))]);
    }

    #[test]
    fn test_filter_bounds_are_inclusive() {
        let window = TimeWindow::parse(Some("17:40"), Some("19:00")).unwrap();
        let filtered = filter_slots(&evening(), &window);
        assert_eq!(filtered, vec![slot((17, 40), (18, 20)), slot((18, 20), (19, 0))]);
    }

    #[test]
    fn test_filter_min_only() {
        let window = TimeWindow::parse(Some("18:00"), None).unwrap();
        let filtered = filter_slots(&evening(), &window);
        assert_eq!(filtered, vec![slot((18, 20), (19, 0)), slot((19, 30), (20, 10))]);
    }

    #[test]
    fn test_filter_max_only() {
        let window = TimeWindow::parse(None, Some("18:20")).unwrap();
        let filtered = filter_slots(&evening(), &window);
        assert_eq!(filtered, vec![slot((17, 0), (17, 40)), slot((17, 40), (18, 20))]);
    }

    #[test]
    fn test_filter_empty_input() {
        let window = TimeWindow::parse(Some("18:00"), Some("20:00")).unwrap();
        assert!(filter_slots(&[], &window).is_empty());
    }

    fn arb_slots() -> impl Strategy<Value = Vec<Slot>> {
        prop::collection::vec((0u32..23 * 60, 1u32..120), 0..20).prop_map(|raw| {
            raw.into_iter()
                .map(|(start, len)| {
                    let end = (start + len).min(23 * 60 + 59);
                    slot((start / 60, start % 60), (end / 60, end % 60))
                })
                .collect()
        })
    }

    fn arb_window() -> impl Strategy<Value = TimeWindow> {
        (prop::option::of(0u32..24 * 60), prop::option::of(0u32..24 * 60)).prop_map(|(a, b)| {
            let to_time = |m: u32| NaiveTime::from_hms_opt(m / 60, m % 60, 0).unwrap();
            let (lo, hi) = match (a, b) {
                (Some(a), Some(b)) if a > b => (Some(b), Some(a)),
                other => other,
            };
            TimeWindow::new(lo.map(to_time), hi.map(to_time)).unwrap()
        })
    }

    proptest! {
        #[test]
        fn prop_filter_is_ordered_subsequence_within_bounds(slots in arb_slots(), window in arb_window()) {
            let filtered = filter_slots(&slots, &window);

            let mut rest = slots.iter();
            for kept in &filtered {
                prop_assert!(rest.any(|s| s == kept), "output is not a subsequence of input");
                prop_assert!(window.min().is_none_or(|lo| kept.start() >= lo));
                prop_assert!(window.max().is_none_or(|hi| kept.end() <= hi));
            }
        }

        #[test]
        fn prop_unbounded_window_is_identity(slots in arb_slots()) {
            prop_assert_eq!(filter_slots(&slots, &TimeWindow::any()), slots);
        }
    }
}
