//! Consecutive slot matching
//!
//! Finds the earliest run of `n` slots where each slot ends exactly when the
//! next one starts, i.e. one continuous booking.

use crate::domain::Slot;

/// Return the first run of `n` back-to-back slots in `slots`, if any.
///
/// `slots` must be in chronological order. Single pass: a slot extends the
/// current run when its start equals the previous slot's end, otherwise it
/// begins a new run. The first run to reach length `n` wins.
pub fn find_consecutive(slots: &[Slot], n: usize) -> Option<&[Slot]> {
    if n == 0 || slots.len() < n {
        return None;
    }

    let mut run_start = 0;
    for i in 0..slots.len() {
        if i > 0 && !slots[i - 1].is_followed_by(&slots[i]) {
            run_start = i;
        }
        if i + 1 - run_start == n {
            return Some(&slots[run_start..=i]);
        }
    }

    None
}
