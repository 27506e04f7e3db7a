//! Slot selection - pure functions over discovered slots.
//!
//! - filter_slots: keep slots inside an attempt's time window
//! - find_consecutive: pick the earliest back-to-back run of N slots

mod consecutive;
mod filter;

pub use consecutive::find_consecutive;
pub use filter::filter_slots;
