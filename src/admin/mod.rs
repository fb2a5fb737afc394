//! Admin Operations (spec §4.4): all mutating control-plane primitives.

mod ops;

pub use ops::{Admin, ResetMode, SetSlotAction};
