//! Scheduling rules: time ranges, lifecycle transitions and queue numbering.
//!
//! Pure functions only; persistence lives in `db` and orchestration in
//! `services`.

pub mod lifecycle;
pub mod queue_number;
pub mod time_range;

pub use lifecycle::{can_transition, ensure_transition};
pub use queue_number::{estimate_wait_minutes, format_queue_number, next_queue_number};
pub use time_range::TimeRange;
