pub mod countdown;
pub mod exam_loader;

pub use countdown::{format_clock, CountdownTimer, TickOutcome, TimerState};
pub use exam_loader::{ExamLoader, LoadFailure};
