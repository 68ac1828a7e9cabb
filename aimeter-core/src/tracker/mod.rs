//! Tab timer and focus tracking
//!
//! [`FocusStateMachine`] decides which tab accrues; [`TimerRegistry`] runs
//! the one-second ticks that credit time to the [`DailyStore`](crate::DailyStore).

mod state;
mod timer;

pub use state::{FocusStateMachine, TrackerState, Transition};
pub use timer::{TabTrackingState, TimerRegistry, TICK_PERIOD};
