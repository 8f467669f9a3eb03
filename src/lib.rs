#![deny(clippy::expect_used, clippy::unwrap_used)]

//! The root of the tick-based timer library.
//! 基于滴答的定时器库的根。

pub mod config;
pub mod error;
pub mod queue;
pub mod timer;

pub use config::{PanicPolicy, TimerConfig};
pub use error::{Error, Result};
pub use queue::{HeapOrder, PriorityQueue};
pub use timer::{
    Entry, EntryId, EntryStatus, JobControl, Timer, TimerStats, TimerStatus, exit,
};
