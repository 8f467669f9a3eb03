//! 基于优先级队列的软件定时器模块
//! Priority-queue driven software timer module
//!
//! 定时器以固定的基础间隔推进逻辑滴答，所有任务间隔都以滴答表示。到期的
//! 条目在独立的 tokio 任务上执行，驱动循环从不等待任务完成。
//!
//! The timer advances logical ticks on a fixed base interval and expresses
//! every job interval in ticks. Due entries run on their own tokio tasks; the
//! driver loop never waits for a job to finish.

mod core;
mod entry;
mod job;
mod stats;


pub use self::core::{Timer, TimerStatus};
pub use entry::{Entry, EntryId, EntryStatus};
pub use job::{JobControl, exit};
pub use stats::TimerStats;
