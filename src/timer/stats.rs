//! 定时器统计信息
//! Timer statistics

use crate::timer::core::TimerStatus;
use std::time::Duration;

/// 定时器统计快照
/// Timer statistics snapshot
#[derive(Debug, Clone)]
pub struct TimerStats {
    /// 定时器状态
    /// Timer status
    pub status: TimerStatus,
    /// 已推进的滴答数
    /// Ticks advanced so far
    pub ticks: i64,
    /// 队列中的条目数
    /// Entries currently queued
    pub pending_entries: usize,
    /// 最早的到期滴答（水位线），队列为空时为 `None`
    /// Earliest due tick (the watermark), `None` when the queue is empty
    pub next_due_tick: Option<i64>,
    /// 基础滴答间隔
    /// Base tick interval
    pub interval: Duration,
}

impl std::fmt::Display for TimerStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TimerStats {{ status: {:?}, ticks: {}, pending: {}, next_due: {:?}, interval: {:?} }}",
            self.status, self.ticks, self.pending_entries, self.next_due_tick, self.interval
        )
    }
}
