//! 定义了定时器的可配置参数。
//! Defines configurable parameters for the timer.

use std::time::Duration;

/// The base tick interval used when none is configured.
/// 未配置时使用的基础滴答间隔。
pub const DEFAULT_TIMER_INTERVAL: Duration = Duration::from_millis(100);

/// What the dispatch boundary does when a job body panics.
///
/// 任务体发生 panic 时调度边界的处理方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanicPolicy {
    /// Log the panic and abort the process. Programming errors inside
    /// scheduled jobs are never swallowed.
    /// 记录 panic 并终止进程。
    #[default]
    Abort,
    /// Log the panic and close the offending entry. The process and all
    /// other entries keep running.
    /// 记录 panic 并关闭出错的条目，进程和其他条目继续运行。
    CloseEntry,
}

/// A structure containing all configurable parameters for a timer.
///
/// 包含定时器所有可配置参数的结构体。
#[derive(Debug, Clone)]
pub struct TimerConfig {
    /// Wall-clock duration of one tick. Immutable once the timer is created.
    /// 每个滴答的时钟时长，定时器创建后不可更改。
    pub interval: Duration,
    /// Handling of panicking job bodies.
    /// 任务体 panic 的处理策略。
    pub panic_policy: PanicPolicy,
}

impl TimerConfig {
    /// Sets the base tick interval.
    /// 设置基础滴答间隔。
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the panic policy.
    /// 设置 panic 处理策略。
    pub fn with_panic_policy(mut self, panic_policy: PanicPolicy) -> Self {
        self.panic_policy = panic_policy;
        self
    }

    /// Returns a copy with a zero interval replaced by the default one.
    pub(crate) fn normalized(mut self) -> Self {
        if self.interval.is_zero() {
            tracing::warn!(
                default = ?DEFAULT_TIMER_INTERVAL,
                "Zero timer interval configured, falling back to default"
            );
            self.interval = DEFAULT_TIMER_INTERVAL;
        }
        self
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_TIMER_INTERVAL,
            panic_policy: PanicPolicy::default(),
        }
    }
}
