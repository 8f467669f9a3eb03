//! 定时器核心实现
//! Timer core implementation
//!
//! 定时器在固定的时钟间隔上推进逻辑滴答计数，并用最小堆按下次到期滴答
//! 管理所有条目。每个滴答弹出所有到期条目，按其调度策略异步执行任务，
//! 然后将仍然有效的条目重新入队。
//!
//! The timer advances a logical tick counter on a fixed wall-clock interval
//! and keeps every entry in a min-heap keyed by its next due tick. On each tick
//! it pops all due entries, dispatches their jobs asynchronously according to
//! each entry's policy, and re-queues the entries that are still alive.

use crate::config::TimerConfig;
use crate::error::Result;
use crate::queue::{HeapOrder, PriorityQueue};
use crate::timer::entry::{Entry, EntryId, EntrySettings, EntryStatus};
use crate::timer::job::{Job, JobControl};
use crate::timer::stats::TimerStats;
use std::future::Future;
use std::sync::atomic::{AtomicI64, AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, trace};

/// 定时器状态
/// Timer status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TimerStatus {
    /// Ticks advance and due entries are dispatched.
    /// 滴答推进，到期条目被调度。
    Running = 0,
    /// Ticks are frozen; nothing is dispatched.
    /// 滴答冻结，不调度任何条目。
    Stopped = 1,
    /// Terminal. The driver task exits on its next interval.
    /// 终止状态，驱动任务在下一个间隔退出。
    Closed = 2,
}

impl TimerStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => TimerStatus::Running,
            1 => TimerStatus::Stopped,
            _ => TimerStatus::Closed,
        }
    }
}

struct TimerInner {
    queue: PriorityQueue<Entry>,
    status: AtomicU8,
    ticks: Arc<AtomicI64>,
    config: TimerConfig,
    next_entry_id: AtomicU64,
}

/// 基于滴答的定时器
/// Tick-based timer
///
/// A cheap, cloneable handle. The driver task and pending delayed
/// registrations only hold weak references, so dropping every handle stops
/// the timer just like [`Timer::close`].
///
/// 轻量可克隆的句柄。驱动任务和挂起的延迟注册只持有弱引用，因此丢弃所有
/// 句柄与调用 [`Timer::close`] 效果相同。
#[derive(Clone)]
pub struct Timer {
    inner: Arc<TimerInner>,
}

impl Timer {
    /// 使用默认配置创建并启动定时器
    /// Create and start a timer with the default configuration
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, like `tokio::spawn`.
    pub fn new() -> Self {
        Self::with_config(TimerConfig::default())
    }

    /// 使用给定配置创建并启动定时器
    /// Create and start a timer with the given configuration
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, like `tokio::spawn`.
    pub fn with_config(config: TimerConfig) -> Self {
        Self::spawn_on(&Handle::current(), config)
    }

    /// Like [`Timer::new`], but reports a missing runtime as an error.
    pub fn try_new() -> Result<Self> {
        Self::try_with_config(TimerConfig::default())
    }

    /// Like [`Timer::with_config`], but reports a missing runtime as an error.
    pub fn try_with_config(config: TimerConfig) -> Result<Self> {
        let handle = Handle::try_current()?;
        Ok(Self::spawn_on(&handle, config))
    }

    fn spawn_on(handle: &Handle, config: TimerConfig) -> Self {
        let config = config.normalized();
        let period = config.interval;
        let inner = Arc::new(TimerInner {
            queue: PriorityQueue::new(HeapOrder::Min),
            status: AtomicU8::new(TimerStatus::Running as u8),
            ticks: Arc::new(AtomicI64::new(0)),
            config,
            next_entry_id: AtomicU64::new(1),
        });

        // The first tick fires one full interval after creation.
        let first_tick = Instant::now() + period;
        handle.spawn(drive(Arc::downgrade(&inner), first_tick, period));

        info!(interval = ?period, "Timer started");
        Self { inner }
    }

    /// 添加重复执行、不限次数、非单例的任务
    /// Add a repeating, unlimited, non-singleton job
    pub fn add<F, Fut, R>(&self, interval: Duration, job: F) -> Entry
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<JobControl>,
    {
        self.create_entry(interval, Job::new(job), false, -1, EntryStatus::Ready)
    }

    /// 添加任务并完全控制其参数
    /// Add a job with full control over its parameters
    ///
    /// * `singleton` - at most one execution of the job is in flight at a time.
    /// * `times` - run limit; zero or negative means unlimited.
    /// * `status` - initial status; [`EntryStatus::Stopped`] adds a paused job.
    pub fn add_entry<F, Fut, R>(
        &self,
        interval: Duration,
        job: F,
        singleton: bool,
        times: i64,
        status: EntryStatus,
    ) -> Entry
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<JobControl>,
    {
        self.create_entry(interval, Job::new(job), singleton, times, status)
    }

    /// 添加单例模式的重复任务
    /// Add a repeating singleton job
    pub fn add_singleton<F, Fut, R>(&self, interval: Duration, job: F) -> Entry
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<JobControl>,
    {
        self.create_entry(interval, Job::new(job), true, -1, EntryStatus::Ready)
    }

    /// 添加只运行一次的任务
    /// Add a job that runs once and then closes
    pub fn add_once<F, Fut, R>(&self, interval: Duration, job: F) -> Entry
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<JobControl>,
    {
        self.create_entry(interval, Job::new(job), true, 1, EntryStatus::Ready)
    }

    /// 添加限制运行次数的任务
    /// Add a job that runs at most `times` times and then closes
    ///
    /// A `times` of zero or less leaves the job unlimited.
    pub fn add_times<F, Fut, R>(&self, interval: Duration, times: i64, job: F) -> Entry
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<JobControl>,
    {
        self.create_entry(interval, Job::new(job), true, times, EntryStatus::Ready)
    }

    /// 延迟 `delay` 后再以 [`Timer::add`] 的语义注册任务
    /// Register the job with [`Timer::add`] semantics after `delay`
    ///
    /// Returns the entry of the pending registration; closing it before it
    /// fires cancels the registration.
    pub fn delay_add<F, Fut, R>(&self, delay: Duration, interval: Duration, job: F) -> Entry
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<JobControl>,
    {
        self.delay_create(delay, interval, Job::new(job), false, -1, EntryStatus::Ready)
    }

    /// Register the job with [`Timer::add_entry`] semantics after `delay`.
    pub fn delay_add_entry<F, Fut, R>(
        &self,
        delay: Duration,
        interval: Duration,
        job: F,
        singleton: bool,
        times: i64,
        status: EntryStatus,
    ) -> Entry
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<JobControl>,
    {
        self.delay_create(delay, interval, Job::new(job), singleton, times, status)
    }

    /// Register the job with [`Timer::add_singleton`] semantics after `delay`.
    pub fn delay_add_singleton<F, Fut, R>(
        &self,
        delay: Duration,
        interval: Duration,
        job: F,
    ) -> Entry
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<JobControl>,
    {
        self.delay_create(delay, interval, Job::new(job), true, -1, EntryStatus::Ready)
    }

    /// Register the job with [`Timer::add_once`] semantics after `delay`.
    pub fn delay_add_once<F, Fut, R>(&self, delay: Duration, interval: Duration, job: F) -> Entry
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<JobControl>,
    {
        self.delay_create(delay, interval, Job::new(job), true, 1, EntryStatus::Ready)
    }

    /// Register the job with [`Timer::add_times`] semantics after `delay`.
    pub fn delay_add_times<F, Fut, R>(
        &self,
        delay: Duration,
        interval: Duration,
        times: i64,
        job: F,
    ) -> Entry
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<JobControl>,
    {
        self.delay_create(delay, interval, Job::new(job), true, times, EntryStatus::Ready)
    }

    /// 恢复定时器
    /// Resume the timer
    pub fn start(&self) {
        if self.set_status(TimerStatus::Running) {
            debug!("Timer resumed");
        }
    }

    /// 暂停定时器，滴答冻结
    /// Pause the timer; ticks stop advancing
    pub fn stop(&self) {
        if self.set_status(TimerStatus::Stopped) {
            debug!("Timer stopped");
        }
    }

    /// 关闭定时器。此操作是终止性的且幂等。
    /// Close the timer. Terminal and idempotent.
    ///
    /// Jobs already dispatched run to completion.
    pub fn close(&self) {
        let previous = self
            .inner
            .status
            .swap(TimerStatus::Closed as u8, Ordering::AcqRel);
        if previous != TimerStatus::Closed as u8 {
            info!("Timer closed");
        }
    }

    /// 定时器状态
    /// Timer status
    pub fn status(&self) -> TimerStatus {
        self.inner.status()
    }

    /// 当前逻辑滴答数
    /// Current logical tick count
    pub fn ticks(&self) -> i64 {
        self.inner.ticks.load(Ordering::Acquire)
    }

    /// 基础滴答间隔
    /// Base tick interval
    pub fn interval(&self) -> Duration {
        self.inner.config.interval
    }

    /// 获取统计快照
    /// Get a statistics snapshot
    pub fn stats(&self) -> TimerStats {
        let next_priority = self.inner.queue.next_priority();
        TimerStats {
            status: self.status(),
            ticks: self.ticks(),
            pending_entries: self.inner.queue.len(),
            next_due_tick: (next_priority != HeapOrder::Min.sentinel()).then_some(next_priority),
            interval: self.interval(),
        }
    }

    /// Returns whether the status changed. A closed timer stays closed.
    fn set_status(&self, status: TimerStatus) -> bool {
        self.inner
            .status
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current != TimerStatus::Closed as u8 && current != status as u8)
                    .then_some(status as u8)
            })
            .is_ok()
    }

    fn delay_create(
        &self,
        delay: Duration,
        interval: Duration,
        job: Job,
        singleton: bool,
        times: i64,
        status: EntryStatus,
    ) -> Entry {
        // The registration lives in this timer's own queue, so it must not
        // keep the timer alive.
        let timer = Arc::downgrade(&self.inner);
        let registration = Job::new(move || {
            let timer = timer.upgrade().map(|inner| Timer { inner });
            let job = job.clone();
            async move {
                match timer {
                    Some(timer) => {
                        timer.create_entry(interval, job, singleton, times, status);
                    }
                    None => trace!("Timer dropped before delayed registration fired"),
                }
            }
        });
        self.create_entry(delay, registration, true, 1, EntryStatus::Ready)
    }

    fn create_entry(
        &self,
        interval: Duration,
        job: Job,
        singleton: bool,
        times: i64,
        status: EntryStatus,
    ) -> Entry {
        let interval_ticks = ticks_for(interval, self.inner.config.interval);
        let next_tick = self.ticks().saturating_add(interval_ticks);
        let id: EntryId = self.inner.next_entry_id.fetch_add(1, Ordering::Relaxed);

        let entry = Entry::new(
            id,
            job,
            Arc::clone(&self.inner.ticks),
            EntrySettings {
                interval_ticks,
                next_tick,
                singleton,
                times,
                status,
                panic_policy: self.inner.config.panic_policy,
            },
        );
        self.inner.queue.push(entry.clone(), next_tick);

        debug!(
            entry_id = id,
            interval_ticks,
            next_tick,
            singleton,
            times,
            ?status,
            "Entry added"
        );
        entry
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("status", &self.status())
            .field("ticks", &self.ticks())
            .field("interval", &self.interval())
            .finish()
    }
}

impl TimerInner {
    fn status(&self) -> TimerStatus {
        TimerStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// 推进一个滴答，必要时扫描队列
    /// Advance one tick and scan the queue if anything may be due
    fn advance(&self) {
        let current_tick = self.ticks.fetch_add(1, Ordering::AcqRel) + 1;
        if current_tick < self.queue.next_priority() {
            return;
        }
        self.proceed(current_tick);
    }

    fn proceed(&self, current_tick: i64) {
        let mut checked = 0usize;
        while let Some(entry) = self.queue.pop() {
            let next_tick = entry.next_tick();
            if current_tick < next_tick {
                // Not due yet (its key was stale, e.g. after a reset).
                self.queue.push(entry, next_tick);
                break;
            }

            entry.check_and_run(current_tick);
            checked += 1;

            if entry.status() == EntryStatus::Closed {
                debug!(entry_id = entry.id(), "Entry dropped from timer");
            } else {
                let next_tick = entry.next_tick();
                self.queue.push(entry, next_tick);
            }
        }
        trace!(tick = current_tick, checked, "Timer scan complete");
    }

    /// Drop every queued entry, releasing jobs that captured a `Timer` handle.
    fn drain(&self) -> usize {
        let mut dropped = 0;
        while self.queue.pop().is_some() {
            dropped += 1;
        }
        dropped
    }
}

/// 把任务间隔换算为滴答数，最少一个滴答
/// Convert a job interval to ticks, at least one
fn ticks_for(interval: Duration, base: Duration) -> i64 {
    let ticks = interval.as_nanos() / base.as_nanos().max(1);
    i64::try_from(ticks).unwrap_or(i64::MAX).max(1)
}

/// 驱动任务主循环
/// Driver task main loop
async fn drive(timer: Weak<TimerInner>, first_tick: Instant, period: Duration) {
    let mut ticker = interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let Some(inner) = timer.upgrade() else {
            debug!("All timer handles dropped, driver exiting");
            break;
        };

        match inner.status() {
            TimerStatus::Running => inner.advance(),
            TimerStatus::Stopped => {}
            TimerStatus::Closed => {
                let dropped = inner.drain();
                info!(dropped, "Timer driver exited");
                break;
            }
        }
    }
}
