//! 定时器条目实现
//! Timer entry implementation
//!
//! 每个条目包装一个任务及其调度元数据（间隔滴答数、剩余次数、单例标志、
//! 状态、下次到期滴答）。状态字段使用原子操作，调用方无需争用队列锁即可
//! 启停条目。
//!
//! Each entry wraps one job with its scheduling metadata (interval in ticks,
//! remaining runs, singleton flag, status, next due tick). Status fields are
//! atomics so callers can toggle an entry without contending on the queue lock.

use crate::config::PanicPolicy;
use crate::timer::job::{Job, JobControl};
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU8, Ordering};
use tracing::{debug, error, trace};

/// 条目ID，在所属定时器内唯一
/// Entry ID, unique within its timer
pub type EntryId = u64;

/// 条目状态
/// Entry status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EntryStatus {
    /// Waiting for its next due tick.
    /// 等待下一个到期滴答。
    Ready = 0,
    /// At least one execution is in flight.
    /// 至少有一次执行正在进行。
    Running = 1,
    /// Skipped on every due check until started again.
    /// 在重新启动之前每次到期检查都会跳过。
    Stopped = 2,
    /// Terminal. The timer drops the entry the next time it is popped.
    /// 终止状态，定时器下次弹出时将其丢弃。
    Closed = 3,
}

impl EntryStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => EntryStatus::Ready,
            1 => EntryStatus::Running,
            2 => EntryStatus::Stopped,
            _ => EntryStatus::Closed,
        }
    }
}

/// Scheduling policy of a new entry.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EntrySettings {
    pub interval_ticks: i64,
    pub next_tick: i64,
    pub singleton: bool,
    /// Run limit; zero or negative means unlimited.
    pub times: i64,
    pub status: EntryStatus,
    pub panic_policy: PanicPolicy,
}

struct EntryInner {
    id: EntryId,
    job: Job,
    /// Tick counter of the owning timer.
    timer_ticks: Arc<AtomicI64>,
    interval_ticks: i64,
    times: AtomicI64,
    infinite: AtomicBool,
    singleton: AtomicBool,
    status: AtomicU8,
    next_tick: AtomicI64,
    panic_policy: PanicPolicy,
}

/// 定时任务条目的句柄
/// Handle to a scheduled job entry
///
/// The timer owns the entry's place in its queue; the handle only toggles
/// status and timing. Clones refer to the same entry.
///
/// 定时器拥有条目在队列中的位置；句柄只负责切换状态和时间。克隆体指向同一条目。
#[derive(Clone)]
pub struct Entry {
    inner: Arc<EntryInner>,
}

impl Entry {
    pub(crate) fn new(
        id: EntryId,
        job: Job,
        timer_ticks: Arc<AtomicI64>,
        settings: EntrySettings,
    ) -> Self {
        Self {
            inner: Arc::new(EntryInner {
                id,
                job,
                timer_ticks,
                interval_ticks: settings.interval_ticks,
                times: AtomicI64::new(settings.times),
                infinite: AtomicBool::new(settings.times <= 0),
                singleton: AtomicBool::new(settings.singleton),
                status: AtomicU8::new(settings.status as u8),
                next_tick: AtomicI64::new(settings.next_tick),
                panic_policy: settings.panic_policy,
            }),
        }
    }

    /// 条目ID
    /// Entry ID
    pub fn id(&self) -> EntryId {
        self.inner.id
    }

    /// 当前状态
    /// Current status
    pub fn status(&self) -> EntryStatus {
        EntryStatus::from_u8(self.inner.status.load(Ordering::Acquire))
    }

    /// 设置状态并返回之前的状态。已关闭的条目保持关闭。
    /// Set the status and return the previous one. A closed entry stays closed.
    pub fn set_status(&self, status: EntryStatus) -> EntryStatus {
        let previous = self
            .inner
            .status
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current != EntryStatus::Closed as u8).then_some(status as u8)
            })
            .unwrap_or_else(|closed| closed);
        EntryStatus::from_u8(previous)
    }

    /// 启动（恢复）条目
    /// Start (resume) the entry
    pub fn start(&self) {
        self.set_status(EntryStatus::Ready);
        debug!(entry_id = self.id(), "Entry started");
    }

    /// 暂停条目，它仍留在队列中直到被启动或关闭
    /// Pause the entry; it stays queued until started or closed
    pub fn stop(&self) {
        self.set_status(EntryStatus::Stopped);
        debug!(entry_id = self.id(), "Entry stopped");
    }

    /// 关闭条目，定时器将丢弃它
    /// Close the entry; the timer will drop it
    pub fn close(&self) {
        let previous = self.inner.status.swap(EntryStatus::Closed as u8, Ordering::AcqRel);
        if previous != EntryStatus::Closed as u8 {
            debug!(entry_id = self.id(), "Entry closed");
        }
    }

    /// 以定时器当前滴答为起点重新计算下次运行时间
    /// Restart the countdown to the next run from the timer's current tick
    pub fn reset(&self) {
        let now = self.inner.timer_ticks.load(Ordering::Acquire);
        self.inner
            .next_tick
            .store(now.saturating_add(self.inner.interval_ticks), Ordering::Release);
    }

    /// 是否为单例条目
    /// Whether the entry is a singleton
    pub fn is_singleton(&self) -> bool {
        self.inner.singleton.load(Ordering::Acquire)
    }

    /// 设置单例模式，单例条目的执行不会重叠
    /// Set singleton mode; executions of a singleton entry never overlap
    pub fn set_singleton(&self, enabled: bool) {
        self.inner.singleton.store(enabled, Ordering::Release);
    }

    /// 设置剩余运行次数上限
    /// Limit the remaining number of runs
    ///
    /// An entry whose runs are used up closes on its next due check, so a
    /// call before then grants it more runs.
    ///
    /// 次数耗尽的条目在下一次到期检查时关闭，在此之前调用可以追加运行次数。
    pub fn set_times(&self, times: i64) {
        self.inner.times.store(times, Ordering::Release);
        self.inner.infinite.store(false, Ordering::Release);
    }

    /// 两次运行之间的滴答数
    /// Number of ticks between runs
    pub fn interval_ticks(&self) -> i64 {
        self.inner.interval_ticks
    }

    /// 下次可运行的滴答
    /// Tick at or after which the entry may run next
    pub fn next_tick(&self) -> i64 {
        self.inner.next_tick.load(Ordering::Acquire)
    }

    /// 检查条目在给定滴答是否可运行，可运行时异步执行
    /// Check whether the entry may run at the given tick and dispatch it if so
    ///
    /// The next due tick is advanced before the status is evaluated, so a
    /// skipped entry is still re-evaluated one interval later.
    ///
    /// 在评估状态之前推进下次到期滴答，因此被跳过的条目也会在一个间隔后重新评估。
    pub(crate) fn check_and_run(&self, current_tick: i64) {
        if current_tick < self.next_tick() {
            return;
        }
        self.inner.next_tick.store(
            current_tick.saturating_add(self.inner.interval_ticks),
            Ordering::Release,
        );

        match self.status() {
            EntryStatus::Running => {
                if self.is_singleton() {
                    trace!(entry_id = self.id(), "Singleton entry still running, skipped");
                    return;
                }
            }
            EntryStatus::Ready => {
                if self
                    .inner
                    .status
                    .compare_exchange(
                        EntryStatus::Ready as u8,
                        EntryStatus::Running as u8,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    )
                    .is_err()
                {
                    return;
                }
            }
            EntryStatus::Stopped | EntryStatus::Closed => return,
        }

        self.run();
    }

    /// Dispatch the job on its own task if the run limit allows.
    fn run(&self) {
        if !self.inner.infinite.load(Ordering::Acquire) {
            let left = self.inner.times.fetch_sub(1, Ordering::AcqRel) - 1;
            if left < 0 {
                self.close();
                return;
            }
        }

        let entry = self.clone();
        tokio::spawn(async move {
            entry.execute().await;
        });
    }

    async fn execute(self) {
        let job = self.inner.job.clone();
        let outcome = AssertUnwindSafe(async move { job.call().await })
            .catch_unwind()
            .await;

        match outcome {
            Ok(JobControl::Continue) => {
                // Leave any status the job or a caller set in the meantime.
                let _ = self.inner.status.compare_exchange(
                    EntryStatus::Running as u8,
                    EntryStatus::Ready as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
            }
            Ok(JobControl::Exit) => {
                debug!(entry_id = self.id(), "Job requested exit");
                self.close();
            }
            Err(payload) => self.handle_panic(payload),
        }
    }

    fn handle_panic(&self, payload: Box<dyn Any + Send>) {
        let message = panic_message(payload.as_ref());
        match self.inner.panic_policy {
            PanicPolicy::Abort => {
                error!(entry_id = self.id(), panic = %message, "Timer job panicked, aborting");
                std::process::abort();
            }
            PanicPolicy::CloseEntry => {
                error!(entry_id = self.id(), panic = %message, "Timer job panicked, closing entry");
                self.close();
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("id", &self.id())
            .field("status", &self.status())
            .field("interval_ticks", &self.interval_ticks())
            .field("next_tick", &self.next_tick())
            .field("singleton", &self.is_singleton())
            .finish()
    }
}
