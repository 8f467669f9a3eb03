//! 定时任务函数及其返回控制
//! Timer job functions and their return control

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// 任务体执行完成后对其条目的请求
/// What a finished job body asks of its entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobControl {
    /// Keep the entry scheduled.
    /// 保持条目的调度。
    #[default]
    Continue,
    /// Close the entry. This is a normal, voluntary exit and not an error.
    /// 关闭条目。这是正常的主动退出，而不是错误。
    Exit,
}

impl From<()> for JobControl {
    fn from(_: ()) -> Self {
        JobControl::Continue
    }
}

/// Returns the voluntary exit signal for a job body.
///
/// 返回任务体的主动退出信号。
///
/// ```
/// # async fn demo(timer: tickwheel::Timer) {
/// use std::time::Duration;
///
/// timer.add(Duration::from_millis(100), || async {
///     if work_done() {
///         return tickwheel::exit();
///     }
///     tickwheel::JobControl::Continue
/// });
/// # }
/// # fn work_done() -> bool { true }
/// ```
pub fn exit() -> JobControl {
    JobControl::Exit
}

/// A boxed job future.
pub type JobFuture = Pin<Box<dyn Future<Output = JobControl> + Send + 'static>>;

/// 可重复调用的任务函数
/// A repeatedly callable job function
///
/// Every dispatch calls the function once and drives the returned future on
/// its own tokio task.
///
/// 每次调度调用一次该函数，并在独立的 tokio 任务上驱动返回的 future。
#[derive(Clone)]
pub struct Job {
    func: Arc<dyn Fn() -> JobFuture + Send + Sync + 'static>,
}

impl Job {
    /// 从异步闭包创建任务
    /// Create a job from an async closure
    pub fn new<F, Fut, R>(func: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<JobControl>,
    {
        Self {
            func: Arc::new(move || -> JobFuture {
                let fut = func();
                Box::pin(async move { fut.await.into() })
            }),
        }
    }

    pub(crate) fn call(&self) -> JobFuture {
        (self.func)()
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").field("func", &"<closure>").finish()
    }
}
