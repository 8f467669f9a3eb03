//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use thiserror::Error;

/// The primary error type for the timer library.
/// 定时器库的主要错误类型。
///
/// Lifecycle operations on timers and entries are plain status toggles and
/// never fail; only construction can.
///
/// 定时器和条目的生命周期操作只是状态切换，不会失败；只有构造可能失败。
#[derive(Debug, Error)]
pub enum Error {
    /// The timer was created outside of a tokio runtime, so its driver
    /// task could not be spawned.
    /// 定时器在 tokio 运行时之外创建，无法启动驱动任务。
    #[error("no tokio runtime available to drive the timer: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;
