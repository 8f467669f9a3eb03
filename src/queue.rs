//! 基于二叉堆的优先级队列
//! Binary-heap based priority queue
//!
//! 队列按外部提供的 `i64` 优先级排序，并缓存当前堆顶的优先级（水位线），
//! 调用方无需加锁即可读取，用于廉价地判断是否需要扫描队列。
//!
//! The queue is ordered by an externally supplied `i64` priority and caches
//! the priority at the top of the heap (the watermark), which callers can read
//! without taking the lock to cheaply decide whether a scan is worthwhile.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[cfg(test)]
mod tests;

/// 堆的排序方向
/// Ordering direction of the heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeapOrder {
    /// Smaller priority values are served first.
    /// 优先级值越小越先出队。
    #[default]
    Min,
    /// Larger priority values are served first.
    /// 优先级值越大越先出队。
    Max,
}

impl HeapOrder {
    /// 空队列时水位线的哨兵值
    /// Sentinel watermark reported by an empty queue
    pub fn sentinel(self) -> i64 {
        match self {
            HeapOrder::Min => i64::MAX,
            HeapOrder::Max => i64::MIN,
        }
    }

    /// Whether `a` must be served before `b`.
    fn more_urgent(self, a: i64, b: i64) -> bool {
        match self {
            HeapOrder::Min => a < b,
            HeapOrder::Max => a > b,
        }
    }
}

#[derive(Debug)]
struct QueueItem<T> {
    value: T,
    priority: i64,
    order: HeapOrder,
}

impl<T> PartialEq for QueueItem<T> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority
    }
}

impl<T> Eq for QueueItem<T> {}

impl<T> PartialOrd for QueueItem<T> {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for QueueItem<T> {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // BinaryHeap is a max-heap; flip the comparison for min ordering.
        match self.order {
            HeapOrder::Max => self.priority.cmp(&other.priority),
            HeapOrder::Min => other.priority.cmp(&self.priority),
        }
    }
}

/// 线程安全的优先级队列
/// Thread-safe priority queue
///
/// `push` 和 `pop` 在队列内部的互斥锁下串行执行；`next_priority` 是对
/// 原子变量的无锁读取，仅作为提示使用。相同优先级的元素出队顺序不保证
/// 与入队顺序一致。
///
/// `push` and `pop` serialize on a mutex private to the queue, while
/// `next_priority` is a lock-free read of an atomic and only a hint. Items
/// with equal priority are not guaranteed to leave in insertion order.
#[derive(Debug)]
pub struct PriorityQueue<T> {
    heap: Mutex<BinaryHeap<QueueItem<T>>>,
    order: HeapOrder,
    next_priority: AtomicI64,
}

impl<T> PriorityQueue<T> {
    /// 创建新的优先级队列
    /// Create a new priority queue
    pub fn new(order: HeapOrder) -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            order,
            next_priority: AtomicI64::new(order.sentinel()),
        }
    }

    /// 队列的排序方向
    /// Ordering direction of this queue
    pub fn order(&self) -> HeapOrder {
        self.order
    }

    /// 以给定优先级插入元素
    /// Push a value with the given priority
    pub fn push(&self, value: T, priority: i64) {
        let mut heap = self.lock();
        heap.push(QueueItem {
            value,
            priority,
            order: self.order,
        });
        // Writes to the watermark happen under the heap lock, so a plain
        // load-compare-store cannot race with another writer.
        let watermark = self.next_priority.load(Ordering::Acquire);
        if self.order.more_urgent(priority, watermark) {
            self.next_priority.store(priority, Ordering::Release);
        }
    }

    /// 弹出优先级最高的元素
    /// Pop the most urgent value
    pub fn pop(&self) -> Option<T> {
        self.pop_with_priority().map(|(value, _)| value)
    }

    /// 弹出优先级最高的元素及其优先级
    /// Pop the most urgent value together with its priority
    pub fn pop_with_priority(&self) -> Option<(T, i64)> {
        let mut heap = self.lock();
        let item = heap.pop()?;
        let watermark = heap
            .peek()
            .map_or(self.order.sentinel(), |top| top.priority);
        self.next_priority.store(watermark, Ordering::Release);
        Some((item.value, item.priority))
    }

    /// 当前堆顶的优先级（水位线），队列为空时返回哨兵值
    /// Priority at the top of the heap (the watermark), or the sentinel when empty
    pub fn next_priority(&self) -> i64 {
        self.next_priority.load(Ordering::Acquire)
    }

    /// 队列中的元素个数
    /// Number of queued values
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// 队列是否为空
    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BinaryHeap<QueueItem<T>>> {
        // The heap stays structurally valid even if a holder panicked.
        self.heap.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new(HeapOrder::Min)
    }
}
