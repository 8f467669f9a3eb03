//! 优先级队列测试
//! Priority queue tests

use super::*;
use proptest::prelude::*;
use rand::Rng;
use std::sync::Arc;
use std::thread;

fn drain(queue: &PriorityQueue<u32>) -> Vec<i64> {
    let mut priorities = Vec::new();
    while let Some((_, priority)) = queue.pop_with_priority() {
        priorities.push(priority);
    }
    priorities
}

#[test]
fn test_empty_queue() {
    let queue: PriorityQueue<u32> = PriorityQueue::new(HeapOrder::Min);
    assert!(queue.is_empty());
    assert_eq!(queue.len(), 0);
    assert_eq!(queue.next_priority(), i64::MAX);
    assert!(queue.pop().is_none());
    // 空队列弹出后水位线保持哨兵值
    assert_eq!(queue.next_priority(), i64::MAX);
}

#[test]
fn test_pop_order_with_duplicates() {
    let queue = PriorityQueue::new(HeapOrder::Min);
    for (value, priority) in [("a", 5), ("b", 1), ("c", 3), ("d", 1), ("e", 4)] {
        queue.push(value, priority);
    }
    assert_eq!(queue.len(), 5);

    let mut popped = Vec::new();
    while let Some(item) = queue.pop_with_priority() {
        popped.push(item);
    }
    let priorities: Vec<i64> = popped.iter().map(|(_, p)| *p).collect();
    assert_eq!(priorities, vec![1, 1, 3, 4, 5]);

    // 两个优先级为1的元素可以任意顺序出队
    let mut ties: Vec<&str> = popped[..2].iter().map(|(v, _)| *v).collect();
    ties.sort();
    assert_eq!(ties, vec!["b", "d"]);
    assert_eq!(popped[2].0, "c");
    assert_eq!(popped[3].0, "e");
    assert_eq!(popped[4].0, "a");
}

#[test]
fn test_watermark_tracks_minimum() {
    let queue = PriorityQueue::new(HeapOrder::Min);
    queue.push(1u32, 10);
    assert_eq!(queue.next_priority(), 10);
    queue.push(2, 20);
    assert_eq!(queue.next_priority(), 10);
    queue.push(3, 5);
    assert_eq!(queue.next_priority(), 5);

    assert_eq!(queue.pop(), Some(3));
    assert_eq!(queue.next_priority(), 10);
    assert_eq!(queue.pop(), Some(1));
    assert_eq!(queue.next_priority(), 20);
    assert_eq!(queue.pop(), Some(2));
    assert_eq!(queue.next_priority(), i64::MAX);
}

#[test]
fn test_max_heap_order() {
    let queue = PriorityQueue::new(HeapOrder::Max);
    assert_eq!(queue.next_priority(), i64::MIN);
    for priority in [5, 1, 3, 1, 4] {
        queue.push(0u32, priority);
    }
    assert_eq!(queue.next_priority(), 5);
    assert_eq!(drain(&queue), vec![5, 4, 3, 1, 1]);
    assert_eq!(queue.next_priority(), i64::MIN);
}

#[test]
fn test_negative_priorities() {
    let queue = PriorityQueue::default();
    queue.push(1u32, -3);
    queue.push(2, 0);
    queue.push(3, -10);
    assert_eq!(queue.next_priority(), -10);
    assert_eq!(drain(&queue), vec![-10, -3, 0]);
}

#[test]
fn test_random_pushes_pop_sorted() {
    let mut rng = rand::rng();
    let queue = PriorityQueue::new(HeapOrder::Min);
    let mut expected: Vec<i64> = (0..500).map(|_| rng.random_range(-1000..1000)).collect();
    for (i, priority) in expected.iter().enumerate() {
        queue.push(i as u32, *priority);
    }
    expected.sort();
    assert_eq!(drain(&queue), expected);
}

#[test]
fn test_interleaved_push_pop() {
    let queue = PriorityQueue::new(HeapOrder::Min);
    queue.push(1u32, 7);
    queue.push(2, 3);
    assert_eq!(queue.pop(), Some(2));
    queue.push(3, 1);
    assert_eq!(queue.next_priority(), 1);
    assert_eq!(queue.pop(), Some(3));
    assert_eq!(queue.pop(), Some(1));
    assert!(queue.pop().is_none());
}

#[test]
fn test_concurrent_push() {
    let queue = Arc::new(PriorityQueue::new(HeapOrder::Min));
    let handles: Vec<_> = (0..8u32)
        .map(|t| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..100u32 {
                    queue.push(t * 100 + i, i64::from(t * 100 + i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(queue.len(), 800);
    assert_eq!(queue.next_priority(), 0);
    let priorities = drain(&queue);
    assert_eq!(priorities, (0..800).collect::<Vec<i64>>());
}

proptest! {
    #[test]
    fn prop_pops_are_non_decreasing(priorities in prop::collection::vec(any::<i64>(), 0..200)) {
        let queue = PriorityQueue::new(HeapOrder::Min);
        for (i, priority) in priorities.iter().enumerate() {
            queue.push(i as u32, *priority);
        }
        let popped = drain(&queue);
        prop_assert_eq!(popped.len(), priorities.len());
        prop_assert!(popped.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn prop_watermark_is_minimum_of_remaining(
        priorities in prop::collection::vec(-1000i64..1000, 1..100),
        pops in 0usize..100,
    ) {
        let queue = PriorityQueue::new(HeapOrder::Min);
        for (i, priority) in priorities.iter().enumerate() {
            queue.push(i as u32, *priority);
            let seen_min = priorities[..=i].iter().copied().min();
            prop_assert_eq!(Some(queue.next_priority()), seen_min);
        }

        let mut remaining = priorities.clone();
        remaining.sort();
        let pops = pops.min(remaining.len());
        for _ in 0..pops {
            queue.pop();
        }
        let expected = remaining.get(pops).copied().unwrap_or(i64::MAX);
        prop_assert_eq!(queue.next_priority(), expected);
    }
}
