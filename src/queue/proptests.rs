//! Property-based tests for the MPMC queue using proptest
//!
//! Single-threaded operation sequences are replayed against both gates and
//! against a plain `VecDeque` model; the queue must agree with the model after
//! every step.

use crate::queue::{CondvarGate, Gate, MpmcQueue, SemaphoreGate};
use proptest::prelude::*;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
enum Op {
    Push(i32),
    Emplace(i32),
    PushBatch(Vec<i32>),
    TryPop,
    PopWaitFor,
    PopWaitUntilPast,
    Drain,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => any::<i32>().prop_map(Op::Push),
        1 => any::<i32>().prop_map(Op::Emplace),
        1 => prop::collection::vec(any::<i32>(), 0..8).prop_map(Op::PushBatch),
        3 => Just(Op::TryPop),
        1 => Just(Op::PopWaitFor),
        1 => Just(Op::PopWaitUntilPast),
        1 => Just(Op::Drain),
    ]
}

fn replay<G: Gate>(ops: &[Op]) -> std::result::Result<(), TestCaseError> {
    let queue: MpmcQueue<i32, G> = MpmcQueue::new();
    let mut model: VecDeque<i32> = VecDeque::new();

    for op in ops {
        match op {
            Op::Push(value) => {
                queue.push(*value).unwrap();
                model.push_back(*value);
            }
            Op::Emplace(value) => {
                let position = queue.emplace(|| *value).unwrap();
                prop_assert_eq!(position, model.len());
                model.push_back(*value);
            }
            Op::PushBatch(values) => {
                prop_assert_eq!(queue.push_batch(values.iter().copied()).unwrap(), values.len());
                model.extend(values.iter().copied());
            }
            Op::TryPop => {
                prop_assert_eq!(queue.try_pop(), model.pop_front());
            }
            Op::PopWaitFor => {
                // Non-empty queues answer at once; empty ones time out quickly.
                prop_assert_eq!(
                    queue.pop_wait_for(Duration::from_micros(200)),
                    model.pop_front()
                );
            }
            Op::PopWaitUntilPast => {
                prop_assert_eq!(queue.pop_wait_until(Instant::now()), model.pop_front());
            }
            Op::Drain => {
                prop_assert_eq!(queue.drain(), model.drain(..).collect::<Vec<_>>());
            }
        }

        prop_assert_eq!(queue.len(), model.len());
        prop_assert_eq!(queue.is_empty(), model.is_empty());
    }
    Ok(())
}

fn swap_matches_model<G: Gate>(
    left: &[i32],
    right: &[i32],
    pops_after: usize,
) -> std::result::Result<(), TestCaseError> {
    let a: MpmcQueue<i32, G> = MpmcQueue::new();
    let b: MpmcQueue<i32, G> = MpmcQueue::new();
    a.push_batch(left.iter().copied()).unwrap();
    b.push_batch(right.iter().copied()).unwrap();

    a.swap(&b);

    let mut expected_a: VecDeque<i32> = right.iter().copied().collect();
    let mut expected_b: VecDeque<i32> = left.iter().copied().collect();

    for _ in 0..pops_after {
        prop_assert_eq!(a.try_pop(), expected_a.pop_front());
        prop_assert_eq!(b.try_pop(), expected_b.pop_front());
    }

    prop_assert_eq!(a.len(), expected_a.len());
    prop_assert_eq!(b.len(), expected_b.len());
    Ok(())
}

mod condvar_gate_properties {
    use super::*;

    proptest! {
        #[test]
        fn test_fifo_ordering_single_thread(
            values in prop::collection::vec(any::<i32>(), 0..200)
        ) {
            let queue: MpmcQueue<i32, CondvarGate> = MpmcQueue::new();
            for &value in &values {
                queue.push(value).unwrap();
            }
            for &expected in &values {
                prop_assert_eq!(queue.try_pop(), Some(expected));
            }
            prop_assert!(queue.is_empty());
        }

        #[test]
        fn test_operations_match_model(ops in prop::collection::vec(op_strategy(), 1..100)) {
            replay::<CondvarGate>(&ops)?;
        }

        #[test]
        fn test_swap_matches_model(
            left in prop::collection::vec(any::<i32>(), 0..20),
            right in prop::collection::vec(any::<i32>(), 0..20),
            pops_after in 0usize..25,
        ) {
            swap_matches_model::<CondvarGate>(&left, &right, pops_after)?;
        }
    }
}

mod semaphore_gate_properties {
    use super::*;

    proptest! {
        #[test]
        fn test_fifo_ordering_single_thread(
            values in prop::collection::vec(any::<i32>(), 0..200)
        ) {
            let queue: MpmcQueue<i32, SemaphoreGate> = MpmcQueue::new();
            for &value in &values {
                queue.push(value).unwrap();
            }
            for &expected in &values {
                prop_assert_eq!(queue.pop_wait(), expected);
            }
            prop_assert!(queue.is_empty());
            prop_assert_eq!(queue.available_permits(), 0);
        }

        #[test]
        fn test_operations_match_model(ops in prop::collection::vec(op_strategy(), 1..100)) {
            replay::<SemaphoreGate>(&ops)?;
        }

        #[test]
        fn test_permits_track_length(ops in prop::collection::vec(op_strategy(), 1..100)) {
            let queue: MpmcQueue<i32, SemaphoreGate> = MpmcQueue::new();
            for op in &ops {
                match op {
                    Op::Push(v) | Op::Emplace(v) => queue.push(*v).unwrap(),
                    Op::PushBatch(vs) => {
                        queue.push_batch(vs.iter().copied()).unwrap();
                    }
                    Op::TryPop | Op::PopWaitFor | Op::PopWaitUntilPast => {
                        queue.try_pop();
                    }
                    Op::Drain => {
                        queue.drain();
                    }
                }
                // Single-threaded, so the count is exact.
                prop_assert_eq!(queue.available_permits(), queue.len());
            }
        }

        #[test]
        fn test_swap_matches_model(
            left in prop::collection::vec(any::<i32>(), 0..20),
            right in prop::collection::vec(any::<i32>(), 0..20),
            pops_after in 0usize..25,
        ) {
            swap_matches_model::<SemaphoreGate>(&left, &right, pops_after)?;
        }
    }
}
