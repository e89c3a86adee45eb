//! Basic usage example for waitq
//!
//! Demonstrates blocking and timed pops, both gates, batch pushes, swapping
//! two queues, and reading the queue metrics.
//!
//! Run with `cargo run --example basic_usage --features tracing` to see the
//! queue's trace events.

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use waitq::metrics::MetricsCollector;
use waitq::queue::{CondvarQueue, MpmcQueue, SemaphoreQueue};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    waitq::trace::init_tracing();

    println!("waitq Usage Example");
    println!("===================");

    // Default queue: condition-variable gate over a VecDeque
    let queue: Arc<MpmcQueue<i32>> = Arc::new(MpmcQueue::new());

    println!("\n1. Basic Operations:");
    queue.push(42)?;
    queue.push(24)?;
    let position = queue.emplace(|| 7)?;
    println!("   Pushed: 42, 24, then emplaced 7 at position {}", position);
    println!("   try_pop: {:?}", queue.try_pop());
    println!("   pop_wait: {}", queue.pop_wait());
    println!("   pop_wait_for: {:?}", queue.pop_wait_for(Duration::from_millis(10)));
    println!("   empty queue, pop_wait_for: {:?}", queue.pop_wait_for(Duration::from_millis(10)));

    println!("\n2. Multi-Producer, Multi-Consumer:");
    let producer_handles: Vec<_> = (0..4)
        .map(|i| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || -> Result<usize, waitq::Error> {
                for j in 0..25 {
                    queue.push(i * 25 + j)?;
                }
                println!("   Producer {} finished", i);
                Ok(25)
            })
        })
        .collect();

    let consumer_handles: Vec<_> = (0..3)
        .map(|i| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let mut consumed = 0;
                let mut sum = 0;
                // Give up once producers have been quiet for a while.
                while let Some(value) = queue.pop_wait_for(Duration::from_millis(100)) {
                    consumed += 1;
                    sum += value;
                }
                println!("   Consumer {} finished: {} items, sum: {}", i, consumed, sum);
                (consumed, sum)
            })
        })
        .collect();

    let mut total_produced = 0;
    for handle in producer_handles {
        total_produced += handle.join().expect("producer panicked")?;
    }

    let mut total_consumed = 0;
    let mut total_sum = 0;
    for handle in consumer_handles {
        let (consumed, sum) = handle.join().expect("consumer panicked");
        total_consumed += consumed;
        total_sum += sum;
    }

    println!("   Produced: {}, consumed: {}, sum: {}", total_produced, total_consumed, total_sum);
    println!("   Queue size: {}", queue.len());

    println!("\n3. Semaphore Gate and Swap:");
    let inbox: Arc<SemaphoreQueue<String>> = Arc::new(SemaphoreQueue::new());
    let staging: SemaphoreQueue<String> = SemaphoreQueue::new();
    staging.push_batch(["alpha", "beta", "gamma"].map(String::from))?;

    let waiter = {
        let inbox = Arc::clone(&inbox);
        thread::spawn(move || (0..3).map(|_| inbox.pop_wait()).collect::<Vec<_>>())
    };

    thread::sleep(Duration::from_millis(20));
    inbox.swap(&staging);
    println!("   Waiter received after swap: {:?}", waiter.join().expect("waiter panicked"));

    println!("\n4. Batches and Drain:");
    let batch: CondvarQueue<u32> = CondvarQueue::with_capacity(16)?;
    println!("   Pushed {} values", batch.push_batch(1..=10)?);
    println!("   Drained: {:?}", batch.drain());

    println!("\n5. Metrics:");
    let metrics = queue.metrics();
    println!("   Pushes: {}, pops: {}", metrics.pushes, metrics.pops);
    println!("   Empty pops: {}, timeouts: {}", metrics.empty_pops, metrics.timeouts);
    println!("   Blocked pops: {}, average wait: {:?}", metrics.blocked_pops, metrics.avg_wait());
    println!("   Timeout rate: {:.2}%", metrics.timeout_rate());

    println!("\nUsage example completed successfully!");
    Ok(())
}
