//! Performance benchmarks for the blocking MPMC queue
//!
//! The multi-threaded groups reproduce a producer/consumer workload harness:
//! every worker rendezvous on a "set up" barrier, all of them are released
//! together by a "start" barrier, and the timed region ends when the last
//! worker reaches the "stop" barrier. A fixed number of items is split across
//! the producers and across the consumers; each consumer makes exactly its
//! share of blocking `pop_wait` calls. Workloads:
//!
//! - normal: producers push as fast as possible
//! - slow: producers sleep between pushes
//! - stub: producers and consumers work on a thread-local `VecDeque` and
//!   never touch the shared queue (harness overhead)
//!
//! Every workload is timed twice: wall-clock time and process CPU time
//! (the `_cpu` benchmark ids). Both gates are compared against
//! `crossbeam::channel::unbounded` and `crossbeam::queue::SegQueue`.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use crossbeam::channel::{unbounded as crossbeam_unbounded, Receiver, Sender};
use crossbeam::queue::SegQueue;
use std::collections::VecDeque;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};
use waitq::queue::{CondvarQueue, SemaphoreQueue};

// Benchmark configurations
const TOTAL_ITEMS: usize = 40_000;
const SLOW_TOTAL_ITEMS: usize = 400;
const SLOW_PRODUCER_DELAY: Duration = Duration::from_micros(20);
const THREAD_CONFIGS: &[(usize, usize)] = &[(1, 1), (2, 2), (4, 4), (8, 2), (2, 8)];
const SINGLE_THREAD_SIZES: &[usize] = &[16, 256, 4096];

/// What the workload needs from a queue
trait BenchQueue: Send + Sync + 'static {
    fn create() -> Self;
    fn put(&self, value: u64);
    fn take(&self) -> u64;
}

impl BenchQueue for CondvarQueue<u64> {
    fn create() -> Self {
        CondvarQueue::new()
    }

    fn put(&self, value: u64) {
        self.push(value).unwrap();
    }

    fn take(&self) -> u64 {
        self.pop_wait()
    }
}

impl BenchQueue for SemaphoreQueue<u64> {
    fn create() -> Self {
        SemaphoreQueue::new()
    }

    fn put(&self, value: u64) {
        self.push(value).unwrap();
    }

    fn take(&self) -> u64 {
        self.pop_wait()
    }
}

struct CrossbeamChannel {
    sender: Sender<u64>,
    receiver: Receiver<u64>,
}

impl BenchQueue for CrossbeamChannel {
    fn create() -> Self {
        let (sender, receiver) = crossbeam_unbounded();
        Self { sender, receiver }
    }

    fn put(&self, value: u64) {
        self.sender.send(value).unwrap();
    }

    fn take(&self) -> u64 {
        self.receiver.recv().unwrap()
    }
}

impl BenchQueue for SegQueue<u64> {
    fn create() -> Self {
        SegQueue::new()
    }

    fn put(&self, value: u64) {
        self.push(value);
    }

    // SegQueue cannot block; spin with yields.
    fn take(&self) -> u64 {
        loop {
            if let Some(value) = self.pop() {
                return value;
            }
            thread::yield_now();
        }
    }
}

#[derive(Clone, Copy)]
enum Workload {
    Normal,
    Slow,
    Stub,
}

impl Workload {
    fn total_items(self) -> usize {
        match self {
            Workload::Slow => SLOW_TOTAL_ITEMS,
            Workload::Normal | Workload::Stub => TOTAL_ITEMS,
        }
    }
}

#[derive(Clone, Copy)]
enum Clock {
    Wall,
    Cpu,
}

/// Wall-clock and process CPU time spent between "start" and "stop"
struct WorkloadTimes {
    wall: Duration,
    cpu: Duration,
}

/// CPU time consumed by every thread of this process so far
#[cfg(unix)]
fn process_cpu_time() -> Duration {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid, writable timespec.
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_PROCESS_CPUTIME_ID, &mut ts) };
    assert_eq!(rc, 0, "clock_gettime(CLOCK_PROCESS_CPUTIME_ID) failed");
    Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32)
}

#[cfg(not(unix))]
fn process_cpu_time() -> Duration {
    Duration::ZERO
}

/// Split `total` across `workers`, the last one taking the remainder
fn share(total: usize, workers: usize, index: usize) -> usize {
    let each = total / workers;
    if index + 1 == workers {
        total - each * (workers - 1)
    } else {
        each
    }
}

/// Run one barrier-aligned workload
fn run_workload<Q: BenchQueue>(producers: usize, consumers: usize, kind: Workload) -> WorkloadTimes {
    let queue = Arc::new(Q::create());
    let total = kind.total_items();
    let workers = producers + consumers;
    // +1 for the timing thread.
    let setup = Arc::new(Barrier::new(workers + 1));
    let start = Arc::new(Barrier::new(workers + 1));
    let stop = Arc::new(Barrier::new(workers + 1));

    let mut handles = Vec::with_capacity(workers);

    for p in 0..producers {
        let items = share(total, producers, p);
        let queue = Arc::clone(&queue);
        let (setup, start, stop) = (Arc::clone(&setup), Arc::clone(&start), Arc::clone(&stop));
        handles.push(thread::spawn(move || {
            let mut local = VecDeque::with_capacity(items);
            setup.wait();
            start.wait();
            match kind {
                Workload::Normal => {
                    for i in 0..items {
                        queue.put(i as u64);
                    }
                }
                Workload::Slow => {
                    for i in 0..items {
                        queue.put(i as u64);
                        // No sleep after the last push.
                        if i + 1 < items {
                            thread::sleep(SLOW_PRODUCER_DELAY);
                        }
                    }
                }
                Workload::Stub => {
                    for i in 0..items {
                        local.push_back(i as u64);
                    }
                    black_box(&local);
                }
            }
            stop.wait();
        }));
    }

    for c in 0..consumers {
        let items = share(total, consumers, c);
        let queue = Arc::clone(&queue);
        let (setup, start, stop) = (Arc::clone(&setup), Arc::clone(&start), Arc::clone(&stop));
        handles.push(thread::spawn(move || {
            let mut local: VecDeque<u64> = match kind {
                Workload::Stub => (0..items as u64).collect(),
                Workload::Normal | Workload::Slow => VecDeque::new(),
            };
            setup.wait();
            start.wait();
            match kind {
                Workload::Normal | Workload::Slow => {
                    for _ in 0..items {
                        black_box(queue.take());
                    }
                }
                Workload::Stub => {
                    while let Some(value) = local.pop_front() {
                        black_box(value);
                    }
                }
            }
            stop.wait();
        }));
    }

    setup.wait();
    let wall_start = Instant::now();
    let cpu_start = process_cpu_time();
    start.wait();
    stop.wait();
    let wall = wall_start.elapsed();
    let cpu = process_cpu_time().saturating_sub(cpu_start);

    for handle in handles {
        handle.join().unwrap();
    }
    WorkloadTimes { wall, cpu }
}

fn bench_workload<Q: BenchQueue>(c: &mut Criterion, group_name: &str, name: &str, kind: Workload) {
    let mut group = c.benchmark_group(group_name);
    group.sample_size(10);
    group.throughput(Throughput::Elements(kind.total_items() as u64));

    for &(producers, consumers) in THREAD_CONFIGS {
        for clock in [Clock::Wall, Clock::Cpu] {
            let id = match clock {
                Clock::Wall => name.to_string(),
                Clock::Cpu => format!("{}_cpu", name),
            };
            group.bench_with_input(
                BenchmarkId::new(id, format!("{}p{}c", producers, consumers)),
                &(producers, consumers),
                |b, &(producers, consumers)| {
                    b.iter_custom(|iters| {
                        (0..iters)
                            .map(|_| {
                                let times = run_workload::<Q>(producers, consumers, kind);
                                match clock {
                                    Clock::Wall => times.wall,
                                    Clock::Cpu => times.cpu,
                                }
                            })
                            .sum()
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_producer_consumer(c: &mut Criterion) {
    bench_workload::<CondvarQueue<u64>>(c, "producer_consumer", "condvar", Workload::Normal);
    bench_workload::<SemaphoreQueue<u64>>(c, "producer_consumer", "semaphore", Workload::Normal);
    bench_workload::<CrossbeamChannel>(c, "producer_consumer", "crossbeam_channel", Workload::Normal);
    bench_workload::<SegQueue<u64>>(c, "producer_consumer", "crossbeam_segqueue", Workload::Normal);
}

fn bench_slow_producer(c: &mut Criterion) {
    bench_workload::<CondvarQueue<u64>>(c, "slow_producer", "condvar", Workload::Slow);
    bench_workload::<SemaphoreQueue<u64>>(c, "slow_producer", "semaphore", Workload::Slow);
    bench_workload::<CrossbeamChannel>(c, "slow_producer", "crossbeam_channel", Workload::Slow);
}

fn bench_harness_overhead(c: &mut Criterion) {
    bench_workload::<CondvarQueue<u64>>(c, "stub_workers", "stub", Workload::Stub);
}

// Single-threaded benchmarks
fn bench_single_thread_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_thread_push_pop");

    for &size in SINGLE_THREAD_SIZES {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("condvar", size), &size, |b, &size| {
            let queue: CondvarQueue<u64> = CondvarQueue::new();
            b.iter(|| {
                for i in 0..size {
                    queue.push(black_box(i as u64)).unwrap();
                }
                for _ in 0..size {
                    black_box(queue.pop_wait());
                }
            })
        });

        group.bench_with_input(BenchmarkId::new("semaphore", size), &size, |b, &size| {
            let queue: SemaphoreQueue<u64> = SemaphoreQueue::new();
            b.iter(|| {
                for i in 0..size {
                    queue.push(black_box(i as u64)).unwrap();
                }
                for _ in 0..size {
                    black_box(queue.pop_wait());
                }
            })
        });

        group.bench_with_input(BenchmarkId::new("condvar_batch", size), &size, |b, &size| {
            let queue: CondvarQueue<u64> = CondvarQueue::new();
            b.iter(|| {
                queue.push_batch((0..size as u64).map(black_box)).unwrap();
                black_box(queue.drain());
            })
        });

        group.bench_with_input(BenchmarkId::new("crossbeam_segqueue", size), &size, |b, &size| {
            let queue: SegQueue<u64> = SegQueue::new();
            b.iter(|| {
                for i in 0..size {
                    queue.push(black_box(i as u64));
                }
                for _ in 0..size {
                    black_box(queue.pop());
                }
            })
        });
    }

    group.finish();
}

fn bench_empty_try_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("empty_try_pop");

    let condvar: CondvarQueue<u64> = CondvarQueue::new();
    group.bench_function("condvar", |b| b.iter(|| black_box(condvar.try_pop())));

    // The semaphore gate answers without touching the storage lock.
    let semaphore: SemaphoreQueue<u64> = SemaphoreQueue::new();
    group.bench_function("semaphore", |b| b.iter(|| black_box(semaphore.try_pop())));

    group.finish();
}

criterion_group!(
    benches,
    bench_single_thread_push_pop,
    bench_empty_try_pop,
    bench_producer_consumer,
    bench_slow_producer,
    bench_harness_overhead
);

criterion_main!(benches);
