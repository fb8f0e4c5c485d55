//! Bounded worker pool
//!
//! Runs a job over a list of items with at most `workers` threads. Items are
//! taken from a shared queue in order, so a slow item never holds back the
//! others. Used at every concurrency level: workflows, targets and the steps
//! of a concurrent group.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::thread;

use log::error;

fn lock_queue<T>(queue: &Mutex<VecDeque<T>>) -> MutexGuard<'_, VecDeque<T>> {
    queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Runs `job` on every item using at most `workers` threads, returning once
/// all items are processed.
///
/// With a single worker (or a single item) the items are processed on the
/// calling thread. Otherwise a panicking job ends its own worker, is logged,
/// and the remaining workers drain the queue.
pub fn run_bounded<T, F>(items: Vec<T>, workers: usize, job: F)
where
    T: Send,
    F: Fn(T) + Sync,
{
    let workers = workers.max(1).min(items.len());
    if workers <= 1 {
        items.into_iter().for_each(&job);
        return;
    }

    let queue = Mutex::new(items.into_iter().collect::<VecDeque<T>>());
    let queue = &queue;
    let job = &job;

    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(move || loop {
                    let next = lock_queue(queue).pop_front();
                    match next {
                        Some(item) => job(item),
                        None => break,
                    }
                })
            })
            .collect();

        for handle in handles {
            if handle.join().is_err() {
                error!("Worker thread panicked");
            }
        }
    });
}
