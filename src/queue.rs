//! Bounded concurrency queue
//!
//! Admits a fixed number of concurrently in-flight requests; excess callers
//! suspend until a slot frees. Admission is FIFO-fair (tokio's semaphore queues
//! waiters in arrival order). The queue inspects nothing about the request and
//! cannot fail, only suspend.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default cap on concurrently in-flight requests, sized to stay under a
/// server's own per-client throttling.
pub const DEFAULT_MAX_CONCURRENCY: usize = 30;

/// An admission slot. Dropping the ticket frees the slot and wakes the
/// longest-waiting pending admission; it is released exactly once regardless of
/// how the request completes.
#[derive(Debug)]
pub struct Ticket {
    _permit: OwnedSemaphorePermit,
}

/// FIFO-fair bounded admission queue
#[derive(Debug, Clone)]
pub struct ConcurrencyQueue {
    semaphore: Arc<Semaphore>,
    max_concurrency: usize,
}

impl ConcurrencyQueue {
    /// Create a queue admitting at most `max_concurrency` tickets at once.
    ///
    /// `max_concurrency` must be at least 1; values of 0 are clamped to 1.
    pub fn new(max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
        }
    }

    /// Suspend until a slot is free, then grant a ticket.
    pub async fn admit(&self) -> Ticket {
        // The semaphore is never closed, so acquire cannot fail.
        let permit = self
            .semaphore
            .clone()
            .acquire_many_owned(1)
            .await
            .expect("concurrency queue semaphore closed");
        Ticket { _permit: permit }
    }

    /// The configured maximum number of concurrent tickets
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Slots currently available (for diagnostics)
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl Default for ConcurrencyQueue {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENCY)
    }
}
