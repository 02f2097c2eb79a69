//! Concurrency limit for verifier invocations.
//!
//! This module provides a semaphore-based pool that bounds how many verifier
//! processes run at once. The semaphore is fair, so units that ask for a
//! permit in resolution order also start in resolution order.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Pool of execution slots for verifier units.
///
/// # Examples
///
/// ```
/// use imgverify_core::pool::UnitPool;
///
/// # #[tokio::main]
/// # async fn main() {
/// let pool = UnitPool::new(2);
///
/// let permit = pool.acquire().await.expect("pool is open");
/// assert_eq!(pool.available_permits(), 1);
/// drop(permit);
/// assert_eq!(pool.available_permits(), 2);
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct UnitPool {
    semaphore: Arc<Semaphore>,
    /// Maximum number of concurrently running units.
    pub max_concurrent: usize,
}

impl UnitPool {
    /// Creates a pool with `max_concurrent` slots (at least one).
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    /// Sizes a pool from the verifier cap.
    ///
    /// A negative cap runs every unit at once; a positive cap bounds
    /// concurrency to the cap.
    pub fn for_units(max_verifiers: i32, unit_count: usize) -> Self {
        match usize::try_from(max_verifiers) {
            Ok(cap) if cap > 0 => Self::new(cap.min(unit_count)),
            _ => Self::new(unit_count),
        }
    }

    /// Waits for a free slot.
    ///
    /// Returns `None` once the pool has been closed; the slot is released
    /// when the permit is dropped.
    pub async fn acquire(&self) -> Option<UnitPermit> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .ok()
            .map(|permit| UnitPermit { _permit: permit })
    }

    /// Closes the pool; pending and future acquires return `None`.
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Returns the current number of free slots.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// A held execution slot.
#[derive(Debug)]
pub struct UnitPermit {
    _permit: OwnedSemaphorePermit,
}
