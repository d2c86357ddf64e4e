//! The global "new items" counter shown next to the feed list.
//!
//! Read-state changes reset the counter as a side effect. A reconciliation
//! pass applies many of those without the user having looked at anything, so
//! it wraps its mutations in a [`SuppressedCount`] that puts the value back.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub trait NewItemCounter {
    fn get(&self) -> u64;
    fn set(&self, value: u64);
}

/// Shared atomic counter; clones observe the same value.
#[derive(Debug, Clone, Default)]
pub struct NewItemCount(Arc<AtomicU64>);

impl NewItemCount {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }
}

impl NewItemCounter for NewItemCount {
    fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    fn set(&self, value: u64) {
        self.0.store(value, Ordering::Relaxed);
    }
}

/// Snapshot of a counter that is written back on drop.
///
/// Restoration runs on every exit path, including `?` returns and panics
/// unwinding through the scope.
pub struct SuppressedCount<'a, C: NewItemCounter> {
    counter: &'a C,
    saved: u64,
}

impl<'a, C: NewItemCounter> SuppressedCount<'a, C> {
    pub fn new(counter: &'a C) -> Self {
        Self {
            saved: counter.get(),
            counter,
        }
    }

    pub fn saved(&self) -> u64 {
        self.saved
    }
}

impl<C: NewItemCounter> Drop for SuppressedCount<'_, C> {
    fn drop(&mut self) {
        self.counter.set(self.saved);
    }
}
