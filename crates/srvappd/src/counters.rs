//! Named counters exposed through the debug endpoints.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Signed 64-bit counter.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicI64,
}

impl Counter {
    /// Adds `delta`, which may be negative.
    pub fn add(&self, delta: i64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    /// Overwrites the value.
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Relaxed);
    }

    /// Current value.
    #[must_use]
    pub fn get_raw(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Registry creating counters on first use.
#[derive(Debug, Default)]
pub struct CounterRegistry {
    counters: RwLock<BTreeMap<String, Arc<Counter>>>,
}

impl CounterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the counter called `name`, creating it at zero.
    pub fn counter(&self, name: &str) -> Arc<Counter> {
        if let Some(counter) = self
            .counters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Arc::clone(counter);
        }
        let mut counters = self.counters.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(counters.entry(name.to_owned()).or_default())
    }

    /// Current values keyed by name.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, i64> {
        self.counters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, counter)| (name.clone(), counter.get_raw()))
            .collect()
    }
}
