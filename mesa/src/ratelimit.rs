//! Fixed-window request limiting over an injected counter store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Duration, NaiveDateTime};

use crate::error::{Error, Result};

/// A request counter for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    /// Requests seen in the current window.
    pub count: u32,
    /// When the window closes.
    pub expires_at: NaiveDateTime,
}

/// Storage for rate-limit counters.
///
/// Implementations must make [`CounterStore::increment`] atomic per key.
pub trait CounterStore: Send + Sync {
    /// Returns the live counter for `key`, ignoring expired ones.
    fn get(&self, key: &str, now: NaiveDateTime) -> Option<Counter>;

    /// Counts one request for `key`, opening a window of length `window`
    /// when none is live, and returns the updated counter.
    fn increment(&self, key: &str, window: Duration, now: NaiveDateTime) -> Counter;

    /// Drops counters whose window closed at or before `now`; returns how
    /// many were dropped.
    fn expire(&self, now: NaiveDateTime) -> usize;
}

impl<S: CounterStore + ?Sized> CounterStore for Arc<S> {
    fn get(&self, key: &str, now: NaiveDateTime) -> Option<Counter> {
        (**self).get(key, now)
    }

    fn increment(&self, key: &str, window: Duration, now: NaiveDateTime) -> Counter {
        (**self).increment(key, window, now)
    }

    fn expire(&self, now: NaiveDateTime) -> usize {
        (**self).expire(now)
    }
}

impl<S: CounterStore + ?Sized> CounterStore for Box<S> {
    fn get(&self, key: &str, now: NaiveDateTime) -> Option<Counter> {
        (**self).get(key, now)
    }

    fn increment(&self, key: &str, window: Duration, now: NaiveDateTime) -> Counter {
        (**self).increment(key, window, now)
    }

    fn expire(&self, now: NaiveDateTime) -> usize {
        (**self).expire(now)
    }
}

/// Process-local counter store.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    counters: Mutex<HashMap<String, Counter>>,
}

impl MemoryCounterStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterStore for MemoryCounterStore {
    fn get(&self, key: &str, now: NaiveDateTime) -> Option<Counter> {
        let counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        counters
            .get(key)
            .copied()
            .filter(|counter| counter.expires_at > now)
    }

    fn increment(&self, key: &str, window: Duration, now: NaiveDateTime) -> Counter {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let counter = counters.entry(key.to_string()).or_insert(Counter {
            count: 0,
            expires_at: now + window,
        });
        if counter.expires_at <= now {
            *counter = Counter {
                count: 0,
                expires_at: now + window,
            };
        }
        counter.count = counter.count.saturating_add(1);
        *counter
    }

    fn expire(&self, now: NaiveDateTime) -> usize {
        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let before = counters.len();
        counters.retain(|_, counter| counter.expires_at > now);
        before - counters.len()
    }
}

/// Allows at most `max_requests` per key in each window.
///
/// A limit of zero disables limiting.
#[derive(Debug)]
pub struct RateLimiter<S> {
    store: S,
    max_requests: u32,
    window: Duration,
}

impl<S: CounterStore> RateLimiter<S> {
    /// Creates a limiter over `store`.
    pub fn new(store: S, max_requests: u32, window: Duration) -> Self {
        Self {
            store,
            max_requests,
            window,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Rejects a request for `key` when the key is over its limit, without
    /// counting it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RateLimited`] with the seconds left in the window.
    pub fn check(&self, key: &str, now: NaiveDateTime) -> Result<()> {
        if self.max_requests == 0 {
            return Ok(());
        }
        self.store.expire(now);
        if let Some(counter) = self.store.get(key, now) {
            if counter.count >= self.max_requests {
                let retry_after_secs = (counter.expires_at - now).num_seconds().max(1);
                log::warn!("rate limit hit for {key}; {retry_after_secs}s left");
                return Err(Error::RateLimited {
                    key: key.to_string(),
                    retry_after_secs,
                });
            }
        }
        Ok(())
    }

    /// Counts a request for `key` that was let through.
    pub fn record(&self, key: &str, now: NaiveDateTime) -> Counter {
        if self.max_requests == 0 {
            return Counter {
                count: 0,
                expires_at: now,
            };
        }
        self.store.increment(key, self.window, now)
    }

    /// Records a request for `key`, or rejects it when the key is over its
    /// limit. Rejected requests are not counted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RateLimited`] with the seconds left in the window.
    pub fn check_and_record(&self, key: &str, now: NaiveDateTime) -> Result<Counter> {
        self.check(key, now)?;
        Ok(self.record(key, now))
    }
}
