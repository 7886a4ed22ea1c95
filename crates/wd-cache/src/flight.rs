//! Per-key mutual exclusion for cache fills.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Set of keys with a conversion in flight.
///
/// Holding a [`KeyGuard`] for a key means no other caller holds one for the
/// same key. Unrelated keys never wait on each other's work.
#[derive(Debug, Default)]
pub(crate) struct KeyLocks {
    in_flight: Mutex<HashSet<String>>,
    released: Condvar,
}

impl KeyLocks {
    /// Block until `key` is free, then claim it.
    pub(crate) fn lock(&self, key: &str) -> KeyGuard<'_> {
        let mut in_flight = self.set();
        while in_flight.contains(key) {
            in_flight = self
                .released
                .wait(in_flight)
                .unwrap_or_else(PoisonError::into_inner);
        }
        in_flight.insert(key.to_owned());
        KeyGuard {
            locks: self,
            key: key.to_owned(),
        }
    }

    fn set(&self) -> MutexGuard<'_, HashSet<String>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.set().len()
    }
}

/// Claim on one key, released on drop (including unwinding).
pub(crate) struct KeyGuard<'a> {
    locks: &'a KeyLocks,
    key: String,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.locks.set().remove(&self.key);
        self.locks.released.notify_all();
    }
}
