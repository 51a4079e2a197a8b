//! Per-target merge locks.
//!
//! Merges into the same target are serialised; merges into different targets
//! run in parallel. Waiters block on a condition variable for a bounded time
//! and give up with [`MergeError::MergeInProgress`].

use std::collections::HashSet;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use scn_types::ScenarioId;

use crate::error::{MergeError, MergeResult};

/// Registry of targets currently being merged into.
#[derive(Debug, Default)]
pub struct MergeLockRegistry {
    held: Mutex<HashSet<ScenarioId>>,
    released: Condvar,
}

impl MergeLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock for `target`, waiting at most `timeout` for a current
    /// holder to release it.
    pub fn acquire(&self, target: ScenarioId, timeout: Duration) -> MergeResult<MergeLockGuard<'_>> {
        let deadline = Instant::now() + timeout;
        let mut held = self.lock_set();
        while held.contains(&target) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!(target_scenario = %target, "merge lock wait timed out");
                return Err(MergeError::MergeInProgress { target });
            }
            held = self
                .released
                .wait_timeout(held, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        held.insert(target);
        Ok(MergeLockGuard {
            registry: self,
            target,
        })
    }

    /// Returns `true` if a merge into `target` currently holds the lock.
    pub fn is_locked(&self, target: &ScenarioId) -> bool {
        self.lock_set().contains(target)
    }

    fn lock_set(&self) -> MutexGuard<'_, HashSet<ScenarioId>> {
        // The set is only touched in short, non-panicking sections; a
        // poisoned mutex still holds a valid set.
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds a target's merge lock; releases it and wakes waiters on drop.
#[derive(Debug)]
pub struct MergeLockGuard<'a> {
    registry: &'a MergeLockRegistry,
    target: ScenarioId,
}

impl MergeLockGuard<'_> {
    pub fn target(&self) -> ScenarioId {
        self.target
    }
}

impl Drop for MergeLockGuard<'_> {
    fn drop(&mut self) {
        self.registry.lock_set().remove(&self.target);
        self.registry.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn second_acquire_times_out_while_held() {
        let registry = MergeLockRegistry::new();
        let target = ScenarioId::new();
        let guard = registry.acquire(target, Duration::from_millis(10)).unwrap();
        assert!(registry.is_locked(&target));

        let err = registry
            .acquire(target, Duration::from_millis(20))
            .unwrap_err();
        assert_eq!(err, MergeError::MergeInProgress { target });

        drop(guard);
        assert!(!registry.is_locked(&target));
        assert!(registry.acquire(target, Duration::ZERO).is_ok());
    }

    #[test]
    fn different_targets_do_not_block() {
        let registry = MergeLockRegistry::new();
        let _a = registry.acquire(ScenarioId::new(), Duration::ZERO).unwrap();
        let _b = registry.acquire(ScenarioId::new(), Duration::ZERO).unwrap();
    }

    #[test]
    fn poisoned_registry_still_hands_out_locks() {
        let registry = Arc::new(MergeLockRegistry::new());
        let held = ScenarioId::new();
        {
            let registry = registry.clone();
            let _ = thread::spawn(move || {
                let _guard = registry.acquire(held, Duration::ZERO).unwrap();
                let _set = registry.held.lock().unwrap();
                panic!("poison the registry");
            })
            .join();
        }
        assert!(registry.held.is_poisoned());

        let target = ScenarioId::new();
        let guard = registry.acquire(target, Duration::ZERO).unwrap();
        assert!(registry.is_locked(&target));
        assert_eq!(
            registry.acquire(target, Duration::ZERO).unwrap_err(),
            MergeError::MergeInProgress { target }
        );
        drop(guard);
        assert!(!registry.is_locked(&target));
    }

    #[test]
    fn waiter_wakes_when_holder_releases() {
        let registry = Arc::new(MergeLockRegistry::new());
        let target = ScenarioId::new();
        let guard = registry.acquire(target, Duration::ZERO).unwrap();

        let waiter = {
            let registry = registry.clone();
            thread::spawn(move || {
                registry
                    .acquire(target, Duration::from_secs(5))
                    .map(|g| g.target())
            })
        };
        thread::sleep(Duration::from_millis(50));
        drop(guard);

        assert_eq!(waiter.join().unwrap(), Ok(target));
    }
}
