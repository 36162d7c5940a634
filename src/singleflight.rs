//! Single-Flight Load Deduplication
//!
//! Collapses concurrent loads of the same key into one execution. The
//! first caller for a key becomes the leader and runs the work; callers
//! arriving while it is in flight become followers and wait on a latch,
//! then receive a clone of the leader's output. Results are not cached:
//! once a call record is removed, the next caller starts a fresh flight.
//!
//! A leader that is cancelled or panics before publishing marks its call
//! abandoned and wakes every follower; the first one to re-enter becomes
//! the new leader, so the latch can never stay held.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use event_listener::Event;
use parking_lot::Mutex;

/// In-flight call record: write-once result slot plus completion latch.
struct Call<T> {
    result: OnceLock<T>,
    done: Event,
    abandoned: AtomicBool,
}

impl<T> Call<T> {
    fn new() -> Self {
        Self {
            result: OnceLock::new(),
            done: Event::new(),
            abandoned: AtomicBool::new(false),
        }
    }
}

/// Duplicate-call suppressor keyed by string.
pub struct SingleFlight<T> {
    calls: Mutex<HashMap<String, Arc<Call<T>>>>,
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> SingleFlight<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the call record if it is still the registered one.
    fn remove(&self, key: &str, call: &Arc<Call<T>>) {
        let mut calls = self.calls.lock();
        if calls.get(key).is_some_and(|cur| Arc::ptr_eq(cur, call)) {
            calls.remove(key);
        }
    }
}

/// Removes the call and releases followers if the leader never published
/// a result (cancellation or panic while the work future was live).
struct LeaderGuard<'a, T> {
    flight: &'a SingleFlight<T>,
    key: &'a str,
    call: Arc<Call<T>>,
    armed: bool,
}

impl<T> Drop for LeaderGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            self.call.abandoned.store(true, Ordering::Release);
            self.flight.remove(self.key, &self.call);
            self.call.done.notify(usize::MAX);
        }
    }
}

impl<T: Clone> SingleFlight<T> {
    /// Run `work` for `key`, suppressing duplicates.
    ///
    /// The map lock only guards call-record bookkeeping; the work future
    /// always runs outside it, so slow loads of one key never serialise
    /// other keys.
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> T
    where
        F: Fn() -> Fut,
        Fut: Future<Output = T>,
    {
        loop {
            let (call, is_leader) = {
                let mut calls = self.calls.lock();
                match calls.get(key) {
                    Some(existing) => (Arc::clone(existing), false),
                    None => {
                        let call = Arc::new(Call::new());
                        calls.insert(key.to_string(), Arc::clone(&call));
                        (call, true)
                    }
                }
            };

            if is_leader {
                let mut guard = LeaderGuard {
                    flight: self,
                    key,
                    call: Arc::clone(&call),
                    armed: true,
                };

                let value = work().await;

                let _ = call.result.set(value.clone());
                self.remove(key, &call);
                guard.armed = false;
                call.done.notify(usize::MAX);
                return value;
            }

            // Follower: wait for the leader's result, re-checking after
            // registering the listener so a wakeup is never missed.
            loop {
                if let Some(value) = call.result.get() {
                    return value.clone();
                }
                let listener = call.done.listen();
                if let Some(value) = call.result.get() {
                    return value.clone();
                }
                if call.abandoned.load(Ordering::Acquire) {
                    break; // leader died without a result; retry from the top
                }
                listener.await;
            }
        }
    }
}

impl<T> std::fmt::Debug for SingleFlight<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlight")
            .field("in_flight", &self.calls.lock().len())
            .finish()
    }
}
