//! Singleton timer slots
//!
//! Each purpose owns at most one outstanding timer. Arming a purpose aborts
//! whatever was armed for it before; a timer that fires vacates its slot
//! before running its action, so the action may re-arm or clear the same
//! purpose without cancelling itself.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Timer purposes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerPurpose {
    /// Automatic close after `expire` seconds
    Expire,
    /// Engages the click guard for a stuck load
    Failsafe,
    /// Re-attempts an image that reported `0x0`
    Retry,
}

struct Slot {
    token: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Slots {
    next_token: u64,
    armed: HashMap<TimerPurpose, Slot>,
}

/// One timer per purpose
#[derive(Default)]
pub struct TimerSlots {
    slots: std::sync::Arc<Mutex<Slots>>,
}

impl TimerSlots {
    /// Create empty slots
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` after `delay`, replacing any timer armed for `purpose`
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm<F>(&self, purpose: TimerPurpose, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slots = self.slots.lock();
        slots.next_token += 1;
        let token = slots.next_token;

        let shared = self.slots.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut slots = shared.lock();
                match slots.armed.get(&purpose) {
                    Some(slot) if slot.token == token => {
                        slots.armed.remove(&purpose);
                    }
                    // Replaced after this timer already woke up
                    _ => return,
                }
            }
            tracing::trace!(?purpose, "timer fired");
            action.await;
        });

        if let Some(previous) = slots.armed.insert(purpose, Slot { token, handle }) {
            previous.handle.abort();
        }
        tracing::trace!(?purpose, delay_ms = delay.as_millis(), "timer armed");
    }

    /// Cancel the timer for `purpose`; returns true if one was armed
    pub fn clear(&self, purpose: TimerPurpose) -> bool {
        match self.slots.lock().armed.remove(&purpose) {
            Some(slot) => {
                slot.handle.abort();
                tracing::trace!(?purpose, "timer cleared");
                true
            }
            None => false,
        }
    }

    /// Cancel every timer
    pub fn clear_all(&self) {
        for (_, slot) in self.slots.lock().armed.drain() {
            slot.handle.abort();
        }
    }

    /// Whether a timer is outstanding for `purpose`
    #[must_use]
    pub fn is_armed(&self, purpose: TimerPurpose) -> bool {
        self.slots.lock().armed.contains_key(&purpose)
    }
}

impl Drop for TimerSlots {
    fn drop(&mut self) {
        self.clear_all();
    }
}

impl std::fmt::Debug for TimerSlots {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let armed: Vec<TimerPurpose> = self.slots.lock().armed.keys().copied().collect();
        f.debug_struct("TimerSlots").field("armed", &armed).finish()
    }
}
