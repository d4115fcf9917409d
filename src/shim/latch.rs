//! One-shot settlement slot.

use std::sync::OnceLock;

use tokio::sync::Notify;

/// A slot that accepts exactly one value. The first [`settle`] wins and
/// every later one is a no-op; [`wait`] resolves once a value is present.
///
/// [`settle`]: SettleLatch::settle
/// [`wait`]: SettleLatch::wait
#[derive(Debug)]
pub struct SettleLatch<T> {
    slot: OnceLock<T>,
    notify: Notify,
}

impl<T> SettleLatch<T> {
    pub fn new() -> Self {
        Self {
            slot: OnceLock::new(),
            notify: Notify::new(),
        }
    }

    /// Store `value` if nothing was stored yet. Returns whether this call
    /// settled the latch.
    pub fn settle(&self, value: T) -> bool {
        let won = self.slot.set(value).is_ok();
        if won {
            self.notify.notify_waiters();
        }
        won
    }

    pub fn get(&self) -> Option<&T> {
        self.slot.get()
    }

    pub fn is_settled(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Wait for the settled value.
    pub async fn wait(&self) -> &T {
        loop {
            // Registered before the check so a settle in between is not missed.
            let notified = self.notify.notified();
            if let Some(value) = self.slot.get() {
                return value;
            }
            notified.await;
        }
    }
}
