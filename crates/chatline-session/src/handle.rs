//! A cloneable handle onto a session's busy state.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// A cloneable handle for observing whether a session is mid-exchange.
///
/// All fields are `Arc`-wrapped, so cloning is cheap.
#[derive(Clone, Default)]
pub struct SessionHandle {
    pub(crate) busy: Arc<AtomicBool>,
    pub(crate) idle_notify: Arc<tokio::sync::Notify>,
}

impl SessionHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Claim the session for one exchange.
    ///
    /// Returns `None` if another exchange holds it. The flag is released when
    /// the returned guard drops, however the exchange ends.
    pub(crate) fn try_begin(&self) -> Option<BusyGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard {
                handle: self.clone(),
            })
    }

    /// Whether an exchange is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Wait until no exchange is in flight.
    pub async fn wait_for_idle(&self) {
        let notified = self.idle_notify.notified();
        if !self.is_busy() {
            return;
        }
        notified.await;
    }

    /// Wait until idle, with a timeout.
    /// Returns `true` if idle was reached, `false` on timeout.
    pub async fn wait_for_idle_timeout(&self, timeout: std::time::Duration) -> bool {
        if !self.is_busy() {
            return true;
        }
        tokio::time::timeout(timeout, self.wait_for_idle())
            .await
            .is_ok()
    }
}

/// Releases the busy flag on drop
pub(crate) struct BusyGuard {
    handle: SessionHandle,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.handle.busy.store(false, Ordering::Release);
        self.handle.idle_notify.notify_waiters();
    }
}
