//! Join point over a set of independent tasks
//!
//! Each task holds a [`SettleTicket`]. The ticket settles when the task calls
//! [`SettleTicket::settle`] or simply drops it, so success, failure and panic
//! all count as settled. [`SettleBarrier::wait`] resolves once every ticket
//! issued so far has settled.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct BarrierState {
    pending: AtomicUsize,
    settled: AtomicUsize,
    notify: Notify,
}

#[derive(Debug, Clone, Default)]
pub struct SettleBarrier {
    state: Arc<BarrierState>,
}

impl SettleBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one more task that must settle before `wait` resolves
    pub fn ticket(&self) -> SettleTicket {
        self.state.pending.fetch_add(1, Ordering::SeqCst);
        SettleTicket {
            state: Some(Arc::clone(&self.state)),
        }
    }

    /// Tickets issued but not yet settled
    pub fn pending(&self) -> usize {
        self.state.pending.load(Ordering::SeqCst)
    }

    /// Tickets settled so far
    pub fn settled(&self) -> usize {
        self.state.settled.load(Ordering::SeqCst)
    }

    /// Resolves once no ticket is outstanding; immediately if none were issued
    pub async fn wait(&self) {
        loop {
            let notified = self.state.notify.notified();
            tokio::pin!(notified);
            // Register interest before checking so a settle in between is not lost
            notified.as_mut().enable();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Completion handle for one task
#[derive(Debug)]
#[must_use = "dropping a ticket settles it immediately"]
pub struct SettleTicket {
    state: Option<Arc<BarrierState>>,
}

impl SettleTicket {
    /// Marks the task as finished; equivalent to dropping the ticket
    pub fn settle(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(state) = self.state.take() {
            state.settled.fetch_add(1, Ordering::SeqCst);
            if state.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
                state.notify.notify_waiters();
            }
        }
    }
}

impl Drop for SettleTicket {
    fn drop(&mut self) {
        self.release();
    }
}
