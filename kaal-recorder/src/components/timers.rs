//! Bookkeeping for every background timer the engine arms.

use crate::common::TimerId;
use slotmap::SlotMap;
use tokio::task::JoinHandle;
use tracing::trace;

/// Owns the join handles of armed timers.
///
/// A timer that is cancelled, or still armed when the registry is dropped,
/// is aborted. Finished timers are pruned lazily on the next `arm`.
#[derive(Default)]
pub struct TimerRegistry {
    timers: SlotMap<TimerId, JoinHandle<()>>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, handle: JoinHandle<()>) -> TimerId {
        self.prune_finished();
        let id = self.timers.insert(handle);
        trace!("Timer {:?} armed, {} active.", id, self.timers.len());
        id
    }

    /// Aborts the timer. Returns `false` if it was unknown or already gone.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.timers.remove(id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Aborts every timer. Returns the ids that were cancelled.
    pub fn cancel_all(&mut self) -> Vec<TimerId> {
        let ids: Vec<TimerId> = self.timers.keys().collect();
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
        ids
    }

    pub fn is_armed(&self, id: TimerId) -> bool {
        self.timers
            .get(id)
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Timers that have not finished yet.
    pub fn active(&self) -> usize {
        self.timers.values().filter(|h| !h.is_finished()).count()
    }

    fn prune_finished(&mut self) {
        self.timers.retain(|_, handle| !handle.is_finished());
    }
}

impl Drop for TimerRegistry {
    fn drop(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}
