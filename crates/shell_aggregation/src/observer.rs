//! Observer registration for membership change events.
//!
//! [`Observers`] is the minimal subscriber list behind the aggregate's
//! "changed" event and the object pool's added/removing events. Callbacks
//! are invoked from a snapshot taken under the list's own small mutex, so a
//! callback may freely subscribe, unsubscribe, or call back into the
//! aggregation API without deadlocking.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

type Callback<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// Handle identifying one subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// A list of subscribers notified with a payload of type `A`.
pub struct Observers<A> {
    entries: Mutex<Vec<(ObserverId, Callback<A>)>>,
    next_id: AtomicU64,
}

impl<A> Observers<A> {
    /// Creates an empty subscriber list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers `callback` and returns its subscription handle.
    pub fn subscribe(&self, callback: impl Fn(&A) + Send + Sync + 'static) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.lock().push((id, Arc::new(callback)));
        id
    }

    /// Removes the subscription `id`.
    ///
    /// Returns `true` if the subscription was found and removed.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Invokes every current subscriber with `payload`.
    ///
    /// The subscriber list is snapshotted first; the list mutex is not held
    /// while callbacks run.
    pub fn notify(&self, payload: &A) {
        let snapshot: Vec<Callback<A>> = self
            .entries
            .lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in snapshot {
            callback(payload);
        }
    }

    /// Returns the number of active subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if nothing is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<A> Default for Observers<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> std::fmt::Debug for Observers<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("subscribers", &self.len())
            .finish()
    }
}
