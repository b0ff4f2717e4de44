//! The [`ObjectPool`] implementation.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::{debug, warn};

use shell_aggregation::{FacetId, FacetRef, ObserverId, Observers, facet_cast};

static GLOBAL: Lazy<ObjectPool> = Lazy::new(ObjectPool::new);

/// A thread-safe pool of shared objects in insertion order.
///
/// The pool holds owning handles but claims no exclusive ownership: the
/// same object may simultaneously live in an
/// [`Aggregate`](shell_aggregation::Aggregate), and callers keep their own
/// handles. Misuse (duplicate addition, removal of an unknown object) is
/// refused with a warning rather than treated as fatal — pools are shared
/// between independently-written modules.
///
/// The pool's lock is its own; it is not the aggregation registry lock.
pub struct ObjectPool {
    objects: RwLock<Vec<FacetRef>>,
    added: Observers<FacetRef>,
    removing: Observers<FacetRef>,
}

impl ObjectPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(Vec::new()),
            added: Observers::new(),
            removing: Observers::new(),
        }
    }

    /// Returns the process-wide pool shared by all shell modules.
    #[must_use]
    pub fn global() -> &'static ObjectPool {
        &GLOBAL
    }

    /// Adds `object` to the pool and fires `object_added`.
    ///
    /// Returns `false` (with a warning, and no notification) if the object
    /// is already pooled.
    pub fn add_object(&self, object: FacetRef) -> bool {
        let id = FacetId::of(&object);
        {
            let mut objects = self.objects.write();
            if objects.iter().any(|pooled| FacetId::of(pooled) == id) {
                warn!(object = %id, "trying to add duplicate object to the pool");
                return false;
            }
            objects.push(object.clone());
        }
        debug!(object = %id, "object added to the pool");
        self.added.notify(&object);
        true
    }

    /// Removes `object` from the pool.
    ///
    /// Fires `about_to_remove_object` *before* the removal, while the
    /// object can still be found in the pool. Returns `false` (with a
    /// warning) if the object is not pooled.
    pub fn remove_object(&self, object: &FacetRef) -> bool {
        let id = FacetId::of(object);
        {
            let objects = self.objects.read();
            if !objects.iter().any(|pooled| FacetId::of(pooled) == id) {
                warn!(object = %id, "trying to remove object that is not in the pool");
                return false;
            }
        }
        self.removing.notify(object);
        self.objects
            .write()
            .retain(|pooled| FacetId::of(pooled) != id);
        debug!(object = %id, "object removed from the pool");
        true
    }

    /// Returns a snapshot of the pooled objects in insertion order.
    #[must_use]
    pub fn all_objects(&self) -> Vec<FacetRef> {
        self.objects.read().clone()
    }

    /// Returns the number of pooled objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Returns `true` if the pool is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Retrieves an object of capability `C` from the pool.
    ///
    /// When several pooled objects qualify, the earliest added wins — an
    /// arbitrary but stable choice. Modules that need a specific one
    /// should use [`get_object_matching`](Self::get_object_matching) or
    /// [`get_object_by_name`](Self::get_object_by_name).
    #[must_use]
    pub fn get_object<C>(&self) -> Option<Arc<C>>
    where
        C: ?Sized + 'static,
    {
        self.objects.read().iter().find_map(facet_cast::<C>)
    }

    /// Retrieves the first object of capability `C` accepted by
    /// `predicate`.
    #[must_use]
    pub fn get_object_matching<C, P>(&self, predicate: P) -> Option<Arc<C>>
    where
        C: ?Sized + 'static,
        P: Fn(&C) -> bool,
    {
        self.objects
            .read()
            .iter()
            .filter_map(facet_cast::<C>)
            .find(|candidate| predicate(candidate.as_ref()))
    }

    /// Retrieves the first object whose
    /// [`Facet::name`](shell_aggregation::Facet::name) is `name`.
    #[must_use]
    pub fn get_object_by_name(&self, name: &str) -> Option<FacetRef> {
        self.objects
            .read()
            .iter()
            .find(|pooled| pooled.name() == Some(name))
            .cloned()
    }

    /// Subscribes to `object_added`, fired after each successful addition
    /// with the added object as payload.
    pub fn on_object_added(
        &self,
        callback: impl Fn(&FacetRef) + Send + Sync + 'static,
    ) -> ObserverId {
        self.added.subscribe(callback)
    }

    /// Subscribes to `about_to_remove_object`, fired before each removal
    /// with the departing object as payload.
    pub fn on_about_to_remove_object(
        &self,
        callback: impl Fn(&FacetRef) + Send + Sync + 'static,
    ) -> ObserverId {
        self.removing.subscribe(callback)
    }

    /// Cancels a subscription made with either
    /// [`on_object_added`](Self::on_object_added) or
    /// [`on_about_to_remove_object`](Self::on_about_to_remove_object).
    ///
    /// Returns `true` if the subscription existed.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.added.unsubscribe(id) || self.removing.unsubscribe(id)
    }
}

impl Default for ObjectPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ObjectPool {
    fn drop(&mut self) {
        let leftover = self.objects.read().len();
        if leftover > 0 {
            debug!(objects = leftover, "objects left in the pool at teardown");
        }
    }
}

impl std::fmt::Debug for ObjectPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectPool")
            .field("objects", &self.len())
            .finish()
    }
}
