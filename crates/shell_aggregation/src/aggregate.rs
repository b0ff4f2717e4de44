//! The [`Aggregate`] container — groups facets into one logical object.
//!
//! An aggregate owns a set of facets that together represent a single
//! entity ("this document" built from buffer, auto-save, and change-log
//! facets). Any member can then be asked for a capability it does not
//! itself implement: the query climbs to the aggregate and scans the
//! siblings (see [`query`](crate::query)).
//!
//! Membership is exclusive — a facet belongs to at most one aggregate at a
//! time — and the aggregate holds the owning handles: dropping the
//! aggregate detaches every member from the registry and drops them, which
//! destroys any facet nobody else holds.

use std::sync::Arc;

use tracing::debug;

use crate::error::AggregateError;
use crate::facet::{FacetId, FacetRef, facet_cast};
use crate::observer::{ObserverId, Observers};
use crate::registry::{AggregateId, Registry};

/// A mutable, ordered collection of facets with capability lookup.
///
/// All operations are callable from any thread; reads run concurrently
/// under the registry's shared lock, mutations serialize on its exclusive
/// side.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use shell_aggregation::{expose_capabilities, Aggregate};
///
/// pub trait Loggable: Send + Sync {
///     fn log_target(&self) -> &str;
/// }
///
/// struct ChangeLog {
///     target: String,
/// }
///
/// impl Loggable for ChangeLog {
///     fn log_target(&self) -> &str {
///         &self.target
///     }
/// }
///
/// expose_capabilities!(ChangeLog => dyn Loggable);
///
/// let document = Aggregate::new();
/// document
///     .add(Arc::new(ChangeLog { target: "doc.log".into() }))
///     .unwrap();
///
/// let log = document.component::<dyn Loggable>().unwrap();
/// assert_eq!(log.log_target(), "doc.log");
/// ```
pub struct Aggregate {
    registry: Arc<Registry>,
    id: AggregateId,
    changed: Observers<()>,
}

impl Aggregate {
    /// Creates an empty aggregate in the process-wide registry.
    #[must_use]
    pub fn new() -> Self {
        Self::in_registry(Registry::global())
    }

    /// Creates an empty aggregate in `registry`.
    ///
    /// Aggregates in an isolated registry are invisible to the free
    /// [`query`](crate::query) functions when starting from a bare facet;
    /// use [`Registry::query`] for registry-scoped lookups.
    #[must_use]
    pub fn in_registry(registry: Arc<Registry>) -> Self {
        let id = registry.allocate_id();
        Self {
            registry,
            id,
            changed: Observers::new(),
        }
    }

    /// Creates an aggregate in the process-wide registry and adds each
    /// facet in order, failing on the first membership error.
    pub fn with_facets<I>(facets: I) -> Result<Self, AggregateError>
    where
        I: IntoIterator<Item = FacetRef>,
    {
        let aggregate = Self::new();
        for facet in facets {
            aggregate.add(facet)?;
        }
        Ok(aggregate)
    }

    /// This aggregate's identity within its registry.
    #[must_use]
    pub fn id(&self) -> AggregateId {
        self.id
    }

    /// The registry this aggregate lives in.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Adds `facet` to this aggregate and records the ownership in the
    /// registry.
    ///
    /// Fires the "changed" notification after the membership mutation is
    /// visible.
    ///
    /// # Errors
    ///
    /// - [`AggregateError::DuplicateMember`] if `facet` is already a member
    ///   of this aggregate.
    /// - [`AggregateError::AlreadyAggregated`] if `facet` belongs to a
    ///   different aggregate.
    pub fn add(&self, facet: FacetRef) -> Result<(), AggregateError> {
        let facet_id = FacetId::of(&facet);
        {
            let mut tables = self.registry.lock().write();
            match tables.owner_of(facet_id) {
                Some(owner) if owner == self.id => {
                    return Err(AggregateError::DuplicateMember {
                        facet: facet_id,
                        aggregate: self.id,
                    });
                }
                Some(owner) => {
                    return Err(AggregateError::AlreadyAggregated {
                        facet: facet_id,
                        owner,
                    });
                }
                None => tables.attach(self.id, facet),
            }
        }
        debug!(aggregate = %self.id, facet = %facet_id, "facet added");
        self.changed.notify(&());
        Ok(())
    }

    /// Removes `facet` from this aggregate and clears its registry entry,
    /// returning the owning handle that was held.
    ///
    /// Dropping the returned handle destroys the facet if nobody else holds
    /// it. Fires the "changed" notification on success.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::NotAMember`] if `facet` is not a member of
    /// this aggregate.
    pub fn remove(&self, facet: &FacetRef) -> Result<FacetRef, AggregateError> {
        let facet_id = FacetId::of(facet);
        let removed = {
            let mut tables = self.registry.lock().write();
            tables
                .detach(self.id, facet_id)
                .ok_or(AggregateError::NotAMember {
                    facet: facet_id,
                    aggregate: self.id,
                })?
        };
        debug!(aggregate = %self.id, facet = %facet_id, "facet removed");
        self.changed.notify(&());
        Ok(removed)
    }

    /// Returns the first member satisfying capability `C`, in insertion
    /// order, or `None` if no member qualifies.
    ///
    /// Runs under the shared read lock; concurrent reads proceed in
    /// parallel, mutations are excluded for the duration of the scan.
    #[must_use]
    pub fn component<C>(&self) -> Option<Arc<C>>
    where
        C: ?Sized + 'static,
    {
        let tables = self.registry.lock().read();
        tables.members_of(self.id).iter().find_map(facet_cast::<C>)
    }

    /// Returns every member satisfying capability `C`, preserving insertion
    /// order.
    #[must_use]
    pub fn components<C>(&self) -> Vec<Arc<C>>
    where
        C: ?Sized + 'static,
    {
        let tables = self.registry.lock().read();
        tables
            .members_of(self.id)
            .iter()
            .filter_map(facet_cast::<C>)
            .collect()
    }

    /// Returns a snapshot of the member list in insertion order.
    #[must_use]
    pub fn facets(&self) -> Vec<FacetRef> {
        self.registry.lock().read().members_of(self.id).to_vec()
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.lock().read().members_of(self.id).len()
    }

    /// Returns `true` if this aggregate has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribes to the no-payload "changed" event fired after every
    /// successful [`add`](Self::add) and [`remove`](Self::remove).
    ///
    /// Callbacks run on the mutating thread, after the registry lock has
    /// been released.
    pub fn on_changed(&self, callback: impl Fn() + Send + Sync + 'static) -> ObserverId {
        self.changed.subscribe(move |()| callback())
    }

    /// Cancels a subscription made with [`on_changed`](Self::on_changed).
    ///
    /// Returns `true` if the subscription existed.
    pub fn remove_changed_observer(&self, id: ObserverId) -> bool {
        self.changed.unsubscribe(id)
    }
}

impl Drop for Aggregate {
    fn drop(&mut self) {
        let dropped = {
            let mut tables = self.registry.lock().write();
            tables.drop_aggregate(self.id)
        };
        if !dropped.is_empty() {
            debug!(aggregate = %self.id, facets = dropped.len(), "aggregate dropped");
        }
        // Member handles are released here, outside the lock, so facet
        // destructors may query the registry.
        drop(dropped);
    }
}

impl Default for Aggregate {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Aggregate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregate")
            .field("id", &self.id)
            .field("facets", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::expose_capabilities;
    use crate::facet::Facet;

    trait Loggable: Send + Sync {
        fn log_target(&self) -> &str;
    }

    struct Base {
        tag: u32,
    }

    impl Facet for Base {}

    struct Logger {
        target: String,
    }

    impl Loggable for Logger {
        fn log_target(&self) -> &str {
            &self.target
        }
    }

    expose_capabilities!(Logger => dyn Loggable);

    struct Auditor {
        target: String,
    }

    impl Loggable for Auditor {
        fn log_target(&self) -> &str {
            &self.target
        }
    }

    expose_capabilities!(Auditor => dyn Loggable);

    fn isolated() -> (Arc<Registry>, Aggregate) {
        let registry = Arc::new(Registry::new());
        let aggregate = Aggregate::in_registry(Arc::clone(&registry));
        (registry, aggregate)
    }

    fn logger(target: &str) -> Arc<Logger> {
        Arc::new(Logger {
            target: target.to_string(),
        })
    }

    #[test]
    fn test_empty_aggregate_has_no_components() {
        let (_registry, aggregate) = isolated();
        assert!(aggregate.is_empty());
        assert!(aggregate.component::<dyn Loggable>().is_none());
        assert!(aggregate.components::<dyn Loggable>().is_empty());
    }

    #[test]
    fn test_add_then_component_finds_capability() {
        let (_registry, aggregate) = isolated();
        aggregate.add(Arc::new(Base { tag: 7 })).unwrap();
        aggregate.add(logger("session")).unwrap();

        let found = aggregate.component::<dyn Loggable>().unwrap();
        assert_eq!(found.log_target(), "session");

        // Concrete types are capabilities too.
        let base = aggregate.component::<Base>().unwrap();
        assert_eq!(base.tag, 7);
        assert_eq!(aggregate.len(), 2);
    }

    #[test]
    fn test_component_returns_first_match_in_insertion_order() {
        let (_registry, aggregate) = isolated();
        aggregate.add(Arc::new(Base { tag: 0 })).unwrap();
        aggregate.add(logger("first")).unwrap();
        aggregate
            .add(Arc::new(Auditor {
                target: "second".to_string(),
            }))
            .unwrap();

        let first = aggregate.component::<dyn Loggable>().unwrap();
        assert_eq!(first.log_target(), "first");

        let all = aggregate.components::<dyn Loggable>();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].log_target(), "first");
        assert_eq!(all[1].log_target(), "second");
    }

    #[test]
    fn test_duplicate_add_is_an_error_and_does_not_duplicate() {
        let (_registry, aggregate) = isolated();
        let log = logger("once");
        aggregate.add(log.clone()).unwrap();

        let err = aggregate.add(log.clone()).unwrap_err();
        assert_eq!(
            err,
            AggregateError::DuplicateMember {
                facet: FacetId::of(&log),
                aggregate: aggregate.id(),
            }
        );
        assert_eq!(aggregate.components::<dyn Loggable>().len(), 1);
    }

    #[test]
    fn test_single_ownership_across_aggregates() {
        let registry = Arc::new(Registry::new());
        let first = Aggregate::in_registry(Arc::clone(&registry));
        let second = Aggregate::in_registry(Arc::clone(&registry));
        let log = logger("owned");

        first.add(log.clone()).unwrap();
        let err = second.add(log.clone()).unwrap_err();
        assert_eq!(
            err,
            AggregateError::AlreadyAggregated {
                facet: FacetId::of(&log),
                owner: first.id(),
            }
        );

        // Only the first aggregate claims ownership.
        let erased: FacetRef = log.clone();
        assert_eq!(registry.parent_aggregate(&erased), Some(first.id()));
        assert!(second.is_empty());
    }

    #[test]
    fn test_remove_clears_registry_and_component_lookup() {
        let (registry, aggregate) = isolated();
        let log = logger("gone");
        aggregate.add(log.clone()).unwrap();

        let erased: FacetRef = log.clone();
        let removed = aggregate.remove(&erased).unwrap();
        assert_eq!(FacetId::of(&removed), FacetId::of(&log));
        assert_eq!(registry.parent_aggregate(&erased), None);
        assert!(aggregate.component::<dyn Loggable>().is_none());
    }

    #[test]
    fn test_remove_nonmember_is_an_error() {
        let (_registry, aggregate) = isolated();
        let stray: FacetRef = logger("stray");

        let err = aggregate.remove(&stray).err().unwrap();
        assert_eq!(
            err,
            AggregateError::NotAMember {
                facet: FacetId::of(&stray),
                aggregate: aggregate.id(),
            }
        );
    }

    #[test]
    fn test_drop_detaches_and_destroys_members() {
        let registry = Arc::new(Registry::new());
        let log = logger("doomed");
        let erased: FacetRef = log.clone();

        {
            let aggregate = Aggregate::in_registry(Arc::clone(&registry));
            aggregate.add(log.clone()).unwrap();
            assert_eq!(registry.parent_aggregate(&erased), Some(aggregate.id()));
        }

        assert_eq!(registry.parent_aggregate(&erased), None);
        assert_eq!(registry.lock().read().facet_count(), 0);
        // The aggregate's owning handle is gone; only the two locals remain.
        assert_eq!(Arc::strong_count(&log), 2);
    }

    #[test]
    fn test_removed_facet_survives_via_returned_handle() {
        let (_registry, aggregate) = isolated();
        let log = logger("kept");
        aggregate.add(log.clone()).unwrap();

        let erased: FacetRef = log.clone();
        let kept = aggregate.remove(&erased).unwrap();
        drop(aggregate);
        assert_eq!(kept.name(), None);
        assert_eq!(FacetId::of(&kept), FacetId::of(&log));
    }

    #[test]
    fn test_changed_fires_after_successful_mutations_only() {
        let (_registry, aggregate) = isolated();
        let changes = Arc::new(AtomicUsize::new(0));

        let changes_clone = Arc::clone(&changes);
        aggregate.on_changed(move || {
            changes_clone.fetch_add(1, Ordering::SeqCst);
        });

        let log = logger("watched");
        aggregate.add(log.clone()).unwrap();
        assert_eq!(changes.load(Ordering::SeqCst), 1);

        // A refused duplicate add changes nothing and stays silent.
        aggregate.add(log.clone()).unwrap_err();
        assert_eq!(changes.load(Ordering::SeqCst), 1);

        let erased: FacetRef = log.clone();
        aggregate.remove(&erased).unwrap();
        assert_eq!(changes.load(Ordering::SeqCst), 2);

        aggregate.remove(&erased).err().unwrap();
        assert_eq!(changes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_changed_observer_can_be_cancelled() {
        let (_registry, aggregate) = isolated();
        let changes = Arc::new(AtomicUsize::new(0));

        let changes_clone = Arc::clone(&changes);
        let id = aggregate.on_changed(move || {
            changes_clone.fetch_add(1, Ordering::SeqCst);
        });

        aggregate.add(logger("a")).unwrap();
        assert!(aggregate.remove_changed_observer(id));
        aggregate.add(logger("b")).unwrap();

        assert_eq!(changes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_with_facets_adds_in_order() {
        let aggregate = Aggregate::with_facets([
            Arc::new(Base { tag: 1 }) as FacetRef,
            logger("built") as FacetRef,
        ])
        .unwrap();
        assert_eq!(aggregate.len(), 2);
        assert_eq!(
            aggregate.component::<dyn Loggable>().unwrap().log_target(),
            "built"
        );
    }

    #[test]
    fn test_with_facets_failure_leaves_no_ownership_behind() {
        let log = logger("twice");
        let err = Aggregate::with_facets([log.clone() as FacetRef, log.clone() as FacetRef])
            .unwrap_err();
        assert!(matches!(err, AggregateError::DuplicateMember { .. }));

        // The partially-built aggregate was dropped and released the facet.
        let erased: FacetRef = log.clone();
        assert_eq!(Registry::global().parent_aggregate(&erased), None);
        assert_eq!(Arc::strong_count(&log), 2);
    }

    #[test]
    fn test_facets_snapshot_preserves_order() {
        let (_registry, aggregate) = isolated();
        let base = Arc::new(Base { tag: 9 });
        let log = logger("snap");
        aggregate.add(base.clone()).unwrap();
        aggregate.add(log.clone()).unwrap();

        let snapshot = aggregate.facets();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(FacetId::of(&snapshot[0]), FacetId::of(&base));
        assert_eq!(FacetId::of(&snapshot[1]), FacetId::of(&log));
    }

    #[test]
    fn test_concurrent_reads_return_identical_results() {
        let (_registry, aggregate) = isolated();
        aggregate.add(Arc::new(Base { tag: 0 })).unwrap();
        aggregate.add(logger("first")).unwrap();
        aggregate
            .add(Arc::new(Auditor {
                target: "second".to_string(),
            }))
            .unwrap();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..200 {
                        let all = aggregate.components::<dyn Loggable>();
                        assert_eq!(all.len(), 2);
                        assert_eq!(all[0].log_target(), "first");
                        assert_eq!(all[1].log_target(), "second");
                    }
                });
            }
        });
    }

    #[test]
    fn test_reads_race_mutations_without_tearing() {
        let (_registry, aggregate) = isolated();
        aggregate.add(logger("stable")).unwrap();
        let flapping = logger("flapping");
        let aggregate = &aggregate;

        std::thread::scope(|scope| {
            let flapper = flapping.clone();
            let writer = scope.spawn(move || {
                for _ in 0..100 {
                    aggregate.add(flapper.clone()).unwrap();
                    let erased: FacetRef = flapper.clone();
                    aggregate.remove(&erased).unwrap();
                }
            });
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..200 {
                        let all = aggregate.components::<dyn Loggable>();
                        // Readers see the list before or after a mutation,
                        // never in between.
                        assert!(all.len() == 1 || all.len() == 2);
                        assert_eq!(all[0].log_target(), "stable");
                    }
                });
            }
            writer.join().unwrap();
        });
    }
}
