//! Facet ownership registry.
//!
//! The registry answers "which aggregate owns this facet?" from nothing but
//! the facet handle — the back-pointer the facets themselves do not carry.
//! It holds two tables behind **one** reader/writer lock: the owner map
//! (`FacetId` → [`AggregateId`]) and every aggregate's member list. A
//! single lock keeps multi-table reads coherent: queries take the shared
//! side, membership mutations take the exclusive side.
//!
//! Most callers use the process-wide [`Registry::global`] instance
//! implicitly through [`Aggregate::new`](crate::Aggregate::new) and the
//! free [`query`](crate::query) functions. Tests and embedded hosts can
//! construct isolated registries with [`Registry::new`] instead.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::facet::{FacetId, FacetRef, facet_cast};

/// A unique identifier for an aggregate within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AggregateId(pub u64);

impl std::fmt::Display for AggregateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Aggregate({})", self.0)
    }
}

/// The tables guarded by the registry lock.
///
/// Exposed so that a caller holding the lock via [`Registry::lock`] can run
/// several lookups against one consistent view. All mutation goes through
/// [`Aggregate`](crate::Aggregate) operations.
#[derive(Default)]
pub struct RegistryTables {
    /// Owning aggregate of every currently-aggregated facet.
    owners: HashMap<FacetId, AggregateId>,
    /// Member lists in insertion order.
    members: HashMap<AggregateId, Vec<FacetRef>>,
}

impl RegistryTables {
    /// Returns the aggregate owning `facet`, if any.
    #[must_use]
    pub fn owner_of(&self, facet: FacetId) -> Option<AggregateId> {
        self.owners.get(&facet).copied()
    }

    /// Returns the member list of `aggregate` in insertion order.
    ///
    /// Unknown aggregates (and aggregates that never received a member)
    /// yield an empty slice.
    #[must_use]
    pub fn members_of(&self, aggregate: AggregateId) -> &[FacetRef] {
        self.members
            .get(&aggregate)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns the number of facets aggregated anywhere in this registry.
    #[must_use]
    pub fn facet_count(&self) -> usize {
        self.owners.len()
    }

    pub(crate) fn attach(&mut self, aggregate: AggregateId, facet: FacetRef) {
        self.owners.insert(FacetId::of(&facet), aggregate);
        self.members.entry(aggregate).or_default().push(facet);
    }

    pub(crate) fn detach(&mut self, aggregate: AggregateId, facet: FacetId) -> Option<FacetRef> {
        let list = self.members.get_mut(&aggregate)?;
        let position = list.iter().position(|member| FacetId::of(member) == facet)?;
        let removed = list.remove(position);
        if list.is_empty() {
            self.members.remove(&aggregate);
        }
        self.owners.remove(&facet);
        Some(removed)
    }

    pub(crate) fn drop_aggregate(&mut self, aggregate: AggregateId) -> Vec<FacetRef> {
        let dropped = self.members.remove(&aggregate).unwrap_or_default();
        for member in &dropped {
            self.owners.remove(&FacetId::of(member));
        }
        dropped
    }
}

impl std::fmt::Debug for RegistryTables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryTables")
            .field("facets", &self.owners.len())
            .field("aggregates", &self.members.len())
            .finish()
    }
}

/// Ownership registry: the owner/member tables plus their shared lock and
/// the [`AggregateId`] allocator.
pub struct Registry {
    tables: RwLock<RegistryTables>,
    next_id: AtomicU64,
}

static GLOBAL: Lazy<Arc<Registry>> = Lazy::new(|| Arc::new(Registry::new()));

impl Registry {
    /// Creates an empty, isolated registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(RegistryTables::default()),
            // IDs start at 1 so 0 can serve as a sentinel if callers need one.
            next_id: AtomicU64::new(1),
        }
    }

    /// Returns the process-wide registry.
    ///
    /// This is the registry behind [`Aggregate::new`](crate::Aggregate::new)
    /// and the free [`query`](crate::query)/[`query_all`](crate::query_all)
    /// functions. It lives until process exit.
    #[must_use]
    pub fn global() -> Arc<Registry> {
        Arc::clone(&GLOBAL)
    }

    /// Exposes the lock guarding both registry tables and every member list.
    ///
    /// Hold the read side to run several [`RegistryTables`] lookups against
    /// one consistent view. While a guard from here is held, do not call the
    /// locking entry points (`component`, `query`, `add`, ...) on the same
    /// registry — the lock is not reentrant.
    #[must_use]
    pub fn lock(&self) -> &RwLock<RegistryTables> {
        &self.tables
    }

    /// Returns the aggregate owning `facet`, or `None` if the facet is not
    /// currently aggregated here. O(1) hash lookup under the read lock.
    #[must_use]
    pub fn parent_aggregate(&self, facet: &FacetRef) -> Option<AggregateId> {
        self.tables.read().owner_of(FacetId::of(facet))
    }

    /// Capability lookup from a bare facet, scoped to this registry.
    ///
    /// The facet itself is checked first (no lock — a pure type check);
    /// otherwise the owning aggregate, if any, is scanned in insertion
    /// order under the read lock. See the free [`query`](crate::query)
    /// function for the global-registry entry point.
    #[must_use]
    pub fn query<C>(&self, facet: &FacetRef) -> Option<Arc<C>>
    where
        C: ?Sized + 'static,
    {
        if let Some(direct) = facet_cast::<C>(facet) {
            return Some(direct);
        }
        let tables = self.tables.read();
        let owner = tables.owner_of(FacetId::of(facet))?;
        tables.members_of(owner).iter().find_map(facet_cast::<C>)
    }

    /// All-matches capability lookup from a bare facet, scoped to this
    /// registry.
    ///
    /// When the facet is aggregated the result is the member scan alone —
    /// the facet is not additionally tested outside the scan (it appears in
    /// the result via the scan whenever it qualifies). An unaggregated
    /// facet yields a singleton or empty vector from the direct check.
    #[must_use]
    pub fn query_all<C>(&self, facet: &FacetRef) -> Vec<Arc<C>>
    where
        C: ?Sized + 'static,
    {
        let tables = self.tables.read();
        match tables.owner_of(FacetId::of(facet)) {
            Some(owner) => tables
                .members_of(owner)
                .iter()
                .filter_map(facet_cast::<C>)
                .collect(),
            None => {
                drop(tables);
                facet_cast::<C>(facet).into_iter().collect()
            }
        }
    }

    pub(crate) fn allocate_id(&self) -> AggregateId {
        AggregateId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.tables.read();
        f.debug_struct("Registry")
            .field("facets", &tables.facet_count())
            .field("aggregates", &tables.members.len())
            .finish()
    }
}
