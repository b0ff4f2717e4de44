//! Capability query entry points.
//!
//! [`query`] and [`query_all`] answer "does this object expose capability
//! `C`, or does whatever it is grouped with?" without the caller knowing
//! whether it holds an [`Aggregate`], a typed facet handle, or a
//! type-erased [`FacetRef`]:
//!
//! 1. A `None` source yields an empty result.
//! 2. An [`Aggregate`] source is scanned directly
//!    ([`Aggregate::component`] / [`Aggregate::components`]).
//! 3. A bare facet is first checked against `C` itself — a pure type
//!    check, no lock — and only then resolved through the ownership
//!    registry to its aggregate, whose members are scanned in insertion
//!    order.
//!
//! Bare facets are resolved against [`Registry::global`]; for aggregates
//! the lookup always runs in the registry the aggregate was created in.
//! Use [`Registry::query`]/[`Registry::query_all`] to resolve bare facets
//! against an isolated registry.
//!
//! Note the deliberate asymmetry in [`query_all`]: a facet that *is*
//! aggregated contributes to the result only through the member scan
//! (which includes it whenever it qualifies); the direct check applies
//! only to unaggregated facets.

use std::sync::Arc;

use crate::aggregate::Aggregate;
use crate::facet::{Facet, FacetRef};
use crate::registry::Registry;

/// A source for capability queries: an [`Aggregate`], a typed or erased
/// facet handle, or an `Option` of either (the "no object" case).
pub trait Queryable {
    /// First capability match for this source. See [`query`].
    fn query<C>(&self) -> Option<Arc<C>>
    where
        C: ?Sized + 'static;

    /// Every capability match for this source. See [`query_all`].
    fn query_all<C>(&self) -> Vec<Arc<C>>
    where
        C: ?Sized + 'static;
}

impl Queryable for Aggregate {
    fn query<C>(&self) -> Option<Arc<C>>
    where
        C: ?Sized + 'static,
    {
        self.component::<C>()
    }

    fn query_all<C>(&self) -> Vec<Arc<C>>
    where
        C: ?Sized + 'static,
    {
        self.components::<C>()
    }
}

impl Queryable for FacetRef {
    fn query<C>(&self) -> Option<Arc<C>>
    where
        C: ?Sized + 'static,
    {
        Registry::global().query::<C>(self)
    }

    fn query_all<C>(&self) -> Vec<Arc<C>>
    where
        C: ?Sized + 'static,
    {
        Registry::global().query_all::<C>(self)
    }
}

impl<T: Facet> Queryable for Arc<T> {
    fn query<C>(&self) -> Option<Arc<C>>
    where
        C: ?Sized + 'static,
    {
        let erased: FacetRef = self.clone();
        erased.query::<C>()
    }

    fn query_all<C>(&self) -> Vec<Arc<C>>
    where
        C: ?Sized + 'static,
    {
        let erased: FacetRef = self.clone();
        erased.query_all::<C>()
    }
}

impl<S: Queryable> Queryable for Option<S> {
    fn query<C>(&self) -> Option<Arc<C>>
    where
        C: ?Sized + 'static,
    {
        self.as_ref().and_then(|source| source.query::<C>())
    }

    fn query_all<C>(&self) -> Vec<Arc<C>>
    where
        C: ?Sized + 'static,
    {
        self.as_ref()
            .map(|source| source.query_all::<C>())
            .unwrap_or_default()
    }
}

/// Finds a facet of capability `C` reachable from `source`.
///
/// For a bare facet the facet itself wins when it satisfies `C` (checked
/// without any lock); otherwise its owning aggregate — if it has one — is
/// scanned in insertion order. Returns `None` when nothing qualifies;
/// a miss is the expected outcome, not an error.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use shell_aggregation::{expose_capabilities, query, Aggregate, Facet};
///
/// pub trait Loggable: Send + Sync {
///     fn log_target(&self) -> &str;
/// }
///
/// struct Buffer {
///     text: String,
/// }
///
/// impl Facet for Buffer {}
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
/// let buffer = Arc::new(Buffer { text: String::new() });
/// let document = Aggregate::new();
/// document.add(buffer.clone()).unwrap();
/// document.add(Arc::new(ChangeLog { target: "doc.log".into() })).unwrap();
///
/// // The buffer is not loggable itself, but its sibling is.
/// let log = query::<dyn Loggable, _>(&buffer).unwrap();
/// assert_eq!(log.log_target(), "doc.log");
/// ```
#[must_use]
pub fn query<C, S>(source: &S) -> Option<Arc<C>>
where
    C: ?Sized + 'static,
    S: Queryable + ?Sized,
{
    source.query::<C>()
}

/// Collects every facet of capability `C` reachable from `source`,
/// preserving insertion order.
///
/// An aggregated facet yields its aggregate's full member scan; an
/// unaggregated facet yields itself (when it qualifies) or nothing. See
/// the module docs for the scan-only asymmetry on aggregated facets.
#[must_use]
pub fn query_all<C, S>(source: &S) -> Vec<Arc<C>>
where
    C: ?Sized + 'static,
    S: Queryable + ?Sized,
{
    source.query_all::<C>()
}
