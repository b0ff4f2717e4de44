//! # shell_aggregation
//!
//! Facet aggregation and dynamic capability queries — the composition core
//! that lets the shell assemble one logical object out of independently
//! typed parts.
//!
//! This crate provides:
//!
//! - [`Facet`] trait — the contract aggregated objects satisfy, with a
//!   pure per-type capability check ([`facet_cast`],
//!   [`expose_capabilities!`]).
//! - [`Aggregate`] — owning container of facets with typed lookup
//!   ([`Aggregate::component`], [`Aggregate::components`]) and a "changed"
//!   notification.
//! - [`Registry`] — the facet → aggregate ownership map behind one
//!   reader/writer lock; process-wide by default, isolatable for tests.
//! - [`query`] / [`query_all`] — capability lookup that transparently
//!   climbs from a bare facet to its owning aggregate.
//!
//! ## Composition model
//!
//! A facet belongs to at most one aggregate. Queries never require the
//! members to share an inheritance hierarchy: capability membership is
//! decided by each facet's [`Facet::expose`], so "implements `dyn Loggable`"
//! and "is a `ChangeLog`" are both just capabilities. Reads are lock-shared
//! and run concurrently from any thread; membership mutations serialize on
//! the registry's write lock.

pub mod aggregate;
pub mod error;
pub mod facet;
pub mod observer;
pub mod query;
pub mod registry;

pub use aggregate::Aggregate;
pub use error::AggregateError;
pub use facet::{CapabilityBox, Facet, FacetId, FacetRef, facet_cast};
pub use observer::{ObserverId, Observers};
pub use query::{Queryable, query, query_all};
pub use registry::{AggregateId, Registry, RegistryTables};
