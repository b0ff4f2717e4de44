//! Aggregation error types.

use crate::facet::FacetId;
use crate::registry::AggregateId;

/// Errors reported by membership mutations.
///
/// All of these indicate a collaborator bug (double ownership, removing a
/// stranger), not a runtime condition to retry. The checks are always on:
/// misuse yields an `Err`, never a panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AggregateError {
    /// The facet is already a member of this aggregate.
    #[error("{facet} is already a member of aggregate {aggregate}")]
    DuplicateMember {
        /// Identity of the offending facet.
        facet: FacetId,
        /// The aggregate the add was attempted on.
        aggregate: AggregateId,
    },

    /// The facet already belongs to a different aggregate.
    #[error("{facet} already belongs to aggregate {owner}")]
    AlreadyAggregated {
        /// Identity of the offending facet.
        facet: FacetId,
        /// The aggregate that currently owns the facet.
        owner: AggregateId,
    },

    /// The facet is not a member of this aggregate.
    #[error("{facet} is not a member of aggregate {aggregate}")]
    NotAMember {
        /// Identity of the facet that was not found.
        facet: FacetId,
        /// The aggregate the removal was attempted on.
        aggregate: AggregateId,
    },
}
