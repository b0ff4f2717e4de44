//! Core [`Facet`] trait and the dynamic capability check.
//!
//! A facet is one independently-typed piece of a composite runtime object:
//! a document might be assembled from a text-buffer facet, an auto-save
//! facet, and a change-log facet. Facets advertise **capabilities** — the
//! concrete facet type itself plus any capability traits it chooses to
//! expose — and capability lookup is a pure, lock-free function of the
//! facet's type.
//!
//! ## Capability identity
//!
//! A capability is identified by its [`TypeId`]: either a concrete facet
//! type (`Logger`) or a capability trait object type (`dyn Loggable`).
//! [`Facet::expose`] answers "can this facet be viewed as capability `C`?"
//! by returning a boxed `Arc` view that [`facet_cast`] downcasts back to
//! `Arc<C>`. Capability traits must declare `Send + Sync` supertraits so
//! their trait objects can cross threads.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use shell_aggregation::{expose_capabilities, facet_cast, FacetRef};
//!
//! pub trait Loggable: Send + Sync {
//!     fn log_target(&self) -> &str;
//! }
//!
//! struct Logger {
//!     target: String,
//! }
//!
//! impl Loggable for Logger {
//!     fn log_target(&self) -> &str {
//!         &self.target
//!     }
//! }
//!
//! expose_capabilities!(Logger => dyn Loggable);
//!
//! let logger: FacetRef = Arc::new(Logger { target: "session".into() });
//! let view = facet_cast::<dyn Loggable>(&logger).unwrap();
//! assert_eq!(view.log_target(), "session");
//! ```

use std::any::{Any, TypeId};
use std::sync::Arc;

/// A type-erased capability view produced by [`Facet::expose`].
///
/// The box always contains an `Arc<C>` for the requested capability `C`;
/// [`facet_cast`] recovers the typed handle.
pub type CapabilityBox = Box<dyn Any + Send + Sync>;

/// Shared handle to a type-erased facet.
pub type FacetRef = Arc<dyn Facet>;

/// The contract every aggregated object must satisfy.
///
/// Requires `Send + Sync + 'static` so facets can be shared freely across
/// the host application's threads. The default [`Facet::expose`] makes the
/// concrete type its only capability; override it — or use
/// [`expose_capabilities!`](crate::expose_capabilities) — to additionally
/// expose capability trait objects.
pub trait Facet: Send + Sync + 'static {
    /// Optional instance name, used for name-based lookup in object pools.
    ///
    /// The default is anonymous.
    fn name(&self) -> Option<&str> {
        None
    }

    /// Attempt to view this facet as the capability identified by `id`.
    ///
    /// Returns a boxed `Arc<C>` when the facet satisfies the capability,
    /// `None` otherwise. Implementations must be pure type dispatch: no
    /// mutation, no locking, no calls back into the aggregation layer.
    fn expose(self: Arc<Self>, id: TypeId) -> Option<CapabilityBox> {
        if id == TypeId::of::<Self>() {
            Some(Box::new(self))
        } else {
            None
        }
    }
}

/// Identity of a facet allocation, used as the registry key.
///
/// Two handles compare equal exactly when they point at the same facet
/// instance, regardless of whether they are typed (`Arc<Logger>`) or
/// erased (`FacetRef`) views of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FacetId(usize);

impl FacetId {
    /// Returns the identity of the facet behind `handle`.
    #[must_use]
    pub fn of<T: ?Sized>(handle: &Arc<T>) -> Self {
        Self(Arc::as_ptr(handle).cast::<()>() as usize)
    }
}

impl std::fmt::Display for FacetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FacetId({:#x})", self.0)
    }
}

/// The safe dynamic capability check.
///
/// Asks `facet` to expose capability `C` and recovers the typed handle.
/// `C` may be the facet's concrete type or a capability trait object type
/// (`dyn Loggable`). Returns `None` when the facet does not satisfy `C`.
///
/// This is a pure type check on the facet itself — it never consults the
/// ownership registry and takes no lock.
#[must_use]
pub fn facet_cast<C>(facet: &FacetRef) -> Option<Arc<C>>
where
    C: ?Sized + 'static,
{
    facet
        .clone()
        .expose(TypeId::of::<C>())
        .and_then(|view| view.downcast::<Arc<C>>().ok())
        .map(|boxed| *boxed)
}

/// Implements [`Facet`] for a concrete type, exposing the listed capability
/// trait objects in addition to the type itself.
///
/// ```rust
/// use shell_aggregation::expose_capabilities;
///
/// pub trait Persistable: Send + Sync {
///     fn save(&self) -> bool;
/// }
///
/// struct AutoSaver {
///     interval_secs: u64,
/// }
///
/// impl Persistable for AutoSaver {
///     fn save(&self) -> bool {
///         true
///     }
/// }
///
/// // AutoSaver is queryable as `AutoSaver` and as `dyn Persistable`.
/// expose_capabilities!(AutoSaver => dyn Persistable);
///
/// struct Plain;
///
/// // No extra capabilities: same as `impl Facet for Plain {}`.
/// expose_capabilities!(Plain);
/// ```
#[macro_export]
macro_rules! expose_capabilities {
    ($ty:ty) => {
        impl $crate::Facet for $ty {}
    };
    ($ty:ty => $($cap:ty),+ $(,)?) => {
        impl $crate::Facet for $ty {
            fn expose(
                self: ::std::sync::Arc<Self>,
                id: ::std::any::TypeId,
            ) -> ::std::option::Option<$crate::CapabilityBox> {
                if id == ::std::any::TypeId::of::<$ty>() {
                    return ::std::option::Option::Some(::std::boxed::Box::new(self));
                }
                $(
                    if id == ::std::any::TypeId::of::<$cap>() {
                        return ::std::option::Option::Some(::std::boxed::Box::new(
                            ::std::sync::Arc::clone(&self) as ::std::sync::Arc<$cap>,
                        ));
                    }
                )+
                ::std::option::Option::None
            }
        }
    };
}
