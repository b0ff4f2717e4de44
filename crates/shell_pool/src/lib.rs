//! # shell_pool
//!
//! A common pool of shared objects, used as the discovery point between
//! otherwise-unrelated shell modules. A module that defines an *extension
//! point* — a capability trait others may implement — looks for
//! implementations in the pool; providing modules simply add their objects.
//!
//! Objects must implement [`Facet`](shell_aggregation::Facet); there are no
//! other prerequisites. Retrieval reuses the aggregation layer's capability
//! check, so anything queryable from an aggregate is discoverable from the
//! pool the same way:
//!
//! ```rust
//! use std::sync::Arc;
//! use shell_aggregation::expose_capabilities;
//! use shell_pool::ObjectPool;
//!
//! pub trait MimeHandler: Send + Sync {
//!     fn handles(&self, mime: &str) -> bool;
//! }
//!
//! struct TextHandler;
//!
//! impl MimeHandler for TextHandler {
//!     fn handles(&self, mime: &str) -> bool {
//!         mime.starts_with("text/")
//!     }
//! }
//!
//! expose_capabilities!(TextHandler => dyn MimeHandler);
//!
//! let pool = ObjectPool::new();
//! pool.add_object(Arc::new(TextHandler));
//!
//! let handler = pool.get_object::<dyn MimeHandler>().unwrap();
//! assert!(handler.handles("text/plain"));
//! ```
//!
//! Whenever the pool's contents change, the corresponding notification
//! fires: `object_added` after an addition, `about_to_remove_object`
//! before a removal (while the object is still in the pool).

mod pool;

pub use pool::ObjectPool;
