//! Document composition demo.
//!
//! Builds one logical "document" out of three independently-typed facets —
//! a text buffer, an auto-saver, and a change log — then discovers
//! capabilities three ways:
//!
//! 1. Typed lookup on the aggregate (`component`/`components`).
//! 2. Delegated lookup from a bare facet (`query` climbs to the siblings).
//! 3. Extension-point discovery through the shared object pool.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shell_aggregation::{Aggregate, Facet, FacetRef, expose_capabilities, query, query_all};
use shell_pool::ObjectPool;

/// Capability: the object records change events somewhere.
pub trait Loggable: Send + Sync {
    fn log_target(&self) -> &str;
}

/// Capability: the object can persist itself.
pub trait Persistable: Send + Sync {
    fn location(&self) -> &str;
    fn save(&self) -> bool;
}

struct TextBuffer {
    contents: String,
}

impl Facet for TextBuffer {
    fn name(&self) -> Option<&str> {
        Some("text-buffer")
    }
}

struct AutoSaver {
    location: String,
}

impl Persistable for AutoSaver {
    fn location(&self) -> &str {
        &self.location
    }

    fn save(&self) -> bool {
        true
    }
}

expose_capabilities!(AutoSaver => dyn Persistable);

struct ChangeLog {
    target: String,
}

impl Loggable for ChangeLog {
    fn log_target(&self) -> &str {
        &self.target
    }
}

expose_capabilities!(ChangeLog => dyn Loggable);

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("document_facets=info".parse()?),
        )
        .init();

    let buffer = Arc::new(TextBuffer {
        contents: "fn main() {}".to_string(),
    });
    let saver = Arc::new(AutoSaver {
        location: "/tmp/scratch.rs".to_string(),
    });
    let log = Arc::new(ChangeLog {
        target: "session.log".to_string(),
    });

    let document = Aggregate::new();
    document.on_changed(|| info!("document membership changed"));
    document.add(buffer.clone())?;
    document.add(saver.clone())?;
    document.add(log.clone())?;
    info!(facets = document.len(), "document assembled");

    // Typed lookup on the aggregate.
    let persister = document
        .component::<dyn Persistable>()
        .expect("document should be persistable");
    info!(
        location = persister.location(),
        saved = persister.save(),
        "saved via aggregate lookup"
    );

    // The buffer is not loggable itself; the query climbs to its sibling.
    let delegated = query::<dyn Loggable, _>(&buffer).expect("sibling change log should be found");
    info!(target = delegated.log_target(), "delegated query hit");

    for loggable in query_all::<dyn Loggable, _>(&document) {
        info!(target = loggable.log_target(), "loggable facet");
    }

    // The pool is the discovery point between unrelated modules: publish
    // the change log as a Loggable extension point.
    let pool = ObjectPool::global();
    pool.add_object(log.clone());
    pool.add_object(buffer.clone());

    let discovered = pool
        .get_object::<dyn Loggable>()
        .expect("a loggable object should be pooled");
    info!(target = discovered.log_target(), "discovered via pool");

    let by_name = pool
        .get_object_by_name("text-buffer")
        .expect("the buffer registered a name");
    info!(
        chars = buffer.contents.len(),
        named = by_name.name().unwrap_or_default(),
        "found by name"
    );

    // Detaching the change log takes the capability away from the whole
    // aggregate.
    let erased: FacetRef = log.clone();
    document.remove(&erased)?;
    assert!(query::<dyn Loggable, _>(&buffer).is_none());
    info!(facets = document.len(), "change log detached");

    Ok(())
}
