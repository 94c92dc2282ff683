//! Identity registry.
//!
//! Keeps one live handle per `(kind, identity)` within a session so that the
//! same remote entity parsed from different pages shares a single cache.

use crate::resource::ResourceKind;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::trace;

type Erased = dyn Any + Send + Sync;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RegistryKey {
    kind: ResourceKind,
    identity: String,
}

/// Weak map from identity to shared resource state.
///
/// Entries never keep a resource alive; once every handle is dropped the next
/// lookup creates fresh state.
#[derive(Default)]
pub(crate) struct Registry {
    entries: Mutex<HashMap<RegistryKey, Weak<Erased>>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Return the live state for `(kind, identity)`, creating it with `make` if absent.
    pub(crate) fn get_or_insert<T, F>(&self, kind: ResourceKind, identity: String, make: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Arc<T>,
    {
        let key = RegistryKey { kind, identity };
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = entries.get(&key).and_then(Weak::upgrade) {
            if let Ok(typed) = existing.downcast::<T>() {
                trace!(kind = %key.kind, identity = %key.identity, "Registry hit");
                return typed;
            }
        }

        // Drop entries whose handles are all gone before growing the map.
        entries.retain(|_, weak| weak.strong_count() > 0);

        let created = make();
        let erased: Arc<Erased> = created.clone();
        trace!(kind = %key.kind, identity = %key.identity, "Registry insert");
        entries.insert(key, Arc::downgrade(&erased));
        created
    }

    /// Number of identities with at least one live handle.
    pub(crate) fn live(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}
