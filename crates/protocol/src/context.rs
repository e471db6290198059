// SPDX-License-Identifier: PolyForm-Shield-1.0

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;

/// per-stimulation key→value storage.
///
/// The kernel never reads through this trait for its own purposes; it only
/// ever calls [`ContextStore::snapshot`] to populate the `context_value` field
/// of a [`crate::response::StimulationResponse`]. Dendrite handlers that want
/// a concrete, non-JSON context type can recover it via [`ContextStore::as_any`]
/// and downcast to their own store implementation.
pub trait ContextStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value);

    /// serialisable snapshot taken at response-emission time.
    fn snapshot(&self) -> Value;

    fn as_any(&self) -> &dyn Any;
}

pub type ContextHandle = Arc<dyn ContextStore>;

/// factory invoked exactly once per Stimulation.
pub type ContextStoreFactory = Arc<dyn Fn() -> ContextHandle + Send + Sync>;

/// default context store: an in-memory JSON-valued map. Values are kept
/// opaque (`serde_json::Value`) so the kernel doesn't need to know anything
/// about user payload types.
#[derive(Default)]
pub struct MapContextStore {
    inner: RwLock<HashMap<String, Value>>,
}

impl MapContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// the default [`ContextStoreFactory`] used when a CNS is constructed
    /// without an explicit `ctx` / `create_context_store` option.
    pub fn factory() -> ContextStoreFactory {
        Arc::new(|| Arc::new(MapContextStore::new()) as ContextHandle)
    }
}

impl ContextStore for MapContextStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.inner
            .read()
            .expect("context store lock poisoned")
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.inner
            .write()
            .expect("context store lock poisoned")
            .insert(key.to_string(), value);
    }

    fn snapshot(&self) -> Value {
        let map = self.inner.read().expect("context store lock poisoned");
        serde_json::to_value(&*map).unwrap_or(Value::Null)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_set_roundtrip() {
        let store = MapContextStore::new();
        assert_eq!(store.get("k"), None);
        store.set("k", Value::from(42));
        assert_eq!(store.get("k"), Some(Value::from(42)));
    }

    #[test]
    fn snapshot_reflects_current_state() {
        let store = MapContextStore::new();
        store.set("a", Value::from("x"));
        let snap = store.snapshot();
        assert_eq!(snap["a"], Value::from("x"));
    }
}
