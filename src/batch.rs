use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use async_graphql_value::ConstValue;
use indexmap::IndexMap;

use crate::error::Result;
use crate::lazy::LazyValue;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Bulk-fetch collaborator for one loader: distinct keys in, a key-to-value
/// mapping out. Keys missing from the mapping are treated as "not found".
pub type BulkFetchFn =
    Arc<dyn Fn(Vec<String>) -> BoxFuture<'static, Result<HashMap<String, ConstValue>>> + Send + Sync>;

struct Loader {
    fetch: BulkFetchFn,
    /// Lookups registered since the last flush, in registration order.
    pending: Mutex<IndexMap<String, LazyValue>>,
    /// Request-scoped cache of successfully resolved lookups.
    resolved: Mutex<HashMap<String, LazyValue>>,
}

/// Merges identical keyed lookups into one bulk fetch per loader per wave.
///
/// State is scoped to a single request; waves are flushed deterministically
/// by the executor's cooperative loop, never on a timer. Locks guard map
/// bookkeeping only and are never held across an await.
pub struct BatchCoordinator {
    loaders: Mutex<HashMap<String, Arc<Loader>>>,
}

impl BatchCoordinator {
    pub fn new() -> Self {
        Self {
            loaders: Mutex::new(HashMap::new()),
        }
    }

    pub fn register<F>(&self, name: impl Into<String>, fetch: F) -> Result<()>
    where
        F: Fn(Vec<String>) -> BoxFuture<'static, Result<HashMap<String, ConstValue>>>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        let mut loaders = self.loaders.lock().unwrap();
        if loaders.contains_key(&name) {
            return Err(crate::error::SchemaError::Build {
                message: format!("batch loader '{name}' registered twice"),
            }
            .into());
        }
        loaders.insert(
            name,
            Arc::new(Loader {
                fetch: Arc::new(fetch),
                pending: Mutex::new(IndexMap::new()),
                resolved: Mutex::new(HashMap::new()),
            }),
        );
        Ok(())
    }

    fn loader(&self, name: &str) -> Arc<Loader> {
        self.loaders
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("unknown batch loader '{name}'"))
    }

    /// Register a lookup. Identical `(loader, key)` pairs return the same
    /// lazy value instance, both within the current wave and, once a wave
    /// has resolved successfully, for the rest of the request.
    ///
    /// Calling this with an unregistered loader name is a programming
    /// error.
    pub fn load(&self, loader: &str, key: impl Into<String>) -> LazyValue {
        let loader = self.loader(loader);
        let key = key.into();
        if let Some(lazy) = loader.resolved.lock().unwrap().get(&key) {
            return lazy.clone();
        }
        let mut pending = loader.pending.lock().unwrap();
        pending.entry(key).or_insert_with(LazyValue::pending).clone()
    }

    pub fn has_pending(&self) -> bool {
        self.pending_count() > 0
    }

    pub fn pending_count(&self) -> usize {
        let loaders = self.loaders.lock().unwrap();
        loaders
            .values()
            .map(|l| l.pending.lock().unwrap().len())
            .sum()
    }

    /// Flush the current wave: one bulk fetch per loader with pending keys.
    /// Keys absent from the returned mapping resolve to `Null`. A fetch
    /// error fails every lazy value in that loader's wave with the same
    /// error and leaves other loaders untouched.
    pub async fn flush(&self) {
        let loaders: Vec<(String, Arc<Loader>)> = {
            let map = self.loaders.lock().unwrap();
            map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        };
        for (name, loader) in loaders {
            let wave: IndexMap<String, LazyValue> =
                std::mem::take(&mut *loader.pending.lock().unwrap());
            if wave.is_empty() {
                continue;
            }
            let keys: Vec<String> = wave.keys().cloned().collect();
            tracing::debug!(loader = %name, keys = keys.len(), "flushing batch wave");
            match (loader.fetch)(keys).await {
                Ok(mut values) => {
                    let mut resolved = loader.resolved.lock().unwrap();
                    for (key, lazy) in wave {
                        let value = values.remove(&key).unwrap_or(ConstValue::Null);
                        lazy.fulfill(Ok(value));
                        resolved.insert(key, lazy);
                    }
                }
                Err(err) => {
                    tracing::error!(loader = %name, error = %err, "bulk fetch failed");
                    // Failed lookups are not cached; a later wave may retry.
                    for (_, lazy) in wave {
                        lazy.fulfill(Err(err.clone()));
                    }
                }
            }
        }
    }
}

impl Default for BatchCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
