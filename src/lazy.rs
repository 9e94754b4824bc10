use std::sync::{Arc, OnceLock};

use async_graphql_value::ConstValue;
use tokio::sync::Notify;

use crate::error::Result;

/// Placeholder for a value that becomes available once its batch wave
/// flushes.
///
/// Clones share the same underlying slot, so every resolution path that was
/// deduplicated onto one lookup observes the identical result. A lazy value
/// resolves exactly once and is never reset; fulfilling it twice is a
/// programming error.
#[derive(Debug, Clone)]
pub struct LazyValue {
    state: Arc<LazyState>,
}

#[derive(Debug)]
struct LazyState {
    cell: OnceLock<Result<ConstValue>>,
    notify: Notify,
}

impl LazyValue {
    pub fn pending() -> Self {
        Self {
            state: Arc::new(LazyState {
                cell: OnceLock::new(),
                notify: Notify::new(),
            }),
        }
    }

    /// A lazy value that is already resolved; reading it never suspends.
    pub fn ready(value: ConstValue) -> Self {
        let lazy = Self::pending();
        lazy.fulfill(Ok(value));
        lazy
    }

    pub fn fulfill(&self, result: Result<ConstValue>) {
        if self.state.cell.set(result).is_err() {
            panic!("lazy value fulfilled twice");
        }
        self.state.notify.notify_waiters();
    }

    pub fn is_resolved(&self) -> bool {
        self.state.cell.get().is_some()
    }

    pub fn try_get(&self) -> Option<Result<ConstValue>> {
        self.state.cell.get().cloned()
    }

    /// Whether two handles refer to the same underlying slot.
    pub fn same_as(&self, other: &LazyValue) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Suspends the calling resolution path until the owning wave flushes.
    /// Sibling paths keep running; only this path waits.
    pub async fn wait(&self) -> Result<ConstValue> {
        loop {
            let notified = self.state.notify.notified();
            if let Some(result) = self.state.cell.get() {
                return result.clone();
            }
            notified.await;
        }
    }
}
