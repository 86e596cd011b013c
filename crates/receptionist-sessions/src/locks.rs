use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::types::SessionKey;

/// Per-session turn lock registry (spec.md §5 "the orchestrator is
/// single-threaded per session ... turns for different sessions run in
/// parallel").
///
/// One `tokio::sync::Mutex<()>` per session key, held only for the
/// duration of a single turn. Entries are never removed — a long-lived
/// multi-tenant deployment has a bounded number of active sessions at any
/// moment and the registry is cheap to keep around.
#[derive(Default)]
pub struct SessionLockRegistry {
    locks: DashMap<SessionKey, Arc<Mutex<()>>>,
}

impl SessionLockRegistry {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Acquire the turn lock for `key`, creating its entry if this is the
    /// first turn ever seen for that session. Holding the returned guard
    /// for the duration of a turn is what serializes concurrent retries and
    /// racing channel deliveries for the same session.
    pub async fn acquire(&self, key: &SessionKey) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    pub fn active_session_count(&self) -> usize {
        self.locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use receptionist_core::{Channel, CompanyId};

    #[tokio::test]
    async fn same_key_serializes_acquisition() {
        let registry = SessionLockRegistry::new();
        let key = SessionKey::new(CompanyId::from("acme"), Channel::Voice, "CA1");

        let guard = registry.acquire(&key).await;
        let registry = Arc::new(registry);
        let registry2 = registry.clone();
        let key2 = key.clone();
        let handle = tokio::spawn(async move {
            let _second = registry2.acquire(&key2).await;
        });

        // The spawned task can't have acquired the lock yet since we're
        // still holding `guard`.
        tokio::task::yield_now().await;
        assert!(!handle.is_finished());
        drop(guard);
        handle.await.unwrap();
    }
}
