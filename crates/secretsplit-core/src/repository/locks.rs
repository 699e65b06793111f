//! Per-entity write locks
//!
//! Two writers splitting the same entity at the same time would both read the
//! same previous pointers and mint the same next version. The writer holds the
//! entity's lock across read-previous / split / write to rule that out.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::types::EntityIdentity;

/// Held while an entity is being written; released on drop
#[derive(Debug)]
pub struct EntityGuard {
    identity: EntityIdentity,
    _guard: OwnedMutexGuard<()>,
}

impl EntityGuard {
    pub fn identity(&self) -> &EntityIdentity {
        &self.identity
    }
}

/// Async mutex per entity identity
///
/// Entries are created on demand and pruned once nobody holds or waits on
/// them, so the table only grows with the number of entities in flight.
#[derive(Debug, Default)]
pub struct EntityLocks {
    table: Mutex<HashMap<EntityIdentity, Arc<AsyncMutex<()>>>>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to one entity
    pub async fn lock(&self, identity: &EntityIdentity) -> EntityGuard {
        let mutex = {
            let mut table = self.table.lock();
            // Only the table itself references an idle entry
            table.retain(|_, mutex| Arc::strong_count(mutex) > 1);
            table.entry(*identity).or_default().clone()
        };

        EntityGuard {
            identity: *identity,
            _guard: mutex.lock_owned().await,
        }
    }

    /// Lock several entities, always in identity order
    ///
    /// Acquiring in a fixed order keeps two batch writers with overlapping
    /// entities from deadlocking. Duplicates are locked once.
    pub async fn lock_all(&self, identities: impl IntoIterator<Item = EntityIdentity>) -> Vec<EntityGuard> {
        let mut identities: Vec<EntityIdentity> = identities.into_iter().collect();
        identities.sort();
        identities.dedup();

        let mut guards = Vec::with_capacity(identities.len());
        for identity in &identities {
            guards.push(self.lock(identity).await);
        }
        guards
    }

    /// Number of entities currently tracked
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use uuid::Uuid;

    use crate::types::EntityKind;

    fn source(id: Uuid) -> EntityIdentity {
        EntityIdentity::new(EntityKind::SourceConnection, id)
    }

    #[tokio::test]
    async fn test_same_entity_is_exclusive() {
        let locks = Arc::new(EntityLocks::new());
        let identity = source(Uuid::new_v4());

        let guard = locks.lock(&identity).await;
        assert_eq!(guard.identity(), &identity);

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(&identity).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_entities_do_not_block() {
        let locks = EntityLocks::new();
        let _a = locks.lock(&source(Uuid::new_v4())).await;
        let b = tokio::time::timeout(Duration::from_secs(1), locks.lock(&source(Uuid::new_v4()))).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_idle_entries_are_pruned() {
        let locks = EntityLocks::new();
        for _ in 0..5 {
            let _guard = locks.lock(&source(Uuid::new_v4())).await;
        }
        // Each acquisition prunes the idle entries left by earlier ones
        assert_eq!(locks.len(), 1);

        let held = locks.lock(&source(Uuid::new_v4())).await;
        assert_eq!(locks.len(), 1);
        drop(held);
    }

    #[tokio::test]
    async fn test_lock_all_dedups() {
        let locks = EntityLocks::new();
        let id = source(Uuid::new_v4());
        let other = source(Uuid::new_v4());

        let guards = locks.lock_all(vec![other, id, other]).await;
        assert_eq!(guards.len(), 2);
        assert!(guards[0].identity() < guards[1].identity());
    }
}
