use crate::models::OwnerId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// One mutex-guarded value per user.
///
/// Events from the same user serialize on their slot; different users never
/// contend beyond the brief map lookup. Slots stay until [`release_if`] drops
/// them, so callers release once the value is back to its idle state.
///
/// [`release_if`]: OwnerSlots::release_if
pub struct OwnerSlots<T> {
    slots: RwLock<HashMap<OwnerId, Arc<Mutex<T>>>>,
}

impl<T: Default> OwnerSlots<T> {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }

    pub async fn lock(&self, owner: OwnerId) -> OwnedMutexGuard<T> {
        let slot = {
            let slots = self.slots.read().await;
            slots.get(&owner).cloned()
        };
        let slot = match slot {
            Some(slot) => slot,
            None => {
                let mut slots = self.slots.write().await;
                slots.entry(owner).or_default().clone()
            }
        };

        slot.lock_owned().await
    }

    /// Forget the user's slot if nobody holds or awaits it and `is_idle` agrees.
    pub async fn release_if<F>(&self, owner: OwnerId, is_idle: F) -> bool
    where
        F: FnOnce(&T) -> bool,
    {
        let mut slots = self.slots.write().await;
        let idle = match slots.get(&owner) {
            // Other clones mean a task is locking or about to lock it
            Some(slot) if Arc::strong_count(slot) == 1 => match slot.try_lock() {
                Ok(value) => is_idle(&*value),
                Err(_) => false,
            },
            _ => false,
        };
        if idle {
            slots.remove(&owner);
        }
        idle
    }

    #[cfg(test)]
    pub async fn tracked(&self) -> usize {
        self.slots.read().await.len()
    }
}

impl<T: Default> Default for OwnerSlots<T> {
    fn default() -> Self {
        Self::new()
    }
}
