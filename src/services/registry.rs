use crate::error::StoreError;
use crate::models::Registration;
use crate::services::store::RegistrationStore;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell, RwLock};

/// Read-through cache of every committed song drop.
///
/// The first reader loads from the store; concurrent first readers wait on
/// that same load. Readers get an `Arc` snapshot, appends swap in a new list
/// (copy-on-write), so nobody ever sees a half-appended list.
pub struct LocationRegistry {
    store: Arc<dyn RegistrationStore>,
    cache: OnceCell<RwLock<Arc<Vec<Registration>>>>,
    /// Serializes appends so the cache keeps the store's order
    writer: Mutex<()>,
}

impl LocationRegistry {
    pub fn new(store: Arc<dyn RegistrationStore>) -> Self {
        Self {
            store,
            cache: OnceCell::new(),
            writer: Mutex::new(()),
        }
    }

    async fn cache(&self) -> Result<&RwLock<Arc<Vec<Registration>>>, StoreError> {
        self.cache
            .get_or_try_init(|| async {
                let registrations = self.store.load_all().await?;
                tracing::info!("Loaded {} song drops", registrations.len());
                Ok::<_, StoreError>(RwLock::new(Arc::new(registrations)))
            })
            .await
    }

    /// Snapshot of all registrations, loading them on first use.
    pub async fn all(&self) -> Result<Arc<Vec<Registration>>, StoreError> {
        let cache = self.cache().await?;
        let snapshot = cache.read().await.clone();
        Ok(snapshot)
    }

    /// Persist a registration, then make it visible to readers.
    ///
    /// The cache is populated before saving so a first load racing with this
    /// save cannot miss the new row or pick it up twice.
    pub async fn append(&self, registration: Registration) -> Result<(), StoreError> {
        let cache = self.cache().await?;

        let _writer = self.writer.lock().await;
        self.store.save(&registration).await?;

        let mut registrations = cache.write().await;
        Arc::make_mut(&mut *registrations).push(registration);

        Ok(())
    }
}
