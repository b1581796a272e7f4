use crate::domain::ports::{Entity, Repository};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A thread-safe in-memory repository for one entity kind.
///
/// Uses `Arc<RwLock<HashMap<Uuid, T>>>` to allow shared concurrent access.
/// Saving an entity with a known id replaces the stored copy.
#[derive(Clone)]
pub struct InMemoryRepository<T> {
    entities: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self {
            entities: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<T: Entity> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entities.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entities.read().await.is_empty()
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for InMemoryRepository<T> {
    async fn save(&self, entity: T) -> Result<Uuid> {
        let id = entity.id();
        let mut entities = self.entities.write().await;
        entities.insert(id, entity);
        Ok(id)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<T>> {
        let entities = self.entities.read().await;
        Ok(entities.get(&id).cloned())
    }
}
