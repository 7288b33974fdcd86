use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::ConciergeResult;
use crate::ports::{Entity, Repository};

/// Process-local repository backed by a `HashMap`
///
/// Used in development and in tests. `list` returns records in no
/// particular order.
pub struct InMemoryRepository<T: Entity> {
    items: RwLock<HashMap<T::Id, T>>,
}

impl<T: Entity> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

impl<T: Entity> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for InMemoryRepository<T> {
    async fn get(&self, id: &T::Id) -> ConciergeResult<Option<T>> {
        Ok(self.items.read().await.get(id).cloned())
    }

    async fn put(&self, entity: T) -> ConciergeResult<()> {
        self.items.write().await.insert(entity.id(), entity);
        Ok(())
    }

    async fn list(&self) -> ConciergeResult<Vec<T>> {
        Ok(self.items.read().await.values().cloned().collect())
    }

    async fn delete(&self, id: &T::Id) -> ConciergeResult<bool> {
        Ok(self.items.write().await.remove(id).is_some())
    }
}
