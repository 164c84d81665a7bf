use std::collections::HashMap;

use common_utils::errors::CustomResult;
use tokio::sync::Mutex;

use crate::{errors::StorageError, kv::KeyValueStore};

/// In-memory [`KeyValueStore`] backend, used by tests and local tooling in
/// place of the hosted document store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get_key(&self, key: &str) -> CustomResult<Option<String>, StorageError> {
        Ok(self.inner.lock().await.get(key).cloned())
    }

    async fn set_key(&self, key: &str, value: String) -> CustomResult<(), StorageError> {
        self.inner.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete_key(&self, key: &str) -> CustomResult<(), StorageError> {
        self.inner.lock().await.remove(key);
        Ok(())
    }

    async fn list_values_with_prefix(
        &self,
        prefix: &str,
    ) -> CustomResult<Vec<String>, StorageError> {
        let guard = self.inner.lock().await;
        let mut entries: Vec<(&String, &String)> = guard
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        Ok(entries.into_iter().map(|(_, value)| value.clone()).collect())
    }
}
