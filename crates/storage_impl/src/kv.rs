use common_utils::errors::CustomResult;

use crate::errors::StorageError;

/// The minimal contract the hosted document store provides: opaque string
/// values under string keys, plus listing by key prefix. No transactions,
/// no compare-and-swap.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get_key(&self, key: &str) -> CustomResult<Option<String>, StorageError>;

    async fn set_key(&self, key: &str, value: String) -> CustomResult<(), StorageError>;

    async fn delete_key(&self, key: &str) -> CustomResult<(), StorageError>;

    /// Values of all keys starting with `prefix`, in key order.
    async fn list_values_with_prefix(
        &self,
        prefix: &str,
    ) -> CustomResult<Vec<String>, StorageError>;
}
