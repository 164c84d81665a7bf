/// Errors surfaced by the storage interfaces.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No value stored under the requested key.
    #[error("Value not found for key: {0}")]
    ValueNotFound(String),
    /// A value already exists under a key that must be inserted fresh.
    #[error("Duplicate value for key: {0}")]
    DuplicateValue(String),
    /// The value could not be serialized for storage.
    #[error("Failed to serialize value for storage")]
    SerializationFailed,
    /// The stored value could not be deserialized into the expected type.
    #[error("Failed to deserialize stored value")]
    DeserializationFailed,
}
