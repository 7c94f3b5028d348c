use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum KeyValueStoreError {
    #[error("stockage indisponible: {message}")]
    Unavailable { message: String },

    #[error("erreur de persistence: {message}")]
    Storage { message: String },
}

/// Persistent string key-value store shared by every instance of a storage
/// scope. Any call may fail.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, KeyValueStoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), KeyValueStoreError>;

    fn remove(&self, key: &str) -> Result<(), KeyValueStoreError>;
}
