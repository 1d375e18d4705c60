use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum SyncedStorageError {
    #[error("Store \"{key}\" already exists with a different item type")]
    TypeMismatch { key: String },

    #[error("{hook} must be used within a {provider}")]
    MissingProvider {
        hook: &'static str,
        provider: &'static str,
    },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
