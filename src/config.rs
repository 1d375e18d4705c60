//! Client configuration.
//!
//! `ClientConfig` holds the defaults a provider hands to the clients it
//! creates: the cookie attributes used when a hook passes none, and the Web
//! Storage scope used when a hook passes no [`StorageOption`](crate::storage::StorageOption).
//!
//! `ClientConfig` provides defaults via [`Default`] and a fluent
//! [`ClientConfig::builder()`] for customization with validation.
//!
//! # Examples
//!
//! ```rust
//! use synced_storage::config::ClientConfig;
//! use synced_storage::cookies::{CookieOptions, SameSite};
//! use synced_storage::storage::StorageScope;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = ClientConfig::builder()
//!     .default_cookie_options(CookieOptions::new().path("/").same_site(SameSite::Lax))
//!     .default_storage(StorageScope::Session)
//!     .build()?; // returns Result<ClientConfig, ConfigError>
//! # Ok(()) }
//! ```
//!
//! # Errors
//!
//! Builder validation returns a [`ConfigError`] for cookie options a browser
//! would reject (`SameSite=None` without `Secure`, a path not starting with `/`).

use crate::cookies::{CookieOptions, SameSite};
use crate::storage::StorageScope;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Attributes filling whatever a store's own cookie options leave unset.
    pub default_cookie_options: CookieOptions,
    /// Scope of Web Storage stores requested without an option.
    pub default_storage: StorageScope,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_cookie_options: CookieOptions::new().path("/"),
            default_storage: StorageScope::Local,
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    inner: ClientConfig,
}

impl ClientConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut ClientConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn default_cookie_options(self, options: CookieOptions) -> Self { self.map(|c| c.default_cookie_options = options) }
    pub fn default_storage(self, scope: StorageScope) -> Self { self.map(|c| c.default_storage = scope) }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut ClientConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

// ---------- Validation ----------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    SameSiteNoneWithoutSecure,
    InvalidCookiePath(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::SameSiteNoneWithoutSecure =>
                write!(f, "SameSite=None cookies must also be Secure"),
            ConfigError::InvalidCookiePath(path) =>
                write!(f, "cookie path {path:?} must start with '/'"),
        }
    }
}
impl std::error::Error for ConfigError {}

fn validate(c: &ClientConfig) -> Result<(), ConfigError> {
    let cookie = &c.default_cookie_options;
    if cookie.same_site == Some(SameSite::None) && cookie.secure != Some(true) {
        return Err(ConfigError::SameSiteNoneWithoutSecure);
    }
    if let Some(path) = &cookie.path {
        if !path.starts_with('/') {
            return Err(ConfigError::InvalidCookiePath(path.clone()));
        }
    }
    Ok(())
}
