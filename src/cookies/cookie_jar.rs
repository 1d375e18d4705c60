//! Cookie jar abstraction and an in-memory implementation.
//!
//! A **cookie jar** stands in for `document.cookie`: the cookies visible to one
//! document, plus a change-listener mechanism that fires for every write made
//! through the jar. Cookie-backed stores rely on that mechanism for their
//! same-document notifications, so every jar implementation must emit a
//! [`CookieChange`] synchronously from `set` and `remove`.
//!
//! ## Notes & limitations
//! - Writing with `Max-Age <= 0` or an `Expires` in the past removes the cookie.
//! - Expiration is otherwise **not** enforced; `expires` is stored but not acted upon.
//! - Cookies are keyed by name only; path/domain scoping is left to the host.

use crate::cookies::cookie::{decode_value, encode_value, Cookie, CookieChange, CookieOptions};
use crate::listeners::{ListenerId, Listeners};
use anyhow::Result;
use std::sync::{Arc, PoisonError, RwLock};
use time::OffsetDateTime;

/// Listener invoked for every cookie change.
pub type CookieChangeListener = Arc<dyn Fn(&CookieChange) + Send + Sync>;

/// A handle to a cookie jar.
///
/// Jars are internally synchronized; all methods take `&self`.
pub type CookieJarHandle = Arc<dyn CookieJar>;

/// The cookie primitive a [`CookieStore`](crate::cookies::CookieStore) persists to.
pub trait CookieJar: Send + Sync {
    /// Returns the decoded value of cookie `name`.
    fn get(&self, name: &str) -> Option<String>;

    /// Sets cookie `name`, replacing any existing one ("last write wins"), and
    /// notifies change listeners.
    fn set(&self, name: &str, value: &str, options: &CookieOptions) -> Result<()>;

    /// Removes cookie `name` and notifies change listeners.
    fn remove(&self, name: &str, options: &CookieOptions) -> Result<()>;

    /// All cookies, in insertion order.
    fn all(&self) -> Vec<Cookie>;

    fn add_change_listener(&self, listener: CookieChangeListener) -> ListenerId;

    fn remove_change_listener(&self, id: ListenerId);
}

/// In-memory cookie jar. Used as a default, and in tests.
#[derive(Debug, Default)]
pub struct InMemoryCookieJar {
    cookies: RwLock<Vec<Cookie>>,
    listeners: Listeners<CookieChange>,
}

impl InMemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a jar holding the cookies of a `Cookie` request header.
    pub fn from_cookie_header(header: &str) -> Self {
        let jar = Self::new();
        {
            let mut cookies = jar.cookies.write().unwrap_or_else(PoisonError::into_inner);
            for part in header.split(';') {
                if let Some((name, value)) = part.trim().split_once('=') {
                    let name = name.trim();
                    if name.is_empty() {
                        continue;
                    }
                    let cookie = Cookie {
                        name: name.to_string(),
                        value: decode_value(value.trim()),
                        options: CookieOptions::default(),
                    };
                    Self::upsert(&mut cookies, cookie);
                }
            }
        }
        jar
    }

    /// Renders the jar as a `Cookie` request header, or `None` when empty.
    pub fn cookie_header(&self) -> Option<String> {
        let header = self
            .read()
            .iter()
            .map(|c| format!("{}={}", c.name, encode_value(&c.value)))
            .collect::<Vec<_>>()
            .join("; ");

        if header.is_empty() {
            None
        } else {
            Some(header)
        }
    }

    /// Number of registered change listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Wraps the jar into a shareable handle.
    pub fn into_handle(self) -> CookieJarHandle {
        Arc::new(self)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Cookie>> {
        self.cookies.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn upsert(cookies: &mut Vec<Cookie>, cookie: Cookie) {
        if let Some(existing) = cookies.iter_mut().find(|c| c.name == cookie.name) {
            *existing = cookie;
        } else {
            cookies.push(cookie);
        }
    }
}

impl CookieJar for InMemoryCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        self.read().iter().find(|c| c.name == name).map(|c| c.value.clone())
    }

    fn set(&self, name: &str, value: &str, options: &CookieOptions) -> Result<()> {
        if options.is_deletion(OffsetDateTime::now_utc()) {
            return self.remove(name, options);
        }

        {
            let mut cookies = self.cookies.write().unwrap_or_else(PoisonError::into_inner);
            Self::upsert(
                &mut cookies,
                Cookie {
                    name: name.to_string(),
                    value: value.to_string(),
                    options: options.clone(),
                },
            );
        }

        self.listeners.emit(&CookieChange {
            name: name.to_string(),
            value: Some(value.to_string()),
        });
        Ok(())
    }

    fn remove(&self, name: &str, _options: &CookieOptions) -> Result<()> {
        self.cookies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|c| c.name != name);

        self.listeners.emit(&CookieChange {
            name: name.to_string(),
            value: None,
        });
        Ok(())
    }

    fn all(&self) -> Vec<Cookie> {
        self.read().clone()
    }

    fn add_change_listener(&self, listener: CookieChangeListener) -> ListenerId {
        self.listeners.add(listener)
    }

    fn remove_change_listener(&self, id: ListenerId) {
        self.listeners.remove(id);
    }
}
