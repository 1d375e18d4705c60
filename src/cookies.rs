//! Cookie-backed synced stores.
//!
//! - [`CookieJar`] stands in for `document.cookie`; [`InMemoryCookieJar`] is
//!   the bundled implementation.
//! - [`CookieStore`] is the store for one cookie name.
//! - [`CookieClient`] memoizes one store per name and seeds new stores with
//!   the cookies seen at server-render time ([`SsrCookie`]).

/// Registry of cookie-backed stores.
pub mod client;
/// Cookie values, options and server snapshots.
pub mod cookie;
/// Cookie jar abstraction.
pub mod cookie_jar;
/// The cookie-backed store.
pub mod store;

pub use client::CookieClient;
pub use cookie::{Cookie, CookieChange, CookieOptions, SameSite, SsrCookie, SsrCookies};
pub use cookie_jar::{CookieChangeListener, CookieJar, CookieJarHandle, InMemoryCookieJar};
pub use store::CookieStore;
