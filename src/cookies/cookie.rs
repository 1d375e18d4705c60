//! Cookie value types.
//!
//! [`CookieOptions`] carries the attributes a cookie-backed store passes
//! through to its jar untouched. [`SsrCookie`] is one `(name, value)` pair seen
//! by the server while rendering; a list of them seeds the initial items of a
//! [`CookieClient`](crate::cookies::CookieClient).
//!
//! Values are percent-encoded on the wire (like `encodeURIComponent`), since
//! JSON text contains characters that are not allowed in a cookie value.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt;
use std::sync::Arc;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Characters left as-is when encoding a cookie value.
const COOKIE_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_value(raw: &str) -> String {
    utf8_percent_encode(raw, COOKIE_VALUE).to_string()
}

/// Decodes a percent-encoded cookie value. Invalid UTF-8 leaves the value as-is.
pub fn decode_value(encoded: &str) -> String {
    percent_decode_str(encoded)
        .decode_utf8()
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| encoded.to_string())
}

/// SameSite policy of a cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    /// Parses an attribute value, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("strict") {
            Some(SameSite::Strict)
        } else if s.eq_ignore_ascii_case("lax") {
            Some(SameSite::Lax)
        } else if s.eq_ignore_ascii_case("none") {
            Some(SameSite::None)
        } else {
            None
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Strict => write!(f, "Strict"),
            SameSite::Lax => write!(f, "Lax"),
            SameSite::None => write!(f, "None"),
        }
    }
}

/// Cookie attributes, passed verbatim to the cookie jar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieOptions {
    pub path: Option<String>,
    pub domain: Option<String>,
    /// Lifetime in seconds. Zero or negative deletes the cookie.
    pub max_age: Option<i64>,
    pub expires: Option<OffsetDateTime>,
    /// Flags are `None` until set, so an explicit `false` survives [`or`](Self::or).
    pub secure: Option<bool>,
    /// Only honoured by jars that model server-set cookies.
    pub http_only: Option<bool>,
    pub same_site: Option<SameSite>,
    pub partitioned: Option<bool>,
}

impl CookieOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn map(mut self, f: impl FnOnce(&mut CookieOptions)) -> Self {
        f(&mut self);
        self
    }

    pub fn path<S: Into<String>>(self, path: S) -> Self { self.map(|c| c.path = Some(path.into())) }
    pub fn domain<S: Into<String>>(self, domain: S) -> Self { self.map(|c| c.domain = Some(domain.into())) }
    pub fn max_age(self, secs: i64) -> Self { self.map(|c| c.max_age = Some(secs)) }
    pub fn expires(self, at: OffsetDateTime) -> Self { self.map(|c| c.expires = Some(at)) }
    pub fn secure(self, on: bool) -> Self { self.map(|c| c.secure = Some(on)) }
    pub fn http_only(self, on: bool) -> Self { self.map(|c| c.http_only = Some(on)) }
    pub fn same_site(self, policy: SameSite) -> Self { self.map(|c| c.same_site = Some(policy)) }
    pub fn partitioned(self, on: bool) -> Self { self.map(|c| c.partitioned = Some(on)) }

    /// Returns `true` when writing a cookie with these options deletes it.
    pub fn is_deletion(&self, now: OffsetDateTime) -> bool {
        self.max_age.is_some_and(|age| age <= 0) || self.expires.is_some_and(|at| at <= now)
    }

    /// Fills every unset attribute from `defaults`.
    pub fn or(self, defaults: &CookieOptions) -> Self {
        CookieOptions {
            path: self.path.or_else(|| defaults.path.clone()),
            domain: self.domain.or_else(|| defaults.domain.clone()),
            max_age: self.max_age.or(defaults.max_age),
            expires: self.expires.or(defaults.expires),
            secure: self.secure.or(defaults.secure),
            http_only: self.http_only.or(defaults.http_only),
            same_site: self.same_site.or(defaults.same_site),
            partitioned: self.partitioned.or(defaults.partitioned),
        }
    }

    /// Renders a `Set-Cookie` header value for `name` and `value`.
    pub fn to_set_cookie(&self, name: &str, value: &str) -> String {
        let mut out = format!("{}={}", name, encode_value(value));

        if let Some(max_age) = self.max_age {
            out.push_str(&format!("; Max-Age={max_age}"));
        }
        if let Some(domain) = &self.domain {
            out.push_str(&format!("; Domain={domain}"));
        }
        if let Some(path) = &self.path {
            out.push_str(&format!("; Path={path}"));
        }
        if let Some(expires) = self.expires {
            let formatted = expires.to_offset(UtcOffset::UTC).format(format_description!(
                "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
            ));
            match formatted {
                Ok(date) => out.push_str(&format!("; Expires={date}")),
                Err(e) => log::warn!("Cookie[{name}]: cannot format expires: {e}"),
            }
        }
        if self.http_only == Some(true) {
            out.push_str("; HttpOnly");
        }
        if self.secure == Some(true) {
            out.push_str("; Secure");
        }
        if self.partitioned == Some(true) {
            out.push_str("; Partitioned");
        }
        if let Some(same_site) = self.same_site {
            out.push_str(&format!("; SameSite={same_site}"));
        }

        out
    }
}

/// A cookie held by a jar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    /// Decoded value.
    pub value: String,
    pub options: CookieOptions,
}

/// Notification emitted by a jar for every write. `value` is `None` on removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieChange {
    pub name: String,
    pub value: Option<String>,
}

/// A cookie visible at server-render time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SsrCookie {
    pub name: String,
    pub value: String,
}

/// Server cookie snapshot. Providers compare snapshots by identity.
pub type SsrCookies = Arc<[SsrCookie]>;

impl SsrCookie {
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Parses a request `Cookie` header (`a=1; b=%7B%7D`) into decoded pairs,
    /// keeping header order. Fragments without `=` are skipped.
    pub fn parse_cookie_header(header: &str) -> Vec<SsrCookie> {
        header
            .split(';')
            .filter_map(|part| {
                let (name, value) = part.trim().split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                Some(SsrCookie::new(name, decode_value(value.trim())))
            })
            .collect()
    }
}
