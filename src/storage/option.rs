use super::event::StorageScope;
use time::OffsetDateTime;

/// Where a Web Storage backed store persists, and when it expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOption {
    Local { expires: Option<OffsetDateTime> },
    Session { expires: Option<OffsetDateTime> },
}

impl Default for StorageOption {
    fn default() -> Self {
        StorageOption::Local { expires: None }
    }
}

impl From<StorageScope> for StorageOption {
    fn from(scope: StorageScope) -> Self {
        match scope {
            StorageScope::Local => StorageOption::local(),
            StorageScope::Session => StorageOption::session(),
        }
    }
}

impl StorageOption {
    pub fn local() -> Self {
        StorageOption::Local { expires: None }
    }

    pub fn session() -> Self {
        StorageOption::Session { expires: None }
    }

    /// Same scope, expiring at `at`.
    pub fn expires(self, at: OffsetDateTime) -> Self {
        match self {
            StorageOption::Local { .. } => StorageOption::Local { expires: Some(at) },
            StorageOption::Session { .. } => StorageOption::Session { expires: Some(at) },
        }
    }

    pub fn scope(&self) -> StorageScope {
        match self {
            StorageOption::Local { .. } => StorageScope::Local,
            StorageOption::Session { .. } => StorageScope::Session,
        }
    }

    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        match self {
            StorageOption::Local { expires } | StorageOption::Session { expires } => *expires,
        }
    }
}
