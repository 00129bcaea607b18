//! Expert (adapter) metadata.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a registered adapter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpertId(String);

impl ExpertId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExpertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExpertId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ExpertId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for ExpertId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Opaque locator for adapter weights, interpreted only by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageHandle(String);

impl StorageHandle {
    #[must_use]
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Registered adapter.
///
/// Experts are never removed from the registry; deactivation hides them
/// from routing while results that reference them may still exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expert {
    pub id: ExpertId,
    /// Task domain the adapter specializes in ("math", "creative", ...).
    pub domain: String,
    /// Free-form compatibility tags.
    pub tags: BTreeSet<String>,
    pub storage: StorageHandle,
    /// 2-D task-affinity position, set by affinity recomputation.
    pub position: Option<[f64; 2]>,
    pub active: bool,
    pub registered_at: DateTime<Utc>,
}

impl Expert {
    #[must_use]
    pub fn new(
        id: impl Into<ExpertId>,
        domain: impl Into<String>,
        tags: impl IntoIterator<Item = impl Into<String>>,
        storage: StorageHandle,
    ) -> Self {
        Self {
            id: id.into(),
            domain: domain.into(),
            tags: tags.into_iter().map(Into::into).collect(),
            storage,
            position: None,
            active: true,
            registered_at: Utc::now(),
        }
    }

    /// True if the expert carries the given compatibility tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}
