// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! OSS tags: free-form labels attached to every entry

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Marks entries created by tests
pub const OSS_TEST: &str = "ossTest";
/// Set on US-Regulated variants whose override declares ServiceNow approval
pub const SERVICE_NOW_APPROVED: &str = "serviceNowApproved";
/// Marks environments synthesized from the Main catalog
pub const CATALOG_NATIVE: &str = "catalog_native";

/// Ordered set of tags
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OssTags(BTreeSet<String>);

impl OssTags {
    /// Empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `tag` is present
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    /// Add a tag; returns false if it was already present
    pub fn add(&mut self, tag: impl Into<String>) -> bool {
        self.0.insert(tag.into())
    }

    /// Remove a tag; returns false if it was absent
    pub fn remove(&mut self, tag: &str) -> bool {
        self.0.remove(tag)
    }

    /// Iterate in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of tags
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no tags are set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tags that are not of the form `[A-Za-z0-9_.-]+`
    #[must_use]
    pub fn invalid(&self) -> Vec<&str> {
        self.iter().filter(|t| !is_valid_tag(t)).collect()
    }
}

/// `[A-Za-z0-9_.-]+`
#[must_use]
pub fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

impl<S: Into<String>> FromIterator<S> for OssTags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for OssTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, tag) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{tag}")?;
        }
        write!(f, "]")
    }
}
