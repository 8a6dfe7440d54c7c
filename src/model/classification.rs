// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! The resource classification singleton

use serde::{Deserialize, Serialize};

use super::tags::OssTags;

/// Name of the singleton entry
pub const RESOURCE_CLASSIFICATION_NAME: &str = "oss-resource-classification";
/// Id of the singleton entry
pub const RESOURCE_CLASSIFICATION_ID: &str = "oss_resource_classification";

/// One supported resource type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTypeInfo {
    /// Type name
    pub name: String,
    /// What it covers
    #[serde(default)]
    pub description: String,
    /// Parent type, if nested
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent: String,
}

/// Schema describing the resource types OSS records may use
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OssResourceClassification {
    /// Schema version this record was written with
    #[serde(default)]
    pub schema_version: String,
    /// Supported types
    #[serde(default)]
    pub resource_types: Vec<ResourceTypeInfo>,
    /// Tags
    #[serde(default)]
    pub oss_tags: OssTags,
}

impl OssResourceClassification {
    /// Empty schema at the current version
    #[must_use]
    pub fn new() -> Self {
        Self { schema_version: super::SCHEMA_VERSION.to_string(), ..Self::default() }
    }

    /// Look up a type by name
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&ResourceTypeInfo> {
        self.resource_types.iter().find(|t| t.name == name)
    }
}
