// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Segment and Tribe entries

use serde::{Deserialize, Serialize};

use super::tags::OssTags;
use super::Person;

/// OSS record for a Segment (top of the ownership hierarchy)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OssSegment {
    /// Schema version this record was written with
    #[serde(default)]
    pub schema_version: String,
    /// Segment id
    pub segment_id: String,
    /// Display name
    #[serde(default)]
    pub display_name: String,
    /// Segment type (e.g. `IBM_PUBLIC_CLOUD`)
    #[serde(default, rename = "type")]
    pub segment_type: String,
    /// Segment owner
    #[serde(default)]
    pub owner: Person,
    /// Technical contact
    #[serde(default)]
    pub technical_contact: Person,
    /// Tags
    #[serde(default)]
    pub oss_tags: OssTags,
}

impl OssSegment {
    /// New record at the current schema version
    #[must_use]
    pub fn new(segment_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            schema_version: super::SCHEMA_VERSION.to_string(),
            segment_id: segment_id.into(),
            display_name: display_name.into(),
            ..Self::default()
        }
    }
}

/// OSS record for a Tribe; lives under its Segment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OssTribe {
    /// Schema version this record was written with
    #[serde(default)]
    pub schema_version: String,
    /// Tribe id
    pub tribe_id: String,
    /// Display name
    #[serde(default)]
    pub display_name: String,
    /// Owning segment id
    pub segment_id: String,
    /// Tribe owner
    #[serde(default)]
    pub owner: Person,
    /// Tags
    #[serde(default)]
    pub oss_tags: OssTags,
}

impl OssTribe {
    /// New record at the current schema version
    #[must_use]
    pub fn new(tribe_id: impl Into<String>, display_name: impl Into<String>, segment_id: impl Into<String>) -> Self {
        Self {
            schema_version: super::SCHEMA_VERSION.to_string(),
            tribe_id: tribe_id.into(),
            display_name: display_name.into(),
            segment_id: segment_id.into(),
            ..Self::default()
        }
    }
}
