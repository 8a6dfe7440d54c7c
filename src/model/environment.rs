// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Environment entries: regions, datacenters, zones and other deployment targets

use serde::{Deserialize, Serialize};

use super::tags::{OssTags, CATALOG_NATIVE};
use crate::crn::Crn;
use crate::resource::Resource;
use crate::traverse::MainKind;

/// Kind of deployment target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnvironmentType {
    /// Multi-zone public region
    IbmPublicRegion,
    /// Single datacenter
    IbmDatacenter,
    /// Availability zone inside a region
    IbmZone,
    /// Point of presence
    IbmPop,
    /// Satellite location
    Satellite,
    /// Dedicated environment
    IbmDedicated,
    /// Local environment
    IbmLocal,
    /// Legacy CNAME
    LegacyCname,
    /// Legacy environment
    LegacyEnvironment,
    /// Anything else
    #[default]
    Other,
}

impl EnvironmentType {
    /// Type of an environment synthesized from a Main catalog entry
    #[must_use]
    pub fn from_main_kind(kind: MainKind) -> Self {
        match kind {
            MainKind::Region => Self::IbmPublicRegion,
            MainKind::Datacenter => Self::IbmDatacenter,
            MainKind::AvailabilityZone => Self::IbmZone,
            MainKind::Pop => Self::IbmPop,
            MainKind::Satellite => Self::Satellite,
            MainKind::LegacyCname => Self::LegacyCname,
            MainKind::LegacyEnvironment => Self::LegacyEnvironment,
            _ => Self::Other,
        }
    }
}

/// Lifecycle status of an environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnvironmentStatus {
    /// In service
    Active,
    /// Temporarily disabled
    Disabled,
    /// Permanently removed
    Decommissioned,
    /// Not known
    #[default]
    Unknown,
}

/// OSS record for an Environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OssEnvironment {
    /// Schema version this record was written with
    #[serde(default)]
    pub schema_version: String,
    /// Canonical CRN of the environment
    pub environment_id: String,
    /// Parent environment CRN (e.g. the region of a zone)
    #[serde(default)]
    pub parent_id: String,
    /// Display name
    #[serde(default)]
    pub display_name: String,
    /// Target kind
    #[serde(default, rename = "type")]
    pub env_type: EnvironmentType,
    /// Status
    #[serde(default)]
    pub status: EnvironmentStatus,
    /// Id of the originating Main catalog entry
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reference_catalog_id: String,
    /// Path of the originating Main catalog entry
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reference_catalog_path: String,
    /// Owning segment id; the entry nests under that Segment when set
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub owning_segment: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Tags
    #[serde(default)]
    pub oss_tags: OssTags,
}

impl OssEnvironment {
    /// New record at the current schema version
    #[must_use]
    pub fn new(environment_id: impl Into<String>, display_name: impl Into<String>, env_type: EnvironmentType) -> Self {
        Self {
            schema_version: super::SCHEMA_VERSION.to_string(),
            environment_id: environment_id.into(),
            display_name: display_name.into(),
            env_type,
            status: EnvironmentStatus::Active,
            ..Self::default()
        }
    }

    /// Environment synthesized from a Main catalog location entry
    ///
    /// `None` unless the entry carries a location CRN.
    #[must_use]
    pub fn from_main_entry(r: &Resource, kind: MainKind, path: &str, parent_crn: Option<&str>) -> Option<Self> {
        let target = r.metadata.deployment.as_ref().map(|d| d.target_crn.as_str())?;
        let crn = Crn::parse(target).ok().filter(Crn::is_location)?;
        let mut env = Self::new(crn.to_string(), r.display_name(), EnvironmentType::from_main_kind(kind));
        env.status = if r.active && !r.disabled { EnvironmentStatus::Active } else { EnvironmentStatus::Disabled };
        env.parent_id = parent_crn.unwrap_or_default().to_string();
        env.reference_catalog_id = r.id.clone();
        env.reference_catalog_path = path.to_string();
        env.oss_tags.add(CATALOG_NATIVE);
        Some(env)
    }

    /// True for environments synthesized from the Main catalog
    #[must_use]
    pub fn is_catalog_native(&self) -> bool {
        self.oss_tags.contains(CATALOG_NATIVE)
    }
}
