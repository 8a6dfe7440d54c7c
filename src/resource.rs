// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Wire types of the remote Global Catalog

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::classification::OssResourceClassification;
use crate::model::environment::OssEnvironment;
use crate::model::segment::{OssSegment, OssTribe};
use crate::model::service::OssService;
use crate::model::sidecars::{MergeControl, ValidationInfo};

/// Visibility restriction level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Restriction {
    /// Anyone, including anonymous readers
    Public,
    /// IBM accounts only; the canonical state of OSS entries
    #[default]
    IbmOnly,
    /// Explicitly included accounts only
    Private,
}

/// Visibility policy of one entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Visibility {
    /// Restriction level
    #[serde(default)]
    pub restrictions: Restriction,
    /// Owning account id
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub owner: String,
    /// Include/exclude lists and anything else the server sends back
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Localized display strings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverviewUi {
    /// Short display name
    #[serde(default)]
    pub display_name: String,
    /// One-line description
    #[serde(default)]
    pub description: String,
    /// Long description
    #[serde(default)]
    pub long_description: String,
}

/// Entry provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    /// Provider name
    #[serde(default)]
    pub name: String,
    /// Contact email
    #[serde(default)]
    pub email: String,
}

/// `metadata.deployment` of Main catalog entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// CRN of the location this entry deploys to
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_crn: String,
    /// Location name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
}

/// Typed sidecars in `metadata.other`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OtherMetaData {
    /// Service sidecar
    #[serde(rename = "oss", default, skip_serializing_if = "Option::is_none")]
    pub service: Option<Box<OssService>>,
    /// Segment sidecar
    #[serde(rename = "oss_segment", default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<OssSegment>,
    /// Tribe sidecar
    #[serde(rename = "oss_tribe", default, skip_serializing_if = "Option::is_none")]
    pub tribe: Option<OssTribe>,
    /// Environment sidecar
    #[serde(rename = "oss_environment", default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<OssEnvironment>,
    /// Resource classification sidecar
    #[serde(rename = "oss_resource_classification", default, skip_serializing_if = "Option::is_none")]
    pub resource_classification: Option<OssResourceClassification>,
    /// Local merge policy
    #[serde(rename = "oss_merge_control", default, skip_serializing_if = "Option::is_none")]
    pub merge_control: Option<MergeControl>,
    /// Last validation report
    #[serde(rename = "oss_validation_info", default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationInfo>,
}

impl OtherMetaData {
    /// Slot names that hold a value
    #[must_use]
    pub fn present_slots(&self) -> Vec<&'static str> {
        let mut slots = Vec::new();
        if self.service.is_some() {
            slots.push("oss");
        }
        if self.segment.is_some() {
            slots.push("oss_segment");
        }
        if self.tribe.is_some() {
            slots.push("oss_tribe");
        }
        if self.environment.is_some() {
            slots.push("oss_environment");
        }
        if self.resource_classification.is_some() {
            slots.push("oss_resource_classification");
        }
        if self.merge_control.is_some() {
            slots.push("oss_merge_control");
        }
        if self.validation.is_some() {
            slots.push("oss_validation_info");
        }
        slots
    }
}

/// `metadata` bag of a resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMetaData {
    /// Typed sidecars
    #[serde(default)]
    pub other: OtherMetaData,
    /// Deployment info (Main catalog only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<Deployment>,
}

/// One remote catalog entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Entry id
    #[serde(default)]
    pub id: String,
    /// Entry name
    #[serde(default)]
    pub name: String,
    /// Kind string
    #[serde(default)]
    pub kind: String,
    /// Parent entry id; empty at top level
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent_id: String,
    /// Active flag
    #[serde(default)]
    pub active: bool,
    /// Disabled flag
    #[serde(default)]
    pub disabled: bool,
    /// Group flag (descend into children)
    #[serde(default)]
    pub group: bool,
    /// Remote tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Visibility, when the server includes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    /// Display strings keyed by language
    #[serde(default)]
    pub overview_ui: BTreeMap<String, OverviewUi>,
    /// Provider
    #[serde(default)]
    pub provider: Provider,
    /// URL listing the children of this entry
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub children_url: String,
    /// Sidecars and deployment info
    #[serde(default)]
    pub metadata: ObjectMetaData,
    /// Server-assigned creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    /// Server-assigned update time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

impl Resource {
    /// English display name, falling back to the entry name
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.overview_ui
            .get("en")
            .map(|ui| ui.display_name.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.name)
    }

    /// Visibility restriction, `None` when the server omitted it
    #[must_use]
    pub fn restriction(&self) -> Option<Restriction> {
        self.visibility.as_ref().map(|v| v.restrictions)
    }
}

/// One page of a listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Page {
    /// Offset of the first resource
    #[serde(default)]
    pub offset: usize,
    /// Number of resources in this page
    #[serde(default)]
    pub resource_count: usize,
    /// Total matching resources
    #[serde(default)]
    pub count: usize,
    /// Cursor URL of the next page, when the server provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    /// Resources
    #[serde(default)]
    pub resources: Vec<Resource>,
}
