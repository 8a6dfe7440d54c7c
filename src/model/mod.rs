// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! OSS entry model
//!
//! Every entry is an [`OssRecord`] (one variant per kind) plus an optional
//! [`Extension`] carrying server timestamps and the merge-control and
//! validation sidecars. Per-kind wire details live in [`KIND_TABLE`].
//!
//! Names and ids are pure functions of the record:
//!
//! | Kind | name | id |
//! |---|---|---|
//! | Service | `oss.<ref>` | `oss.<ref>` |
//! | Segment | `oss-segment.<canonical display>` | `oss_segment.<segment id>` |
//! | Tribe | `oss-tribe.<canonical display>` | `oss_tribe.<tribe id>` |
//! | Environment | `oss-environment.<cname>-<ctype>-<location>` | `oss_environment.<crn>` |
//! | ResourceClassification | fixed | fixed |

pub mod classification;
pub mod environment;
pub mod segment;
pub mod service;
pub mod sidecars;
pub mod tags;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crn::Crn;
use crate::error::Result;
use crate::resource::OtherMetaData;

use classification::{OssResourceClassification, RESOURCE_CLASSIFICATION_ID, RESOURCE_CLASSIFICATION_NAME};
use environment::OssEnvironment;
use segment::{OssSegment, OssTribe};
use service::OssService;
use sidecars::{MergeControl, ValidationInfo};
use tags::OssTags;

/// Schema version written by this client
pub const SCHEMA_VERSION: &str = "1.0.12";

/// Prefix that sorts test records ahead of real ones
const TEST_RECORD_PREFIX: &str = "test-record-";

/// A person referenced by an entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Person {
    /// IBM w3 id (email)
    pub w3id: String,
    /// Full name
    pub name: String,
}

/// Closed set of OSS entry kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryKind {
    /// Service
    Service,
    /// Segment
    Segment,
    /// Tribe
    Tribe,
    /// Environment
    Environment,
    /// Resource classification singleton
    ResourceClassification,
}

impl EntryKind {
    /// Wire kind string
    #[must_use]
    pub fn wire_kind(self) -> &'static str {
        self.spec().wire_kind
    }

    /// Dispatch-table row for this kind
    #[must_use]
    pub fn spec(self) -> &'static KindSpec {
        let row = match self {
            Self::Service => 0,
            Self::Segment => 1,
            Self::Tribe => 2,
            Self::Environment => 3,
            Self::ResourceClassification => 4,
        };
        &KIND_TABLE[row]
    }

    /// Kind for a wire kind string
    #[must_use]
    pub fn from_wire(kind: &str) -> Option<Self> {
        KIND_TABLE.iter().find(|s| s.wire_kind == kind).map(|s| s.kind)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Service => "Service",
            Self::Segment => "Segment",
            Self::Tribe => "Tribe",
            Self::Environment => "Environment",
            Self::ResourceClassification => "ResourceClassification",
        })
    }
}

/// Wire details of one entry kind
pub struct KindSpec {
    /// Kind
    pub kind: EntryKind,
    /// Value of `kind` on the wire
    pub wire_kind: &'static str,
    /// `metadata.other` slot holding the typed record
    pub slot: &'static str,
    /// Whether the kind carries a merge-control sidecar
    pub has_merge_control: bool,
    /// Whether the kind carries a validation sidecar
    pub has_validation: bool,
    /// Take the typed record out of the sidecar bag
    pub extract: fn(&OtherMetaData) -> Option<OssRecord>,
}

/// Per-kind dispatch table
pub static KIND_TABLE: [KindSpec; 5] = [
    KindSpec {
        kind: EntryKind::Service,
        wire_kind: "oss",
        slot: "oss",
        has_merge_control: true,
        has_validation: true,
        extract: |o| o.service.as_ref().map(|s| OssRecord::Service(s.clone())),
    },
    KindSpec {
        kind: EntryKind::Segment,
        wire_kind: "oss_segment",
        slot: "oss_segment",
        has_merge_control: false,
        has_validation: true,
        extract: |o| o.segment.clone().map(OssRecord::Segment),
    },
    KindSpec {
        kind: EntryKind::Tribe,
        wire_kind: "oss_tribe",
        slot: "oss_tribe",
        has_merge_control: false,
        has_validation: false,
        extract: |o| o.tribe.clone().map(OssRecord::Tribe),
    },
    KindSpec {
        kind: EntryKind::Environment,
        wire_kind: "oss_environment",
        slot: "oss_environment",
        has_merge_control: false,
        has_validation: true,
        extract: |o| o.environment.clone().map(OssRecord::Environment),
    },
    KindSpec {
        kind: EntryKind::ResourceClassification,
        wire_kind: "oss_resource_classification",
        slot: "oss_resource_classification",
        has_merge_control: false,
        has_validation: false,
        extract: |o| o.resource_classification.clone().map(OssRecord::ResourceClassification),
    },
];

/// Lowercase, and replace every character outside `[a-z0-9-]` with `-`
#[must_use]
pub fn canonical(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' { c } else { '-' })
        .collect()
}

/// Canonical display name; test records get a leading `-`
#[must_use]
pub fn canonical_display_name(display_name: &str) -> String {
    let c = canonical(display_name);
    if c.starts_with(TEST_RECORD_PREFIX) {
        format!("-{c}")
    } else {
        c
    }
}

/// Typed payload of an OSS entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OssRecord {
    /// Service
    Service(Box<OssService>),
    /// Segment
    Segment(OssSegment),
    /// Tribe
    Tribe(OssTribe),
    /// Environment
    Environment(OssEnvironment),
    /// Resource classification singleton
    ResourceClassification(OssResourceClassification),
}

impl OssRecord {
    /// Kind of this record
    #[must_use]
    pub fn kind(&self) -> EntryKind {
        match self {
            Self::Service(_) => EntryKind::Service,
            Self::Segment(_) => EntryKind::Segment,
            Self::Tribe(_) => EntryKind::Tribe,
            Self::Environment(_) => EntryKind::Environment,
            Self::ResourceClassification(_) => EntryKind::ResourceClassification,
        }
    }

    /// Remote entry name
    pub fn name(&self) -> Result<String> {
        Ok(match self {
            Self::Service(s) => format!("oss.{}", s.reference_resource_name),
            Self::Segment(s) => format!("oss-segment.{}", canonical_display_name(&s.display_name)),
            Self::Tribe(t) => format!("oss-tribe.{}", canonical_display_name(&t.display_name)),
            Self::Environment(e) => {
                let crn = Crn::parse(&e.environment_id)?;
                format!("oss-environment.{}", canonical(&format!("{}-{}-{}", crn.cname, crn.ctype, crn.location)))
            }
            Self::ResourceClassification(_) => RESOURCE_CLASSIFICATION_NAME.to_string(),
        })
    }

    /// Remote entry id
    #[must_use]
    pub fn entry_id(&self) -> String {
        match self {
            Self::Service(s) => format!("oss.{}", s.reference_resource_name),
            Self::Segment(s) => format!("oss_segment.{}", s.segment_id),
            Self::Tribe(t) => format!("oss_tribe.{}", t.tribe_id),
            Self::Environment(e) => format!("oss_environment.{}", e.environment_id),
            Self::ResourceClassification(_) => RESOURCE_CLASSIFICATION_ID.to_string(),
        }
    }

    /// Remote parent id; empty for top-level entries
    #[must_use]
    pub fn parent_id(&self) -> String {
        match self {
            Self::Tribe(t) => segment_entry_id(&t.segment_id),
            Self::Environment(e) if !e.owning_segment.is_empty() => segment_entry_id(&e.owning_segment),
            _ => String::new(),
        }
    }

    /// Declared schema version
    #[must_use]
    pub fn schema_version(&self) -> &str {
        match self {
            Self::Service(s) => &s.schema_version,
            Self::Segment(s) => &s.schema_version,
            Self::Tribe(t) => &t.schema_version,
            Self::Environment(e) => &e.schema_version,
            Self::ResourceClassification(r) => &r.schema_version,
        }
    }

    /// Tags
    #[must_use]
    pub fn oss_tags(&self) -> &OssTags {
        match self {
            Self::Service(s) => &s.general_info.oss_tags,
            Self::Segment(s) => &s.oss_tags,
            Self::Tribe(t) => &t.oss_tags,
            Self::Environment(e) => &e.oss_tags,
            Self::ResourceClassification(r) => &r.oss_tags,
        }
    }

    /// Display name
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Self::Service(s) => &s.reference_display_name,
            Self::Segment(s) => &s.display_name,
            Self::Tribe(t) => &t.display_name,
            Self::Environment(e) => &e.display_name,
            Self::ResourceClassification(_) => "OSS Resource Classification",
        }
    }

    /// One-line header used in listings and long descriptions
    #[must_use]
    pub fn header(&self) -> String {
        match self {
            Self::Service(s) => format!(
                "Service {} \"{}\" [{} {} {}]",
                self.entry_id(),
                s.reference_display_name,
                s.general_info.entry_type.as_str(),
                s.general_info.operational_status,
                s.general_info.domain
            ),
            Self::Segment(s) => format!("Segment {} \"{}\"", self.entry_id(), s.display_name),
            Self::Tribe(t) => format!("Tribe {} \"{}\" in segment {}", self.entry_id(), t.display_name, t.segment_id),
            Self::Environment(e) => format!(
                "Environment {} \"{}\" [{:?} {:?}]",
                self.entry_id(),
                e.display_name,
                e.env_type,
                e.status
            ),
            Self::ResourceClassification(r) => {
                format!("ResourceClassification {} ({} types)", self.entry_id(), r.resource_types.len())
            }
        }
    }

    /// Borrow as a Service
    #[must_use]
    pub fn as_service(&self) -> Option<&OssService> {
        match self {
            Self::Service(s) => Some(s),
            _ => None,
        }
    }

    /// Mutably borrow as a Service
    pub fn as_service_mut(&mut self) -> Option<&mut OssService> {
        match self {
            Self::Service(s) => Some(s),
            _ => None,
        }
    }
}

/// Entry id of a Segment given its segment id
#[must_use]
pub fn segment_entry_id(segment_id: &str) -> String {
    format!("oss_segment.{segment_id}")
}

/// Timestamps and sidecars of an extended entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extension {
    /// Server creation time
    pub created: Option<String>,
    /// Server update time
    pub updated: Option<String>,
    /// Local merge policy
    pub merge_control: Option<MergeControl>,
    /// Last validation report
    pub validation: Option<ValidationInfo>,
}

/// An OSS entry as seen by callers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OssEntry {
    /// Typed payload
    pub record: OssRecord,
    /// Present when the include-options asked for timestamps or sidecars
    pub extension: Option<Extension>,
}

impl OssEntry {
    /// Plain entry
    #[must_use]
    pub fn new(record: OssRecord) -> Self {
        Self { record, extension: None }
    }

    /// Extended entry
    #[must_use]
    pub fn extended(record: OssRecord, extension: Extension) -> Self {
        Self { record, extension: Some(extension) }
    }

    /// Kind
    #[must_use]
    pub fn kind(&self) -> EntryKind {
        self.record.kind()
    }

    /// Remote id
    #[must_use]
    pub fn entry_id(&self) -> String {
        self.record.entry_id()
    }

    /// Merge control, when extended
    #[must_use]
    pub fn merge_control(&self) -> Option<&MergeControl> {
        self.extension.as_ref().and_then(|x| x.merge_control.as_ref())
    }

    /// Validation report, when extended
    #[must_use]
    pub fn validation(&self) -> Option<&ValidationInfo> {
        self.extension.as_ref().and_then(|x| x.validation.as_ref())
    }

    /// Header plus sidecar headers, one paragraph each
    #[must_use]
    pub fn long_description(&self) -> String {
        let mut paragraphs = vec![self.record.header()];
        if let Some(mc) = self.merge_control() {
            paragraphs.push(mc.header());
        }
        if let Some(v) = self.validation() {
            paragraphs.push(v.header());
        }
        paragraphs.join("\n\n")
    }
}

impl fmt::Display for OssEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.record.header())
    }
}

impl From<OssService> for OssRecord {
    fn from(s: OssService) -> Self {
        Self::Service(Box::new(s))
    }
}

impl From<OssSegment> for OssRecord {
    fn from(s: OssSegment) -> Self {
        Self::Segment(s)
    }
}

impl From<OssTribe> for OssRecord {
    fn from(t: OssTribe) -> Self {
        Self::Tribe(t)
    }
}

impl From<OssEnvironment> for OssRecord {
    fn from(e: OssEnvironment) -> Self {
        Self::Environment(e)
    }
}

impl From<OssResourceClassification> for OssRecord {
    fn from(r: OssResourceClassification) -> Self {
        Self::ResourceClassification(r)
    }
}
