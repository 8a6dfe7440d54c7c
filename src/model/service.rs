// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Service entries and their per-domain overrides

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::tags::OssTags;
use super::Person;
use crate::error::{Error, Result};

/// Kind of offering a Service represents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    /// Regular service
    #[default]
    Service,
    /// Runtime
    Runtime,
    /// Template / boilerplate
    Template,
    /// Infrastructure
    #[serde(rename = "IAAS")]
    Iaas,
    /// Platform component
    PlatformComponent,
    /// Composite of several services
    Composite,
    /// Grouping of related services
    Supercategory,
    /// Part of another service
    Subcomponent,
    /// Internal-only service
    #[serde(rename = "INTERNALSERVICE")]
    InternalService,
}

impl EntryType {
    /// Wire string
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Service => "SERVICE",
            Self::Runtime => "RUNTIME",
            Self::Template => "TEMPLATE",
            Self::Iaas => "IAAS",
            Self::PlatformComponent => "PLATFORM_COMPONENT",
            Self::Composite => "COMPOSITE",
            Self::Supercategory => "SUPERCATEGORY",
            Self::Subcomponent => "SUBCOMPONENT",
            Self::InternalService => "INTERNALSERVICE",
        }
    }
}

/// Lifecycle status of a Service
///
/// Unknown wire values are kept in `Other` so the codec can decide whether to
/// reject them or map them to [`OperationalStatus::Unknown`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OperationalStatus {
    /// Generally available
    Ga,
    /// Beta
    Beta,
    /// Experimental
    Experimental,
    /// Third-party offering
    ThirdParty,
    /// Community offering
    Community,
    /// Select availability
    SelectAvailability,
    /// Deprecated
    Deprecated,
    /// Retired
    Retired,
    /// Not ready for customers
    NotReady,
    /// Internal only
    Internal,
    /// Sentinel for statuses this client does not recognize
    #[default]
    Unknown,
    /// Unrecognized wire value
    Other(String),
}

impl OperationalStatus {
    /// Wire string
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ga => "GA",
            Self::Beta => "BETA",
            Self::Experimental => "EXPERIMENTAL",
            Self::ThirdParty => "THIRDPARTY",
            Self::Community => "COMMUNITY",
            Self::SelectAvailability => "SELECTAVAILABILITY",
            Self::Deprecated => "DEPRECATED",
            Self::Retired => "RETIRED",
            Self::NotReady => "NOTREADY",
            Self::Internal => "INTERNAL",
            Self::Unknown => "UNKNOWN",
            Self::Other(s) => s,
        }
    }

    /// True for `Other`
    #[must_use]
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, Self::Other(_))
    }
}

impl From<String> for OperationalStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "GA" => Self::Ga,
            "BETA" => Self::Beta,
            "EXPERIMENTAL" => Self::Experimental,
            "THIRDPARTY" => Self::ThirdParty,
            "COMMUNITY" => Self::Community,
            "SELECTAVAILABILITY" => Self::SelectAvailability,
            "DEPRECATED" => Self::Deprecated,
            "RETIRED" => Self::Retired,
            "NOTREADY" => Self::NotReady,
            "INTERNAL" => Self::Internal,
            "UNKNOWN" => Self::Unknown,
            _ => Self::Other(s),
        }
    }
}

impl From<OperationalStatus> for String {
    fn from(s: OperationalStatus) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for OperationalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Regulatory domain of a Service variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    /// Base variant stored in the record itself
    #[default]
    #[serde(rename = "COMMERCIAL")]
    Commercial,
    /// US-Regulated overlay
    #[serde(rename = "USREGULATED")]
    UsRegulated,
}

impl Domain {
    /// Wire string
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Commercial => "COMMERCIAL",
            Self::UsRegulated => "USREGULATED",
        }
    }
}

impl FromStr for Domain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "COMMERCIAL" => Ok(Self::Commercial),
            "USREGULATED" | "US-REGULATED" | "US_REGULATED" => Ok(Self::UsRegulated),
            _ => Err(Error::InvalidDomain(s.to_string())),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// General information about a Service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralInfo {
    /// Tags
    pub oss_tags: OssTags,
    /// Internal description
    pub oss_description: String,
    /// Offering kind
    pub entry_type: EntryType,
    /// Lifecycle status
    pub operational_status: OperationalStatus,
    /// Domain of this variant
    pub domain: Domain,
    /// ServiceNow configuration item sys id
    #[serde(rename = "servicenow_sys_id")]
    pub service_now_sys_id: String,
    /// ServiceNow configuration item URL
    #[serde(rename = "servicenow_ciurl")]
    pub service_now_ci_url: String,
    /// Name of the parent service for subcomponents
    pub parent_resource_name: String,
}

/// Ownership of a Service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ownership {
    /// Offering manager
    pub offering_manager: Person,
    /// Owning segment id
    pub segment_id: String,
    /// Owning tribe id
    pub tribe_id: String,
}

/// Compliance state of a Service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Compliance {
    /// Onboarded into ServiceNow
    #[serde(rename = "servicenow_onboarded")]
    pub service_now_onboarded: bool,
    /// Free-form onboarding status
    pub onboarding_status: String,
}

/// General-info fields a domain override may replace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralInfoOverride {
    /// ServiceNow sys id of the variant
    #[serde(rename = "servicenow_sys_id")]
    pub service_now_sys_id: String,
    /// ServiceNow CI URL of the variant
    #[serde(rename = "servicenow_ciurl")]
    pub service_now_ci_url: String,
    /// Tags declared by the variant; only `serviceNowApproved` is projected
    pub oss_tags: OssTags,
}

/// Compliance fields a domain override replaces
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceOverride {
    /// Onboarded into ServiceNow in this domain
    #[serde(rename = "servicenow_onboarded")]
    pub service_now_onboarded: bool,
}

/// Per-domain overlay on a Service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OssServiceOverride {
    /// Domain this overlay produces
    pub domain: Domain,
    /// General-info overlay
    #[serde(default)]
    pub general_info: GeneralInfoOverride,
    /// Compliance overlay
    #[serde(default)]
    pub compliance: ComplianceOverride,
}

/// OSS record for a Service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OssService {
    /// Schema version this record was written with
    #[serde(default)]
    pub schema_version: String,
    /// Identifier unique among services
    pub reference_resource_name: String,
    /// Display name
    #[serde(default)]
    pub reference_display_name: String,
    /// General information
    #[serde(default)]
    pub general_info: GeneralInfo,
    /// Ownership
    #[serde(default)]
    pub ownership: Ownership,
    /// Compliance
    #[serde(default)]
    pub compliance: Compliance,
    /// At most one overlay per non-Commercial domain
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<OssServiceOverride>,
}

impl OssService {
    /// New record at the current schema version
    #[must_use]
    pub fn new(reference_resource_name: impl Into<String>) -> Self {
        Self {
            schema_version: super::SCHEMA_VERSION.to_string(),
            reference_resource_name: reference_resource_name.into(),
            ..Self::default()
        }
    }

    /// Position of the override for `domain`
    #[must_use]
    pub fn find_override(&self, domain: Domain) -> Option<usize> {
        self.overrides.iter().position(|o| o.domain == domain)
    }

    /// Index of the override for `domain`, creating an empty one if missing
    ///
    /// `Ok(None)` for Commercial, which never needs an override.
    pub fn get_or_create_override(&mut self, domain: &str) -> Result<Option<usize>> {
        let domain: Domain = domain.parse()?;
        if domain == Domain::Commercial {
            return Ok(None);
        }
        if let Some(ix) = self.find_override(domain) {
            return Ok(Some(ix));
        }
        self.overrides.push(OssServiceOverride { domain, ..OssServiceOverride::default() });
        Ok(Some(self.overrides.len() - 1))
    }

    /// Domains that appear in more than one override, or Commercial overrides
    #[must_use]
    pub fn override_conflicts(&self) -> Vec<Domain> {
        let mut seen = Vec::new();
        let mut bad = Vec::new();
        for o in &self.overrides {
            if (o.domain == Domain::Commercial || seen.contains(&o.domain)) && !bad.contains(&o.domain) {
                bad.push(o.domain);
            }
            seen.push(o.domain);
        }
        bad
    }
}
