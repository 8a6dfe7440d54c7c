// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Canonical resource names
//!
//! `crn:<version>:<cname>:<ctype>:<service-name>:<location>:<scope>:<service-instance>:<resource-type>:<resource>`

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A parsed CRN
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Crn {
    /// Format version, normally `v1`
    pub version: String,
    /// Cloud name (`bluemix`, `staging`, ...)
    pub cname: String,
    /// Cloud type (`public`, `dedicated`, `local`, `satellite`)
    pub ctype: String,
    /// Service name; empty for location CRNs
    pub service_name: String,
    /// Region, zone or datacenter
    pub location: String,
    /// Account scope
    pub scope: String,
    /// Service instance
    pub service_instance: String,
    /// Resource type
    pub resource_type: String,
    /// Resource
    pub resource: String,
}

impl Crn {
    /// Parse and canonicalize: scheme, version, cname, ctype and location are lowercased
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidCrn { crn: input.to_string(), reason: reason.to_string() };
        let parts: Vec<&str> = input.trim().split(':').collect();
        if parts.len() != 10 {
            return Err(invalid(&format!("expected 10 colon-separated fields, found {}", parts.len())));
        }
        if !parts[0].eq_ignore_ascii_case("crn") {
            return Err(invalid("missing crn: prefix"));
        }
        let lower = |s: &str| s.trim().to_ascii_lowercase();
        let crn = Self {
            version: lower(parts[1]),
            cname: lower(parts[2]),
            ctype: lower(parts[3]),
            service_name: parts[4].trim().to_string(),
            location: lower(parts[5]),
            scope: parts[6].trim().to_string(),
            service_instance: parts[7].trim().to_string(),
            resource_type: parts[8].trim().to_string(),
            resource: parts[9].trim().to_string(),
        };
        if crn.version.is_empty() || crn.cname.is_empty() || crn.ctype.is_empty() {
            return Err(invalid("version, cname and ctype are required"));
        }
        Ok(crn)
    }

    /// True for CRNs naming a location rather than a service instance
    #[must_use]
    pub fn is_location(&self) -> bool {
        !self.location.is_empty()
            && self.service_name.is_empty()
            && self.scope.is_empty()
            && self.service_instance.is_empty()
            && self.resource_type.is_empty()
            && self.resource.is_empty()
    }
}

impl fmt::Display for Crn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "crn:{}:{}:{}:{}:{}:{}:{}:{}:{}",
            self.version,
            self.cname,
            self.ctype,
            self.service_name,
            self.location,
            self.scope,
            self.service_instance,
            self.resource_type,
            self.resource
        )
    }
}

impl FromStr for Crn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
