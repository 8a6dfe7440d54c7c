// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Include-options: which kinds, sidecars and domain variants a read returns

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::model::EntryKind;

/// Bit set of include flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct IncludeOptions(u32);

impl IncludeOptions {
    /// Nothing requested
    pub const NONE: Self = Self(0);
    /// Merge-control sidecars
    pub const MERGE_CONTROL: Self = Self(1 << 0);
    /// Validation sidecars
    pub const VALIDATION: Self = Self(1 << 1);
    /// Server timestamps
    pub const TIMESTAMPS: Self = Self(1 << 2);
    /// Service entries
    pub const SERVICES: Self = Self(1 << 3);
    /// Tribe entries
    pub const TRIBES: Self = Self(1 << 4);
    /// Environment entries stored as OSS records
    pub const ENVIRONMENTS: Self = Self(1 << 5);
    /// Environment entries, plus ones synthesized from the Main catalog
    pub const ENVIRONMENTS_NATIVE: Self = Self(1 << 6);
    /// Keep the `overrides` list on projected services
    pub const SERVICES_DOMAIN_OVERRIDES: Self = Self(1 << 7);
    /// Commercial variant of services
    pub const SERVICES_DOMAIN_COMMERCIAL: Self = Self(1 << 8);
    /// US-Regulated variant of services
    pub const SERVICES_DOMAIN_US_REGULATED: Self = Self(1 << 9);
    /// The resource classification singleton
    pub const RESOURCE_CLASSIFICATION: Self = Self(1 << 10);

    const ALL: u32 = (1 << 11) - 1;
    const KINDS: Self = Self(
        Self::SERVICES.0 | Self::TRIBES.0 | Self::ENVIRONMENTS.0 | Self::ENVIRONMENTS_NATIVE.0 | Self::RESOURCE_CLASSIFICATION.0,
    );
    const SIDECARS: Self = Self(Self::MERGE_CONTROL.0 | Self::VALIDATION.0);

    const NAMES: [(&'static str, Self); 11] = [
        ("merge-control", Self::MERGE_CONTROL),
        ("validation", Self::VALIDATION),
        ("timestamps", Self::TIMESTAMPS),
        ("services", Self::SERVICES),
        ("tribes", Self::TRIBES),
        ("environments", Self::ENVIRONMENTS),
        ("environments-native", Self::ENVIRONMENTS_NATIVE),
        ("overrides", Self::SERVICES_DOMAIN_OVERRIDES),
        ("commercial", Self::SERVICES_DOMAIN_COMMERCIAL),
        ("us-regulated", Self::SERVICES_DOMAIN_US_REGULATED),
        ("resource-classification", Self::RESOURCE_CLASSIFICATION),
    ];

    /// Build from raw bits without checking them
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True if every bit of `other` is set
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any bit of `other` is set
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Copy without the bits of `other`
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Apply defaults and check consistency
    ///
    /// - no kind bits: `services | tribes | environments`
    /// - any sidecar bit implies `timestamps`
    /// - `environments` and `environments-native` are exclusive
    /// - unknown bits are rejected
    pub fn normalize(self) -> Result<Self> {
        if self.0 & !Self::ALL != 0 {
            return Err(Error::InvalidOptions(format!("unknown include bits {:#x}", self.0 & !Self::ALL)));
        }
        if self.contains(Self::ENVIRONMENTS | Self::ENVIRONMENTS_NATIVE) {
            return Err(Error::InvalidOptions("environments and environments-native are mutually exclusive".into()));
        }
        let mut out = self;
        if !out.intersects(Self::KINDS) {
            out |= Self::SERVICES | Self::TRIBES | Self::ENVIRONMENTS;
        }
        if out.intersects(Self::SIDECARS) {
            out |= Self::TIMESTAMPS;
        }
        Ok(out)
    }

    /// True when entries should carry an [`Extension`](crate::model::Extension)
    #[must_use]
    pub fn wants_extension(self) -> bool {
        self.intersects(Self::SIDECARS | Self::TIMESTAMPS)
    }

    /// True when entries of `kind` are requested
    #[must_use]
    pub fn wants_kind(self, kind: EntryKind) -> bool {
        match kind {
            EntryKind::Service => self.contains(Self::SERVICES),
            EntryKind::Tribe => self.contains(Self::TRIBES),
            EntryKind::Environment => self.intersects(Self::ENVIRONMENTS | Self::ENVIRONMENTS_NATIVE),
            EntryKind::ResourceClassification => self.contains(Self::RESOURCE_CLASSIFICATION),
            // Segments are always fetched: everything else may nest under them
            EntryKind::Segment => true,
        }
    }

    /// Wire kinds to put in the `q=kind:...` filter
    #[must_use]
    pub fn wire_kinds(self) -> Vec<&'static str> {
        [
            EntryKind::Service,
            EntryKind::Segment,
            EntryKind::Tribe,
            EntryKind::Environment,
            EntryKind::ResourceClassification,
        ]
        .into_iter()
        .filter(|k| self.wants_kind(*k))
        .map(EntryKind::wire_kind)
        .collect()
    }

    /// Value of the `include=` query parameter
    #[must_use]
    pub fn include_list(self) -> String {
        let mut parts = vec![
            "metadata.other.oss",
            "metadata.other.oss_segment",
            "metadata.other.oss_tribe",
            "metadata.other.oss_environment",
        ];
        if self.contains(Self::RESOURCE_CLASSIFICATION) {
            parts.push("metadata.other.oss_resource_classification");
        }
        if self.contains(Self::MERGE_CONTROL) {
            parts.push("metadata.other.oss_merge_control");
        }
        if self.contains(Self::VALIDATION) {
            parts.push("metadata.other.oss_validation_info");
        }
        parts.join(":")
    }
}

impl BitOr for IncludeOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for IncludeOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for IncludeOptions {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl FromStr for IncludeOptions {
    type Err = Error;

    /// Comma-separated flag names, e.g. `services,merge-control,us-regulated`
    fn from_str(s: &str) -> Result<Self> {
        let mut out = Self::NONE;
        for name in s.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let flag = Self::NAMES
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, f)| *f)
                .ok_or_else(|| Error::InvalidOptions(format!("unknown include flag {name:?}")))?;
            out |= flag;
        }
        Ok(out)
    }
}

impl fmt::Display for IncludeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(n, _)| *n)
            .collect();
        f.write_str(&names.join(","))
    }
}
