// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Merge-control and validation sidecars

use serde::{Deserialize, Serialize};
use std::fmt;

use super::tags::OssTags;

/// Local merge policy attached to a Service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeControl {
    /// Tags forced onto the merged record
    pub oss_tags: OssTags,
    /// Main catalog names that must not be merged into this entry
    pub do_not_merge_names: Vec<String>,
    /// Main catalog names known to be duplicates of this entry
    pub raw_duplicate_names: Vec<String>,
    /// Free-form notes
    pub notes: String,
    /// Last time the policy was edited
    pub last_update: String,
    /// Who edited it
    pub updated_by: String,
}

impl MergeControl {
    /// Header line used in long descriptions
    #[must_use]
    pub fn header(&self) -> String {
        format!(
            "MergeControl: tags={} do-not-merge={} duplicates={} (updated {} by {})",
            self.oss_tags,
            self.do_not_merge_names.len(),
            self.raw_duplicate_names.len(),
            if self.last_update.is_empty() { "never" } else { &self.last_update },
            if self.updated_by.is_empty() { "unknown" } else { &self.updated_by },
        )
    }
}

/// Issue severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Must be fixed
    Critical,
    /// Should be fixed
    Severe,
    /// Worth a look
    Warning,
    /// Informational
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Critical => "critical",
            Self::Severe => "severe",
            Self::Warning => "warning",
            Self::Info => "info",
        })
    }
}

/// One consistency finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Severity
    pub severity: Severity,
    /// Short title
    pub title: String,
    /// Details
    #[serde(default)]
    pub details: String,
}

/// Last-run consistency report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationInfo {
    /// When the validation ran
    pub last_run_timestamp: String,
    /// Findings
    pub issues: Vec<ValidationIssue>,
}

impl ValidationInfo {
    /// Empty report stamped with `timestamp`
    #[must_use]
    pub fn new(timestamp: impl Into<String>) -> Self {
        Self { last_run_timestamp: timestamp.into(), issues: Vec::new() }
    }

    /// Record a finding
    pub fn add_issue(&mut self, severity: Severity, title: impl Into<String>, details: impl Into<String>) {
        self.issues.push(ValidationIssue { severity, title: title.into(), details: details.into() });
    }

    /// Number of issues at `severity`
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Header line used in long descriptions
    #[must_use]
    pub fn header(&self) -> String {
        format!(
            "Validation: {} issues ({} critical, {} severe, {} warnings) last run {}",
            self.issues.len(),
            self.count(Severity::Critical),
            self.count(Severity::Severe),
            self.count(Severity::Warning),
            if self.last_run_timestamp.is_empty() { "never" } else { &self.last_run_timestamp },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_header_counts() {
        let mut v = ValidationInfo::new("2026-01-01T00:00:00Z");
        v.add_issue(Severity::Critical, "missing owner", "");
        v.add_issue(Severity::Warning, "stale", "x");
        assert_eq!(v.count(Severity::Critical), 1);
        assert!(v.header().starts_with("Validation: 2 issues (1 critical, 0 severe, 1 warnings)"));
    }

    #[test]
    fn test_merge_control_header_defaults() {
        assert_eq!(
            MergeControl::default().header(),
            "MergeControl: tags=[] do-not-merge=0 duplicates=0 (updated never by unknown)"
        );
    }
}
