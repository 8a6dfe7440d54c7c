// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Command implementations

pub mod completions;
pub mod delete;
pub mod get;
pub mod list;

use anyhow::{Context as _, Result};
use owo_colors::OwoColorize;
use serde_json::json;
use std::path::{Path, PathBuf};

use crate::catalog::Catalog;
use crate::config::{self, Settings};
use crate::context::{Context, Environment};
use crate::model::{EntryKind, OssEntry, OssRecord};
use crate::token::KeyFile;

/// Everything a command needs from the global flags
pub struct Session {
    /// Loaded settings, with flag overrides applied
    pub settings: Settings,
    /// Key file location
    pub key_file: PathBuf,
    /// Target environment
    pub environment: Environment,
    /// Print JSON instead of text
    pub json: bool,
    /// Colorize text output
    pub color: bool,
}

impl Session {
    /// Load settings and apply global flags
    pub fn load(
        config_file: Option<&Path>,
        key_file: Option<&Path>,
        environment: Environment,
        lenient: bool,
        json: bool,
        no_color: bool,
    ) -> Result<Self> {
        let mut settings = config::load(config_file).context("Failed to load settings")?;
        if lenient {
            settings.options.lenient = true;
        }
        Ok(Self { settings, key_file: config::key_file_path(key_file), environment, json, color: !no_color })
    }

    /// Build the catalog handle, reading the key file
    pub fn catalog(&self) -> Result<Catalog> {
        let keys = KeyFile::load(&self.key_file)
            .with_context(|| format!("Failed to read key file {}", self.key_file.display()))?;
        Ok(Catalog::builder(self.settings.clone()).key_file(keys).build()?)
    }

    /// Request context for the selected environment
    #[must_use]
    pub fn context(&self, catalog: &Catalog) -> Context {
        catalog.context(self.environment)
    }

    /// One-line text rendering of an entry
    #[must_use]
    pub fn entry_line(&self, entry: &OssEntry) -> String {
        let kind = entry.kind().to_string();
        let kind = if self.color {
            match entry.kind() {
                EntryKind::Service => kind.cyan().to_string(),
                EntryKind::Segment => kind.magenta().to_string(),
                EntryKind::Tribe => kind.blue().to_string(),
                EntryKind::Environment => kind.green().to_string(),
                EntryKind::ResourceClassification => kind.yellow().to_string(),
            }
        } else {
            kind
        };
        format!("{kind:<24} {}", entry.record.header())
    }
}

/// JSON rendering of an entry
pub fn entry_json(entry: &OssEntry) -> Result<serde_json::Value> {
    let record = match &entry.record {
        OssRecord::Service(s) => serde_json::to_value(s)?,
        OssRecord::Segment(s) => serde_json::to_value(s)?,
        OssRecord::Tribe(t) => serde_json::to_value(t)?,
        OssRecord::Environment(e) => serde_json::to_value(e)?,
        OssRecord::ResourceClassification(r) => serde_json::to_value(r)?,
    };
    let extension = entry.extension.as_ref();
    Ok(json!({
        "kind": entry.kind().wire_kind(),
        "id": entry.entry_id(),
        "name": entry.record.name()?,
        "record": record,
        "created": extension.and_then(|x| x.created.clone()),
        "updated": extension.and_then(|x| x.updated.clone()),
        "merge_control": entry.merge_control(),
        "validation": entry.validation(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::segment::OssTribe;

    #[test]
    fn test_entry_json() {
        let entry = OssEntry::new(OssTribe::new("t1", "Tribe One", "s1").into());
        let v = entry_json(&entry).unwrap();
        assert_eq!(v["kind"], "oss_tribe");
        assert_eq!(v["id"], "oss_tribe.t1");
        assert_eq!(v["name"], "oss-tribe.tribe-one");
        assert_eq!(v["record"]["segment_id"], "s1");
        assert!(v["validation"].is_null());
    }

    #[test]
    fn test_entry_line_without_color() {
        let session = Session {
            settings: Settings::default(),
            key_file: PathBuf::from("keys.json"),
            environment: Environment::Staging,
            json: false,
            color: false,
        };
        let entry = OssEntry::new(OssTribe::new("t1", "Tribe One", "s1").into());
        assert!(session.entry_line(&entry).starts_with("Tribe "));
        assert!(session.entry_line(&entry).contains("oss_tribe.t1"));
    }
}
