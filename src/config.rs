// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `OSSCAT_`-prefixed environment variables (`OSSCAT_OPTIONS__LENIENT=true`).

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::resource::Restriction;

/// Environment variable naming the key file
pub const KEY_FILE_ENV: &str = "OSSCAT_KEY_FILE";

/// Process-wide behaviour switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Visibility restriction that scopes reads
    pub visibility: Restriction,
    /// Downgrade consistency failures to warnings
    pub lenient: bool,
    /// Surface decode failures of entries tagged `ossTest`
    pub test_mode: bool,
    /// Skip entries whose visibility owner is not accepted
    pub owner_check: bool,
    /// Owner account ids accepted by the owner check
    pub accepted_owners: Vec<String>,
    /// Global switch for writes against Production
    pub production_write_enabled: bool,
    /// Timestamp stamped on freshly constructed validation sidecars
    pub log_timestamp: String,
    /// Provider name stamped on encoded resources
    pub provider_name: String,
    /// Provider email stamped on encoded resources
    pub provider_email: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            visibility: Restriction::IbmOnly,
            lenient: false,
            test_mode: false,
            owner_check: false,
            accepted_owners: Vec::new(),
            production_write_enabled: false,
            log_timestamp: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            provider_name: "IBM".to_string(),
            provider_email: "oss-catalog@ibm.com".to_string(),
        }
    }
}

/// Remote base URLs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Main catalog (always Production)
    pub main_url: String,
    /// OSS entries in Production
    pub oss_production_url: String,
    /// OSS entries in Staging
    pub oss_staging_url: String,
    /// IAM token endpoint
    pub iam_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            main_url: "https://globalcatalog.cloud.ibm.com/api/v1".to_string(),
            oss_production_url: "https://globalcatalog.cloud.ibm.com/api/v1".to_string(),
            oss_staging_url: "https://globalcatalog.test.cloud.ibm.com/api/v1".to_string(),
            iam_url: "https://iam.cloud.ibm.com/identity/token".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Key-file credential names used by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyNames {
    /// Reads of the Main catalog
    pub main: String,
    /// OSS entries in Production
    pub production: String,
    /// OSS entries in Staging
    pub staging: String,
}

impl Default for KeyNames {
    fn default() -> Self {
        Self {
            main: "main-catalog".to_string(),
            production: "oss-production".to_string(),
            staging: "oss-staging".to_string(),
        }
    }
}

/// Visibility applied after an update that moved an entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReparentVisibility {
    /// Leave whatever the server did
    #[default]
    Keep,
    /// Re-apply IBM-only visibility
    IbmOnly,
}

/// Explicit switches for behaviour the remote API leaves undefined
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyToggles {
    /// `read_main_entry` falls back to a full-tree search for non top-level names
    pub main_lookup_nested: bool,
    /// `read_oss_entry` falls back to catalog-native environments on 404
    pub native_environment_lookup: bool,
    /// Visibility after a move-update
    pub reparent_visibility: ReparentVisibility,
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Behaviour switches
    pub options: Options,
    /// Remote URLs
    pub endpoints: Endpoints,
    /// Credential names
    pub keys: KeyNames,
    /// Toggles for behaviour the remote API leaves undefined
    pub policy: PolicyToggles,
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("org", "ibm", "osscatalog")
}

/// Default settings file: `<config dir>/osscatalog.toml`
#[must_use]
pub fn default_config_file() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().join("osscatalog.toml"))
}

/// Key file location: explicit path, then `OSSCAT_KEY_FILE`, then `<config dir>/keys.json`
#[must_use]
pub fn key_file_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(KEY_FILE_ENV) {
        return PathBuf::from(path);
    }
    project_dirs()
        .map(|d| d.config_dir().join("keys.json"))
        .unwrap_or_else(|| PathBuf::from("keys.json"))
}

/// Load settings from defaults, an optional file and the environment
///
/// An explicit `path` must exist; the default file is optional.
pub fn load(path: Option<&Path>) -> Result<Settings> {
    let mut builder = config::Config::builder().add_source(config::Config::try_from(&Settings::default())?);

    match path {
        Some(p) => builder = builder.add_source(config::File::from(p).required(true)),
        None => {
            if let Some(p) = default_config_file() {
                builder = builder.add_source(config::File::from(p).required(false));
            }
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("OSSCAT")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("options.accepted_owners"),
    );

    Ok(builder.build()?.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.options.visibility, Restriction::IbmOnly);
        assert!(!settings.options.lenient);
        assert!(!settings.options.production_write_enabled);
        assert_eq!(settings.endpoints.timeout_secs, 60);
        assert_eq!(settings.policy.reparent_visibility, ReparentVisibility::Keep);
    }

    #[test]
    fn test_load_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[options]\nlenient = true\nvisibility = \"private\"\n\n[policy]\nreparent_visibility = \"ibm_only\"\n\n[keys]\nstaging = \"my-staging\""
        )
        .unwrap();

        let settings = load(Some(file.path())).unwrap();
        assert!(settings.options.lenient);
        assert_eq!(settings.options.visibility, Restriction::Private);
        assert_eq!(settings.policy.reparent_visibility, ReparentVisibility::IbmOnly);
        assert_eq!(settings.keys.staging, "my-staging");
        assert_eq!(settings.keys.production, "oss-production");
    }

    #[test]
    fn test_explicit_key_file_wins() {
        let p = PathBuf::from("/tmp/explicit-keys.json");
        assert_eq!(key_file_path(Some(&p)), p);
    }
}
