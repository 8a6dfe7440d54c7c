// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Resource codec: typed OSS entries to and from remote resources
//!
//! Lenient mode turns most consistency failures into `warn!` lines and a
//! best-effort result. Decode returns `Ok(None)` for resources that are
//! skipped on purpose (foreign owner, broken test records).

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::config::Options;
use crate::error::{Error, Result};
use crate::include::IncludeOptions;
use crate::model::sidecars::{MergeControl, ValidationInfo};
use crate::model::tags::OSS_TEST;
use crate::model::{EntryKind, Extension, OssEntry, OssRecord, SCHEMA_VERSION};
use crate::resource::{OtherMetaData, OverviewUi, Provider, Resource};

const MERGE_CONTROL_SLOT: &str = "oss_merge_control";
const VALIDATION_SLOT: &str = "oss_validation_info";

/// Fail with `InconsistentEntry`, or warn and carry on under lenient mode
fn inconsistency(lenient: bool, id: &str, reason: impl Into<String>) -> Result<()> {
    let reason = reason.into();
    if lenient {
        warn!(id, "{reason} (lenient mode, continuing)");
        Ok(())
    } else {
        Err(Error::inconsistent(id, reason))
    }
}

/// Build the remote resource for `entry`
///
/// Visibility is left unset; the write path fixes it through the visibility
/// endpoint.
pub fn encode(entry: &OssEntry, include: IncludeOptions, options: &Options) -> Result<Resource> {
    let record = &entry.record;
    let kind = record.kind();
    let spec = kind.spec();
    let id = record.entry_id();

    let bad_tags = record.oss_tags().invalid();
    if !bad_tags.is_empty() {
        inconsistency(options.lenient, &id, format!("invalid tags {bad_tags:?}"))?;
    }

    let mut other = OtherMetaData::default();
    match record {
        OssRecord::Service(s) => other.service = Some(s.clone()),
        OssRecord::Segment(s) => other.segment = Some(s.clone()),
        OssRecord::Tribe(t) => other.tribe = Some(t.clone()),
        OssRecord::Environment(e) => other.environment = Some(e.clone()),
        OssRecord::ResourceClassification(r) => other.resource_classification = Some(r.clone()),
    }

    if spec.has_merge_control && include.contains(IncludeOptions::MERGE_CONTROL) {
        other.merge_control = entry.merge_control().cloned();
        if other.merge_control.is_none() {
            required_sidecar_missing(options.lenient, &id, MERGE_CONTROL_SLOT)?;
        }
    }
    if spec.has_validation && include.contains(IncludeOptions::VALIDATION) {
        other.validation = entry.validation().cloned();
        if other.validation.is_none() {
            required_sidecar_missing(options.lenient, &id, VALIDATION_SLOT)?;
        }
    }

    let mut resource = Resource {
        id,
        name: record.name()?,
        kind: spec.wire_kind.to_string(),
        parent_id: record.parent_id(),
        active: true,
        disabled: false,
        group: matches!(kind, EntryKind::Segment | EntryKind::Tribe),
        tags: record.oss_tags().iter().map(str::to_string).collect(),
        provider: Provider { name: options.provider_name.clone(), email: options.provider_email.clone() },
        overview_ui: BTreeMap::new(),
        ..Resource::default()
    };
    resource.overview_ui.insert(
        "en".to_string(),
        OverviewUi {
            display_name: record.display_name().to_string(),
            description: record.header(),
            long_description: entry.long_description(),
        },
    );
    resource.metadata.other = other;
    Ok(resource)
}

fn required_sidecar_missing(lenient: bool, id: &str, slot: &str) -> Result<()> {
    let reason = format!("include-options request {slot} but the entry has none");
    if lenient {
        warn!(id, "{reason} (lenient mode, writing without it)");
        Ok(())
    } else {
        Err(Error::PolicyViolation(format!("{id}: {reason}")))
    }
}

/// Decode a remote resource into a typed entry
///
/// `Ok(None)` when the resource is skipped: its owner is not accepted, or it
/// is an `ossTest` record that fails to decode outside test mode.
pub fn decode(resource: &Resource, include: IncludeOptions, options: &Options) -> Result<Option<OssEntry>> {
    if options.owner_check {
        let owner = resource.visibility.as_ref().map(|v| v.owner.as_str()).unwrap_or_default();
        if !options.accepted_owners.iter().any(|o| o == owner) {
            warn!(id = %resource.id, owner, "skipping entry with unexpected owner");
            return Ok(None);
        }
    }

    match decode_checked(resource, include, options) {
        Err(e) if !options.test_mode && resource.tags.iter().any(|t| t == OSS_TEST) => {
            debug!(id = %resource.id, error = %e, "ignoring decode failure of test record");
            Ok(None)
        }
        other => other.map(Some),
    }
}

fn decode_checked(resource: &Resource, include: IncludeOptions, options: &Options) -> Result<OssEntry> {
    let id = resource.id.as_str();
    let lenient = options.lenient;
    let kind = EntryKind::from_wire(&resource.kind)
        .ok_or_else(|| Error::inconsistent(id, format!("unknown OSS kind {:?}", resource.kind)))?;
    let spec = kind.spec();
    let other = &resource.metadata.other;

    let unexpected: Vec<&str> = other
        .present_slots()
        .into_iter()
        .filter(|slot| {
            *slot != spec.slot
                && !(spec.has_merge_control && *slot == MERGE_CONTROL_SLOT)
                && !(spec.has_validation && *slot == VALIDATION_SLOT)
        })
        .collect();
    if !unexpected.is_empty() {
        inconsistency(lenient, id, format!("unexpected metadata {unexpected:?} for kind {kind}"))?;
    }

    let mut record =
        (spec.extract)(other).ok_or_else(|| Error::inconsistent(id, format!("missing {} metadata", spec.slot)))?;

    let want_mc = spec.has_merge_control && include.contains(IncludeOptions::MERGE_CONTROL);
    let want_val = spec.has_validation && include.contains(IncludeOptions::VALIDATION);
    let mut merge_control = other.merge_control.clone().filter(|_| want_mc);
    let mut validation = other.validation.clone().filter(|_| want_val);
    if want_mc && merge_control.is_none() {
        inconsistency(lenient, id, format!("missing {MERGE_CONTROL_SLOT} metadata"))?;
        merge_control = Some(MergeControl::default());
    }
    if want_val && validation.is_none() {
        inconsistency(lenient, id, format!("missing {VALIDATION_SLOT} metadata"))?;
        validation = Some(ValidationInfo::new(options.log_timestamp.clone()));
    }

    if let Some(service) = record.as_service_mut() {
        let status = &mut service.general_info.operational_status;
        if status.is_unrecognized() {
            inconsistency(lenient, id, format!("unknown operational status {:?}", status.as_str()))?;
            *status = Default::default();
        }
        let conflicts = service.override_conflicts();
        if !conflicts.is_empty() {
            inconsistency(lenient, id, format!("invalid domain overrides {conflicts:?}"))?;
        }
    }

    let version = record.schema_version();
    if version != SCHEMA_VERSION {
        if lenient {
            warn!(id, found = version, expected = SCHEMA_VERSION, "schema version mismatch (lenient mode, continuing)");
        } else {
            return Err(Error::SchemaMismatch {
                id: id.to_string(),
                found: version.to_string(),
                expected: SCHEMA_VERSION.to_string(),
            });
        }
    }

    let expected_name = record.name()?;
    if expected_name != resource.name {
        inconsistency(lenient, id, format!("name {:?} does not match derived {expected_name:?}", resource.name))?;
    }
    let expected_id = record.entry_id();
    if expected_id != resource.id {
        inconsistency(lenient, id, format!("id does not match derived {expected_id:?}"))?;
    }

    let extension = include.wants_extension().then(|| Extension {
        created: resource.created.clone(),
        updated: resource.updated.clone(),
        merge_control,
        validation,
    });
    Ok(OssEntry { record, extension })
}
