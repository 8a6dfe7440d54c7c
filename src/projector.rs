// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Domain projection of Service entries
//!
//! A stored Service holds the Commercial variant plus at most one overlay per
//! other domain. Projection turns that into the logical entries a caller asked
//! for, US-Regulated first. Inputs are never mutated.

use crate::error::{Error, Result};
use crate::include::IncludeOptions;
use crate::model::service::{Domain, OssServiceOverride};
use crate::model::tags::SERVICE_NOW_APPROVED;
use crate::model::OssEntry;

/// Logical entries for `entry` under `include`
///
/// Non-Service entries pass through unchanged. Fails with
/// [`Error::DomainUnavailable`] when US-Regulated is requested and the Service
/// has no such override.
pub fn project_for_domain(entry: &OssEntry, include: IncludeOptions) -> Result<Vec<OssEntry>> {
    let Some(service) = entry.record.as_service() else {
        return Ok(vec![entry.clone()]);
    };

    let us_regulated = include.contains(IncludeOptions::SERVICES_DOMAIN_US_REGULATED);
    let commercial = include.contains(IncludeOptions::SERVICES_DOMAIN_COMMERCIAL) || !us_regulated;
    let keep_overrides = include.contains(IncludeOptions::SERVICES_DOMAIN_OVERRIDES);

    let mut out = Vec::with_capacity(2);
    if us_regulated {
        let overlay = service
            .find_override(Domain::UsRegulated)
            .map(|ix| &service.overrides[ix])
            .ok_or_else(|| Error::DomainUnavailable {
                id: entry.entry_id(),
                domain: Domain::UsRegulated.to_string(),
            })?;
        out.push(apply_override(entry, overlay));
    }
    if commercial {
        out.push(entry.clone());
    }

    if !keep_overrides {
        for projected in &mut out {
            if let Some(s) = projected.record.as_service_mut() {
                s.overrides.clear();
            }
        }
    }
    Ok(out)
}

fn apply_override(entry: &OssEntry, overlay: &OssServiceOverride) -> OssEntry {
    let mut derived = entry.clone();
    if let Some(s) = derived.record.as_service_mut() {
        let info = &mut s.general_info;
        info.service_now_sys_id.clone_from(&overlay.general_info.service_now_sys_id);
        info.service_now_ci_url.clone_from(&overlay.general_info.service_now_ci_url);
        info.domain = overlay.domain;
        if overlay.general_info.oss_tags.contains(SERVICE_NOW_APPROVED) {
            info.oss_tags.add(SERVICE_NOW_APPROVED);
        }
        s.compliance.service_now_onboarded = overlay.compliance.service_now_onboarded;
    }
    derived
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::segment::OssSegment;
    use crate::model::service::OssService;

    fn with_override() -> OssEntry {
        let mut svc = OssService::new("osscatalog-testing");
        svc.general_info.service_now_sys_id = "base-sys".into();
        let ix = svc.get_or_create_override("USREGULATED").unwrap().unwrap();
        let o = &mut svc.overrides[ix];
        o.general_info.service_now_sys_id = "fakeSNSysId".into();
        o.general_info.service_now_ci_url = "fakeSNCIURL".into();
        o.general_info.oss_tags.add(SERVICE_NOW_APPROVED);
        o.compliance.service_now_onboarded = true;
        OssEntry::new(svc.into())
    }

    fn service(e: &OssEntry) -> &OssService {
        e.record.as_service().unwrap()
    }

    #[test]
    fn test_default_is_commercial_without_overrides() {
        let out = project_for_domain(&with_override(), IncludeOptions::SERVICES).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(service(&out[0]).general_info.domain, Domain::Commercial);
        assert!(service(&out[0]).overrides.is_empty());
    }

    #[test]
    fn test_overrides_kept_on_request() {
        let out = project_for_domain(&with_override(), IncludeOptions::SERVICES | IncludeOptions::SERVICES_DOMAIN_OVERRIDES)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(service(&out[0]).overrides.len(), 1);
    }

    #[test]
    fn test_us_regulated_overlay() {
        let out = project_for_domain(&with_override(), IncludeOptions::SERVICES_DOMAIN_US_REGULATED).unwrap();
        assert_eq!(out.len(), 1);
        let s = service(&out[0]);
        assert_eq!(s.general_info.domain, Domain::UsRegulated);
        assert_eq!(s.general_info.service_now_sys_id, "fakeSNSysId");
        assert_eq!(s.general_info.service_now_ci_url, "fakeSNCIURL");
        assert!(s.general_info.oss_tags.contains(SERVICE_NOW_APPROVED));
        assert!(s.compliance.service_now_onboarded);
        assert!(s.overrides.is_empty());
    }

    #[test]
    fn test_both_domains_us_first() {
        let include = IncludeOptions::SERVICES_DOMAIN_US_REGULATED | IncludeOptions::SERVICES_DOMAIN_COMMERCIAL;
        let out = project_for_domain(&with_override(), include).unwrap();
        let domains: Vec<_> = out.iter().map(|e| service(e).general_info.domain).collect();
        assert_eq!(domains, vec![Domain::UsRegulated, Domain::Commercial]);
        assert_eq!(service(&out[1]).general_info.service_now_sys_id, "base-sys");
    }

    #[test]
    fn test_missing_override() {
        let plain = OssEntry::new(OssService::new("x").into());
        assert!(matches!(
            project_for_domain(&plain, IncludeOptions::SERVICES_DOMAIN_US_REGULATED),
            Err(Error::DomainUnavailable { .. })
        ));
    }

    #[test]
    fn test_input_untouched_and_non_services_pass_through() {
        let entry = with_override();
        let before = entry.clone();
        let _ = project_for_domain(&entry, IncludeOptions::SERVICES_DOMAIN_US_REGULATED).unwrap();
        assert_eq!(entry, before);

        let seg = OssEntry::new(OssSegment::new("s1", "Seg").into());
        assert_eq!(project_for_domain(&seg, IncludeOptions::SERVICES_DOMAIN_US_REGULATED).unwrap(), vec![seg]);
    }
}
