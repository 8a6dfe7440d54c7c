// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Paginated walks over the Main and OSS catalogs
//!
//! Sub-pages are read one at a time, so visitors always see a parent before
//! any of its descendants. The bearer is resolved again for every page; long
//! walks outlive a single token.

use globset::{Glob, GlobMatcher};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, error, info, warn};

use crate::catalog::Catalog;
use crate::codec;
use crate::context::{Context, Target};
use crate::error::{Error, Result};
use crate::include::IncludeOptions;
use crate::model::environment::OssEnvironment;
use crate::model::{EntryKind, Extension, OssEntry};
use crate::projector::project_for_domain;
use crate::resource::{Page, Resource, Restriction};

/// `include=` value for Main catalog listings
const MAIN_INCLUDE: &str = "metadata.deployment";

/// Main catalog kinds that are skipped without a log line
const IGNORED_MAIN_KINDS: &[&str] = &[
    "alias",
    "boilerplate",
    "buildpack",
    "dashboard",
    "iam_role",
    "ui_dashboard",
    "whitelist",
    "catalog_root",
];

/// Classified kind of a Main catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MainKind {
    /// Runtime
    Runtime,
    /// Template
    Template,
    /// Platform service
    PlatformService,
    /// Deployment of a plan
    Deployment,
    /// Environment of a platform service
    PlatformServiceEnvironment,
    /// Service
    Service,
    /// Infrastructure service
    Iaas,
    /// Composite service
    Composite,
    /// Pricing plan
    Plan,
    /// Flavor of a plan
    Flavor,
    /// Profile of a plan
    Profile,
    /// Public region
    Region,
    /// Datacenter
    Datacenter,
    /// Availability zone
    AvailabilityZone,
    /// Point of presence
    Pop,
    /// Legacy CNAME
    LegacyCname,
    /// Legacy environment
    LegacyEnvironment,
    /// Satellite location
    Satellite,
    /// Geography container
    Geography,
    /// Country container
    Country,
    /// Metro container
    Metro,
    /// Generic location
    Location,
    /// OSS entry stored in the Main tree
    Oss,
    /// Known kind with nothing to do
    Ignored,
    /// Anything else
    Unknown,
}

/// What the Main walk does with an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Leaf,
    VisitThenDescendIfLive,
    VisitThenDescendForDeployments,
    VisitThenDescend,
    DescendOnly,
    Skip,
    Unknown,
}

impl MainKind {
    /// Classify a wire kind string
    #[must_use]
    pub fn classify(kind: &str) -> Self {
        match kind {
            "runtime" => Self::Runtime,
            "template" => Self::Template,
            "platform_service" => Self::PlatformService,
            "deployment" => Self::Deployment,
            "platform_service_environment" => Self::PlatformServiceEnvironment,
            "service" => Self::Service,
            "iaas" => Self::Iaas,
            "composite" => Self::Composite,
            "plan" => Self::Plan,
            "flavor" => Self::Flavor,
            "profile" => Self::Profile,
            "region" => Self::Region,
            "dc" | "datacenter" => Self::Datacenter,
            "availability_zone" | "zone" => Self::AvailabilityZone,
            "pop" => Self::Pop,
            "legacy_cname" => Self::LegacyCname,
            "legacy_environment" => Self::LegacyEnvironment,
            "satellite" => Self::Satellite,
            "geography" => Self::Geography,
            "country" => Self::Country,
            "metro" => Self::Metro,
            "location" => Self::Location,
            k if EntryKind::from_wire(k).is_some() => Self::Oss,
            k if IGNORED_MAIN_KINDS.contains(&k) => Self::Ignored,
            _ => Self::Unknown,
        }
    }

    /// Deployment targets that become Environment entries
    #[must_use]
    pub fn is_environment(self) -> bool {
        matches!(
            self,
            Self::Region
                | Self::Datacenter
                | Self::AvailabilityZone
                | Self::Pop
                | Self::LegacyCname
                | Self::LegacyEnvironment
                | Self::Satellite
        )
    }

    /// Grouping containers that are walked through but never visited
    #[must_use]
    pub fn is_container(self) -> bool {
        matches!(self, Self::Geography | Self::Country | Self::Metro)
    }

    fn action(self) -> Action {
        match self {
            Self::Runtime | Self::Template | Self::PlatformService | Self::Deployment | Self::PlatformServiceEnvironment => {
                Action::Leaf
            }
            Self::Service | Self::Iaas | Self::Composite => Action::VisitThenDescendIfLive,
            Self::Plan | Self::Flavor | Self::Profile => Action::VisitThenDescendForDeployments,
            k if k.is_environment() => Action::VisitThenDescend,
            k if k.is_container() => Action::DescendOnly,
            Self::Unknown => Action::Unknown,
            _ => Action::Skip,
        }
    }
}

impl fmt::Display for MainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A Main catalog entry as seen by a visitor
#[derive(Debug, Clone)]
pub struct MainEntry {
    /// Raw resource
    pub resource: Resource,
    /// Classified kind
    pub kind: MainKind,
    /// Slash-separated names from the top of the tree
    pub catalog_path: String,
    /// Most restrictive visibility along the path
    pub effective_visibility: Restriction,
}

/// Counters reported by a listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListStats {
    /// Visitor invocations
    pub visited: usize,
    /// Entries that failed to decode or project
    pub errors: usize,
    /// Entries skipped on purpose (owner check, test records, unknown kinds)
    pub skipped: usize,
}

impl fmt::Display for ListStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} visited, {} errors, {} skipped", self.visited, self.errors, self.skipped)
    }
}

fn rank(r: Restriction) -> u8 {
    match r {
        Restriction::Public => 0,
        Restriction::IbmOnly => 1,
        Restriction::Private => 2,
    }
}

/// Merge a parent's effective visibility with an entry's own
#[must_use]
pub fn effective_visibility(parent: Restriction, own: Option<Restriction>) -> Restriction {
    match own {
        Some(own) if rank(own) > rank(parent) => own,
        _ => parent,
    }
}

/// Append `params` to `url`, starting a query string if it has none
fn with_query(url: &str, params: &str) -> String {
    let params = params.trim_start_matches('&');
    if params.is_empty() {
        url.to_string()
    } else if url.contains('?') {
        format!("{url}&{params}")
    } else {
        format!("{url}?{params}")
    }
}

fn compile(pattern: Option<&str>) -> Result<Option<GlobMatcher>> {
    Ok(pattern.map(Glob::new).transpose()?.map(|g| g.compile_matcher()))
}

/// IaaS entries that group regional offerings descend even when inactive
fn is_iaas_regions_placeholder(r: &Resource, kind: MainKind) -> bool {
    kind == MainKind::Iaas && r.name.ends_with("-regions")
}

/// Offset and cursor pagination over one listing URL
struct Pager<'a> {
    catalog: &'a Catalog,
    ctx: &'a Context,
    target: Target,
    url: String,
    attribution: String,
    offset: usize,
    cursor: Option<String>,
    fetched: HashSet<String>,
    seen: HashSet<String>,
    done: bool,
}

impl<'a> Pager<'a> {
    fn new(catalog: &'a Catalog, ctx: &'a Context, target: Target, url: String, attribution: String) -> Self {
        Self { catalog, ctx, target, url, attribution, offset: 0, cursor: None, fetched: HashSet::new(), seen: HashSet::new(), done: false }
    }

    /// Next page of not-yet-seen resources; `None` once the listing is exhausted
    fn next_page(&mut self) -> Result<Option<Vec<Resource>>> {
        if self.done {
            return Ok(None);
        }
        let token = self.catalog.resolve(self.ctx, self.target, false)?.token;
        let url = match &self.cursor {
            Some(next) => next.clone(),
            None => with_query(&self.url, &format!("_offset={}", self.offset)),
        };
        let page: Page = self.catalog.get_json(self.ctx, &url, token.as_deref(), &self.attribution)?;
        if page.resource_count != page.resources.len() {
            return Err(Error::ProtocolViolation {
                url,
                offset: self.offset,
                reported: page.resource_count,
                actual: page.resources.len(),
            });
        }
        if page.resources.is_empty() {
            self.done = true;
            return Ok(None);
        }

        self.offset += page.resources.len();
        self.fetched.insert(url.clone());
        match page.next.filter(|n| !n.is_empty()) {
            Some(next) if self.fetched.contains(&next) => {
                debug!(url = %url, next = %next, "cursor did not advance");
                self.done = true;
            }
            Some(next) => self.cursor = Some(next),
            None if self.cursor.is_some() => self.done = true,
            None if page.count > 0 && self.offset >= page.count => self.done = true,
            None => {}
        }

        let fresh: Vec<Resource> = page.resources.into_iter().filter(|r| self.seen.insert(r.id.clone())).collect();
        if fresh.is_empty() {
            debug!(url = %url, "page repeated earlier resources");
            self.done = true;
            return Ok(None);
        }
        Ok(Some(fresh))
    }
}

type MainVisitor<'v> = dyn FnMut(&MainEntry) -> Result<()> + 'v;
type OssVisitor<'v> = dyn FnMut(&OssEntry) -> Result<()> + 'v;

struct MainWalk<'v, 'w> {
    deployments: bool,
    scope: String,
    visitor: &'w mut MainVisitor<'v>,
    stats: ListStats,
}

struct OssWalk<'v, 'w> {
    include: IncludeOptions,
    query: String,
    visitor: &'w mut OssVisitor<'v>,
    seen: HashSet<String>,
    stats: ListStats,
}

impl Catalog {
    /// Walk the Main catalog, calling `visitor` on every visited entry
    ///
    /// `pattern` filters top-level entries by name; children of a match are
    /// always walked. Plans, flavors and profiles are descended only when
    /// `deployments` is set.
    pub fn list_main<F>(&self, ctx: &Context, pattern: Option<&str>, deployments: bool, mut visitor: F) -> Result<ListStats>
    where
        F: FnMut(&MainEntry) -> Result<()>,
    {
        let matcher = compile(pattern)?;
        let resolved = self.resolve(ctx, Target::Main, false)?;
        let url = format!("{}/?include={MAIN_INCLUDE}{}", resolved.base_url, resolved.scope);
        let mut walk = MainWalk { deployments, scope: resolved.scope, visitor: &mut visitor, stats: ListStats::default() };
        self.walk_main(ctx, url, "", Restriction::Public, matcher.as_ref(), &mut walk)?;
        info!(stats = %walk.stats, "main catalog listing done");
        Ok(walk.stats)
    }

    fn walk_main(
        &self,
        ctx: &Context,
        url: String,
        parent_path: &str,
        parent_visibility: Restriction,
        matcher: Option<&GlobMatcher>,
        walk: &mut MainWalk<'_, '_>,
    ) -> Result<()> {
        let mut pager = Pager::new(self, ctx, Target::Main, url, format!("list_main({parent_path})"));
        while let Some(page) = pager.next_page()? {
            for resource in page {
                if matcher.is_some_and(|m| !m.is_match(&resource.name)) {
                    continue;
                }
                let kind = MainKind::classify(&resource.kind);
                let entry = MainEntry {
                    catalog_path: format!("{parent_path}/{}", resource.name),
                    effective_visibility: effective_visibility(parent_visibility, resource.restriction()),
                    kind,
                    resource,
                };
                let descend = match kind.action() {
                    Action::Leaf => {
                        self.visit_main(&entry, walk)?;
                        false
                    }
                    Action::VisitThenDescendIfLive => {
                        self.visit_main(&entry, walk)?;
                        let r = &entry.resource;
                        r.group || r.active || is_iaas_regions_placeholder(r, kind)
                    }
                    Action::VisitThenDescendForDeployments => {
                        self.visit_main(&entry, walk)?;
                        walk.deployments
                    }
                    Action::VisitThenDescend => {
                        self.visit_main(&entry, walk)?;
                        true
                    }
                    Action::DescendOnly => true,
                    Action::Skip => false,
                    Action::Unknown => {
                        error!(id = %entry.resource.id, kind = %entry.resource.kind, path = %entry.catalog_path, "unknown main catalog kind");
                        walk.stats.skipped += 1;
                        false
                    }
                };
                if descend && !entry.resource.children_url.is_empty() {
                    let child_url =
                        with_query(&entry.resource.children_url, &format!("include={MAIN_INCLUDE}{}", walk.scope));
                    self.walk_main(ctx, child_url, &entry.catalog_path, entry.effective_visibility, None, walk)?;
                }
            }
        }
        Ok(())
    }

    fn visit_main(&self, entry: &MainEntry, walk: &mut MainWalk<'_, '_>) -> Result<()> {
        (walk.visitor)(entry)?;
        walk.stats.visited += 1;
        Ok(())
    }

    /// Find one Main catalog entry by name
    ///
    /// Only top-level matches count unless `policy.main_lookup_nested` is set.
    pub fn read_main_entry(&self, ctx: &Context, name: &str) -> Result<MainEntry> {
        let resolved = self.resolve(ctx, Target::Main, false)?;
        let url = format!(
            "{}/?q={}&include={MAIN_INCLUDE}{}",
            resolved.base_url,
            urlencoding::encode(&format!("name:{name}")),
            resolved.scope
        );
        let page: Page = self.get_json(ctx, &url, resolved.token.as_deref(), &format!("read_main_entry({name})"))?;
        let nested_ok = self.settings().policy.main_lookup_nested;
        let found = page
            .resources
            .into_iter()
            .filter(|r| r.name == name)
            .min_by_key(|r| !r.parent_id.is_empty())
            .filter(|r| r.parent_id.is_empty() || nested_ok);

        match found {
            Some(resource) => {
                let catalog_path = if resource.parent_id.is_empty() {
                    format!("/{}", resource.name)
                } else {
                    format!("/{}/{}", resource.parent_id, resource.name)
                };
                Ok(MainEntry {
                    kind: MainKind::classify(&resource.kind),
                    effective_visibility: effective_visibility(Restriction::Public, resource.restriction()),
                    catalog_path,
                    resource,
                })
            }
            None => {
                debug!(name, nested_ok, "no main catalog entry");
                Err(Error::NotFound { url })
            }
        }
    }

    /// Walk the OSS catalog, calling `visitor` on every logical entry
    ///
    /// Decode failures are logged and counted; pagination, authorization and
    /// policy failures abort. With `environments-native`, Environment entries
    /// synthesized from the Main catalog follow the stored ones.
    pub fn list_oss<F>(&self, ctx: &Context, pattern: Option<&str>, include: IncludeOptions, mut visitor: F) -> Result<ListStats>
    where
        F: FnMut(&OssEntry) -> Result<()>,
    {
        let include = include.normalize()?;
        let matcher = compile(pattern)?;
        let resolved = self.resolve(ctx, Target::Oss, false)?;
        let kinds: Vec<String> = include.wire_kinds().into_iter().map(|k| format!("kind:{k}")).collect();
        let query = format!(
            "q={}&include={}{}",
            urlencoding::encode(&kinds.join("+")),
            include.include_list(),
            resolved.scope
        );
        let url = with_query(&format!("{}/", resolved.base_url), &query);

        let mut walk =
            OssWalk { include, query, visitor: &mut visitor, seen: HashSet::new(), stats: ListStats::default() };
        self.walk_oss(ctx, &resolved.base_url, url, matcher.as_ref(), true, &mut walk)?;

        if include.contains(IncludeOptions::ENVIRONMENTS_NATIVE) {
            let OssWalk { visitor, seen, stats, .. } = &mut walk;
            self.walk_native_environments(ctx, include, &mut |entry: OssEntry| {
                if seen.contains(&entry.entry_id()) {
                    return Ok(());
                }
                let name = entry.record.name()?;
                if matcher.as_ref().is_some_and(|m| !m.is_match(&name)) {
                    return Ok(());
                }
                visitor(&entry)?;
                stats.visited += 1;
                Ok(())
            })?;
        }
        info!(stats = %walk.stats, "OSS listing done");
        Ok(walk.stats)
    }

    fn walk_oss(
        &self,
        ctx: &Context,
        base_url: &str,
        url: String,
        matcher: Option<&GlobMatcher>,
        top_level: bool,
        walk: &mut OssWalk<'_, '_>,
    ) -> Result<()> {
        let mut pager = Pager::new(self, ctx, Target::Oss, url, "list_oss".to_string());
        while let Some(page) = pager.next_page()? {
            for resource in page {
                // Nested entries are reached through their parent's children
                if top_level && !resource.parent_id.is_empty() {
                    continue;
                }
                if matcher.is_some_and(|m| !m.is_match(&resource.name)) {
                    continue;
                }
                if !walk.seen.insert(resource.id.clone()) {
                    continue;
                }
                self.visit_oss(base_url, &resource, walk)?;

                let group = matches!(EntryKind::from_wire(&resource.kind), Some(EntryKind::Segment | EntryKind::Tribe));
                if group && !resource.children_url.is_empty() {
                    let child_url = with_query(&resource.children_url, &walk.query);
                    self.walk_oss(ctx, base_url, child_url, None, false, walk)?;
                }
            }
        }
        Ok(())
    }

    fn visit_oss(&self, base_url: &str, resource: &Resource, walk: &mut OssWalk<'_, '_>) -> Result<()> {
        let decode_with = walk.include | IncludeOptions::SERVICES_DOMAIN_OVERRIDES;
        let entry = match codec::decode(resource, decode_with, self.options()) {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                walk.stats.skipped += 1;
                return Ok(());
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                error!(id = %resource.id, error = %e, "cannot decode OSS entry");
                walk.stats.errors += 1;
                return Ok(());
            }
        };
        self.parent_map().record(base_url, &resource.id, &resource.parent_id);
        if !walk.include.wants_kind(entry.kind()) {
            return Ok(());
        }

        let projected = match project_for_domain(&entry, walk.include) {
            Ok(projected) => projected,
            Err(Error::DomainUnavailable { id, domain }) => {
                debug!(id = %id, domain = %domain, "no override for requested domain");
                return Ok(());
            }
            Err(e) => {
                warn!(id = %resource.id, error = %e, "cannot project OSS entry");
                walk.stats.errors += 1;
                return Ok(());
            }
        };
        for logical in &projected {
            (walk.visitor)(logical)?;
            walk.stats.visited += 1;
        }
        Ok(())
    }

    /// Environment entries synthesized from public Main catalog locations
    ///
    /// Walks geographies, countries and metros down to regions, datacenters
    /// and the like; zones nest under their region.
    fn walk_native_environments(
        &self,
        ctx: &Context,
        include: IncludeOptions,
        emit: &mut dyn FnMut(OssEntry) -> Result<()>,
    ) -> Result<()> {
        let resolved = self.resolve(ctx, Target::Main, false)?;
        let url = format!("{}/?include={MAIN_INCLUDE}{}", resolved.base_url, resolved.scope);
        self.walk_native(ctx, url, "", Restriction::Public, None, &resolved.scope, include, emit)
    }

    #[allow(clippy::too_many_arguments)]
    fn walk_native(
        &self,
        ctx: &Context,
        url: String,
        parent_path: &str,
        parent_visibility: Restriction,
        parent_crn: Option<&str>,
        scope: &str,
        include: IncludeOptions,
        emit: &mut dyn FnMut(OssEntry) -> Result<()>,
    ) -> Result<()> {
        let mut pager = Pager::new(self, ctx, Target::Main, url, format!("native_environments({parent_path})"));
        while let Some(page) = pager.next_page()? {
            for resource in page {
                let kind = MainKind::classify(&resource.kind);
                if !kind.is_container() && !kind.is_environment() {
                    continue;
                }
                let path = format!("{parent_path}/{}", resource.name);
                let visibility = effective_visibility(parent_visibility, resource.restriction());
                let mut crn = parent_crn.map(str::to_string);

                if kind.is_environment() && visibility == Restriction::Public {
                    match OssEnvironment::from_main_entry(&resource, kind, &path, parent_crn) {
                        Some(env) => {
                            crn = Some(env.environment_id.clone());
                            let extension = include.wants_extension().then(|| Extension {
                                created: resource.created.clone(),
                                updated: resource.updated.clone(),
                                ..Extension::default()
                            });
                            emit(OssEntry { record: env.into(), extension })?;
                        }
                        None => debug!(id = %resource.id, "main entry has no location CRN"),
                    }
                }

                if !resource.children_url.is_empty() {
                    let child_url = with_query(&resource.children_url, &format!("include={MAIN_INCLUDE}{scope}"));
                    self.walk_native(ctx, child_url, &path, visibility, crn.as_deref(), scope, include, emit)?;
                }
            }
        }
        Ok(())
    }

    /// Catalog-native environment with entry id `id`, if any
    pub(crate) fn find_native_environment(
        &self,
        ctx: &Context,
        id: &str,
        include: IncludeOptions,
    ) -> Result<Option<OssEntry>> {
        let mut found = None;
        self.walk_native_environments(ctx, include, &mut |entry: OssEntry| {
            if found.is_none() && entry.entry_id() == id {
                found = Some(entry);
            }
            Ok(())
        })?;
        Ok(found)
    }
}
