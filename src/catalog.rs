// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Catalog handle: read-one and the OSS write path
//!
//! A [`Catalog`] is built once per process from [`Settings`] and shared by
//! every call. Listings live in [`crate::traverse`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::codec;
use crate::config::{Options, ReparentVisibility, Settings};
use crate::context::{Context, Environment, Resolved, Target};
use crate::error::{Error, Result};
use crate::include::IncludeOptions;
use crate::model::OssEntry;
use crate::parent_map::ParentMap;
use crate::projector::project_for_domain;
use crate::resource::{Resource, Restriction, Visibility};
use crate::token::{IamTokenSource, KeyFile, TokenProvider, TokenSource};
use crate::transport::{HttpTransport, Method, Rest, Transport};

/// Prefix of Environment entry ids
const ENVIRONMENT_ID_PREFIX: &str = "oss_environment.";

/// Builder for [`Catalog`]
pub struct CatalogBuilder {
    settings: Settings,
    keys: KeyFile,
    transport: Option<Arc<dyn Transport>>,
    token_source: Option<Arc<dyn TokenSource>>,
    parents: Option<Arc<ParentMap>>,
    retry_delay: Option<Duration>,
}

impl CatalogBuilder {
    /// Credentials used for bearer tokens
    #[must_use]
    pub fn key_file(mut self, keys: KeyFile) -> Self {
        self.keys = keys;
        self
    }

    /// HTTP transport; defaults to reqwest
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Token source; defaults to IAM
    #[must_use]
    pub fn token_source(mut self, source: Arc<dyn TokenSource>) -> Self {
        self.token_source = Some(source);
        self
    }

    /// Parent-Map; defaults to the process-wide one
    #[must_use]
    pub fn parent_map(mut self, parents: Arc<ParentMap>) -> Self {
        self.parents = Some(parents);
        self
    }

    /// Delay before the single retry of a transient failure
    #[must_use]
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    /// Finish the handle
    pub fn build(self) -> Result<Catalog> {
        let timeout = Duration::from_secs(self.settings.endpoints.timeout_secs);
        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new(timeout)?),
        };
        let source = match self.token_source {
            Some(s) => s,
            None => Arc::new(IamTokenSource::new(self.settings.endpoints.iam_url.clone(), timeout)?),
        };
        let mut rest = Rest::new(transport);
        if let Some(delay) = self.retry_delay {
            rest = rest.with_retry_delay(delay);
        }
        Ok(Catalog {
            rest,
            tokens: TokenProvider::new(self.keys, source),
            parents: self.parents.unwrap_or_else(ParentMap::global),
            settings: self.settings,
        })
    }
}

/// Client for the Main and OSS catalogs
pub struct Catalog {
    rest: Rest,
    tokens: TokenProvider,
    parents: Arc<ParentMap>,
    settings: Settings,
}

impl Catalog {
    /// Start building a handle over `settings`
    #[must_use]
    pub fn builder(settings: Settings) -> CatalogBuilder {
        CatalogBuilder { settings, keys: KeyFile::default(), transport: None, token_source: None, parents: None, retry_delay: None }
    }

    /// Settings this handle was built with
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Process-wide options
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.settings.options
    }

    /// Parent-Map used by the write path
    #[must_use]
    pub fn parent_map(&self) -> &ParentMap {
        &self.parents
    }

    /// Token provider
    #[must_use]
    pub fn tokens(&self) -> &TokenProvider {
        &self.tokens
    }

    /// Context for `environment`, scoped by the configured visibility
    #[must_use]
    pub fn context(&self, environment: Environment) -> Context {
        Context::new(environment).with_restriction(self.settings.options.visibility)
    }

    pub(crate) fn resolve(&self, ctx: &Context, target: Target, want_write: bool) -> Result<Resolved> {
        ctx.check_cancelled()?;
        ctx.url_and_auth(target, want_write, &self.settings, &self.tokens)
    }

    pub(crate) fn get_json<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        url: &str,
        token: Option<&str>,
        attribution: &str,
    ) -> Result<T> {
        ctx.check_cancelled()?;
        Ok(self.rest.get(url, token, attribution)?)
    }

    fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        ctx: &Context,
        method: Method,
        url: &str,
        token: Option<&str>,
        body: Option<&B>,
        attribution: &str,
    ) -> Result<T> {
        ctx.check_cancelled()?;
        Ok(self.rest.send(method, url, token, body, attribution)?)
    }

    /// Read one OSS entry by id
    ///
    /// Returns the logical entries the domain projection yields, never empty on
    /// success. Records the entry's parent for later updates.
    pub fn read_oss_entry(&self, ctx: &Context, id: &str, include: IncludeOptions) -> Result<Vec<OssEntry>> {
        let include = include.normalize()?;
        let resolved = self.resolve(ctx, Target::Oss, false)?;
        let url = format!(
            "{}/{}?include={}{}",
            resolved.base_url,
            urlencoding::encode(id),
            include.include_list(),
            resolved.scope
        );
        let attribution = format!("read_oss_entry({id})");

        let resource: Resource = match self.get_json(ctx, &url, resolved.token.as_deref(), &attribution) {
            Err(e) if e.is_not_found()
                && self.settings.policy.native_environment_lookup
                && id.starts_with(ENVIRONMENT_ID_PREFIX) =>
            {
                debug!(id, "not stored, looking among catalog-native environments");
                let entry = self.find_native_environment(ctx, id, include)?.ok_or(e)?;
                return project_for_domain(&entry, include);
            }
            other => other?,
        };

        let decode_with = include | IncludeOptions::SERVICES_DOMAIN_OVERRIDES;
        let entry = codec::decode(&resource, decode_with, &self.settings.options)?.ok_or_else(|| {
            debug!(id, "entry skipped by decode");
            Error::NotFound { url: url.clone() }
        })?;
        self.parents.record(&resolved.base_url, &resource.id, &resource.parent_id);
        project_for_domain(&entry, include)
    }

    /// Create an OSS entry and pin its visibility to IBM-only
    pub fn create_oss_entry(&self, ctx: &Context, entry: &OssEntry, include: IncludeOptions) -> Result<()> {
        let include = include.normalize()?;
        let resolved = self.resolve(ctx, Target::Oss, true)?;
        let resource = codec::encode(entry, include, &self.settings.options)?;
        let id = resource.id.clone();
        let attribution = format!("create_oss_entry({id})");
        let url = format!("{}/", resolved.base_url);

        let created: Result<serde_json::Value> =
            self.send_json(ctx, Method::Post, &url, resolved.token.as_deref(), Some(&resource), &attribution);
        if let Err(e) = created {
            self.parents.forget(&resolved.base_url, &id);
            return Err(e);
        }
        self.parents.record(&resolved.base_url, &id, &resource.parent_id);

        if let Err(e) = self.pin_ibm_only(ctx, &resolved, &id) {
            warn!(id = %id, error = %e, "created entry but could not set its visibility");
            self.parents.forget(&resolved.base_url, &id);
            return Err(e);
        }
        info!(id = %id, "created OSS entry");
        Ok(())
    }

    /// Update an OSS entry that was read or written earlier in this process
    ///
    /// Sends `move=true` when the entry's parent differs from the recorded one.
    pub fn update_oss_entry(&self, ctx: &Context, entry: &OssEntry, include: IncludeOptions) -> Result<()> {
        let include = include.normalize()?;
        let resolved = self.resolve(ctx, Target::Oss, true)?;
        let resource = codec::encode(entry, include, &self.settings.options)?;
        let id = resource.id.clone();
        let previous = self.parents.lookup(&resolved.base_url, &id).ok_or_else(|| Error::NotLoaded(id.clone()))?;

        let moved = previous != resource.parent_id;
        let url = format!(
            "{}/{}{}",
            resolved.base_url,
            urlencoding::encode(&id),
            if moved { "?move=true" } else { "" }
        );
        let attribution = format!("update_oss_entry({id})");
        if moved {
            debug!(id = %id, from = %previous, to = %resource.parent_id, "moving entry");
        }

        let updated: Result<serde_json::Value> =
            self.send_json(ctx, Method::Put, &url, resolved.token.as_deref(), Some(&resource), &attribution);
        if let Err(e) = updated {
            self.parents.forget(&resolved.base_url, &id);
            return Err(e);
        }
        self.parents.record(&resolved.base_url, &id, &resource.parent_id);

        if moved && self.settings.policy.reparent_visibility == ReparentVisibility::IbmOnly {
            self.pin_ibm_only(ctx, &resolved, &id)?;
        }
        info!(id = %id, moved, "updated OSS entry");
        Ok(())
    }

    /// Delete an OSS entry; deleting an absent entry succeeds
    pub fn delete_oss_entry(&self, ctx: &Context, id: &str) -> Result<()> {
        let resolved = self.resolve(ctx, Target::Oss, true)?;
        let url = format!("{}/{}", resolved.base_url, urlencoding::encode(id));
        let attribution = format!("delete_oss_entry({id})");
        let result: Result<serde_json::Value> =
            self.send_json::<(), _>(ctx, Method::Delete, &url, resolved.token.as_deref(), None, &attribution);
        self.parents.forget(&resolved.base_url, id);
        match result {
            Ok(_) => {
                info!(id, "deleted OSS entry");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(id, "delete of absent entry");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Visibility of an OSS entry
    pub fn get_visibility(&self, ctx: &Context, id: &str) -> Result<Visibility> {
        let resolved = self.resolve(ctx, Target::Oss, false)?;
        self.fetch_visibility(ctx, &resolved, id)
    }

    /// Replace the visibility of an OSS entry
    pub fn set_visibility(&self, ctx: &Context, id: &str, visibility: &Visibility) -> Result<()> {
        let resolved = self.resolve(ctx, Target::Oss, true)?;
        self.store_visibility(ctx, &resolved, id, visibility)
    }

    fn visibility_url(resolved: &Resolved, id: &str) -> String {
        format!("{}/{}/visibility", resolved.base_url, urlencoding::encode(id))
    }

    fn fetch_visibility(&self, ctx: &Context, resolved: &Resolved, id: &str) -> Result<Visibility> {
        let url = Self::visibility_url(resolved, id);
        self.get_json(ctx, &url, resolved.token.as_deref(), &format!("get_visibility({id})"))
    }

    fn store_visibility(&self, ctx: &Context, resolved: &Resolved, id: &str, visibility: &Visibility) -> Result<()> {
        let url = Self::visibility_url(resolved, id);
        let _: serde_json::Value = self.send_json(
            ctx,
            Method::Put,
            &url,
            resolved.token.as_deref(),
            Some(visibility),
            &format!("set_visibility({id})"),
        )?;
        Ok(())
    }

    fn pin_ibm_only(&self, ctx: &Context, resolved: &Resolved, id: &str) -> Result<()> {
        let mut visibility = self.fetch_visibility(ctx, resolved, id)?;
        visibility.restrictions = Restriction::IbmOnly;
        self.store_visibility(ctx, resolved, id, &visibility)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::service::OssService;
    use crate::token::Token;
    use crate::transport::{HttpError, RawResponse, Request};
    use chrono::Utc;
    use std::sync::Mutex;

    struct NoAuth;

    impl TokenSource for NoAuth {
        fn fetch(&self, _secret: &str) -> Result<Token> {
            Ok(Token { access_token: "t".into(), expires_at: Utc::now() + chrono::Duration::hours(1) })
        }
    }

    /// Answers every request with one fixed status
    struct Fixed {
        status: u16,
        seen: Mutex<Vec<String>>,
    }

    impl Transport for Fixed {
        fn execute(&self, request: &Request<'_>) -> std::result::Result<RawResponse, HttpError> {
            self.seen.lock().unwrap().push(format!("{} {}", request.method, request.url));
            Ok(RawResponse { status: self.status, body: String::new() })
        }
    }

    fn catalog(status: u16) -> (Catalog, Arc<Fixed>) {
        let transport = Arc::new(Fixed { status, seen: Mutex::new(Vec::new()) });
        let catalog = Catalog::builder(Settings::default())
            .key_file(KeyFile::from_pairs([("oss-staging", "k"), ("oss-production", "k"), ("main-catalog", "k")]))
            .transport(transport.clone())
            .token_source(Arc::new(NoAuth))
            .parent_map(Arc::new(ParentMap::new()))
            .retry_delay(Duration::ZERO)
            .build()
            .unwrap();
        (catalog, transport)
    }

    #[test]
    fn test_update_requires_prior_read() {
        let (catalog, transport) = catalog(200);
        let ctx = catalog.context(Environment::Staging);
        let entry = OssEntry::new(OssService::new("x").into());
        assert!(matches!(
            catalog.update_oss_entry(&ctx, &entry, IncludeOptions::SERVICES),
            Err(Error::NotLoaded(_))
        ));
        assert!(transport.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_delete_absent_is_ok() {
        let (catalog, transport) = catalog(404);
        let ctx = catalog.context(Environment::Staging);
        catalog.delete_oss_entry(&ctx, "oss.gone").unwrap();
        assert_eq!(
            transport.seen.lock().unwrap().as_slice(),
            ["DELETE https://globalcatalog.test.cloud.ibm.com/api/v1/oss.gone"]
        );
    }

    #[test]
    fn test_failed_create_leaves_no_parent() {
        let (catalog, _) = catalog(400);
        let ctx = catalog.context(Environment::Staging);
        let entry = OssEntry::new(OssService::new("x").into());
        assert!(catalog.create_oss_entry(&ctx, &entry, IncludeOptions::SERVICES).is_err());
        assert!(catalog.parent_map().is_empty());
    }

    #[test]
    fn test_writes_blocked_in_read_only_production() {
        let (catalog, transport) = catalog(200);
        let ctx = catalog.context(Environment::ProductionReadOnly);
        assert!(matches!(catalog.delete_oss_entry(&ctx, "oss.x"), Err(Error::PolicyViolation(_))));
        assert!(transport.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_cancelled_before_request() {
        let (catalog, transport) = catalog(200);
        let flag = crate::context::CancelFlag::new();
        flag.cancel();
        let ctx = catalog.context(Environment::Staging).with_cancel(flag);
        assert!(matches!(catalog.read_oss_entry(&ctx, "oss.x", IncludeOptions::NONE), Err(Error::Cancelled)));
        assert!(transport.seen.lock().unwrap().is_empty());
    }
}
