// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Request context: environment, read scope, authentication and cancellation
//!
//! Contexts are immutable values; the `with_*` methods return refined copies.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::resource::Restriction;
use crate::token::TokenProvider;

/// Which catalog instance and access level a call targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    /// Staging catalog, read-write
    Staging,
    /// Production catalog, reads only
    ProductionReadOnly,
    /// Production catalog, writes allowed when globally enabled
    ProductionReadWrite,
}

impl Environment {
    /// True for either Production variant
    #[must_use]
    pub fn is_production(self) -> bool {
        !matches!(self, Self::Staging)
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "staging" => Ok(Self::Staging),
            "prod-ro" | "production" => Ok(Self::ProductionReadOnly),
            "prod-rw" => Ok(Self::ProductionReadWrite),
            other => Err(Error::PolicyViolation(format!("unknown environment {other:?} (staging, prod-ro, prod-rw)"))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Staging => "staging",
            Self::ProductionReadOnly => "prod-ro",
            Self::ProductionReadWrite => "prod-rw",
        })
    }
}

/// How a context authenticates
#[derive(Clone, PartialEq, Eq)]
pub enum Authentication {
    /// Key-file names from the settings, chosen per catalog and environment
    Configured,
    /// One key-file name, resolved to a fresh token on every request
    Key(String),
    /// A fixed bearer token
    Bearer(String),
}

impl fmt::Debug for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configured => f.write_str("Configured"),
            Self::Key(name) => f.debug_tuple("Key").field(name).finish(),
            Self::Bearer(_) => f.write_str("Bearer(<redacted>)"),
        }
    }
}

/// Shared cancellation flag; checked before each HTTP request
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// New, not cancelled
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Which catalog a URL is resolved for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Main catalog (services, regions)
    Main,
    /// OSS records
    Oss,
}

/// Base URL, scope suffix and bearer for one request
#[derive(Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Base URL without trailing slash
    pub base_url: String,
    /// Query-string suffix, e.g. `&account=global`
    pub scope: String,
    /// Bearer; `None` for anonymous public reads
    pub token: Option<String>,
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolved")
            .field("base_url", &self.base_url)
            .field("scope", &self.scope)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Per-call environment and credentials
#[derive(Debug, Clone)]
pub struct Context {
    environment: Environment,
    restriction: Restriction,
    authentication: Authentication,
    cancel: CancelFlag,
}

impl Context {
    /// Context for `environment` with configured keys and IBM-only read scope
    #[must_use]
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            restriction: Restriction::IbmOnly,
            authentication: Authentication::Configured,
            cancel: CancelFlag::new(),
        }
    }

    /// Copy with a different read scope
    #[must_use]
    pub fn with_restriction(mut self, restriction: Restriction) -> Self {
        self.restriction = restriction;
        self
    }

    /// Copy authenticating with `authentication`
    #[must_use]
    pub fn with_authentication(mut self, authentication: Authentication) -> Self {
        self.authentication = authentication;
        self
    }

    /// Copy observing `cancel`
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Environment
    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Read scope
    #[must_use]
    pub fn restriction(&self) -> Restriction {
        self.restriction
    }

    /// Authentication
    #[must_use]
    pub fn authentication(&self) -> &Authentication {
        &self.authentication
    }

    /// Fail with [`Error::Cancelled`] once cancellation was requested
    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Query suffix that scopes reads
    #[must_use]
    pub fn scope(&self) -> &'static str {
        match self.restriction {
            Restriction::Private => "&account=global",
            Restriction::IbmOnly | Restriction::Public => "",
        }
    }

    /// Check the write policy and resolve base URL, scope and bearer
    ///
    /// Writes need Staging, or ProductionReadWrite with production writes
    /// globally enabled. The Main catalog is never written.
    pub fn url_and_auth(
        &self,
        target: Target,
        want_write: bool,
        settings: &Settings,
        tokens: &TokenProvider,
    ) -> Result<Resolved> {
        if want_write {
            self.check_write_policy(target, settings)?;
        }

        let endpoints = &settings.endpoints;
        let base_url = match (target, self.environment) {
            (Target::Main, _) => &endpoints.main_url,
            (Target::Oss, Environment::Staging) => &endpoints.oss_staging_url,
            (Target::Oss, _) => &endpoints.oss_production_url,
        };
        let base_url = base_url.trim_end_matches('/').to_string();

        let public_read = !want_write && self.restriction == Restriction::Public;
        let token = match &self.authentication {
            _ if public_read => None,
            Authentication::Bearer(b) if b.is_empty() => {
                return Err(Error::TokenUnavailable {
                    key: "<bearer>".into(),
                    reason: "empty bearer is only allowed for public reads".into(),
                })
            }
            Authentication::Bearer(b) => Some(b.clone()),
            Authentication::Key(name) => Some(tokens.get_token(name)?.access_token),
            Authentication::Configured => {
                let keys = &settings.keys;
                let name = match (target, self.environment) {
                    (Target::Main, _) => &keys.main,
                    (Target::Oss, Environment::Staging) => &keys.staging,
                    (Target::Oss, _) => &keys.production,
                };
                Some(tokens.get_token(name)?.access_token)
            }
        };

        Ok(Resolved { base_url, scope: self.scope().to_string(), token })
    }

    fn check_write_policy(&self, target: Target, settings: &Settings) -> Result<()> {
        if target == Target::Main {
            return Err(Error::PolicyViolation("the Main catalog is read-only".into()));
        }
        match self.environment {
            Environment::Staging => Ok(()),
            Environment::ProductionReadOnly => Err(Error::PolicyViolation(
                "write attempted with a read-only Production context".into(),
            )),
            Environment::ProductionReadWrite if !settings.options.production_write_enabled => Err(
                Error::PolicyViolation("writes to Production are globally disabled".into()),
            ),
            Environment::ProductionReadWrite => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{KeyFile, Token, TokenSource};
    use chrono::{Duration, Utc};

    struct Fixed;

    impl TokenSource for Fixed {
        fn fetch(&self, secret: &str) -> Result<Token> {
            Ok(Token { access_token: format!("bearer-for-{secret}"), expires_at: Utc::now() + Duration::hours(1) })
        }
    }

    fn tokens() -> TokenProvider {
        TokenProvider::new(
            KeyFile::from_pairs([("main-catalog", "m"), ("oss-production", "p"), ("oss-staging", "s")]),
            Arc::new(Fixed),
        )
    }

    #[test]
    fn test_staging_write_allowed() {
        let r = Context::new(Environment::Staging)
            .url_and_auth(Target::Oss, true, &Settings::default(), &tokens())
            .unwrap();
        assert_eq!(r.base_url, "https://globalcatalog.test.cloud.ibm.com/api/v1");
        assert_eq!(r.token.as_deref(), Some("bearer-for-s"));
    }

    #[test]
    fn test_production_write_policy() {
        let mut settings = Settings::default();
        let ro = Context::new(Environment::ProductionReadOnly);
        assert!(matches!(ro.url_and_auth(Target::Oss, true, &settings, &tokens()), Err(Error::PolicyViolation(_))));

        let rw = Context::new(Environment::ProductionReadWrite);
        assert!(matches!(rw.url_and_auth(Target::Oss, true, &settings, &tokens()), Err(Error::PolicyViolation(_))));

        settings.options.production_write_enabled = true;
        let r = rw.url_and_auth(Target::Oss, true, &settings, &tokens()).unwrap();
        assert_eq!(r.token.as_deref(), Some("bearer-for-p"));
    }

    #[test]
    fn test_main_catalog_is_read_only() {
        let ctx = Context::new(Environment::Staging);
        assert!(ctx.url_and_auth(Target::Main, true, &Settings::default(), &tokens()).is_err());
        let r = ctx.url_and_auth(Target::Main, false, &Settings::default(), &tokens()).unwrap();
        assert_eq!(r.token.as_deref(), Some("bearer-for-m"));
    }

    #[test]
    fn test_scope_by_restriction() {
        let settings = Settings::default();
        let private = Context::new(Environment::ProductionReadOnly).with_restriction(Restriction::Private);
        assert_eq!(private.url_and_auth(Target::Oss, false, &settings, &tokens()).unwrap().scope, "&account=global");

        let public = Context::new(Environment::ProductionReadOnly).with_restriction(Restriction::Public);
        let r = public.url_and_auth(Target::Oss, false, &settings, &tokens()).unwrap();
        assert_eq!(r.scope, "");
        assert_eq!(r.token, None);
    }

    #[test]
    fn test_empty_bearer_only_for_public_reads() {
        let settings = Settings::default();
        let ctx = Context::new(Environment::Staging).with_authentication(Authentication::Bearer(String::new()));
        assert!(matches!(
            ctx.url_and_auth(Target::Oss, false, &settings, &tokens()),
            Err(Error::TokenUnavailable { .. })
        ));
        let public = ctx.with_restriction(Restriction::Public);
        assert!(public.url_and_auth(Target::Oss, false, &settings, &tokens()).is_ok());
    }

    #[test]
    fn test_named_key_overrides_configured_key() {
        let ctx = Context::new(Environment::Staging)
            .with_restriction(Restriction::IbmOnly)
            .with_authentication(Authentication::Key("main-catalog".into()));
        let r = ctx.url_and_auth(Target::Oss, false, &Settings::default(), &tokens()).unwrap();
        assert_eq!(r.token.as_deref(), Some("bearer-for-m"));

        let missing = ctx.with_authentication(Authentication::Key("nope".into()));
        assert!(matches!(
            missing.url_and_auth(Target::Oss, false, &Settings::default(), &tokens()),
            Err(Error::TokenUnavailable { .. })
        ));
    }

    #[test]
    fn test_cancel_flag() {
        let flag = CancelFlag::new();
        let ctx = Context::new(Environment::Staging).with_cancel(flag.clone());
        assert!(ctx.check_cancelled().is_ok());
        flag.cancel();
        assert!(matches!(ctx.check_cancelled(), Err(Error::Cancelled)));
    }

    #[test]
    fn test_debug_redacts_bearer() {
        let ctx = Context::new(Environment::Staging).with_authentication(Authentication::Bearer("secret".into()));
        assert!(!format!("{ctx:?}").contains("secret"));
    }
}
