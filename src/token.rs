// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Bearer tokens for named credentials
//!
//! Secrets come from a local JSON key file mapping credential names to API
//! keys. Tokens are fetched from IAM on first use, cached per name, and
//! fetched again shortly before they expire.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Tokens this close to expiry are treated as expired
const EXPIRY_MARGIN_SECS: i64 = 120;

/// Short hash of a secret, safe to log
#[must_use]
pub fn fingerprint(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())[..8].to_string()
}

/// Named secrets loaded from disk
#[derive(Clone, Default)]
pub struct KeyFile {
    keys: HashMap<String, String>,
}

impl std::fmt::Debug for KeyFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.keys.keys().collect();
        names.sort();
        f.debug_struct("KeyFile").field("names", &names).finish()
    }
}

impl KeyFile {
    /// Read a `{ "name": "secret", ... }` JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let key_err = |reason: String| Error::KeyFile { path: path.display().to_string(), reason };
        let content = fs::read_to_string(path).map_err(|e| key_err(e.to_string()))?;
        let keys: HashMap<String, String> = serde_json::from_str(&content).map_err(|e| key_err(e.to_string()))?;
        info!(path = %path.display(), count = keys.len(), "loaded key file");
        Ok(Self { keys })
    }

    /// Key file built in memory
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self { keys: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }

    /// Secret for `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.keys.get(name).map(String::as_str)
    }
}

/// A bearer token and its expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Bearer value
    pub access_token: String,
    /// Expiry instant
    pub expires_at: DateTime<Utc>,
}

impl Token {
    /// True if the token is still usable at `now`
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) > now
    }
}

/// Exchanges a secret for a bearer token
pub trait TokenSource: Send + Sync {
    /// Fetch a new token for `secret`
    fn fetch(&self, secret: &str) -> Result<Token>;
}

#[derive(Deserialize)]
struct IamResponse {
    access_token: String,
    #[serde(default)]
    expiration: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// [`TokenSource`] backed by the IAM API-key grant
pub struct IamTokenSource {
    client: reqwest::blocking::Client,
    url: String,
}

impl IamTokenSource {
    /// IAM client for `url`
    pub fn new(url: impl Into<String>, timeout: std::time::Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::TokenUnavailable { key: String::new(), reason: e.to_string() })?;
        Ok(Self { client, url: url.into() })
    }
}

impl TokenSource for IamTokenSource {
    fn fetch(&self, secret: &str) -> Result<Token> {
        let unavailable = |reason: String| Error::TokenUnavailable { key: fingerprint(secret), reason };
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[("grant_type", "urn:ibm:params:oauth:grant-type:apikey"), ("apikey", secret)])
            .send()
            .map_err(|e| unavailable(e.to_string()))?;
        let status = response.status();
        if status.as_u16() == 400 || status.as_u16() == 401 {
            return Err(Error::Unauthorized(format!("IAM rejected key {}", fingerprint(secret))));
        }
        if !status.is_success() {
            return Err(unavailable(format!("IAM returned HTTP {status}")));
        }
        let body: IamResponse = response.json().map_err(|e| unavailable(e.to_string()))?;
        let expires_at = match (body.expiration, body.expires_in) {
            (Some(at), _) => Utc.timestamp_opt(at, 0).single(),
            (None, Some(secs)) => Some(Utc::now() + Duration::seconds(secs)),
            (None, None) => None,
        }
        .ok_or_else(|| unavailable("IAM response carries no usable expiry".into()))?;
        Ok(Token { access_token: body.access_token, expires_at })
    }
}

/// Cached, refreshing tokens keyed by credential name
pub struct TokenProvider {
    keys: KeyFile,
    source: Arc<dyn TokenSource>,
    cache: Mutex<HashMap<String, Token>>,
}

impl TokenProvider {
    /// Provider over `keys` using `source` for fresh tokens
    #[must_use]
    pub fn new(keys: KeyFile, source: Arc<dyn TokenSource>) -> Self {
        Self { keys, source, cache: Mutex::new(HashMap::new()) }
    }

    /// Secret for `name`, for non-bearer uses
    pub fn get_key(&self, name: &str) -> Result<&str> {
        self.keys.get(name).ok_or_else(|| Error::TokenUnavailable {
            key: name.to_string(),
            reason: "no such key in key file".into(),
        })
    }

    /// Cached token for `name`, fetching a new one when missing or near expiry
    pub fn get_token(&self, name: &str) -> Result<Token> {
        let now = Utc::now();
        if let Some(token) = self.lock_cache().get(name).filter(|t| t.is_fresh(now)) {
            return Ok(token.clone());
        }

        let secret = self.get_key(name)?;
        debug!(key = name, fingerprint = %fingerprint(secret), "fetching token");
        let token = self.source.fetch(secret).map_err(|e| match e {
            Error::Unauthorized(_) => e,
            other => Error::TokenUnavailable { key: name.to_string(), reason: other.to_string() },
        })?;
        self.lock_cache().insert(name.to_string(), token.clone());
        Ok(token)
    }

    /// Drop the cached token for `name`
    pub fn invalidate(&self, name: &str) {
        self.lock_cache().remove(name);
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, Token>> {
        // A panic while holding the lock leaves a plain map behind; keep using it
        self.cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
