// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! In-memory Global Catalog for integration tests
//!
//! Implements `Transport` directly, so the whole client stack above the HTTP
//! client runs unchanged. Serves one Main tree and one OSS store.

#![allow(dead_code)]

use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use osscatalog::catalog::Catalog;
use osscatalog::config::Settings;
use osscatalog::parent_map::ParentMap;
use osscatalog::resource::{Deployment, OverviewUi, Page, Resource, Restriction, Visibility};
use osscatalog::token::{KeyFile, Token, TokenSource};
use osscatalog::transport::{HttpError, Method, RawResponse, Request, Transport};

pub const MAIN_URL: &str = "https://main.test/api/v1";
pub const OSS_URL: &str = "https://oss.test/api/v1";
pub const OWNER: &str = "a/ibm-owner";

// =============================================================================
// Fake catalog
// =============================================================================

/// How listing pages point at the next page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CursorMode {
    /// No `next`; the client pages by offset
    #[default]
    Off,
    /// `next` carries `cursor=<offset>` and is absent on the last page
    Follow,
    /// Like `Follow`, but the last page has an empty `next`
    EmptyNext,
    /// `next` is the URL just requested
    SelfCursor,
    /// First page points at `cursor=A`, A at `cursor=B`, B back at A
    Cycle,
    /// Every page repeats the first resources under a fresh cursor
    Repeat,
}

#[derive(Default)]
struct State {
    oss: BTreeMap<String, Resource>,
    main: Vec<Resource>,
    requests: Vec<String>,
    bearers: Vec<(String, Option<String>)>,
    current: (String, String),
    page_size: usize,
    miscount: bool,
    cursor_mode: CursorMode,
    clock: u64,
}

/// Fake catalog server
pub struct FakeCatalog {
    state: Mutex<State>,
}

fn reply(status: u16, body: impl Into<String>) -> Result<RawResponse, HttpError> {
    Ok(RawResponse { status, body: body.into() })
}

fn json_reply<T: serde::Serialize>(value: &T) -> Result<RawResponse, HttpError> {
    reply(200, serde_json::to_string(value).unwrap())
}

fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|p| {
            let (k, v) = p.split_once('=').unwrap_or((p, ""));
            (k.to_string(), urlencoding::decode(v).unwrap().into_owned())
        })
        .collect()
}

impl FakeCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { state: Mutex::new(State { page_size: 2, ..State::default() }) })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Resources per page
    pub fn set_page_size(&self, n: usize) {
        self.lock().page_size = n;
    }

    /// Report one more resource per page than is returned
    pub fn set_miscount(&self, on: bool) {
        self.lock().miscount = on;
    }

    /// Every request seen, as `METHOD url`
    pub fn requests(&self) -> Vec<String> {
        self.lock().requests.clone()
    }

    pub fn clear_requests(&self) {
        let mut state = self.lock();
        state.requests.clear();
        state.bearers.clear();
    }

    /// Every request URL with the bearer it carried
    pub fn bearers(&self) -> Vec<(String, Option<String>)> {
        self.lock().bearers.clone()
    }

    /// Switch listing pages to server cursors
    pub fn set_cursor_mode(&self, mode: CursorMode) {
        self.lock().cursor_mode = mode;
    }

    /// Add a Main catalog entry under `parent` (empty for top level)
    pub fn add_main(&self, resource: Resource) {
        let mut state = self.lock();
        let mut resource = resource;
        resource.children_url = format!("{MAIN_URL}/{}/children", resource.id);
        state.main.push(resource);
    }

    /// Store a raw OSS resource as-is
    pub fn put_oss_raw(&self, resource: Resource) {
        let mut state = self.lock();
        let mut resource = resource;
        if resource.visibility.is_none() {
            resource.visibility = Some(Visibility { restrictions: Restriction::IbmOnly, owner: OWNER.into(), ..Visibility::default() });
        }
        resource.children_url = format!("{OSS_URL}/{}/children", urlencoding::encode(&resource.id));
        state.oss.insert(resource.id.clone(), resource);
    }

    /// Stored OSS resource
    pub fn oss(&self, id: &str) -> Option<Resource> {
        self.lock().oss.get(id).cloned()
    }

    fn page(state: &State, items: Vec<Resource>, query: &HashMap<String, String>) -> Result<RawResponse, HttpError> {
        let cursor = query.get("cursor").map(String::as_str);
        let offset = match (state.cursor_mode, cursor) {
            (CursorMode::Cycle, Some("A")) => state.page_size,
            (CursorMode::Cycle, Some(_)) => 2 * state.page_size,
            (CursorMode::Repeat, _) => 0,
            (_, Some(c)) => c.parse().unwrap_or(0),
            (_, None) => query.get("_offset").and_then(|o| o.parse().ok()).unwrap_or(0),
        };
        let count = items.len();
        let resources: Vec<Resource> = items.into_iter().skip(offset).take(state.page_size).collect();
        let reported = resources.len() + usize::from(state.miscount);
        let next = Self::next_cursor(state, cursor, offset + resources.len(), count);
        json_reply(&Page { offset, resource_count: reported, count, next, resources })
    }

    fn next_cursor(state: &State, cursor: Option<&str>, end: usize, count: usize) -> Option<String> {
        let (path, query) = &state.current;
        let kept: Vec<&str> = query
            .split('&')
            .filter(|p| !p.is_empty() && !p.starts_with("_offset=") && !p.starts_with("cursor="))
            .collect();
        let at = |c: &str| {
            let cursor = format!("cursor={c}");
            let mut params = kept.clone();
            params.push(cursor.as_str());
            format!("{path}?{}", params.join("&"))
        };
        match state.cursor_mode {
            CursorMode::Off => None,
            CursorMode::Follow if end < count => Some(at(&end.to_string())),
            CursorMode::Follow => None,
            CursorMode::EmptyNext if end < count => Some(at(&end.to_string())),
            CursorMode::EmptyNext => Some(String::new()),
            CursorMode::SelfCursor if query.is_empty() => Some(path.clone()),
            CursorMode::SelfCursor => Some(format!("{path}?{query}")),
            CursorMode::Cycle => Some(at(if cursor == Some("A") { "B" } else { "A" })),
            CursorMode::Repeat => {
                let n: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
                Some(at(&(n + 1).to_string()))
            }
        }
    }

    fn handle_main(&self, state: &mut State, path: &str, query: &HashMap<String, String>) -> Result<RawResponse, HttpError> {
        if path.is_empty() {
            if let Some(name) = query.get("q").and_then(|q| q.strip_prefix("name:")) {
                let items = state.main.iter().filter(|r| r.name == name).cloned().collect();
                return Self::page(state, items, query);
            }
            let items = state.main.iter().filter(|r| r.parent_id.is_empty()).cloned().collect();
            return Self::page(state, items, query);
        }
        if let Some(parent) = path.strip_suffix("/children") {
            let items = state.main.iter().filter(|r| r.parent_id == parent).cloned().collect();
            return Self::page(state, items, query);
        }
        reply(404, "no such entry")
    }

    fn handle_oss(
        &self,
        state: &mut State,
        method: Method,
        path: &str,
        query: &HashMap<String, String>,
        body: Option<&str>,
    ) -> Result<RawResponse, HttpError> {
        state.clock += 1;
        let now = format!("2026-01-01T00:00:{:02}Z", state.clock % 60);

        if let Some(encoded) = path.strip_suffix("/visibility") {
            let id = urlencoding::decode(encoded).unwrap().into_owned();
            let Some(resource) = state.oss.get_mut(&id) else { return reply(404, "no such entry") };
            return match method {
                Method::Get => json_reply(resource.visibility.as_ref().unwrap()),
                Method::Put => {
                    resource.visibility = Some(serde_json::from_str(body.unwrap_or("{}")).unwrap());
                    reply(200, "{}")
                }
                _ => reply(405, "method not allowed"),
            };
        }

        if let Some(encoded) = path.strip_suffix("/children") {
            let parent = urlencoding::decode(encoded).unwrap().into_owned();
            let kinds = Self::kind_filter(query);
            let items = state
                .oss
                .values()
                .filter(|r| r.parent_id == parent && kinds.iter().any(|k| *k == r.kind))
                .cloned()
                .collect();
            return Self::page(state, items, query);
        }

        match (method, path) {
            (Method::Get, "") => {
                let kinds = Self::kind_filter(query);
                let items = state.oss.values().filter(|r| kinds.iter().any(|k| *k == r.kind)).cloned().collect();
                Self::page(state, items, query)
            }
            (Method::Post, "") => {
                let mut resource: Resource = serde_json::from_str(body.unwrap_or("{}")).unwrap();
                if state.oss.contains_key(&resource.id) {
                    return reply(400, "duplicate id");
                }
                resource.created = Some(now.clone());
                resource.updated = Some(now);
                // Server default before the client pins it
                resource.visibility = Some(Visibility { restrictions: Restriction::Public, owner: OWNER.into(), ..Visibility::default() });
                resource.children_url = format!("{OSS_URL}/{}/children", urlencoding::encode(&resource.id));
                state.oss.insert(resource.id.clone(), resource.clone());
                reply(201, serde_json::to_string(&resource).unwrap())
            }
            (method, encoded) => {
                let id = urlencoding::decode(encoded).unwrap().into_owned();
                match method {
                    Method::Get => match state.oss.get(&id) {
                        Some(r) => json_reply(r),
                        None => reply(404, "no such entry"),
                    },
                    Method::Put => {
                        let Some(old) = state.oss.get(&id).cloned() else { return reply(404, "no such entry") };
                        let mut resource: Resource = serde_json::from_str(body.unwrap_or("{}")).unwrap();
                        let moving = query.get("move").map(String::as_str) == Some("true");
                        if old.parent_id != resource.parent_id && !moving {
                            return reply(400, "parent changed without move=true");
                        }
                        resource.created = old.created;
                        resource.updated = Some(now);
                        resource.visibility = old.visibility;
                        resource.children_url = old.children_url;
                        state.oss.insert(id, resource.clone());
                        reply(200, serde_json::to_string(&resource).unwrap())
                    }
                    Method::Delete => {
                        if state.oss.values().any(|r| r.parent_id == id) {
                            return reply(400, "entry has children");
                        }
                        match state.oss.remove(&id) {
                            Some(_) => reply(200, ""),
                            None => reply(404, "no such entry"),
                        }
                    }
                    Method::Post => reply(405, "method not allowed"),
                }
            }
        }
    }

    fn kind_filter(query: &HashMap<String, String>) -> Vec<String> {
        query
            .get("q")
            .map(|q| q.split('+').filter_map(|k| k.strip_prefix("kind:")).map(str::to_string).collect())
            .unwrap_or_default()
    }
}

impl Transport for FakeCatalog {
    fn execute(&self, request: &Request<'_>) -> Result<RawResponse, HttpError> {
        let mut state = self.lock();
        state.requests.push(format!("{} {}", request.method, request.url));
        state.bearers.push((request.url.to_string(), request.token.map(str::to_string)));
        let (path, query) = request.url.split_once('?').unwrap_or((request.url, ""));
        state.current = (path.to_string(), query.to_string());
        let query = parse_query(query);

        if let Some(rest) = path.strip_prefix(MAIN_URL) {
            let rest = rest.trim_start_matches('/').to_string();
            return self.handle_main(&mut state, &rest, &query);
        }
        if let Some(rest) = path.strip_prefix(OSS_URL) {
            let rest = rest.trim_start_matches('/').to_string();
            return self.handle_oss(&mut state, request.method, &rest, &query, request.body);
        }
        reply(404, "unknown host")
    }
}

// =============================================================================
// Client wiring
// =============================================================================

/// Token source that never talks to IAM
pub struct StaticTokens;

impl TokenSource for StaticTokens {
    fn fetch(&self, secret: &str) -> osscatalog::Result<Token> {
        Ok(Token { access_token: format!("bearer-{secret}"), expires_at: Utc::now() + chrono::Duration::hours(1) })
    }
}

/// Settings pointing at the fake hosts
pub fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.endpoints.main_url = MAIN_URL.into();
    settings.endpoints.oss_staging_url = OSS_URL.into();
    settings.endpoints.oss_production_url = OSS_URL.into();
    settings.options.log_timestamp = "2026-01-01T00:00:00Z".into();
    settings
}

/// Catalog over `fake` with its own Parent-Map
pub fn catalog_with(fake: &Arc<FakeCatalog>, settings: Settings) -> Catalog {
    Catalog::builder(settings)
        .key_file(KeyFile::from_pairs([("main-catalog", "m"), ("oss-production", "p"), ("oss-staging", "s")]))
        .transport(fake.clone())
        .token_source(Arc::new(StaticTokens))
        .parent_map(Arc::new(ParentMap::new()))
        .retry_delay(Duration::ZERO)
        .build()
        .unwrap()
}

/// Catalog over `fake` fetching tokens from `source`
pub fn catalog_with_tokens(fake: &Arc<FakeCatalog>, source: Arc<dyn TokenSource>) -> Catalog {
    Catalog::builder(settings())
        .key_file(KeyFile::from_pairs([("main-catalog", "m"), ("oss-production", "p"), ("oss-staging", "s")]))
        .transport(fake.clone())
        .token_source(source)
        .parent_map(Arc::new(ParentMap::new()))
        .retry_delay(Duration::ZERO)
        .build()
        .unwrap()
}

pub fn catalog(fake: &Arc<FakeCatalog>) -> Catalog {
    catalog_with(fake, settings())
}

// =============================================================================
// Fixtures
// =============================================================================

/// Main catalog resource
pub fn main_entry(id: &str, kind: &str, parent: &str) -> Resource {
    let mut r = Resource {
        id: id.into(),
        name: id.into(),
        kind: kind.into(),
        parent_id: parent.into(),
        active: true,
        visibility: Some(Visibility { restrictions: Restriction::Public, ..Visibility::default() }),
        ..Resource::default()
    };
    r.overview_ui.insert("en".into(), OverviewUi { display_name: id.to_uppercase(), ..OverviewUi::default() });
    r
}

/// Main catalog location with a deployment CRN
pub fn main_location(id: &str, kind: &str, parent: &str, location: &str, restriction: Restriction) -> Resource {
    let mut r = main_entry(id, kind, parent);
    r.visibility = Some(Visibility { restrictions: restriction, ..Visibility::default() });
    r.metadata.deployment = Some(Deployment {
        target_crn: format!("crn:v1:bluemix:public::{location}::::"),
        location: location.into(),
    });
    r
}
