//! Routing rule table.
//!
//! Each intercepted request is matched against an ordered list of rules;
//! the first rule whose predicate matches decides the strategy and the
//! namespace. The default table is:
//!
//! | Predicate | Route |
//! |---|---|
//! | scheme is not http/https | pass through |
//! | host is the module CDN | network-first, dynamic |
//! | host is a cache-first host | cache-first, dynamic |
//! | same origin as the app | cache-first, static |
//! | anything else | network-first, dynamic |

use std::fmt;

use serde::{Deserialize, Serialize};
use url::{Origin, Url};

use crate::config::{AppConfig, ConfigError};
use crate::Request;

/// Retrieval strategy selected for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
}

/// Which of the two current namespaces a route reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamespaceKind {
    Static,
    Dynamic,
}

/// The two current namespace identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespaces {
    pub static_ns: String,
    pub dynamic_ns: String,
}

impl Namespaces {
    pub fn new(static_ns: impl Into<String>, dynamic_ns: impl Into<String>) -> Self {
        Self { static_ns: static_ns.into(), dynamic_ns: dynamic_ns.into() }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.static_namespace, &config.dynamic_namespace)
    }

    /// Identifier for a namespace kind.
    pub fn name(&self, kind: NamespaceKind) -> &str {
        match kind {
            NamespaceKind::Static => &self.static_ns,
            NamespaceKind::Dynamic => &self.dynamic_ns,
        }
    }

    /// Whether the identifier is one of the two current namespaces.
    pub fn is_current(&self, name: &str) -> bool {
        name == self.static_ns || name == self.dynamic_ns
    }
}

/// Outcome of classifying a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Route {
    /// Not intercepted; the host handles the request as if no proxy existed.
    Passthrough,
    Handle { strategy: Strategy, namespace: NamespaceKind },
}

impl Route {
    pub const fn cache_first(namespace: NamespaceKind) -> Self {
        Route::Handle { strategy: Strategy::CacheFirst, namespace }
    }

    pub const fn network_first(namespace: NamespaceKind) -> Self {
        Route::Handle { strategy: Strategy::NetworkFirst, namespace }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Passthrough => f.write_str("passthrough"),
            Route::Handle { strategy, namespace } => {
                let strategy = match strategy {
                    Strategy::CacheFirst => "cache-first",
                    Strategy::NetworkFirst => "network-first",
                };
                let namespace = match namespace {
                    NamespaceKind::Static => "static",
                    NamespaceKind::Dynamic => "dynamic",
                };
                write!(f, "{strategy}+{namespace}")
            }
        }
    }
}

/// Predicate over a request URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Scheme is anything but http or https.
    NotHttp,
    /// Hostname equals one of the listed (lowercase) hosts.
    Hosts(Vec<String>),
    /// URL origin equals the given origin.
    SameOrigin(Origin),
    Any,
}

impl Matcher {
    pub fn matches(&self, url: &Url) -> bool {
        match self {
            Matcher::NotHttp => !matches!(url.scheme(), "http" | "https"),
            Matcher::Hosts(hosts) => url
                .host_str()
                .is_some_and(|host| hosts.iter().any(|h| h.eq_ignore_ascii_case(host))),
            Matcher::SameOrigin(origin) => &url.origin() == origin,
            Matcher::Any => true,
        }
    }
}

/// A named (predicate, route) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    pub name: &'static str,
    pub matcher: Matcher,
    pub route: Route,
}

/// Ordered routing rules; first match wins.
#[derive(Debug, Clone)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    /// Build the standard table for an application origin.
    pub fn new(app_origin: &Url, module_cdn_host: &str, cache_first_hosts: &[String]) -> Self {
        let rules = vec![
            RouteRule { name: "non-http", matcher: Matcher::NotHttp, route: Route::Passthrough },
            RouteRule {
                name: "module-cdn",
                matcher: Matcher::Hosts(vec![module_cdn_host.to_lowercase()]),
                route: Route::network_first(NamespaceKind::Dynamic),
            },
            RouteRule {
                name: "cache-first-host",
                matcher: Matcher::Hosts(cache_first_hosts.iter().map(|h| h.to_lowercase()).collect()),
                route: Route::cache_first(NamespaceKind::Dynamic),
            },
            RouteRule {
                name: "same-origin",
                matcher: Matcher::SameOrigin(app_origin.origin()),
                route: Route::cache_first(NamespaceKind::Static),
            },
            RouteRule { name: "default", matcher: Matcher::Any, route: Route::network_first(NamespaceKind::Dynamic) },
        ];
        Self { rules }
    }

    /// Build the table from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `app_origin` does not parse.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(&config.origin()?, &config.module_cdn_host, &config.cache_first_hosts))
    }

    /// Build a table from arbitrary rules. A trailing catch-all is the caller's job.
    pub fn with_rules(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    /// The first rule matching the URL, if any.
    pub fn matching_rule(&self, url: &Url) -> Option<&RouteRule> {
        self.rules.iter().find(|rule| rule.matcher.matches(url))
    }

    /// Route for a request. Requests no rule matches pass through.
    pub fn classify(&self, request: &Request) -> Route {
        self.matching_rule(&request.url)
            .map_or(Route::Passthrough, |rule| rule.route)
    }
}
