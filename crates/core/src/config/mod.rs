//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (HARBOR_*)
//! 2. TOML config file (if HARBOR_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! Namespace names are the invalidation mechanism: bumping the version suffix
//! of `static_namespace` or `dynamic_namespace` makes the next activation
//! delete everything cached under the old names.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (HARBOR_*)
/// 2. TOML config file (if HARBOR_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via HARBOR_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin of the host application (scheme, host and port only).
    ///
    /// Requests to this origin are served cache-first from the static namespace.
    #[serde(default = "default_app_origin")]
    pub app_origin: String,

    /// Current static namespace identifier.
    #[serde(default = "default_static_namespace")]
    pub static_namespace: String,

    /// Current dynamic namespace identifier.
    #[serde(default = "default_dynamic_namespace")]
    pub dynamic_namespace: String,

    /// Same-origin paths pre-cached into the static namespace at install.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// Absolute URLs opportunistically pre-cached into the dynamic namespace at install.
    #[serde(default = "default_external_assets")]
    pub external_assets: Vec<String>,

    /// Hostname of the JS module CDN, always served network-first.
    #[serde(default = "default_module_cdn_host")]
    pub module_cdn_host: String,

    /// Third-party hosts served cache-first from the dynamic namespace.
    #[serde(default = "default_cache_first_hosts")]
    pub cache_first_hosts: Vec<String>,

    /// Same-origin path of the document served when a cache-first fetch fails.
    #[serde(default = "default_offline_document")]
    pub offline_document: String,

    /// Body of the synthesized 503 when neither network nor cache can answer.
    #[serde(default = "default_offline_message")]
    pub offline_message: String,

    /// Request headers that take part in request identity.
    #[serde(default)]
    pub vary_headers: Vec<String>,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via HARBOR_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Optional network deadline in milliseconds. Unset means fetches never time out.
    ///
    /// Set via HARBOR_FETCH_TIMEOUT_MS environment variable.
    #[serde(default)]
    pub fetch_timeout_ms: Option<u64>,

    /// Maximum redirects followed per fetch.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./harbor-cache.sqlite")
}

fn default_app_origin() -> String {
    "http://localhost:8080".into()
}

fn default_static_namespace() -> String {
    "harbor-static-v1".into()
}

fn default_dynamic_namespace() -> String {
    "harbor-dynamic-v1".into()
}

fn default_static_assets() -> Vec<String> {
    ["/", "/index.html", "/manifest.json", "/icons/icon-192.png", "/icons/icon-512.png"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_external_assets() -> Vec<String> {
    [
        "https://cdn.tailwindcss.com",
        "https://fonts.googleapis.com/css2?family=Cairo:wght@300;400;600;700;900&display=swap",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_module_cdn_host() -> String {
    "esm.sh".into()
}

fn default_cache_first_hosts() -> Vec<String> {
    ["fonts.googleapis.com", "fonts.gstatic.com", "cdn.tailwindcss.com", "images.unsplash.com"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_offline_document() -> String {
    "/index.html".into()
}

fn default_offline_message() -> String {
    "Offline - please connect to the internet first".into()
}

fn default_user_agent() -> String {
    "harbor/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_max_redirects() -> usize {
    5
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            app_origin: default_app_origin(),
            static_namespace: default_static_namespace(),
            dynamic_namespace: default_dynamic_namespace(),
            static_assets: default_static_assets(),
            external_assets: default_external_assets(),
            module_cdn_host: default_module_cdn_host(),
            cache_first_hosts: default_cache_first_hosts(),
            offline_document: default_offline_document(),
            offline_message: default_offline_message(),
            vary_headers: Vec::new(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            fetch_timeout_ms: None,
            max_redirects: default_max_redirects(),
        }
    }
}

impl AppConfig {
    /// Fetch deadline as Duration for use with reqwest/tokio, if one is configured.
    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_ms.map(Duration::from_millis)
    }

    /// Parsed application origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `app_origin` is not an absolute URL.
    pub fn origin(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.app_origin)
            .map_err(|e| ConfigError::Invalid { field: "app_origin".into(), reason: e.to_string() })
    }

    /// Static asset paths resolved against the application origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin or any path fails to parse.
    pub fn static_asset_urls(&self) -> Result<Vec<Url>, ConfigError> {
        let origin = self.origin()?;
        self.static_assets
            .iter()
            .map(|path| {
                origin
                    .join(path)
                    .map_err(|e| ConfigError::Invalid { field: "static_assets".into(), reason: format!("{path}: {e}") })
            })
            .collect()
    }

    /// External asset URLs, parsed.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if any entry is not an absolute URL.
    pub fn external_asset_urls(&self) -> Result<Vec<Url>, ConfigError> {
        self.external_assets
            .iter()
            .map(|raw| {
                Url::parse(raw)
                    .map_err(|e| ConfigError::Invalid { field: "external_assets".into(), reason: format!("{raw}: {e}") })
            })
            .collect()
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `HARBOR_`
    /// 2. TOML file from `HARBOR_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("HARBOR_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("HARBOR_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
