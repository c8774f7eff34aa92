//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;
use url::Url;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `app_origin` is not a bare http(s) origin
    /// - either namespace is empty, or both are the same
    /// - a static asset is not an absolute path
    /// - an external asset is not an absolute http(s) URL
    /// - `fetch_timeout_ms` is set outside 100ms..=5 minutes
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `user_agent` is empty
    ///
    /// Returns `ConfigError::Missing` if a required host name is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = self.origin()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("app_origin", "scheme must be http or https"));
        }
        if origin.host_str().is_none() {
            return Err(invalid("app_origin", "must include a host"));
        }
        if origin.path() != "/" || origin.query().is_some() {
            return Err(invalid("app_origin", "must be an origin without path or query"));
        }

        if self.static_namespace.trim().is_empty() {
            return Err(invalid("static_namespace", "must not be empty"));
        }
        if self.dynamic_namespace.trim().is_empty() {
            return Err(invalid("dynamic_namespace", "must not be empty"));
        }
        if self.static_namespace == self.dynamic_namespace {
            return Err(invalid("dynamic_namespace", "must differ from static_namespace"));
        }

        if let Some(path) = self.static_assets.iter().find(|p| !p.starts_with('/')) {
            return Err(invalid("static_assets", format!("{path} must start with '/'")));
        }
        if !self.offline_document.starts_with('/') {
            return Err(invalid("offline_document", "must start with '/'"));
        }

        for raw in &self.external_assets {
            let url = Url::parse(raw).map_err(|e| invalid("external_assets", format!("{raw}: {e}")))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(invalid("external_assets", format!("{raw}: scheme must be http or https")));
            }
        }

        if self.module_cdn_host.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "module_cdn_host".into(),
                hint: "Set HARBOR_MODULE_CDN_HOST environment variable".into(),
            });
        }

        if let Some(timeout_ms) = self.fetch_timeout_ms {
            if timeout_ms < 100 {
                return Err(invalid("fetch_timeout_ms", "must be at least 100ms"));
            }
            if timeout_ms > 300_000 {
                return Err(invalid("fetch_timeout_ms", "must not exceed 5 minutes (300000ms)"));
            }
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self
            .cache_first_hosts
            .iter()
            .any(|h| h.eq_ignore_ascii_case(&self.module_cdn_host))
        {
            tracing::warn!(
                module_cdn_host = %self.module_cdn_host,
                "module_cdn_host is also listed in cache_first_hosts; network-first wins"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_origin_with_path() {
        let config = AppConfig { app_origin: "https://example.com/app".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "app_origin"));
    }

    #[test]
    fn test_validate_origin_not_http() {
        let config = AppConfig { app_origin: "ftp://example.com".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "app_origin"));
    }

    #[test]
    fn test_validate_same_namespaces() {
        let config = AppConfig { dynamic_namespace: "harbor-static-v1".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "dynamic_namespace"));
    }

    #[test]
    fn test_validate_relative_static_asset() {
        let config = AppConfig { static_assets: vec!["index.html".into()], ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "static_assets"));
    }

    #[test]
    fn test_validate_external_asset_not_absolute() {
        let config = AppConfig { external_assets: vec!["/fonts.css".into()], ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "external_assets"));
    }

    #[test]
    fn test_validate_missing_module_cdn_host() {
        let config = AppConfig { module_cdn_host: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Missing { field, .. }) if field == "module_cdn_host"));
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = AppConfig { fetch_timeout_ms: Some(50), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "fetch_timeout_ms"));

        let config = AppConfig { fetch_timeout_ms: Some(301_000), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "fetch_timeout_ms"));

        let config = AppConfig { fetch_timeout_ms: Some(100), ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_bytes() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "max_bytes"));

        let config = AppConfig { max_bytes: 50 * 1024 * 1024, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }
}
