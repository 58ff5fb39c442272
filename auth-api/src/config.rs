/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Application configuration loaded from environment variables.
//!
//! Loaded once at startup and passed by reference to every component.

use std::env;
use std::time::Duration;

use crate::transport::RetryPolicy;

/// Origins accepted as redirect targets when `ALLOWED_ORIGINS` is unset.
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:5173"];

/// Configuration for the login backend.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the HTTP server (e.g. "0.0.0.0:8080").
    pub listen_addr: String,
    /// PostgreSQL connection string. `None` disables user provisioning.
    pub database_url: Option<String>,
    pub oauth: OAuthConfig,
    /// Retry policy for calls to the identity service.
    pub retry: RetryPolicy,
}

/// Identity service and redirect settings.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// Base URL of the managed identity service (no trailing slash).
    pub identity_domain: String,
    pub client_id: String,
    /// Frontend base URL the callback path is appended to.
    pub frontend_url: Option<String>,
    /// Exact-match allow-list for `frontend_url`.
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Required
    /// - `IDENTITY_DOMAIN_URL`
    /// - `OAUTH_CLIENT_ID`
    ///
    /// # Optional
    /// - `LISTEN_ADDR` (default: `"0.0.0.0:8080"`)
    /// - `FE_URL`
    /// - `ALLOWED_ORIGINS` (comma-separated, default: localhost:3000 and localhost:5173)
    /// - `HTTP_TIMEOUT_SECS` (default: `30`)
    /// - `HTTP_MAX_RETRIES` (default: `3`)
    /// - `HTTP_BASE_BACKOFF_MS` (default: `1000`)
    /// - `HTTP_MAX_BACKOFF_MS` (default: `30000`)
    /// - `HTTP_JITTER_MAX_MS` (default: `1000`)
    /// - `DATABASE_URL`
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

        let identity_domain = get("IDENTITY_DOMAIN_URL")
            .ok_or("IDENTITY_DOMAIN_URL environment variable is required")?
            .trim_end_matches('/')
            .to_string();
        let client_id =
            get("OAUTH_CLIENT_ID").ok_or("OAUTH_CLIENT_ID environment variable is required")?;

        let listen_addr = get("LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string());
        let frontend_url = get("FE_URL");
        let allowed_origins = match get("ALLOWED_ORIGINS") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            None => DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        let number = |key: &str, default: u64| -> Result<u64, String> {
            match get(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| format!("{key} must be a non-negative integer")),
                None => Ok(default),
            }
        };

        let max_retries = u32::try_from(number("HTTP_MAX_RETRIES", 3)?)
            .map_err(|_| "HTTP_MAX_RETRIES is too large".to_string())?;
        let retry = RetryPolicy::new(
            Duration::from_secs(number("HTTP_TIMEOUT_SECS", 30)?),
            max_retries,
            Duration::from_millis(number("HTTP_BASE_BACKOFF_MS", 1000)?),
            Duration::from_millis(number("HTTP_MAX_BACKOFF_MS", 30_000)?),
            Duration::from_millis(number("HTTP_JITTER_MAX_MS", 1000)?),
        )?;

        Ok(Self {
            listen_addr,
            database_url: get("DATABASE_URL"),
            oauth: OAuthConfig {
                identity_domain,
                client_id,
                frontend_url,
                allowed_origins,
            },
            retry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("IDENTITY_DOMAIN_URL", "https://auth.example.com/"),
        ("OAUTH_CLIENT_ID", "client-123"),
    ];

    #[test]
    fn defaults_apply() {
        let config = load(&REQUIRED).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.oauth.identity_domain, "https://auth.example.com");
        assert_eq!(config.oauth.frontend_url, None);
        assert_eq!(config.oauth.allowed_origins, DEFAULT_ALLOWED_ORIGINS);
        assert_eq!(config.retry, RetryPolicy::default());
        assert!(config.database_url.is_none());
    }

    #[test]
    fn missing_required_values_fail() {
        assert!(load(&[("OAUTH_CLIENT_ID", "x")]).is_err());
        assert!(load(&[("IDENTITY_DOMAIN_URL", "https://a")]).is_err());
        assert!(load(&[("IDENTITY_DOMAIN_URL", ""), ("OAUTH_CLIENT_ID", "x")]).is_err());
    }

    #[test]
    fn allowed_origins_are_split_and_trimmed() {
        let mut vars = REQUIRED.to_vec();
        vars.push((
            "ALLOWED_ORIGINS",
            " https://app.example.com , https://admin.example.com,,",
        ));
        vars.push(("FE_URL", "https://app.example.com"));
        let config = load(&vars).unwrap();
        assert_eq!(
            config.oauth.allowed_origins,
            vec!["https://app.example.com", "https://admin.example.com"]
        );
        assert_eq!(
            config.oauth.frontend_url.as_deref(),
            Some("https://app.example.com")
        );
    }

    #[test]
    fn retry_settings_are_parsed() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("HTTP_TIMEOUT_SECS", "5"),
            ("HTTP_MAX_RETRIES", "0"),
            ("HTTP_BASE_BACKOFF_MS", "200"),
            ("HTTP_MAX_BACKOFF_MS", "800"),
            ("HTTP_JITTER_MAX_MS", "0"),
        ]);
        let retry = load(&vars).unwrap().retry;
        assert_eq!(retry.timeout, Duration::from_secs(5));
        assert_eq!(retry.max_retries, 0);
        assert_eq!(retry.base_backoff, Duration::from_millis(200));
        assert_eq!(retry.max_backoff, Duration::from_millis(800));
        assert_eq!(retry.jitter_max, Duration::ZERO);
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("HTTP_MAX_RETRIES", "-1"));
        assert!(load(&vars).is_err());
    }

    #[test]
    fn backoff_cap_below_base_is_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([("HTTP_BASE_BACKOFF_MS", "5000"), ("HTTP_MAX_BACKOFF_MS", "100")]);
        assert!(load(&vars).is_err());
    }
}
