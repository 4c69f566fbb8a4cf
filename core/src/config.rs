//! Credentials and client configuration.
//!
//! Both hosts are fixed when the client is constructed. Values can be set
//! with the `with_*` builders or picked up from the environment.

use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default host of the cleansing and profile endpoints.
pub const DEFAULT_CLEAN_URL: &str = "https://dadata.ru/api/v2";

/// Default host of the suggestion endpoints.
pub const DEFAULT_SUGGESTIONS_URL: &str = "https://suggestions.dadata.ru/suggestions/api/4_1/rs";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

pub const TOKEN_VAR: &str = "DADATA_TOKEN";
pub const SECRET_VAR: &str = "DADATA_SECRET";
pub const CLEAN_URL_VAR: &str = "DADATA_CLEAN_URL";
pub const SUGGESTIONS_URL_VAR: &str = "DADATA_SUGGESTIONS_URL";

/// API token plus optional secret. The secret is only required by the
/// cleansing and profile endpoints.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
    secret: Option<String>,
}

impl Credentials {
    pub fn new(token: impl Into<String>, secret: Option<String>) -> Self {
        Self {
            token: token.into(),
            secret,
        }
    }

    /// Read `DADATA_TOKEN` (required) and `DADATA_SECRET` (optional).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let token = lookup(TOKEN_VAR)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::Config {
                message: format!("{TOKEN_VAR} is not set"),
            })?;
        let secret = lookup(SECRET_VAR).filter(|s| !s.trim().is_empty());
        Ok(Self::new(token, secret))
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }
}

// Keeps the token and secret out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"***")
            .field("secret", &self.secret.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the cleansing (and profile) API, without trailing slash.
    pub clean_url: String,
    /// Base URL of the suggestion API, without trailing slash.
    pub suggestions_url: String,
    /// Connect timeout (default: 5 seconds).
    pub connect_timeout: Duration,
    /// Response and body read timeout (default: 5 seconds).
    pub read_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            clean_url: DEFAULT_CLEAN_URL.to_string(),
            suggestions_url: DEFAULT_SUGGESTIONS_URL.to_string(),
            connect_timeout: DEFAULT_TIMEOUT,
            read_timeout: DEFAULT_TIMEOUT,
            user_agent: format!("dadata-rs/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Defaults, with hosts overridden by `DADATA_CLEAN_URL` and
    /// `DADATA_SUGGESTIONS_URL` when those are set.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup(CLEAN_URL_VAR).filter(|u| !u.is_empty()) {
            config = config.with_clean_url(&url);
        }
        if let Some(url) = lookup(SUGGESTIONS_URL_VAR).filter(|u| !u.is_empty()) {
            config = config.with_suggestions_url(&url);
        }
        config
    }

    pub fn with_clean_url(mut self, url: &str) -> Self {
        self.clean_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_suggestions_url(mut self, url: &str) -> Self {
        self.suggestions_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_use_fixed_hosts_and_five_second_timeouts() {
        let config = ClientConfig::default();
        assert_eq!(config.clean_url, DEFAULT_CLEAN_URL);
        assert_eq!(config.suggestions_url, DEFAULT_SUGGESTIONS_URL);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.read_timeout, Duration::from_secs(5));
        assert!(config.user_agent.starts_with("dadata-rs/"));
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let config = ClientConfig::default()
            .with_clean_url("http://localhost:3000/")
            .with_suggestions_url("http://localhost:3001//");
        assert_eq!(config.clean_url, "http://localhost:3000");
        assert_eq!(config.suggestions_url, "http://localhost:3001");
    }

    #[test]
    fn config_hosts_come_from_env() {
        let config = ClientConfig::from_lookup(env(&[(CLEAN_URL_VAR, "http://127.0.0.1:9/")]));
        assert_eq!(config.clean_url, "http://127.0.0.1:9");
        assert_eq!(config.suggestions_url, DEFAULT_SUGGESTIONS_URL);
    }

    #[test]
    fn credentials_require_token() {
        let err = Credentials::from_lookup(env(&[(SECRET_VAR, "s")])).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn credentials_secret_is_optional() {
        let creds = Credentials::from_lookup(env(&[(TOKEN_VAR, "t")])).unwrap();
        assert_eq!(creds.token(), "t");
        assert!(creds.secret().is_none());

        let creds = Credentials::from_lookup(env(&[(TOKEN_VAR, "t"), (SECRET_VAR, "s")])).unwrap();
        assert_eq!(creds.secret(), Some("s"));
    }

    #[test]
    fn credentials_debug_hides_values() {
        let creds = Credentials::new("very-secret-token", Some("hush".to_string()));
        let shown = format!("{creds:?}");
        assert!(!shown.contains("very-secret-token"));
        assert!(!shown.contains("hush"));
    }
}
