//! Validated client configuration. Built once, before any request is sent.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

pub const DEFAULT_BASE_URL: &str = "https://api-publica.datajud.cnj.jus.br";
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(3);

/// Environment variable holding the DataJud public API key.
pub const API_KEY_ENV: &str = "CNJ_API_KEY";

const API_KEY_SCHEME: &str = "ApiKey";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("API key not found: set CNJ_API_KEY in the environment or a .env file (format: CNJ_API_KEY=\"ApiKey ...\")")]
    MissingApiKey,
    #[error("API key is blank")]
    BlankApiKey,
    #[error("tribunal alias {0:?} must be non-empty lowercase ASCII letters and digits (e.g. tjgo, stj)")]
    InvalidTribunal(String),
    #[error("base URL {0:?} must start with http:// or https://")]
    InvalidBaseUrl(String),
}

/// The `Authorization` header value. Always carries the `ApiKey ` scheme.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Accept a key with or without the `ApiKey ` prefix.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim().trim_matches('"').trim();
        let (bare, had_scheme) = match trimmed.strip_prefix(API_KEY_SCHEME) {
            Some(rest) if rest.is_empty() || rest.starts_with(' ') => (rest.trim(), true),
            _ => (trimmed, false),
        };
        if bare.is_empty() {
            return Err(ConfigError::BlankApiKey);
        }
        if !had_scheme {
            info!("API key had no scheme, prefixing with {API_KEY_SCHEME:?}");
        }
        Ok(Self(format!("{API_KEY_SCHEME} {bare}")))
    }

    pub fn header_value(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Everything the fetcher and HTTP backend need for one run.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: String,
    tribunal: String,
    api_key: ApiKey,
    /// Per-request timeout. `None` leaves requests unbounded.
    pub timeout: Option<Duration>,
    /// Fixed pause after every successful page.
    pub page_delay: Duration,
    /// Stop after this many pages. `None` pages until exhausted.
    pub max_pages: Option<u32>,
}

impl ClientConfig {
    /// Validate the credential, tribunal alias and base URL.
    ///
    /// `api_key` is `None` when no source provided one; that is a fatal
    /// configuration error, not something the fetcher retries.
    pub fn new(
        api_key: Option<&str>,
        tribunal: &str,
        base_url: &str,
    ) -> Result<Self, ConfigError> {
        let api_key = ApiKey::parse(api_key.ok_or(ConfigError::MissingApiKey)?)?;

        let tribunal = tribunal.trim().to_string();
        if tribunal.is_empty()
            || !tribunal
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(ConfigError::InvalidTribunal(tribunal));
        }

        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(base_url));
        }

        Ok(Self {
            base_url,
            tribunal,
            api_key,
            timeout: None,
            page_delay: DEFAULT_PAGE_DELAY,
            max_pages: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages.filter(|&n| n > 0);
        self
    }

    pub fn tribunal(&self) -> &str {
        &self.tribunal
    }

    pub fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    /// `POST` target for this tribunal's index.
    pub fn search_url(&self) -> String {
        format!("{}/api_publica_{}/_search", self.base_url, self.tribunal)
    }
}
