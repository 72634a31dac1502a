//! Client configuration.

use crate::error::{ClientError, Result};

/// Host used when none is configured.
pub const DEFAULT_HOST: &str = "http://127.0.0.1:11434";

/// Base URL of the hosted web search and fetch API.
pub const DEFAULT_WEB_HOST: &str = "https://ollama.com";

/// Port assumed when the host has neither a scheme nor a port.
pub const DEFAULT_PORT: u16 = 11434;

/// Static configuration for an [`Ollama`](crate::Ollama) client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address. Normalized with [`format_host`] when the client is built.
    pub host: String,

    /// Extra headers sent with every request.
    pub headers: Vec<(String, String)>,

    /// Sent as `Authorization: Bearer <key>` when set.
    pub api_key: Option<String>,

    /// `User-Agent` header value.
    pub user_agent: String,

    /// Base URL for `web_search` and `web_fetch`. These endpoints are hosted
    /// centrally, not by the local server.
    pub web_host: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            headers: Vec::new(),
            api_key: None,
            user_agent: concat!("ollama-client-rs/", env!("CARGO_PKG_VERSION")).into(),
            web_host: DEFAULT_WEB_HOST.into(),
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `OLLAMA_HOST` and `OLLAMA_API_KEY`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(host) = lookup("OLLAMA_HOST").filter(|h| !h.is_empty()) {
            config.host = host;
        }
        config.api_key = lookup("OLLAMA_API_KEY").filter(|k| !k.is_empty());
        config
    }

    /// Override the server address.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Add a header sent with every request.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the bearer token.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Override the `User-Agent` header.
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Override the web search and fetch base URL.
    #[must_use]
    pub fn web_host(mut self, host: impl Into<String>) -> Self {
        self.web_host = host.into();
        self
    }

    /// Build the default header map for the HTTP client.
    pub(crate) fn header_map(&self) -> Result<reqwest::header::HeaderMap> {
        use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, USER_AGENT};

        let mut map = HeaderMap::new();
        map.insert(USER_AGENT, header_value(&self.user_agent)?);
        if let Some(key) = &self.api_key {
            let mut auth = header_value(&format!("Bearer {key}"))?;
            auth.set_sensitive(true);
            map.insert(AUTHORIZATION, auth);
        }
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ClientError::InvalidHeader(format!("{name}: {e}")))?;
            map.insert(name, header_value(value)?);
        }
        Ok(map)
    }
}

fn header_value(value: &str) -> Result<reqwest::header::HeaderValue> {
    reqwest::header::HeaderValue::from_str(value)
        .map_err(|e| ClientError::InvalidHeader(e.to_string()))
}

/// Normalize a host into `scheme://host:port[/path]`.
///
/// - empty → [`DEFAULT_HOST`]
/// - `:port` → loopback on that port
/// - no scheme → `http://`, and [`DEFAULT_PORT`] unless a port is given
/// - explicit scheme without a port → 80 or 443
/// - trailing `/` is dropped
pub fn format_host(host: &str) -> Result<String> {
    let host = host.trim();
    if host.is_empty() {
        return Ok(DEFAULT_HOST.into());
    }

    let (with_scheme, explicit_scheme) = if let Some(port) = host.strip_prefix(':') {
        (format!("http://127.0.0.1:{port}"), true)
    } else if host.contains("://") {
        (host.to_string(), true)
    } else {
        (format!("http://{host}"), false)
    };

    let url = url::Url::parse(&with_scheme)
        .map_err(|e| ClientError::InvalidHost(format!("{host}: {e}")))?;
    let hostname = url
        .host_str()
        .ok_or_else(|| ClientError::InvalidHost(format!("{host}: no host")))?;

    // The parser drops ports that equal the scheme default, so check the text.
    let port = match url.port() {
        Some(port) => port,
        None if explicit_scheme || authority_has_port(&with_scheme) => {
            url.port_or_known_default().unwrap_or(80)
        }
        None => DEFAULT_PORT,
    };

    let mut formatted = format!("{}://{}:{}{}", url.scheme(), hostname, port, url.path());
    while formatted.ends_with('/') {
        formatted.pop();
    }
    Ok(formatted)
}

fn authority_has_port(url: &str) -> bool {
    let after_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = after_scheme.split('/').next().unwrap_or_default();
    let host_port = authority.rsplit('@').next().unwrap_or_default();
    match host_port.rsplit_once(':') {
        Some((host, port)) => {
            !port.is_empty()
                && port.bytes().all(|b| b.is_ascii_digit())
                && (!host.starts_with('[') || host.ends_with(']'))
        }
        None => false,
    }
}
