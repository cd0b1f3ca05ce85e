//! WebSocket endpoint construction.

use url::Url;

use crate::error::HubError;

/// Where the hub connects.
///
/// The scheme follows the hosting page: an `https` page connects over `wss`,
/// anything else over `ws`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    secure: bool,
    host: String,
    path: String,
}

impl Endpoint {
    pub const DEFAULT_PATH: &'static str = "/ws";
    /// Query parameter carrying the session token during the handshake
    pub const TOKEN_PARAM: &'static str = "token";

    pub fn new(secure: bool, host: impl Into<String>, path: impl AsRef<str>) -> Self {
        Self {
            secure,
            host: host.into(),
            path: normalize_path(path.as_ref()),
        }
    }

    /// Derive the endpoint from the URL of the hosting page.
    pub fn for_page(page: &Url) -> Result<Self, HubError> {
        let host = page
            .host_str()
            .ok_or_else(|| HubError::InvalidEndpoint(format!("page URL '{page}' has no host")))?;
        let host = match page.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        Ok(Self::new(page.scheme() == "https", host, Self::DEFAULT_PATH))
    }

    /// Override the host (defaults to the page host)
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_path(mut self, path: impl AsRef<str>) -> Self {
        self.path = normalize_path(path.as_ref());
        self
    }

    pub fn scheme(&self) -> &'static str {
        if self.secure {
            "wss"
        } else {
            "ws"
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn url(&self) -> Result<Url, HubError> {
        Ok(Url::parse(&self.to_string())?)
    }

    /// The connection URL with the session token attached.
    pub fn url_with_token(&self, token: &str) -> Result<Url, HubError> {
        let mut url = self.url()?;
        url.query_pairs_mut().append_pair(Self::TOKEN_PARAM, token);
        Ok(url)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new(false, "localhost:3000", Self::DEFAULT_PATH)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}{}", self.scheme(), self.host, self.path)
    }
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
