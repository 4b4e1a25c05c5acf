use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: Url,
}

impl Request {
    pub fn get(url: Url) -> Self {
        Self {
            method: "GET".to_string(),
            url,
        }
    }

    pub fn new(method: impl Into<String>, url: Url) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            url,
        }
    }

    /// Cache identity of the request.
    pub fn key(&self) -> &str {
        self.url.as_str()
    }

    /// Only GET requests are looked up in or written to a cache.
    pub fn is_cacheable(&self) -> bool {
        self.method == "GET"
    }
}

/// Classification of a response, mirroring the fetch standard's response types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin response with full access.
    Basic,
    /// Cross-origin response fetched with CORS.
    Cors,
    /// Cross-origin response without readable contents.
    Opaque,
    /// Same-origin request that was redirected to another origin.
    OpaqueRedirect,
    /// Network error.
    Error,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Opaque => "opaque",
            ResponseType::OpaqueRedirect => "opaqueredirect",
            ResponseType::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub url: Url,
    pub status: u16,
    pub kind: ResponseType,
    pub redirected: bool,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(url: Url, status: u16, kind: ResponseType, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url,
            status,
            kind,
            redirected: false,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[cfg(test)]
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Only plain 200 same-origin responses are stored on a cache miss.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.kind == ResponseType::Basic
    }
}
