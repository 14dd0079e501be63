//! Route parameters shared with the navigation layer.
//!
//! The page state lives in two query parameters: `language` (plain string)
//! and `labels` (comma-separated, percent-encoded). Parameters are kept raw
//! and in order so that unrelated parameters survive a navigation push.

use thiserror::Error;

pub const LANGUAGE_PARAM: &str = "language";
pub const LABELS_PARAM: &str = "labels";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("truncated percent-escape at byte {0}")]
    TruncatedEscape(usize),
    #[error("invalid percent-escape at byte {0}")]
    InvalidEscape(usize),
    #[error("decoded value is not valid UTF-8")]
    InvalidUtf8,
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUri { url: String, reason: String },
}

// ---------------------------------------------------------------------------
// Percent-encoding
// ---------------------------------------------------------------------------

/// Decode `%XX` escapes. Malformed escapes and non-UTF-8 output are errors.
pub fn percent_decode(s: &str) -> Result<String, UrlError> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3).ok_or(UrlError::TruncatedEscape(i))?;
            if !hex.iter().all(u8::is_ascii_hexdigit) {
                return Err(UrlError::InvalidEscape(i));
            }
            let hex = std::str::from_utf8(hex).map_err(|_| UrlError::InvalidEscape(i))?;
            let byte = u8::from_str_radix(hex, 16).map_err(|_| UrlError::InvalidEscape(i))?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| UrlError::InvalidUtf8)
}

/// Encode everything outside the URI-component unreserved set.
pub fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if b.is_ascii_alphanumeric() || b"-_.!~*'()".contains(&b) {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Route parameters
// ---------------------------------------------------------------------------

/// Raw query parameters of the finder page, in their original order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    params: Vec<(String, String)>,
}

impl RouteParams {
    /// Parse a raw query string (with or without the leading `?`).
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let params = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((k, v)) => (k.to_owned(), v.to_owned()),
                None => (pair.to_owned(), String::new()),
            })
            .collect();
        Self { params }
    }

    /// Parse the query part of an absolute URL or an origin-form path.
    ///
    /// A bare query string (`?language=java` or `language=java`) is accepted
    /// as well, since that is what users tend to paste.
    pub fn from_url(url: &str) -> Result<Self, UrlError> {
        if url.starts_with('?') || !url.contains(['/', '?']) {
            return Ok(Self::from_query(url));
        }
        let uri: http::Uri = url.parse().map_err(|e: http::uri::InvalidUri| UrlError::InvalidUri {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(uri.query().map(Self::from_query).unwrap_or_default())
    }

    /// Canonical parameters for the given filter state.
    pub fn from_filters(language: &str, labels: &[String]) -> Self {
        Self::default().with_filters(language, labels)
    }

    /// Replace `language` and `labels`, keeping every other parameter.
    ///
    /// Labels are joined with commas, so a label must not contain one.
    pub fn with_filters(mut self, language: &str, labels: &[String]) -> Self {
        self.set_raw(LANGUAGE_PARAM, percent_encode(language));
        if labels.is_empty() {
            self.params.retain(|(k, _)| k != LABELS_PARAM);
        } else {
            self.set_raw(LABELS_PARAM, percent_encode(&labels.join(",")));
        }
        self
    }

    pub fn get_raw(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set a parameter to an already-encoded value.
    pub fn set_raw(&mut self, name: &str, value: String) {
        if let Some(slot) = self.params.iter_mut().find(|(k, _)| k == name) {
            slot.1 = value;
        } else {
            self.params.push((name.to_owned(), value));
        }
    }

    /// The decoded `language` parameter. An undecodable value is returned raw.
    pub fn language(&self) -> Option<String> {
        self.get_raw(LANGUAGE_PARAM).map(|raw| {
            let raw = raw.replace('+', " ");
            percent_decode(&raw).unwrap_or(raw)
        })
    }

    /// The `labels` parameter, still percent-encoded.
    pub fn labels_raw(&self) -> Option<&str> {
        self.get_raw(LABELS_PARAM)
    }

    pub fn to_query(&self) -> String {
        self.params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Render `path?query`, or just `path` when there are no parameters.
    pub fn to_href(&self, path: &str) -> String {
        if self.params.is_empty() {
            path.to_owned()
        } else {
            format!("{path}?{}", self.to_query())
        }
    }
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

/// Receives the canonical href after every local filter change, so that a
/// reload or a shared link reproduces the same filters.
pub trait Navigator {
    fn push(&mut self, href: String);

    fn current(&self) -> Option<&str>;
}

/// In-memory navigation history.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

impl Navigator for History {
    fn push(&mut self, href: String) {
        tracing::debug!("navigate: {href}");
        self.entries.push(href);
    }

    fn current(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }
}
