//! Canonical URL keys used for deduplication.
//!
//! A [`NormalizedUrl`] keeps only scheme, host (with a non-default port) and
//! path. Fragments, query strings and userinfo are dropped, so content
//! identity ignores query parameters: `/a?x=1` and `/a?x=2` are one page.

use crate::error::{Result, ScanError};
use serde::Serialize;
use std::fmt;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NormalizedUrl(Url);

impl NormalizedUrl {
    /// Resolve `raw` against `base` (if any) and canonicalize it.
    pub fn parse(raw: &str, base: Option<&NormalizedUrl>) -> Result<Self> {
        let raw = raw.trim();
        let parsed = match base {
            Some(base) => base.0.join(raw),
            None => Url::parse(raw),
        }
        .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", raw, e)))?;

        Self::from_url(parsed)
    }

    pub fn from_url(mut url: Url) -> Result<Self> {
        match url.host_str() {
            Some(host) if !host.is_empty() => {}
            _ => return Err(ScanError::InvalidUrl(format!("{}: missing host", url))),
        }

        url.set_fragment(None);
        url.set_query(None);
        // Only fails for cannot-be-a-base URLs, which have no host and are rejected above.
        let _ = url.set_username("");
        let _ = url.set_password(None);

        Ok(Self(url))
    }

    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    /// Host plus `:port` when the port differs from the scheme default.
    pub fn host(&self) -> String {
        authority(&self.0)
    }

    pub fn path(&self) -> &str {
        self.0.path()
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl AsRef<str> for NormalizedUrl {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Shorthand for [`NormalizedUrl::parse`].
pub fn normalize(raw: &str, base: Option<&NormalizedUrl>) -> Result<NormalizedUrl> {
    NormalizedUrl::parse(raw, base)
}

pub(crate) fn authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}
