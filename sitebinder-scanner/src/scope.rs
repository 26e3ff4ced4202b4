use crate::error::{Result, ScanError};
use crate::normalize::NormalizedUrl;
use serde::Serialize;
use tracing::debug;

pub const DEFAULT_ALLOWED_SCHEMES: [&str; 2] = ["http", "https"];

/// Immutable description of what a crawl may touch.
///
/// The domain is taken from the seed (host plus any non-default port) and is
/// matched exactly, so `docs.example.com` is out of scope for an
/// `example.com` seed.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlTarget {
    seed: NormalizedUrl,
    domain: String,
    path_scope: Option<String>,
    allowed_schemes: Vec<String>,
}

impl CrawlTarget {
    pub fn new(seed: &str, path_scope: Option<&str>) -> Result<Self> {
        let seed = NormalizedUrl::parse(seed, None)?;
        if !DEFAULT_ALLOWED_SCHEMES.contains(&seed.scheme()) {
            return Err(ScanError::InvalidUrl(format!(
                "{}: unsupported scheme '{}'",
                seed,
                seed.scheme()
            )));
        }

        let path_scope = path_scope
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        Ok(Self {
            domain: seed.host(),
            seed,
            path_scope,
            allowed_schemes: DEFAULT_ALLOWED_SCHEMES.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn seed(&self) -> &NormalizedUrl {
        &self.seed
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn path_scope(&self) -> Option<&str> {
        self.path_scope.as_deref()
    }

    pub fn allowed_schemes(&self) -> &[String] {
        &self.allowed_schemes
    }

    /// Pure scope predicate.
    ///
    /// The path check is a plain string prefix test: a scope of `/doc` also
    /// admits `/documents`.
    pub fn in_scope(&self, url: &NormalizedUrl) -> bool {
        if !self.allowed_schemes.iter().any(|s| s == url.scheme()) {
            debug!("  -> {} rejected: scheme {}", url, url.scheme());
            return false;
        }

        if url.host() != self.domain {
            debug!("  -> {} rejected: host outside {}", url, self.domain);
            return false;
        }

        if let Some(prefix) = &self.path_scope
            && !url.path().starts_with(prefix.as_str())
        {
            debug!("  -> {} rejected: path outside {}", url, prefix);
            return false;
        }

        true
    }
}

pub fn in_scope(url: &NormalizedUrl, target: &CrawlTarget) -> bool {
    target.in_scope(url)
}
