use crate::error::{FetchError, Result, ScanError};
use crate::normalize::NormalizedUrl;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_USER_AGENT: &str = concat!("sitebinder/", env!("CARGO_PKG_VERSION"));

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status_code: u16,
    pub content_type: Option<String>,
    /// Empty unless the content type is HTML.
    pub body: String,
}

impl FetchedPage {
    pub fn is_html(&self) -> bool {
        self.content_type.as_deref().is_some_and(is_html_content_type)
    }
}

pub fn is_html_content_type(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.contains("text/html") || content_type.contains("application/xhtml+xml")
}

/// Fetch collaborator. One attempt per call; non-2xx is an error.
///
/// Redirects are not followed: a 3xx carrying a `Location` comes back as
/// [`FetchError::Redirect`] so the caller can check every hop against its scope.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &NormalizedUrl,
        timeout: Duration,
    ) -> std::result::Result<FetchedPage, FetchError>;
}

/// Plain HTTP GET over a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    pub fn with_user_agent(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(8)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ScanError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &NormalizedUrl,
        timeout: Duration,
    ) -> std::result::Result<FetchedPage, FetchError> {
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(url.as_str())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, timeout))?;

        let status = response.status();
        if status.is_redirection()
            && let Some(location) = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
        {
            return Err(FetchError::Redirect {
                status: status.as_u16(),
                location: location.to_string(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let mut page = FetchedPage {
            status_code: status.as_u16(),
            content_type,
            body: String::new(),
        };

        // Non-HTML bodies are never parsed, so don't download them.
        if page.is_html() {
            page.body = response
                .text()
                .await
                .map_err(|e| map_reqwest_error(e, timeout))?;
        }

        Ok(page)
    }
}

fn map_reqwest_error(error: reqwest::Error, timeout: Duration) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(timeout)
    } else {
        FetchError::Http(error)
    }
}
