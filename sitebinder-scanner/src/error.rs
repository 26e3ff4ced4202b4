use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Per-URL fetch failure. Never fatal to a crawl.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP {0}")]
    Status(u16),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A 3xx with a `Location`. Hops are followed by the crawler, not the client.
    #[error("HTTP {status} redirect to {location}")]
    Redirect { status: u16, location: String },

    #[error("redirect leaves the crawl scope: {0}")]
    OutOfScope(String),

    #[error("unusable redirect: {0}")]
    InvalidRedirect(String),

    #[error("more than {0} redirects")]
    TooManyRedirects(usize),

    #[error("abandoned after stop signal")]
    Abandoned,
}

pub type Result<T> = std::result::Result<T, ScanError>;
