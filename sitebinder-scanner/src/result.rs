use crate::normalize::NormalizedUrl;
use serde::Serialize;
use std::time::Duration;

/// Terminal state of a dequeued URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageState {
    /// Dequeued, fetch in progress. Never left in a finished result.
    Fetching,
    /// 2xx with HTML; links were followed.
    Visited,
    /// 2xx but not HTML, or a redirect onto a page already taken.
    Skipped,
    /// Transport error, timeout, non-2xx, or abandoned on stop.
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageRecord {
    pub url: NormalizedUrl,
    pub state: PageState,
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub links_found: usize,
    pub response_time: Duration,
    pub error: Option<String>,
    /// Where in-scope redirects finally led, when the page moved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirected_to: Option<NormalizedUrl>,
}

impl PageRecord {
    pub fn new(url: NormalizedUrl) -> Self {
        Self {
            url,
            state: PageState::Fetching,
            status_code: None,
            content_type: None,
            links_found: 0,
            response_time: Duration::from_secs(0),
            error: None,
            redirected_to: None,
        }
    }

    /// True when the fetch itself succeeded (Visited or Skipped).
    pub fn is_fetched(&self) -> bool {
        matches!(self.state, PageState::Visited | PageState::Skipped)
    }
}

/// Outcome of one crawl.
///
/// `pages` holds the HTML pages that fetched successfully, in the order they
/// were dequeued. `records` holds every dequeued URL in the same order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlResult {
    pub pages: Vec<NormalizedUrl>,
    pub records: Vec<PageRecord>,
    pub cancelled: bool,
}

impl CrawlResult {
    pub fn from_records(records: Vec<PageRecord>, cancelled: bool) -> Self {
        let pages = records
            .iter()
            .filter(|r| r.state == PageState::Visited)
            .map(|r| r.url.clone())
            .collect();

        Self {
            pages,
            records,
            cancelled,
        }
    }

    pub fn count(&self, state: PageState) -> usize {
        self.records.iter().filter(|r| r.state == state).count()
    }

    /// Every URL whose fetch succeeded, HTML or not.
    pub fn fetched_urls(&self) -> impl Iterator<Item = &NormalizedUrl> {
        self.records.iter().filter(|r| r.is_fetched()).map(|r| &r.url)
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
