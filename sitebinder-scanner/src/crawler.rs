use crate::error::{FetchError, Result};
use crate::extract::extract_links;
use crate::fetch::{DEFAULT_USER_AGENT, FetchedPage, Fetcher, HttpFetcher};
use crate::frontier::{Frontier, VisitedSet};
use crate::normalize::NormalizedUrl;
use crate::result::{CrawlResult, PageRecord, PageState};
use crate::scope::CrawlTarget;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Redirect hops followed per dequeued URL before giving up.
pub const MAX_REDIRECTS: usize = 5;

/// Called once per dequeued URL when its fetch settles.
pub type ProgressCallback = Arc<dyn Fn(&PageRecord) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Upper bound on fetches in flight. 1 gives a sequential, deterministic crawl.
    pub workers: usize,
    pub timeout: Duration,
    /// How long in-flight fetches may still finish after a stop.
    pub grace_period: Duration,
    pub user_agent: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            timeout: Duration::from_secs(10),
            grace_period: Duration::from_secs(2),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl CrawlConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Breadth-first, scope-bounded crawler.
///
/// Every call to [`Crawler::crawl`] owns its own frontier and visited set, so
/// one `Crawler` can run several crawls at once.
pub struct Crawler {
    fetcher: Arc<dyn Fetcher>,
    config: CrawlConfig,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler {
    pub fn new() -> Result<Self> {
        Self::with_config(CrawlConfig::default())
    }

    pub fn with_config(config: CrawlConfig) -> Result<Self> {
        let fetcher = HttpFetcher::with_user_agent(&config.user_agent)?;
        Ok(Self::with_fetcher(Arc::new(fetcher)).with_crawl_config(config))
    }

    pub fn with_fetcher(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            config: CrawlConfig::default(),
            progress_callback: None,
        }
    }

    pub fn with_crawl_config(mut self, config: CrawlConfig) -> Self {
        self.config = CrawlConfig {
            workers: config.workers.max(1),
            ..config
        };
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Crawl `target` until the frontier drains or `cancel` fires.
    ///
    /// Per-URL failures never abort the crawl. A cancelled crawl returns what
    /// it has so far with `cancelled` set.
    pub async fn crawl(&self, target: &CrawlTarget, cancel: &CancellationToken) -> CrawlResult {
        let workers = self.config.workers.max(1);
        info!("Starting crawl of {} with {} workers", target.seed(), workers);
        if let Some(scope) = target.path_scope() {
            info!("Scope restricted to {}{}", target.domain(), scope);
        }

        let mut state = CrawlState::new(target);
        let mut in_flight = FuturesUnordered::new();
        let mut cancelled = false;

        loop {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            while in_flight.len() < workers {
                let Some(hop) = state.next_fetchable() else {
                    break;
                };
                in_flight.push(fetch_one(self.fetcher.clone(), hop, self.config.timeout));
            }

            if in_flight.is_empty() {
                break;
            }

            tokio::select! {
                biased;
                Some(outcome) = in_flight.next() => {
                    match state.complete(outcome, true) {
                        Step::Settled(seq) => self.report(&state.records[seq]),
                        Step::Follow(hop) => {
                            in_flight.push(fetch_one(self.fetcher.clone(), hop, self.config.timeout));
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
            }
        }

        if cancelled {
            info!(
                "Stop requested, {} fetch(es) in flight, grace period {:?}",
                in_flight.len(),
                self.config.grace_period
            );
            let grace = tokio::time::sleep(self.config.grace_period);
            tokio::pin!(grace);

            while !in_flight.is_empty() {
                tokio::select! {
                    Some(outcome) = in_flight.next() => {
                        if let Step::Settled(seq) = state.complete(outcome, false) {
                            self.report(&state.records[seq]);
                        }
                    }
                    _ = &mut grace => break,
                }
            }
        }
        drop(in_flight);

        for seq in state.abandon_unfinished() {
            self.report(&state.records[seq]);
        }

        let result = CrawlResult::from_records(state.records, cancelled);
        info!(
            "Crawl {}. {} pages succeeded, {} skipped, {} failed",
            if cancelled { "stopped early" } else { "complete" },
            result.pages.len(),
            result.count(PageState::Skipped),
            result.count(PageState::Failed)
        );
        result
    }

    fn report(&self, record: &PageRecord) {
        if let Some(ref callback) = self.progress_callback {
            callback(record);
        }
    }
}

/// One request on behalf of the record at `seq`. `redirects` counts the hops
/// already taken to reach `url`.
struct Hop {
    seq: usize,
    url: NormalizedUrl,
    redirects: usize,
}

struct FetchOutcome {
    hop: Hop,
    result: std::result::Result<FetchedPage, FetchError>,
    elapsed: Duration,
}

/// What the owner task does after a fetch comes back.
enum Step {
    /// The record at this position is final.
    Settled(usize),
    /// An in-scope redirect to a URL nobody has taken yet.
    Follow(Hop),
}

async fn fetch_one(fetcher: Arc<dyn Fetcher>, hop: Hop, timeout: Duration) -> FetchOutcome {
    let start = Instant::now();
    let result = match tokio::time::timeout(timeout, fetcher.fetch(&hop.url, timeout)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(timeout)),
    };

    FetchOutcome {
        hop,
        result,
        elapsed: start.elapsed(),
    }
}

/// Frontier, visited set and per-URL records of one crawl. Only the task
/// driving [`Crawler::crawl`] touches it, so no locking is needed.
struct CrawlState<'a> {
    target: &'a CrawlTarget,
    frontier: Frontier,
    visited: VisitedSet,
    records: Vec<PageRecord>,
}

impl<'a> CrawlState<'a> {
    fn new(target: &'a CrawlTarget) -> Self {
        let mut frontier = Frontier::new();
        frontier.push(target.seed().clone());

        Self {
            target,
            frontier,
            visited: VisitedSet::new(),
            records: Vec::new(),
        }
    }

    /// Pop until a URL eligible for fetching turns up, and claim it.
    fn next_fetchable(&mut self) -> Option<Hop> {
        while let Some(url) = self.frontier.pop() {
            if self.visited.contains(&url) {
                debug!("Already visited {}", url);
                continue;
            }
            if !self.target.in_scope(&url) {
                debug!("Out of scope at dequeue: {}", url);
                continue;
            }

            self.visited.insert(url.clone());
            let seq = self.records.len();
            self.records.push(PageRecord::new(url.clone()));
            return Some(Hop {
                seq,
                url,
                redirects: 0,
            });
        }
        None
    }

    fn complete(&mut self, outcome: FetchOutcome, follow_links: bool) -> Step {
        let FetchOutcome {
            hop,
            result,
            elapsed,
        } = outcome;
        self.records[hop.seq].response_time += elapsed;

        match result {
            Ok(page) => self.settle_page(&hop, page, follow_links),
            Err(FetchError::Redirect { status, location }) => {
                self.records[hop.seq].status_code = Some(status);
                if !follow_links {
                    return self.fail(hop.seq, FetchError::Abandoned);
                }
                match self.redirect_target(&hop, &location) {
                    Ok(next) => self.claim_redirect(hop, next),
                    Err(e) => self.fail(hop.seq, e),
                }
            }
            Err(e) => self.fail(hop.seq, e),
        }
    }

    /// Resolve `location` against the URL that answered with it, and check
    /// the result is somewhere this crawl may go.
    fn redirect_target(
        &self,
        hop: &Hop,
        location: &str,
    ) -> std::result::Result<NormalizedUrl, FetchError> {
        if hop.redirects >= MAX_REDIRECTS {
            return Err(FetchError::TooManyRedirects(MAX_REDIRECTS));
        }

        let next = NormalizedUrl::parse(location, Some(&hop.url))
            .map_err(|_| FetchError::InvalidRedirect(location.to_string()))?;
        if next == hop.url {
            return Err(FetchError::InvalidRedirect(format!("{} redirects to itself", next)));
        }
        if !self.target.in_scope(&next) {
            return Err(FetchError::OutOfScope(next.to_string()));
        }
        Ok(next)
    }

    /// Take the redirect target for this record, unless another record has it.
    fn claim_redirect(&mut self, hop: Hop, next: NormalizedUrl) -> Step {
        let record = &mut self.records[hop.seq];
        record.redirected_to = Some(next.clone());

        if !self.visited.insert(next.clone()) {
            debug!("{} redirects to {}, which is already taken", record.url, next);
            record.state = PageState::Skipped;
            return Step::Settled(hop.seq);
        }

        debug!("Following redirect {} -> {}", hop.url, next);
        Step::Follow(Hop {
            seq: hop.seq,
            url: next,
            redirects: hop.redirects + 1,
        })
    }

    /// `hop.url` is where the page was actually served from, so relative
    /// links resolve against it.
    fn settle_page(&mut self, hop: &Hop, page: FetchedPage, follow_links: bool) -> Step {
        let is_html = page.is_html();
        let links_found = if is_html && follow_links {
            self.enqueue_links(&hop.url, &page.body)
        } else {
            0
        };

        let record = &mut self.records[hop.seq];
        record.status_code = Some(page.status_code);
        record.links_found = links_found;
        if is_html {
            record.state = PageState::Visited;
            debug!("Visited {} ({} links)", hop.url, links_found);
        } else {
            record.state = PageState::Skipped;
            debug!(
                "Skipping {}: content type {}",
                hop.url,
                page.content_type.as_deref().unwrap_or("unknown")
            );
        }
        record.content_type = page.content_type;

        Step::Settled(hop.seq)
    }

    fn fail(&mut self, seq: usize, error: FetchError) -> Step {
        let record = &mut self.records[seq];
        warn!("Error accessing {}: {}", record.url, error);
        if let FetchError::Status(code) = error {
            record.status_code = Some(code);
        }
        record.state = PageState::Failed;
        record.error = Some(error.to_string());
        Step::Settled(seq)
    }

    fn enqueue_links(&mut self, page_url: &NormalizedUrl, body: &str) -> usize {
        let hrefs = extract_links(body);
        let found = hrefs.len();

        for href in hrefs {
            let url = match NormalizedUrl::parse(&href, Some(page_url)) {
                Ok(url) => url,
                Err(e) => {
                    debug!("Dropping link on {}: {}", page_url, e);
                    continue;
                }
            };

            if !self.target.in_scope(&url)
                || self.visited.contains(&url)
                || self.frontier.contains(&url)
            {
                continue;
            }

            debug!("Found: {}", url);
            self.frontier.push(url);
        }

        found
    }

    /// Mark fetches that never settled as failed. Returns their positions.
    fn abandon_unfinished(&mut self) -> Vec<usize> {
        let mut abandoned = Vec::new();
        for (seq, record) in self.records.iter_mut().enumerate() {
            if record.state == PageState::Fetching {
                warn!("Abandoning fetch of {}", record.url);
                record.state = PageState::Failed;
                record.error = Some(FetchError::Abandoned.to_string());
                abandoned.push(seq);
            }
        }
        abandoned
    }
}
