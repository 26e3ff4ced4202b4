pub mod crawler;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod frontier;
pub mod normalize;
pub mod result;
pub mod scope;

pub use crawler::{CrawlConfig, Crawler, ProgressCallback};
pub use error::{FetchError, ScanError};
pub use extract::extract_links;
pub use fetch::{FetchedPage, Fetcher, HttpFetcher};
pub use frontier::{Frontier, VisitedSet};
pub use normalize::{NormalizedUrl, normalize};
pub use result::{CrawlResult, PageRecord, PageState};
pub use scope::{CrawlTarget, in_scope};
pub use tokio_util::sync::CancellationToken;
