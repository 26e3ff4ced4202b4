use crate::error::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use sitebinder_scanner::{
    CancellationToken, CrawlConfig, CrawlResult, CrawlTarget, Crawler, PageRecord, PageState,
    ProgressCallback,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

/// Options for configuring a crawl operation
pub struct CrawlOptions {
    pub seed: String,
    pub path_scope: Option<String>,
    pub workers: usize,
    pub timeout: Duration,
    pub show_progress_bars: bool,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        let config = CrawlConfig::default();
        Self {
            seed: String::new(),
            path_scope: None,
            workers: config.workers,
            timeout: config.timeout,
            show_progress_bars: false,
        }
    }
}

/// Callback for reporting individual page records as they settle
pub type CrawlRecordCallback = Arc<dyn Fn(&PageRecord) + Send + Sync>;

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Build the target from the options. Fails only on an unusable seed.
pub fn build_target(options: &CrawlOptions) -> Result<CrawlTarget> {
    Ok(CrawlTarget::new(
        &options.seed,
        options.path_scope.as_deref(),
    )?)
}

/// Execute a crawl with the given options
///
/// A stop through `cancel` is not an error: the partial result comes back
/// with `cancelled` set.
pub async fn execute_crawl(
    options: &CrawlOptions,
    cancel: &CancellationToken,
    record_callback: Option<CrawlRecordCallback>,
) -> Result<(CrawlTarget, CrawlResult)> {
    let target = build_target(options)?;

    let config = CrawlConfig::default()
        .with_workers(options.workers)
        .with_timeout(options.timeout);

    // Set up single progress bar for overall crawl progress (only if enabled)
    let progress_bar = if options.show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Starting crawl...");
        Some(pb)
    } else {
        None
    };

    let processed_count = Arc::new(AtomicUsize::new(0));
    let pb_clone = progress_bar.clone();
    let count_clone = processed_count.clone();
    let internal_callback: ProgressCallback = Arc::new(move |record: &PageRecord| {
        let count = count_clone.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(ref pb) = pb_clone {
            pb.set_message(format!(
                "Crawling... {} URLs processed, last {}",
                count,
                extract_url_path(record.url.as_str())
            ));
        }
        if let Some(ref cb) = record_callback {
            cb(record);
        }
    });

    let crawler = Crawler::with_config(config)?.with_progress_callback(internal_callback);
    let result = crawler.crawl(&target, cancel).await;

    if let Some(ref pb) = progress_bar {
        let total = processed_count.load(Ordering::Relaxed);
        if result.cancelled {
            pb.finish_with_message(format!("Crawl stopped early, {} URLs processed", total));
        } else {
            pb.finish_with_message(format!("Crawl complete! {} URLs processed", total));
        }
    }

    Ok((target, result))
}

/// Generate a crawl report from results
pub fn generate_crawl_report(target: &CrawlTarget, result: &CrawlResult) -> String {
    let mut report = String::new();
    report.push_str(&"━".repeat(52));
    report.push_str("\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Target domain: {}\n", target.domain()));
    report.push_str(&format!(
        "  Scope: {}\n",
        target.path_scope().unwrap_or("entire domain")
    ));
    report.push_str(&format!("  {} pages succeeded\n", result.pages.len()));
    report.push_str(&format!(
        "  Skipped (not HTML): {}\n",
        result.count(PageState::Skipped)
    ));
    report.push_str(&format!("  Failed: {}\n", result.count(PageState::Failed)));
    if result.cancelled {
        report.push_str(&format!("  {}\n", "Stopped early, result is partial".yellow()));
    }
    report.push('\n');
    report.push_str(&"━".repeat(52));
    report.push_str("\n\n");

    if result.records.is_empty() {
        return report;
    }

    report.push_str(&format!("## {}\n", target.domain()));
    for record in &result.records {
        let status = match record.status_code {
            Some(code @ 200..=299) => format!("{}", code).green().to_string(),
            Some(code @ 300..=399) => format!("{}", code).cyan().to_string(),
            Some(code @ 400..=499) => format!("{}", code).yellow().to_string(),
            Some(code) => format!("{}", code).red().to_string(),
            None => "---".red().to_string(),
        };

        let mut line = format!("  {} {}", status, extract_url_path(record.url.as_str()));
        if let Some(ref moved) = record.redirected_to {
            line.push_str(&format!(" → {}", extract_url_path(moved.as_str())));
        }

        match record.state {
            PageState::Skipped => {
                if let Some(ref content_type) = record.content_type {
                    line.push_str(&format!(" {}", content_type.bright_black()));
                }
            }
            PageState::Failed => {
                if let Some(ref error) = record.error {
                    line.push_str(&format!(" {}", error.red()));
                }
            }
            PageState::Visited | PageState::Fetching => {}
        }

        report.push_str(&line);
        report.push('\n');
    }

    report
}
