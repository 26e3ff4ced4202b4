use crate::error::RenderError;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use sitebinder_scanner::{CancellationToken, NormalizedUrl};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Render collaborator: one URL in, one PDF file out.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &NormalizedUrl, dest: &Path) -> Result<(), RenderError>;
}

/// Options for the render batch
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Concurrent pages (browser tabs).
    pub tabs: usize,
    pub page_timeout: Duration,
    pub show_progress_bars: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            tabs: 1,
            page_timeout: Duration::from_secs(60),
            show_progress_bars: false,
        }
    }
}

/// A page that rendered successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub url: NormalizedUrl,
    pub path: PathBuf,
}

/// `{index:03}_{slug}.pdf`, where the slug is the URL path with slashes
/// trimmed and inner slashes as `_`, or `index` for the site root.
pub fn page_file_name(index: usize, url: &NormalizedUrl) -> String {
    let path = url.path().trim_matches('/').replace('/', "_");
    let slug = if path.is_empty() { "index".to_string() } else { path };
    format!("{:03}_{}.pdf", index, slug)
}

/// Render every URL into `out_dir`, at most `options.tabs` at a time.
///
/// Failures are logged and dropped. The returned pages keep the input order.
/// After `cancel` fires no new render starts.
pub async fn render_all(
    urls: &[NormalizedUrl],
    renderer: &dyn Renderer,
    out_dir: &Path,
    options: &RenderOptions,
    cancel: &CancellationToken,
) -> Vec<RenderedPage> {
    info!("Rendering {} pages with {} tab(s)", urls.len(), options.tabs.max(1));

    let progress_bar = if options.show_progress_bars {
        let pb = ProgressBar::new(urls.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let rendered: Vec<Option<RenderedPage>> = futures::stream::iter(urls.iter().enumerate())
        .map(|(index, url)| {
            let pb = progress_bar.clone();
            async move {
                if cancel.is_cancelled() {
                    debug!("Not rendering {}: stop requested", url);
                    return None;
                }

                let dest = out_dir.join(page_file_name(index, url));
                if let Some(ref pb) = pb {
                    pb.set_message(url.path().to_string());
                }

                let outcome = match tokio::time::timeout(
                    options.page_timeout,
                    renderer.render(url, &dest),
                )
                .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => Err(RenderError::Timeout(options.page_timeout)),
                };

                if let Some(ref pb) = pb {
                    pb.inc(1);
                }

                match outcome {
                    Ok(()) => Some(RenderedPage {
                        url: url.clone(),
                        path: dest,
                    }),
                    Err(e) => {
                        warn!("Failed to print {}: {}", url, e);
                        None
                    }
                }
            }
        })
        .buffered(options.tabs.max(1))
        .collect()
        .await;

    if let Some(pb) = progress_bar {
        pb.finish_and_clear();
    }

    let pages: Vec<RenderedPage> = rendered.into_iter().flatten().collect();
    info!("Rendered {}/{} pages", pages.len(), urls.len());
    pages
}

/// Poll `sample` until it reports the same value for `quiet`, or `limit`
/// runs out. Returns whether it settled.
pub async fn wait_until_settled<F, Fut, T>(mut sample: F, quiet: Duration, limit: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = T>,
    T: PartialEq,
{
    let deadline = Instant::now() + limit;
    let interval = (quiet / 4).max(Duration::from_millis(10));
    let mut last = sample().await;
    let mut unchanged_since = Instant::now();

    loop {
        if unchanged_since.elapsed() >= quiet {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(interval).await;

        let current = sample().await;
        if current != last {
            last = current;
            unchanged_since = Instant::now();
        }
    }
}

// Resources the page has requested so far. Stops growing once the network is idle.
const RESOURCE_COUNT_JS: &str = "performance.getEntriesByType('resource').length";

/// Headless Chromium via the DevTools protocol. A4, backgrounds on.
///
/// After the load event each page is given time for late requests: it is
/// printed once no new resource has been requested for `network_quiet`, or
/// after `settle_limit` regardless.
pub struct ChromeRenderer {
    browser: Browser,
    handler: JoinHandle<()>,
    network_quiet: Duration,
    settle_limit: Duration,
}

// A4 in inches, and 20px margins at 96 dpi.
const A4_WIDTH_IN: f64 = 8.27;
const A4_HEIGHT_IN: f64 = 11.69;
const MARGIN_IN: f64 = 20.0 / 96.0;

impl ChromeRenderer {
    pub async fn launch() -> Result<Self, RenderError> {
        let config = BrowserConfig::builder()
            .build()
            .map_err(RenderError::Browser)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Browser(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {}", e);
                }
            }
        });

        Ok(Self {
            browser,
            handler,
            network_quiet: Duration::from_millis(500),
            settle_limit: Duration::from_secs(10),
        })
    }

    async fn wait_for_network_idle(&self, page: &Page, url: &NormalizedUrl) {
        let settled = wait_until_settled(
            || async move {
                page.evaluate(RESOURCE_COUNT_JS)
                    .await
                    .ok()
                    .and_then(|result| result.into_value::<u64>().ok())
            },
            self.network_quiet,
            self.settle_limit,
        )
        .await;

        if !settled {
            debug!("{} still loading after {:?}, printing anyway", url, self.settle_limit);
        }
    }

    fn pdf_params() -> PrintToPdfParams {
        PrintToPdfParams {
            print_background: Some(true),
            paper_width: Some(A4_WIDTH_IN),
            paper_height: Some(A4_HEIGHT_IN),
            margin_top: Some(MARGIN_IN),
            margin_bottom: Some(MARGIN_IN),
            ..Default::default()
        }
    }

    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("Browser close failed: {}", e);
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
    }
}

#[async_trait]
impl Renderer for ChromeRenderer {
    async fn render(&self, url: &NormalizedUrl, dest: &Path) -> Result<(), RenderError> {
        debug!("Rendering {} -> {}", url, dest.display());

        let page = self
            .browser
            .new_page(url.as_str())
            .await
            .map_err(|e| RenderError::Browser(e.to_string()))?;

        let pdf = match page.wait_for_navigation().await {
            Ok(_) => {
                self.wait_for_network_idle(&page, url).await;
                page.pdf(Self::pdf_params()).await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = page.close().await {
            debug!("Closing tab for {} failed: {}", url, e);
        }

        let bytes = pdf.map_err(|e| RenderError::Browser(e.to_string()))?;
        tokio::fs::write(dest, bytes).await?;
        Ok(())
    }
}
