use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use serde_json::json;
use sitebinder_core::crawl::{CrawlOptions, execute_crawl, generate_crawl_report};
use sitebinder_core::index::{index_file_name, write_index};
use sitebinder_core::merge::LopdfMerger;
use sitebinder_core::pipeline::{BindSummary, pdf_output_path, render_and_merge};
use sitebinder_core::render::{ChromeRenderer, RenderOptions};
use sitebinder_core::MergeError;
use sitebinder_scanner::{CancellationToken, CrawlResult, CrawlTarget};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

/// Prefix `https://` when the seed has no scheme, then check it parses with a host.
pub fn parse_seed_url(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        bail!("the seed URL is empty");
    }

    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    let parsed = Url::parse(&candidate).with_context(|| format!("invalid seed URL '{}'", raw))?;
    if parsed.host_str().is_none() {
        bail!("seed URL '{}' has no host", raw);
    }
    Ok(candidate)
}

/// Expand a leading `~` to the home directory.
pub fn expand_output_path(raw: &str) -> String {
    shellexpand::tilde(raw).into_owned()
}

/// Where the index file goes. Without `-o` it is the derived name in the
/// working directory; an existing directory gets the derived name inside it.
pub fn index_output_path(target: &CrawlTarget, output: Option<&str>) -> PathBuf {
    let file_name = index_file_name(target);
    match output {
        None => PathBuf::from(file_name),
        Some(raw) => {
            let path = PathBuf::from(expand_output_path(raw));
            if path.is_dir() {
                path.join(file_name)
            } else {
                path
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

pub fn format_report(
    target: &CrawlTarget,
    result: &CrawlResult,
    index_path: Option<&Path>,
    format: ReportFormat,
) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(generate_crawl_report(target, result)),
        ReportFormat::Json => {
            let report = json!({
                "target": target,
                "index": index_path,
                "pages": result.pages,
                "records": result.records,
                "cancelled": result.cancelled,
            });
            Ok(serde_json::to_string_pretty(&report)?)
        }
    }
}

/// Crawl settings shared by both subcommands.
#[derive(Debug, Clone)]
pub struct CrawlArgs {
    pub seed: String,
    pub path_scope: Option<String>,
    pub workers: usize,
    pub timeout: Duration,
    pub output: Option<String>,
}

impl CrawlArgs {
    pub fn from_matches(args: &ArgMatches) -> Result<Self> {
        let raw_url = args
            .get_one::<String>("url")
            .context("a seed URL is required")?;

        Ok(Self {
            seed: parse_seed_url(raw_url)?,
            path_scope: args.get_one::<String>("path-scope").cloned(),
            workers: args.get_one::<usize>("threads").copied().unwrap_or(1),
            timeout: Duration::from_secs(args.get_one::<u64>("timeout").copied().unwrap_or(10)),
            output: args.get_one::<String>("output").cloned(),
        })
    }

    pub fn crawl_options(&self, show_progress_bars: bool) -> CrawlOptions {
        CrawlOptions {
            seed: self.seed.clone(),
            path_scope: self.path_scope.clone(),
            workers: self.workers,
            timeout: self.timeout,
            show_progress_bars,
        }
    }
}

/// Cancel `token` on the first Ctrl-C. Abort the handle once the phase is over.
pub fn spawn_interrupt_listener(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                eprintln!("\n{} Stopping, keeping what has been collected so far...", "⚠".yellow());
                token.cancel();
            }
            Err(e) => debug!("Cannot listen for Ctrl-C: {}", e),
        }
    })
}

fn print_crawl_header(args: &CrawlArgs, target: &CrawlTarget) {
    println!("\n{} Crawling {}", "→".blue(), target.domain().bright_white());
    println!(
        "  Scope: {}",
        args.path_scope.as_deref().unwrap_or("entire domain")
    );
    println!("  Workers: {}", args.workers.max(1));
    println!("  Timeout: {}s\n", args.timeout.as_secs());
}

/// Crawl and write the URL index. Returns the target, result and index path.
pub async fn run_index(
    args: &CrawlArgs,
    cancel: &CancellationToken,
    show_progress_bars: bool,
) -> Result<(CrawlTarget, CrawlResult, PathBuf)> {
    let options = args.crawl_options(show_progress_bars);
    let (target, result) = execute_crawl(&options, cancel, None)
        .await
        .context("crawl failed")?;

    let index_path = index_output_path(&target, args.output.as_deref());
    write_index(&index_path, &result)
        .with_context(|| format!("failed to write index {}", index_path.display()))?;

    Ok((target, result, index_path))
}

pub async fn handle_index(sub_matches: &ArgMatches, quiet: bool) -> Result<()> {
    let args = CrawlArgs::from_matches(sub_matches)?;
    let format = sub_matches
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);

    if !quiet && format == ReportFormat::Text {
        let target = sitebinder_core::crawl::build_target(&args.crawl_options(false))?;
        print_crawl_header(&args, &target);
    }

    let cancel = CancellationToken::new();
    let listener = spawn_interrupt_listener(cancel.clone());
    let outcome = run_index(&args, &cancel, !quiet && format == ReportFormat::Text).await;
    listener.abort();
    let (target, result, index_path) = outcome?;

    match format {
        ReportFormat::Json => {
            println!("{}", format_report(&target, &result, Some(&index_path), format)?);
        }
        ReportFormat::Text => {
            if !quiet {
                print!("{}", format_report(&target, &result, Some(&index_path), format)?);
            }
            println!(
                "{} Wrote {} URL(s) to {}",
                "✓".green().bold(),
                result.fetched_urls().count(),
                index_path.display().to_string().bright_white()
            );
        }
    }

    Ok(())
}

pub async fn handle_pdf(sub_matches: &ArgMatches, quiet: bool) -> Result<()> {
    let args = CrawlArgs::from_matches(sub_matches)?;
    let tabs = sub_matches.get_one::<usize>("tabs").copied().unwrap_or(1);
    let output = pdf_output_path(&expand_output_path(
        args.output.as_deref().unwrap_or_default(),
    ));

    let options = args.crawl_options(!quiet);
    if !quiet {
        let target = sitebinder_core::crawl::build_target(&options)?;
        print_crawl_header(&args, &target);
    }

    // Crawl phase
    let crawl_cancel = CancellationToken::new();
    let listener = spawn_interrupt_listener(crawl_cancel.clone());
    let crawled = execute_crawl(&options, &crawl_cancel, None).await;
    listener.abort();
    let (target, result) = crawled.context("crawl failed")?;

    if !quiet {
        print!("{}", generate_crawl_report(&target, &result));
    }
    if result.pages.is_empty() {
        return Err(MergeError::NoInputs).context("the crawl found no HTML pages to print");
    }
    if result.cancelled {
        warn!("Crawl stopped early, printing the {} page(s) found so far", result.pages.len());
    }

    // Render phase, with its own stop signal
    let renderer = ChromeRenderer::launch()
        .await
        .context("failed to launch headless Chromium")?;
    let render_cancel = CancellationToken::new();
    let listener = spawn_interrupt_listener(render_cancel.clone());
    let render_options = RenderOptions {
        tabs,
        show_progress_bars: !quiet,
        ..RenderOptions::default()
    };
    let bound = render_and_merge(
        &result.pages,
        &renderer,
        &LopdfMerger::new(),
        &output,
        &render_options,
        &render_cancel,
    )
    .await;
    renderer.shutdown().await;
    listener.abort();

    let summary: BindSummary =
        bound.with_context(|| format!("failed to build {}", output.display()))?;

    if summary.rendered < summary.requested {
        println!(
            "{} {} of {} page(s) could not be printed",
            "⚠".yellow(),
            summary.requested - summary.rendered,
            summary.requested
        );
    }
    println!(
        "{} Bound {} page(s) into {}",
        "✓".green().bold(),
        summary.rendered,
        summary.output.display().to_string().bright_white()
    );

    Ok(())
}
