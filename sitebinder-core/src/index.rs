// URL index output: one normalized URL per line, sorted.

use sitebinder_scanner::{CrawlResult, CrawlTarget};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;

/// `urls_{domain}_{slug}.txt`, derived only from the target.
pub fn index_file_name(target: &CrawlTarget) -> String {
    let domain = target.domain().replace(['.', ':'], "_");
    format!("urls_{}_{}.txt", domain, scope_slug(target.path_scope()))
}

/// Path scope with outer slashes trimmed and inner ones as `_`, or `full_site`.
pub fn scope_slug(path_scope: Option<&str>) -> String {
    match path_scope.map(|p| p.trim_matches('/')) {
        Some(trimmed) if !trimmed.is_empty() => trimmed.replace('/', "_"),
        _ => "full_site".to_string(),
    }
}

/// Every URL the crawl managed to fetch, deduplicated and sorted.
pub fn index_lines(result: &CrawlResult) -> Vec<String> {
    result
        .fetched_urls()
        .map(|u| u.to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn format_index(result: &CrawlResult) -> String {
    let mut out = String::new();
    for line in index_lines(result) {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Write the index file and return how many URLs it holds.
pub fn write_index(path: &Path, result: &CrawlResult) -> io::Result<usize> {
    let lines = index_lines(result);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, format_index(result))?;
    Ok(lines.len())
}
