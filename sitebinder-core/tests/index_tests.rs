// Tests for URL index naming and persistence

use sitebinder_core::index::{format_index, index_file_name, scope_slug, write_index};
use sitebinder_scanner::{CrawlResult, CrawlTarget, NormalizedUrl, PageRecord, PageState};
use std::fs;
use tempfile::TempDir;

fn record(url: &str, state: PageState) -> PageRecord {
    PageRecord {
        state,
        ..PageRecord::new(NormalizedUrl::parse(url, None).unwrap())
    }
}

fn sample_result() -> CrawlResult {
    CrawlResult::from_records(
        vec![
            record("https://docs.example.com/guide/z", PageState::Visited),
            record("https://docs.example.com/guide/", PageState::Visited),
            record("https://docs.example.com/guide/manual.pdf", PageState::Skipped),
            record("https://docs.example.com/guide/broken", PageState::Failed),
            record("https://docs.example.com/guide/a", PageState::Visited),
        ],
        false,
    )
}

#[test]
fn test_file_name_full_site() {
    let target = CrawlTarget::new("https://docs.example.com", None).unwrap();
    assert_eq!(index_file_name(&target), "urls_docs_example_com_full_site.txt");
}

#[test]
fn test_file_name_with_scope() {
    let target = CrawlTarget::new("https://docs.example.com/api/v2/", Some("/api/v2/")).unwrap();
    assert_eq!(index_file_name(&target), "urls_docs_example_com_api_v2.txt");
}

#[test]
fn test_file_name_with_port() {
    let target = CrawlTarget::new("http://localhost:8080/", None).unwrap();
    assert_eq!(index_file_name(&target), "urls_localhost_8080_full_site.txt");
}

#[test]
fn test_scope_slug() {
    assert_eq!(scope_slug(None), "full_site");
    assert_eq!(scope_slug(Some("/")), "full_site");
    assert_eq!(scope_slug(Some("/docs/")), "docs");
    assert_eq!(scope_slug(Some("docs/reference")), "docs_reference");
}

#[test]
fn test_index_is_sorted_and_excludes_failures() {
    let content = format_index(&sample_result());
    let lines: Vec<&str> = content.lines().collect();

    assert_eq!(
        lines,
        vec![
            "https://docs.example.com/guide/",
            "https://docs.example.com/guide/a",
            "https://docs.example.com/guide/manual.pdf",
            "https://docs.example.com/guide/z",
        ]
    );
    assert!(content.ends_with('\n'));
}

#[test]
fn test_write_index_creates_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("nested").join("urls.txt");

    let written = write_index(&path, &sample_result())?;

    assert_eq!(written, 4);
    let content = fs::read_to_string(&path)?;
    assert_eq!(content.lines().count(), 4);
    assert!(content.starts_with("https://docs.example.com/guide/\n"));
    Ok(())
}

#[test]
fn test_write_index_for_empty_crawl() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("empty.txt");

    let written = write_index(&path, &CrawlResult::default())?;

    assert_eq!(written, 0);
    assert_eq!(fs::read_to_string(&path)?, "");
    Ok(())
}
