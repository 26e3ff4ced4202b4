// Tests for the render-then-merge pipeline

mod common;

use common::{StubRenderer, page_widths, url};
use lopdf::Document;
use sitebinder_core::merge::{LopdfMerger, Merger};
use sitebinder_core::pipeline::{DEFAULT_PDF_OUTPUT, pdf_output_path, render_and_merge};
use sitebinder_core::render::RenderOptions;
use sitebinder_core::{CoreError, MergeError};
use sitebinder_scanner::CancellationToken;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

/// Records the inputs it was handed instead of merging.
#[derive(Default)]
struct RecordingMerger {
    inputs: Mutex<Vec<PathBuf>>,
}

impl Merger for RecordingMerger {
    fn merge(&self, inputs: &[PathBuf], _output: &Path) -> Result<(), MergeError> {
        if inputs.is_empty() {
            return Err(MergeError::NoInputs);
        }
        for input in inputs {
            assert!(input.exists(), "{} should exist while merging", input.display());
        }
        *self.inputs.lock().unwrap() = inputs.to_vec();
        Ok(())
    }
}

#[test]
fn test_pdf_output_path_appends_extension() {
    assert_eq!(pdf_output_path("site"), PathBuf::from("site.pdf"));
    assert_eq!(pdf_output_path("docs/site"), PathBuf::from("docs/site.pdf"));
}

#[test]
fn test_pdf_output_path_keeps_extension() {
    assert_eq!(pdf_output_path("site.pdf"), PathBuf::from("site.pdf"));
    assert_eq!(pdf_output_path("SITE.PDF"), PathBuf::from("SITE.PDF"));
}

#[test]
fn test_pdf_output_path_default() {
    assert_eq!(pdf_output_path(""), PathBuf::from(DEFAULT_PDF_OUTPUT));
    assert_eq!(pdf_output_path("   "), PathBuf::from("output.pdf"));
}

#[tokio::test]
async fn test_render_and_merge_passes_pages_in_order() {
    let dir = TempDir::new().unwrap();
    let renderer = StubRenderer::failing_on(&["/b"]);
    let merger = RecordingMerger::default();
    let pages = vec![
        url("https://example.com/"),
        url("https://example.com/b"),
        url("https://example.com/c"),
    ];

    let summary = render_and_merge(
        &pages,
        &renderer,
        &merger,
        &dir.path().join("out.pdf"),
        &RenderOptions::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.requested, 3);
    assert_eq!(summary.rendered, 2);

    let inputs = merger.inputs.lock().unwrap().clone();
    let names: Vec<_> = inputs
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["000_index.pdf", "002_c.pdf"]);

    // Scratch files are gone once the pipeline returns.
    assert!(inputs.iter().all(|p| !p.exists()));
}

#[tokio::test]
async fn test_render_and_merge_produces_single_document() {
    let dir = TempDir::new().unwrap();
    let renderer = StubRenderer::default();
    let output = dir.path().join("site.pdf");
    let pages = vec![
        url("https://example.com/"),
        url("https://example.com/guide"),
        url("https://example.com/faq"),
    ];

    let summary = render_and_merge(
        &pages,
        &renderer,
        &LopdfMerger::new(),
        &output,
        &RenderOptions::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.rendered, 3);
    assert_eq!(summary.output, output);
    let merged = Document::load(&output).unwrap();
    assert_eq!(page_widths(&merged), vec![100, 200, 300]);
}

#[tokio::test]
async fn test_render_and_merge_with_nothing_rendered_fails() {
    let dir = TempDir::new().unwrap();
    let renderer = StubRenderer::failing_on(&["/"]);
    let output = dir.path().join("site.pdf");

    let result = render_and_merge(
        &[url("https://example.com/")],
        &renderer,
        &LopdfMerger::new(),
        &output,
        &RenderOptions::default(),
        &CancellationToken::new(),
    )
    .await;

    assert!(matches!(result, Err(CoreError::Merge(MergeError::NoInputs))));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_render_and_merge_with_no_pages_fails() {
    let dir = TempDir::new().unwrap();

    let result = render_and_merge(
        &[],
        &StubRenderer::default(),
        &LopdfMerger::new(),
        &dir.path().join("site.pdf"),
        &RenderOptions::default(),
        &CancellationToken::new(),
    )
    .await;

    assert!(matches!(result, Err(CoreError::Merge(MergeError::NoInputs))));
}
