// Shared fixtures for the render, merge and pipeline tests

#![allow(dead_code)]

use async_trait::async_trait;
use lopdf::{Document, Object, Stream, dictionary};
use sitebinder_core::RenderError;
use sitebinder_core::render::Renderer;
use sitebinder_scanner::{CancellationToken, NormalizedUrl};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

pub fn url(raw: &str) -> NormalizedUrl {
    NormalizedUrl::parse(raw, None).unwrap()
}

/// A minimal document with `pages` blank pages, each `width` points wide.
pub fn blank_pdf(pages: usize, width: i64) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for _ in 0..pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), 842.into()],
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// Like [`blank_pdf`], but the pages inherit `MediaBox` from the page tree.
pub fn blank_pdf_inherited(pages: usize, width: i64) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for _ in 0..pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), 842.into()],
            "Resources" => dictionary! {},
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

pub fn write_blank_pdf(path: &Path, pages: usize, width: i64) {
    blank_pdf(pages, width).save(path).unwrap();
}

/// Page widths of a document, in page order.
pub fn page_widths(doc: &Document) -> Vec<i64> {
    doc.get_pages()
        .values()
        .map(|id| {
            let media_box = doc.get_dictionary(*id).unwrap().get(b"MediaBox").unwrap();
            media_box.as_array().unwrap()[2].as_i64().unwrap()
        })
        .collect()
}

/// Renderer stand-in that writes a one-page PDF per URL.
///
/// The page width is `100 * (n + 1)` where `n` is the call number, so the
/// merged output shows which render each page came from.
#[derive(Default)]
pub struct StubRenderer {
    pub failing: HashSet<String>,
    pub slow: HashSet<String>,
    pub calls: Mutex<Vec<String>>,
    pub cancel_after_first: Option<CancellationToken>,
}

impl StubRenderer {
    pub fn failing_on(paths: &[&str]) -> Self {
        Self {
            failing: paths.iter().map(|p| p.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Renderer for StubRenderer {
    async fn render(&self, url: &NormalizedUrl, dest: &Path) -> Result<(), RenderError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(url.path().to_string());
            calls.len()
        };

        if let Some(ref token) = self.cancel_after_first {
            token.cancel();
        }
        if self.slow.contains(url.path()) {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        if self.failing.contains(url.path()) {
            return Err(RenderError::Browser(format!("cannot print {}", url)));
        }

        write_blank_pdf(dest, 1, 100 * call as i64);
        Ok(())
    }
}
