use crate::error::Result;
use crate::merge::Merger;
use crate::render::{RenderOptions, Renderer, render_all};
use serde::Serialize;
use sitebinder_scanner::{CancellationToken, NormalizedUrl};
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_PDF_OUTPUT: &str = "output.pdf";

#[derive(Debug, Clone, Serialize)]
pub struct BindSummary {
    pub requested: usize,
    pub rendered: usize,
    pub output: PathBuf,
}

/// Append `.pdf` unless the name already ends with it. Empty means the default.
pub fn pdf_output_path(raw: &str) -> PathBuf {
    let raw = raw.trim();
    if raw.is_empty() {
        return PathBuf::from(DEFAULT_PDF_OUTPUT);
    }
    if raw.to_ascii_lowercase().ends_with(".pdf") {
        PathBuf::from(raw)
    } else {
        PathBuf::from(format!("{}.pdf", raw))
    }
}

/// Render `pages` into a scratch directory, then merge them into `output`.
///
/// Pages that fail to render are left out. Merging nothing, or failing to
/// write `output`, is an error. The scratch directory is removed either way.
pub async fn render_and_merge(
    pages: &[NormalizedUrl],
    renderer: &dyn Renderer,
    merger: &dyn Merger,
    output: &Path,
    options: &RenderOptions,
    cancel: &CancellationToken,
) -> Result<BindSummary> {
    let work_dir = tempfile::Builder::new().prefix("sitebinder-").tempdir()?;

    let rendered = render_all(pages, renderer, work_dir.path(), options, cancel).await;
    let inputs: Vec<PathBuf> = rendered.iter().map(|page| page.path.clone()).collect();

    info!("Merging {} page(s) into {}", inputs.len(), output.display());
    merger.merge(&inputs, output)?;

    Ok(BindSummary {
        requested: pages.len(),
        rendered: inputs.len(),
        output: output.to_path_buf(),
    })
}
