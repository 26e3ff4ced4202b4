use sitebinder_scanner::ScanError;
use std::time::Duration;
use thiserror::Error;

/// A single page failed to render. The batch carries on without it.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("browser error: {0}")]
    Browser(String),

    #[error("render timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Merging is fatal: there is no sensible partial output.
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("no rendered pages to merge")]
    NoInputs,

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("malformed PDF {0}: {1}")]
    Malformed(String, String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
