//! Results returned by the export entry points.

use crate::error::RenderWarning;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One table-of-contents entry, in page order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub ordinal: usize,
    pub depth: usize,
    /// `"{section number} - {title}"`
    pub label: String,
    /// Target id, e.g. `page-3`.
    pub anchor: String,
    /// Source path relative to the docs root.
    pub source: String,
}

/// The single HTML document handed to the PDF engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledDocument {
    pub title: String,
    /// Highest `vX.Y.Z` mentioned in the pages, if any.
    pub version: Option<String>,
    pub toc: Vec<TocEntry>,
    pub html: String,
}

/// Aggregate numbers for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportStats {
    pub pages: usize,
    /// Distinct image references resolved.
    pub assets_resolved: usize,
    /// Of those, found in the checkout.
    pub assets_local: usize,
    /// Of those, downloaded.
    pub assets_remote: usize,
    /// References replaced by a placeholder.
    pub assets_missing: usize,
    pub warnings: usize,
    pub fetch_duration_ms: u64,
    pub render_duration_ms: u64,
    pub pdf_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a completed export produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOutput {
    /// Where the PDF was written; `None` for HTML-only runs.
    pub pdf_path: Option<PathBuf>,
    /// Where the assembled HTML was written, if requested.
    pub html_path: Option<PathBuf>,
    pub title: String,
    pub version: Option<String>,
    pub toc: Vec<TocEntry>,
    pub warnings: Vec<RenderWarning>,
    pub stats: ExportStats,
}
