//! Export entry points.
//!
//! [`export`] runs the whole pipeline and writes the PDF. [`export_html_only`]
//! stops after assembly and writes the HTML instead, and [`list_pages`] stops
//! after collection. [`build_document`] runs collection, rendering and
//! assembly against an existing docs tree without touching git or the PDF
//! engine.

use crate::config::ExportConfig;
use crate::error::{ExportError, RenderWarning, Stage};
use crate::output::{AssembledDocument, ExportOutput, ExportStats, TocEntry};
use crate::pipeline::assets::AssetResolver;
use crate::pipeline::links::LinkTable;
use crate::pipeline::{assemble, collect, fetch, markdown, pdf};
use crate::progress::{ExportProgressCallback, NoopProgressCallback};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// An assembled document with everything learned while building it.
#[derive(Debug, Clone)]
pub struct BuiltDocument {
    pub document: AssembledDocument,
    pub warnings: Vec<RenderWarning>,
    pub stats: ExportStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Pdf,
    HtmlOnly,
}

/// Export the configured documentation to a PDF.
///
/// # Errors
/// Returns `Err(ExportError)` for any fatal stage failure;
/// [`ExportError::stage`] names the stage. Per-page degradations are
/// reported in [`ExportOutput::warnings`] instead.
///
/// # Example
/// ```rust,no_run
/// use docs2pdf::{export, ExportConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ExportConfig::builder().source_ref("v15.1.0").build()?;
/// let output = export(&config).await?;
/// println!("{:?} ({} pages)", output.pdf_path, output.stats.pages);
/// # Ok(())
/// # }
/// ```
pub async fn export(config: &ExportConfig) -> Result<ExportOutput, ExportError> {
    run(config, Target::Pdf).await
}

/// Run every stage except PDF rendering and write the assembled HTML.
///
/// The HTML goes to `export_html` when set, else next to the PDF the full
/// export would have produced, with an `.html` extension.
pub async fn export_html_only(config: &ExportConfig) -> Result<ExportOutput, ExportError> {
    run(config, Target::HtmlOnly).await
}

/// Synchronous wrapper around [`export`].
///
/// Creates a current-thread tokio runtime internally.
pub fn export_sync(config: &ExportConfig) -> Result<ExportOutput, ExportError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| ExportError::Internal {
            stage: Stage::Fetch,
            detail: format!("Failed to create tokio runtime: {e}"),
        })?
        .block_on(export(config))
}

/// Fetch and collect, returning the table of contents without rendering.
pub async fn list_pages(config: &ExportConfig) -> Result<Vec<TocEntry>, ExportError> {
    let cb = callback(config);

    cb.on_stage_start(Stage::Fetch);
    let docs_root = fetch::fetch_source(config).await?;
    cb.on_stage_complete(Stage::Fetch);

    cb.on_stage_start(Stage::Collect);
    let collected = collect::collect_pages(&docs_root, &config.nav_manifest)?;
    for w in &collected.warnings {
        cb.on_warning(w);
    }
    cb.on_pages_collected(collected.pages.len());
    cb.on_stage_complete(Stage::Collect);

    Ok(assemble::toc_entries(&collected.pages))
}

/// Collect, render and assemble the pages under `docs_root`.
pub async fn build_document(
    config: &ExportConfig,
    docs_root: &Path,
) -> Result<BuiltDocument, ExportError> {
    let cb = callback(config);
    let render_start = Instant::now();

    // ── Collect ──────────────────────────────────────────────────────────
    cb.on_stage_start(Stage::Collect);
    let collected = collect::collect_pages(docs_root, &config.nav_manifest)?;
    let mut warnings = collected.warnings;
    for w in &warnings {
        cb.on_warning(w);
    }
    let mut pages = collected.pages;
    let total = pages.len();
    cb.on_pages_collected(total);
    cb.on_stage_complete(Stage::Collect);

    // ── Render ───────────────────────────────────────────────────────────
    cb.on_stage_start(Stage::Render);
    let links = LinkTable::new(&pages, config.site_url.clone());
    let mut assets = AssetResolver::new(config, docs_root)?;
    for page in pages.iter_mut() {
        let rendered =
            markdown::render_page(page, &links, &mut assets, config.missing_assets).await?;
        for w in &rendered.warnings {
            cb.on_warning(w);
        }
        warnings.extend(rendered.warnings);
        page.set_fragment(rendered.html);
        cb.on_page_rendered(page.ordinal, total, &page.title);
    }
    let counts = assets.counts();
    info!(
        "Rendered {} pages ({} images: {} local, {} remote, {} missing)",
        total, counts.resolved, counts.local, counts.remote, counts.missing
    );
    cb.on_stage_complete(Stage::Render);

    // ── Assemble ─────────────────────────────────────────────────────────
    cb.on_stage_start(Stage::Assemble);
    let document = assemble::assemble(&pages, config, &links)?;
    cb.on_stage_complete(Stage::Assemble);

    let stats = ExportStats {
        pages: total,
        assets_resolved: counts.resolved,
        assets_local: counts.local,
        assets_remote: counts.remote,
        assets_missing: counts.missing,
        warnings: warnings.len(),
        render_duration_ms: render_start.elapsed().as_millis() as u64,
        ..ExportStats::default()
    };

    Ok(BuiltDocument {
        document,
        warnings,
        stats,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn callback(config: &ExportConfig) -> &dyn ExportProgressCallback {
    config
        .progress_callback
        .as_deref()
        .unwrap_or(&NoopProgressCallback)
}

async fn run(config: &ExportConfig, target: Target) -> Result<ExportOutput, ExportError> {
    let total_start = Instant::now();
    let cb = callback(config);

    // An explicit output path can be checked before any work is done.
    if target == Target::Pdf {
        if let Some(ref path) = config.output_path {
            pdf::check_output_writable(path)?;
        }
    }

    // ── Step 1: Fetch ────────────────────────────────────────────────────
    let fetch_start = Instant::now();
    cb.on_stage_start(Stage::Fetch);
    let docs_root = fetch::fetch_source(config).await?;
    cb.on_stage_complete(Stage::Fetch);
    let fetch_duration_ms = fetch_start.elapsed().as_millis() as u64;

    // ── Steps 2–4: Collect, render, assemble ─────────────────────────────
    let BuiltDocument {
        document,
        warnings,
        mut stats,
    } = build_document(config, &docs_root).await?;
    stats.fetch_duration_ms = fetch_duration_ms;

    if !warnings.is_empty() {
        warn!(
            "{} warning(s) on {} page(s)",
            warnings.len(),
            pages_with_warnings(&warnings)
        );
    }

    let html_path = match target {
        Target::HtmlOnly => Some(config.export_html.clone().unwrap_or_else(|| {
            config
                .resolve_output_path(document.version.as_deref())
                .with_extension("html")
        })),
        Target::Pdf => config.export_html.clone(),
    };
    if let Some(ref path) = html_path {
        write_html(path, &document.html).await?;
        info!("HTML written to {}", path.display());
    }

    // ── Step 5: PDF ──────────────────────────────────────────────────────
    let pdf_path = match target {
        Target::HtmlOnly => None,
        Target::Pdf => {
            let pdf_start = Instant::now();
            cb.on_stage_start(Stage::Pdf);
            let output = config.resolve_output_path(document.version.as_deref());
            pdf::render_pdf(&document.html, &output, config).await?;
            cb.on_stage_complete(Stage::Pdf);
            stats.pdf_duration_ms = pdf_start.elapsed().as_millis() as u64;
            Some(output)
        }
    };

    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Export complete: {} pages, {}ms total",
        stats.pages, stats.total_duration_ms
    );

    Ok(ExportOutput {
        pdf_path,
        html_path,
        title: document.title,
        version: document.version,
        toc: document.toc,
        warnings,
        stats,
    })
}

/// Number of distinct pages that raised at least one warning.
fn pages_with_warnings(warnings: &[RenderWarning]) -> usize {
    warnings
        .iter()
        .map(RenderWarning::page)
        .collect::<HashSet<_>>()
        .len()
}

/// Atomic write: temp file, then rename.
async fn write_html(path: &Path, html: &str) -> Result<(), ExportError> {
    let failed = |e: std::io::Error| ExportError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(failed)?;
    }
    let tmp_path: PathBuf = path.with_extension("html.tmp");
    tokio::fs::write(&tmp_path, html).await.map_err(failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ExportProgressCallback for Recorder {
        fn on_stage_start(&self, stage: Stage) {
            self.events.lock().unwrap().push(format!("start:{stage}"));
        }
        fn on_pages_collected(&self, total: usize) {
            self.events.lock().unwrap().push(format!("pages:{total}"));
        }
        fn on_page_rendered(&self, ordinal: usize, total: usize, title: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("page:{ordinal}/{total}:{title}"));
        }
    }

    #[tokio::test]
    async fn html_only_run_writes_html_and_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        let checkout = dir.path().join("checkout");
        std::fs::create_dir_all(checkout.join("docs")).unwrap();
        std::fs::write(checkout.join("docs/index.md"), "# Intro\n\nHello.\n").unwrap();
        std::fs::write(checkout.join("docs/setup.md"), "# Setup\n\nInstall.\n").unwrap();

        let recorder = Arc::new(Recorder::default());
        let html_path = dir.path().join("out/docs.html");
        let config = ExportConfig::builder()
            .checkout_dir(&checkout)
            .offline(true)
            .asset_base_url(None)
            .cover_date("2024-01-01")
            .export_html(&html_path)
            .progress_callback(recorder.clone())
            .build()
            .unwrap();

        let out = export_html_only(&config).await.unwrap();
        assert!(out.pdf_path.is_none());
        assert_eq!(out.html_path.as_deref(), Some(html_path.as_path()));
        let html = std::fs::read_to_string(&html_path).unwrap();
        assert!(html.contains("1 - Intro"));
        assert_eq!(out.stats.pages, 2);

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "start:fetch",
                "start:collect",
                "pages:2",
                "start:render",
                "page:1/2:Intro",
                "page:2/2:Setup",
                "start:assemble",
            ]
        );
    }

    #[tokio::test]
    async fn list_pages_returns_toc() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("docs/guide")).unwrap();
        std::fs::write(dir.path().join("docs/index.md"), "# Home\n").unwrap();
        std::fs::write(dir.path().join("docs/guide/index.md"), "# Guide\n").unwrap();
        std::fs::write(dir.path().join("docs/guide/step.md"), "# Step\n").unwrap();

        let config = ExportConfig::builder()
            .checkout_dir(dir.path())
            .offline(true)
            .build()
            .unwrap();
        let toc = list_pages(&config).await.unwrap();
        let labels: Vec<_> = toc.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["1 - Home", "2 - Guide", "2.1 - Step"]);
    }

    #[tokio::test]
    async fn explicit_locked_output_fails_before_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig::builder()
            .checkout_dir(dir.path().join("absent"))
            .offline(true)
            .output_path(dir.path())
            .build()
            .unwrap();
        let err = export(&config).await.unwrap_err();
        assert_eq!(err.stage(), Stage::Pdf);
    }

    #[test]
    fn warnings_are_counted_per_page() {
        let warnings = vec![
            RenderWarning::UnsupportedCallout {
                page: 2,
                kind: "sidebar".into(),
            },
            RenderWarning::UnsupportedComponent {
                page: 2,
                name: "Tabs".into(),
            },
            RenderWarning::UnsupportedCallout {
                page: 5,
                kind: "aside".into(),
            },
        ];
        assert_eq!(pages_with_warnings(&warnings), 2);
        assert_eq!(pages_with_warnings(&[]), 0);
    }
}
