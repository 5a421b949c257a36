//! CLI binary for docs2pdf.
//!
//! A thin shim over the library crate: flags and `DOCS2PDF_*` environment
//! variables are layered over an optional config file, then over the
//! library defaults, and the export summary is printed at the end.

use anyhow::{Context, Result};
use clap::Parser;
use docs2pdf::{
    export, export_html_only, list_pages, ExportConfig, ExportError, ExportOutput,
    ExportProgressCallback, FileConfig, ProgressCallback, RenderWarning, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a spinner per stage, switching to a page bar while
/// pages render.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Starting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn activate_bar(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>4}/{len} pages  \
             ⏱ {elapsed_precise}  {wide_msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_style(style);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ExportProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        let msg = match stage {
            Stage::Fetch => "Fetching documentation…",
            Stage::Collect => "Collecting pages…",
            Stage::Render => "Rendering pages…",
            Stage::Assemble => "Assembling document…",
            Stage::Pdf => "Running PDF engine…",
        };
        if stage != Stage::Render {
            self.bar.set_style(
                ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_strings(TICKS),
            );
        }
        self.bar.set_prefix(stage.to_string());
        self.bar.set_message(msg);
    }

    fn on_stage_complete(&self, stage: Stage) {
        self.bar
            .println(format!("{} {}", green("✓"), dim(&format!("{stage} done"))));
    }

    fn on_pages_collected(&self, total_pages: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("{total_pages} pages to render"))
        ));
        self.activate_bar(total_pages);
    }

    fn on_page_rendered(&self, _ordinal: usize, _total: usize, title: &str) {
        self.bar.set_message(title.to_string());
        self.bar.inc(1);
    }

    fn on_warning(&self, warning: &RenderWarning) {
        self.bar
            .println(format!("  {} {}", yellow("⚠"), dim(&warning.to_string())));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Export the latest Next.js docs (clones into ./nextjs-docs)
  docs2pdf

  # A tagged release, to a chosen file
  docs2pdf --ref v15.1.0 -o nextjs-15.1.pdf

  # Re-render from the existing checkout without network access
  docs2pdf --offline --asset-base-url ""

  # Inspect the HTML instead of producing a PDF
  docs2pdf --html-only --export-html nextjs.html

  # Print the table of contents
  docs2pdf --list-pages --offline

  # Fail on any image that cannot be resolved
  docs2pdf --strict-assets

CONFIG FILE (--config docs2pdf.toml):
  source_ref = "v15.1.0"
  output_path = "nextjs.pdf"
  strict_assets = true
  pdf_engine_args = ["--no-outline"]

  Flags and DOCS2PDF_* environment variables override the file.

REQUIREMENTS:
  git          on PATH (skipped with --offline)
  wkhtmltopdf  on PATH, or another engine via --pdf-engine
"#;

/// Export a git-hosted documentation tree to a single PDF.
#[derive(Parser, Debug)]
#[command(
    name = "docs2pdf",
    version,
    about = "Export a git-hosted documentation tree to a single PDF",
    long_about = "Fetch the Next.js documentation (or another markdown docs tree) from git, \
render every page to HTML with cover page and table of contents, and convert the result \
to PDF with wkhtmltopdf.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Output PDF path. Default: derived from the detected version.
    #[arg(short, long, env = "DOCS2PDF_OUTPUT")]
    output: Option<PathBuf>,

    /// TOML or JSON configuration file.
    #[arg(long, env = "DOCS2PDF_CONFIG")]
    config: Option<PathBuf>,

    /// Branch or tag to export.
    #[arg(long = "ref", env = "DOCS2PDF_REF")]
    source_ref: Option<String>,

    /// Repository holding the documentation.
    #[arg(long, env = "DOCS2PDF_REPO_URL")]
    repo_url: Option<String>,

    /// Documentation directory inside the repository.
    #[arg(long, env = "DOCS2PDF_DOCS_DIR")]
    docs_dir: Option<String>,

    /// Local checkout directory.
    #[arg(long, env = "DOCS2PDF_CHECKOUT_DIR")]
    checkout_dir: Option<PathBuf>,

    /// Reuse the existing checkout; do not run git.
    #[arg(long, env = "DOCS2PDF_OFFLINE")]
    offline: bool,

    /// Navigation manifest file name at the docs root.
    #[arg(long, env = "DOCS2PDF_NAV_MANIFEST")]
    nav_manifest: Option<String>,

    /// Product name on the cover page.
    #[arg(long, env = "DOCS2PDF_PROJECT_NAME")]
    project_name: Option<String>,

    /// Live site for unknown internal links ("" keeps them as written).
    #[arg(long, env = "DOCS2PDF_SITE_URL")]
    site_url: Option<String>,

    /// Prefix for remote image downloads ("" disables downloads).
    #[arg(long, env = "DOCS2PDF_ASSET_BASE_URL")]
    asset_base_url: Option<String>,

    /// Suffix appended to remote image URLs.
    #[arg(long, env = "DOCS2PDF_ASSET_URL_SUFFIX")]
    asset_url_suffix: Option<String>,

    /// Image cache directory.
    #[arg(long, env = "DOCS2PDF_ASSET_CACHE_DIR")]
    asset_cache_dir: Option<PathBuf>,

    /// Abort when an image cannot be resolved instead of showing a placeholder.
    #[arg(long, env = "DOCS2PDF_STRICT_ASSETS")]
    strict_assets: bool,

    /// Reference cached images by file:// URL instead of embedding them.
    #[arg(long, env = "DOCS2PDF_LINK_ASSETS")]
    link_assets: bool,

    /// Stylesheet replacing the bundled one.
    #[arg(long, env = "DOCS2PDF_STYLESHEET")]
    stylesheet: Option<PathBuf>,

    /// Date printed on the cover (default: today).
    #[arg(long, env = "DOCS2PDF_COVER_DATE")]
    cover_date: Option<String>,

    /// Also write the assembled HTML to this path.
    #[arg(long, env = "DOCS2PDF_EXPORT_HTML")]
    export_html: Option<PathBuf>,

    /// Stop after assembly and write the HTML only.
    #[arg(long)]
    html_only: bool,

    /// Print the table of contents and exit.
    #[arg(long)]
    list_pages: bool,

    /// HTML-to-PDF engine executable.
    #[arg(long, env = "DOCS2PDF_PDF_ENGINE")]
    pdf_engine: Option<String>,

    /// Extra engine argument (repeatable).
    #[arg(long = "engine-arg", allow_hyphen_values = true)]
    engine_args: Vec<String>,

    /// Paper size.
    #[arg(long, env = "DOCS2PDF_PAGE_SIZE")]
    page_size: Option<String>,

    /// Image DPI passed to the engine.
    #[arg(long, env = "DOCS2PDF_IMAGE_DPI",
          value_parser = clap::value_parser!(u32).range(1..=1200))]
    image_dpi: Option<u32>,

    /// JPEG quality passed to the engine (0–100).
    #[arg(long, env = "DOCS2PDF_IMAGE_QUALITY",
          value_parser = clap::value_parser!(u32).range(0..=100))]
    image_quality: Option<u32>,

    /// Per-command git timeout in seconds.
    #[arg(long, env = "DOCS2PDF_GIT_TIMEOUT")]
    git_timeout: Option<u64>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "DOCS2PDF_DOWNLOAD_TIMEOUT")]
    download_timeout: Option<u64>,

    /// PDF engine timeout in seconds.
    #[arg(long, env = "DOCS2PDF_PDF_TIMEOUT")]
    pdf_timeout: Option<u64>,

    /// Retries per image download (0–10).
    #[arg(long, env = "DOCS2PDF_MAX_RETRIES",
          value_parser = clap::value_parser!(u32).range(0..=10))]
    max_retries: Option<u32>,

    /// Print the export summary (or page list) as JSON on stdout.
    #[arg(long, env = "DOCS2PDF_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "DOCS2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCS2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCS2PDF_QUIET")]
    quiet: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; verbose mode shows everything.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress = show_progress.then(CliProgressCallback::new);
    let config = build_config(
        &cli,
        progress
            .clone()
            .map(|cb| cb as Arc<dyn ExportProgressCallback>),
    )?;

    // ── List-only mode ───────────────────────────────────────────────────
    if cli.list_pages {
        let toc = list_pages(&config).await;
        if let Some(ref cb) = progress {
            cb.finish();
        }
        let toc = toc.map_err(stage_error)?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&toc).context("Failed to serialise page list")?
            );
        } else {
            for entry in &toc {
                println!(
                    "{}{}  {}",
                    "  ".repeat(entry.depth),
                    entry.label,
                    dim(&entry.source)
                );
            }
        }
        return Ok(());
    }

    // ── Run export ───────────────────────────────────────────────────────
    let result = if cli.html_only {
        export_html_only(&config).await
    } else {
        export(&config).await
    };
    if let Some(ref cb) = progress {
        cb.finish();
    }
    let output = result.map_err(stage_error)?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&output, show_progress);
    }

    Ok(())
}

/// Wrap a library error so the message names the stage that failed.
fn stage_error(err: ExportError) -> anyhow::Error {
    let stage = err.stage();
    anyhow::Error::new(err).context(format!("Export failed during the {stage} stage"))
}

fn print_summary(output: &ExportOutput, warnings_already_shown: bool) {
    if !warnings_already_shown {
        for w in &output.warnings {
            eprintln!("  {} {}", yellow("⚠"), w);
        }
    }
    let target = output
        .pdf_path
        .as_ref()
        .or(output.html_path.as_ref())
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    eprintln!(
        "{}  {}  {} pages  {}ms  →  {}",
        if output.warnings.is_empty() {
            green("✔")
        } else {
            yellow("⚠")
        },
        bold(&output.title),
        output.stats.pages,
        output.stats.total_duration_ms,
        bold(&target),
    );
    eprintln!(
        "   {} images ({} local, {} remote, {} missing)  —  {} warnings",
        dim(&output.stats.assets_resolved.to_string()),
        output.stats.assets_local,
        output.stats.assets_remote,
        output.stats.assets_missing,
        output.warnings.len(),
    );
}

/// Layer flags over the config file over the defaults.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExportConfig> {
    let mut builder = ExportConfig::builder();

    if let Some(ref path) = cli.config {
        let file = FileConfig::load(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?;
        builder = builder.apply_file(file);
    }

    if let Some(ref v) = cli.repo_url {
        builder = builder.repo_url(v);
    }
    if let Some(ref v) = cli.source_ref {
        builder = builder.source_ref(v);
    }
    if let Some(ref v) = cli.docs_dir {
        builder = builder.docs_dir(v);
    }
    if let Some(ref v) = cli.checkout_dir {
        builder = builder.checkout_dir(v);
    }
    if cli.offline {
        builder = builder.offline(true);
    }
    if let Some(ref v) = cli.nav_manifest {
        builder = builder.nav_manifest(v);
    }
    if let Some(ref v) = cli.project_name {
        builder = builder.project_name(v);
    }
    if let Some(ref v) = cli.site_url {
        builder = builder.site_url(non_empty(v));
    }
    if let Some(ref v) = cli.asset_base_url {
        builder = builder.asset_base_url(non_empty(v));
    }
    if let Some(ref v) = cli.asset_url_suffix {
        builder = builder.asset_url_suffix(v);
    }
    if let Some(ref v) = cli.asset_cache_dir {
        builder = builder.asset_cache_dir(v);
    }
    if cli.strict_assets {
        builder = builder.strict_assets(true);
    }
    if cli.link_assets {
        builder = builder.asset_embedding(docs2pdf::AssetEmbedding::Link);
    }
    if let Some(ref v) = cli.stylesheet {
        builder = builder.stylesheet(v);
    }
    if let Some(ref v) = cli.cover_date {
        builder = builder.cover_date(v);
    }
    if let Some(ref v) = cli.output {
        builder = builder.output_path(v);
    }
    if let Some(ref v) = cli.export_html {
        builder = builder.export_html(v);
    }
    if let Some(ref v) = cli.pdf_engine {
        builder = builder.pdf_engine(v);
    }
    if !cli.engine_args.is_empty() {
        builder = builder.pdf_engine_args(cli.engine_args.clone());
    }
    if let Some(ref v) = cli.page_size {
        builder = builder.page_size(v);
    }
    if let Some(v) = cli.image_dpi {
        builder = builder.image_dpi(v);
    }
    if let Some(v) = cli.image_quality {
        builder = builder.image_quality(v);
    }
    if let Some(v) = cli.git_timeout {
        builder = builder.git_timeout_secs(v);
    }
    if let Some(v) = cli.download_timeout {
        builder = builder.download_timeout_secs(v);
    }
    if let Some(v) = cli.pdf_timeout {
        builder = builder.pdf_timeout_secs(v);
    }
    if let Some(v) = cli.max_retries {
        builder = builder.max_retries(v);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}
