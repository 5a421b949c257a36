//! # docs2pdf
//!
//! Export a git-hosted documentation tree (by default the Next.js docs) to a
//! single PDF with a cover page and a table of contents.
//!
//! ## Pipeline Overview
//!
//! ```text
//! git remote
//!  │
//!  ├─ 1. Fetch     sparse, shallow checkout of the docs directory
//!  ├─ 2. Collect   ordered pages, front-matter, section numbers
//!  ├─ 3. Render    markdown → HTML; callouts, MDX components, links, images
//!  ├─ 4. Assemble  cover + table of contents + one section per page
//!  └─ 5. PDF       external wkhtmltopdf-compatible engine
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docs2pdf::{export, ExportConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExportConfig::default();
//!     let output = export(&config).await?;
//!     println!("{} ({} pages)", output.title, output.stats.pages);
//!     for warning in &output.warnings {
//!         eprintln!("warning: {warning}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docs2pdf` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! docs2pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod output;
pub mod page;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AssetEmbedding, ExportConfig, ExportConfigBuilder, FileConfig, MissingAssetPolicy};
pub use error::{
    AssemblyError, AssetError, ExportError, FetchError, PageCollectionError, RenderError,
    RenderWarning, Stage,
};
pub use export::{build_document, export, export_html_only, export_sync, list_pages, BuiltDocument};
pub use output::{AssembledDocument, ExportOutput, ExportStats, TocEntry};
pub use page::{FrontMatter, Page, Related};
pub use progress::{ExportProgressCallback, NoopProgressCallback, ProgressCallback};
