//! Error types for the docs2pdf library.
//!
//! Two distinct kinds of failure exist:
//!
//! * **Fatal** stage errors ([`FetchError`], [`PageCollectionError`],
//!   [`AssetError`] in strict mode, [`AssemblyError`], [`RenderError`]) abort
//!   the run. They are all wrapped by [`ExportError`], which is what the
//!   top-level `export*` functions return. [`ExportError::stage`] names the
//!   stage that failed so the CLI can report it.
//!
//! * **Non-fatal** [`RenderWarning`]s describe a single page that rendered
//!   with a visible degradation (unsupported syntax, missing image). They are
//!   collected into [`crate::output::ExportOutput::warnings`] and never
//!   propagated as `Err`.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stage, used to tag errors and progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Fetch,
    Collect,
    Render,
    Assemble,
    Pdf,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Collect => "collect",
            Stage::Render => "render",
            Stage::Assemble => "assemble",
            Stage::Pdf => "pdf",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All fatal errors returned by the docs2pdf library.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Collect(#[from] PageCollectionError),

    /// Raised for a missing image under `strict_assets`, or when the asset
    /// cache cannot be prepared.
    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error(transparent)]
    Render(#[from] RenderError),

    /// Could not write the exported HTML file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Builder or config-file validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error, tagged with the stage it interrupted.
    #[error("Internal error during {stage}: {detail}")]
    Internal { stage: Stage, detail: String },
}

impl ExportError {
    /// The pipeline stage this error aborted.
    ///
    /// Configuration problems are reported against the stage that would have
    /// consumed them first (`fetch`), since they stop the run before it starts.
    pub fn stage(&self) -> Stage {
        match self {
            ExportError::Fetch(_) | ExportError::InvalidConfig(_) => Stage::Fetch,
            ExportError::Collect(_) => Stage::Collect,
            ExportError::Asset(_) => Stage::Render,
            ExportError::Assembly(_) | ExportError::OutputWriteFailed { .. } => Stage::Assemble,
            ExportError::Render(_) => Stage::Pdf,
            ExportError::Internal { stage, .. } => *stage,
        }
    }
}

// ── Source fetcher ───────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum FetchError {
    /// `git` is not installed or not on `PATH`.
    #[error("git client not found: {0}\nInstall git and make sure it is on PATH.")]
    ClientMissing(String),

    #[error("Remote '{url}' is unreachable: {detail}\nCheck your internet connection.")]
    RemoteUnreachable { url: String, detail: String },

    #[error("Reference '{reference}' does not exist on '{url}'")]
    RefNotFound { url: String, reference: String },

    #[error("git {command} timed out after {secs}s")]
    Timeout { command: String, secs: u64 },

    /// The checkout succeeded but does not contain the documentation directory.
    #[error("Documentation directory '{path}' is missing from the checkout")]
    DocsDirMissing { path: PathBuf },

    /// Offline mode was requested but there is nothing to reuse.
    #[error("Offline mode: no existing checkout at '{path}'")]
    NoCheckout { path: PathBuf },

    #[error("git {command} failed: {detail}")]
    CommandFailed { command: String, detail: String },

    #[error("I/O error in checkout '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ── Page collector ───────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PageCollectionError {
    #[error("Documentation root '{path}' does not exist or is not a directory")]
    RootMissing { path: PathBuf },

    #[error("No markdown pages found under '{path}'")]
    NoPages { path: PathBuf },

    #[error("Navigation manifest '{path}' is invalid: {detail}")]
    ManifestInvalid { path: PathBuf, detail: String },

    #[error("Navigation manifest lists '{entry}', which does not exist")]
    ManifestEntryMissing { entry: String },

    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ── Asset resolver ───────────────────────────────────────────────────────

/// An image reference could not be resolved.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum AssetError {
    #[error("Image '{reference}' not found locally or remotely (page {page}): {detail}")]
    Unresolved {
        reference: String,
        page: usize,
        detail: String,
    },

    #[error("Image '{reference}' downloaded from '{url}' is not a recognised image")]
    NotAnImage { reference: String, url: String },

    #[error("Asset cache error for '{reference}': {detail}")]
    Cache { reference: String, detail: String },
}

impl AssetError {
    pub fn reference(&self) -> &str {
        match self {
            AssetError::Unresolved { reference, .. }
            | AssetError::NotAnImage { reference, .. }
            | AssetError::Cache { reference, .. } => reference,
        }
    }
}

// ── Document assembler ───────────────────────────────────────────────────

/// Internal inconsistency between collected pages and the assembled document.
///
/// These indicate a bug in the collector or assembler, never bad input.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("Page {ordinal} ('{title}') has no rendered fragment")]
    MissingFragment { ordinal: usize, title: String },

    #[error("Page ordinals are not contiguous: expected {expected}, found {found}")]
    OrdinalGap { expected: usize, found: usize },

    #[error("Anchor '{anchor}' is used by more than one page")]
    DuplicateAnchor { anchor: String },

    #[error("Table of contents entry '{anchor}' has no matching page section")]
    DanglingTocEntry { anchor: String },

    #[error("Cannot read stylesheet '{path}': {source}")]
    Stylesheet {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ── PDF renderer ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF engine '{engine}' not found\nInstall wkhtmltopdf or set --pdf-engine.")]
    EngineMissing { engine: String },

    #[error("PDF engine '{engine}' exited with {status}: {stderr}")]
    EngineFailed {
        engine: String,
        status: String,
        stderr: String,
    },

    #[error("PDF engine '{engine}' timed out after {secs}s")]
    Timeout { engine: String, secs: u64 },

    #[error("PDF engine produced no valid PDF at '{path}'")]
    InvalidOutput { path: PathBuf },

    /// The output file exists and cannot be opened for writing
    /// (typically open in a viewer that locks it).
    #[error("Output file '{path}' is not writable; close it in other programs and retry")]
    OutputLocked { path: PathBuf },

    #[error("I/O error writing '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A non-fatal problem on a single page.
///
/// The page still renders; the warning marks where output was degraded.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum RenderWarning {
    #[error("Page {page}: unsupported callout '{kind}' rendered as a generic block")]
    UnsupportedCallout { page: usize, kind: String },

    #[error("Page {page}: unsupported component <{name}> rendered as a generic block")]
    UnsupportedComponent { page: usize, name: String },

    #[error("Page {page}: malformed front-matter ignored: {detail}")]
    MalformedFrontMatter { page: usize, detail: String },

    #[error("Page {page}: image '{reference}' replaced by a placeholder: {detail}")]
    MissingAsset {
        page: usize,
        reference: String,
        detail: String,
    },
}

impl RenderWarning {
    pub fn page(&self) -> usize {
        match self {
            RenderWarning::UnsupportedCallout { page, .. }
            | RenderWarning::UnsupportedComponent { page, .. }
            | RenderWarning::MalformedFrontMatter { page, .. }
            | RenderWarning::MissingAsset { page, .. } => *page,
        }
    }
}
