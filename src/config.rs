//! Configuration types for a documentation export run.
//!
//! All export behaviour is controlled through [`ExportConfig`], built via its
//! [`ExportConfigBuilder`]. Every option has a documented default, so a bare
//! `ExportConfig::default()` exports the Next.js documentation exactly as the
//! CLI does with no flags.
//!
//! Options can also come from a TOML or JSON file ([`FileConfig`]); the CLI
//! layers flags over the file over the defaults.

use crate::error::ExportError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

pub const DEFAULT_REPO_URL: &str = "https://github.com/vercel/next.js.git";
pub const DEFAULT_SOURCE_REF: &str = "canary";
pub const DEFAULT_DOCS_DIR: &str = "docs";
pub const DEFAULT_CHECKOUT_DIR: &str = "nextjs-docs";
pub const DEFAULT_NAV_MANIFEST: &str = "navigation.yml";
pub const DEFAULT_PROJECT_NAME: &str = "Next.js";
pub const DEFAULT_SITE_URL: &str = "https://nextjs.org";
pub const DEFAULT_ASSET_BASE_URL: &str = "https://nextjs.org/_next/image?url=";
pub const DEFAULT_ASSET_URL_SUFFIX: &str = "&w=1920&q=75";
pub const DEFAULT_PDF_ENGINE: &str = "wkhtmltopdf";
/// Upper bound accepted for [`ExportConfig::max_retries`].
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Configuration for one export run.
///
/// Built via [`ExportConfig::builder()`] or using [`ExportConfig::default()`].
///
/// # Example
/// ```rust
/// use docs2pdf::{ExportConfig, MissingAssetPolicy};
///
/// let config = ExportConfig::builder()
///     .source_ref("v15.0.0")
///     .output_path("nextjs.pdf")
///     .missing_assets(MissingAssetPolicy::Abort)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExportConfig {
    /// Remote repository holding the documentation. Default: the Next.js repo.
    pub repo_url: String,

    /// Branch or tag to check out. Default: `canary`.
    pub source_ref: String,

    /// Documentation directory inside the repository. Default: `docs`.
    ///
    /// Only this directory is checked out (sparse checkout).
    pub docs_dir: String,

    /// Local checkout directory. Default: `nextjs-docs`.
    pub checkout_dir: PathBuf,

    /// Reuse the existing checkout without running git. Default: false.
    pub offline: bool,

    /// Timeout for each git command, in seconds. Default: 600.
    pub git_timeout_secs: u64,

    /// File name of the optional navigation manifest at the docs root.
    /// Default: `navigation.yml`.
    pub nav_manifest: String,

    /// Product name used on the cover page. Default: `Next.js`.
    pub project_name: String,

    /// Live site; unknown root-relative links are rewritten onto it.
    /// Default: `https://nextjs.org`.
    pub site_url: Option<String>,

    /// Prefix for remote image downloads. `None` disables remote fetching.
    pub asset_base_url: Option<String>,

    /// Suffix appended to remote image URLs. Default: `&w=1920&q=75`.
    pub asset_url_suffix: String,

    /// Where resolved images are cached. Default: `<checkout_dir>-assets`.
    pub asset_cache_dir: Option<PathBuf>,

    /// What to do when an image cannot be resolved. Default: placeholder.
    pub missing_assets: MissingAssetPolicy,

    /// How resolved images are referenced from the HTML. Default: inline.
    pub asset_embedding: AssetEmbedding,

    /// Per-request HTTP timeout in seconds. Default: 60.
    pub download_timeout_secs: u64,

    /// Retries per image download on transient failure. Default: 2, at most
    /// [`MAX_RETRIES_LIMIT`].
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (doubles per attempt). Default: 500.
    pub retry_backoff_ms: u64,

    /// Custom stylesheet replacing the bundled one.
    pub stylesheet: Option<PathBuf>,

    /// Date printed on the cover. Default: today (`%Y-%m-%d`).
    pub cover_date: Option<String>,

    /// Final PDF path. Default: derived from the project name and detected
    /// version, e.g. `Next.js_v15.1.0_Documentation.pdf`.
    pub output_path: Option<PathBuf>,

    /// Also write the assembled HTML here.
    pub export_html: Option<PathBuf>,

    /// HTML-to-PDF engine executable. Default: `wkhtmltopdf`.
    pub pdf_engine: String,

    /// Extra arguments passed to the engine before the input/output paths.
    pub pdf_engine_args: Vec<String>,

    /// Timeout for the engine run, in seconds. Default: 600.
    pub pdf_timeout_secs: u64,

    /// Paper size passed to wkhtmltopdf. Default: `A4`.
    pub page_size: String,

    /// Image DPI passed to wkhtmltopdf. Default: 150.
    ///
    /// 300 suits print, 150 e-readers, 72 screen-only use.
    pub image_dpi: u32,

    /// JPEG quality passed to wkhtmltopdf (0–100). Default: 75.
    pub image_quality: u32,

    /// Stage and page events; see [`crate::progress`].
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            repo_url: DEFAULT_REPO_URL.to_string(),
            source_ref: DEFAULT_SOURCE_REF.to_string(),
            docs_dir: DEFAULT_DOCS_DIR.to_string(),
            checkout_dir: PathBuf::from(DEFAULT_CHECKOUT_DIR),
            offline: false,
            git_timeout_secs: 600,
            nav_manifest: DEFAULT_NAV_MANIFEST.to_string(),
            project_name: DEFAULT_PROJECT_NAME.to_string(),
            site_url: Some(DEFAULT_SITE_URL.to_string()),
            asset_base_url: Some(DEFAULT_ASSET_BASE_URL.to_string()),
            asset_url_suffix: DEFAULT_ASSET_URL_SUFFIX.to_string(),
            asset_cache_dir: None,
            missing_assets: MissingAssetPolicy::default(),
            asset_embedding: AssetEmbedding::default(),
            download_timeout_secs: 60,
            max_retries: 2,
            retry_backoff_ms: 500,
            stylesheet: None,
            cover_date: None,
            output_path: None,
            export_html: None,
            pdf_engine: DEFAULT_PDF_ENGINE.to_string(),
            pdf_engine_args: Vec::new(),
            pdf_timeout_secs: 600,
            page_size: "A4".to_string(),
            image_dpi: 150,
            image_quality: 75,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportConfig")
            .field("repo_url", &self.repo_url)
            .field("source_ref", &self.source_ref)
            .field("docs_dir", &self.docs_dir)
            .field("checkout_dir", &self.checkout_dir)
            .field("offline", &self.offline)
            .field("nav_manifest", &self.nav_manifest)
            .field("project_name", &self.project_name)
            .field("site_url", &self.site_url)
            .field("asset_base_url", &self.asset_base_url)
            .field("asset_cache_dir", &self.asset_cache_dir)
            .field("missing_assets", &self.missing_assets)
            .field("asset_embedding", &self.asset_embedding)
            .field("output_path", &self.output_path)
            .field("pdf_engine", &self.pdf_engine)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExportProgressCallback>"),
            )
            .finish()
    }
}

impl ExportConfig {
    /// Create a new builder for `ExportConfig`.
    pub fn builder() -> ExportConfigBuilder {
        ExportConfigBuilder {
            config: Self::default(),
        }
    }

    /// Load a configuration file and apply it over the defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let file = FileConfig::load(path)?;
        Self::builder().apply_file(file).build()
    }

    /// Root of the documentation inside the checkout.
    pub fn docs_root(&self) -> PathBuf {
        self.checkout_dir.join(&self.docs_dir)
    }

    /// Directory used for the per-run image cache.
    pub fn asset_cache_path(&self) -> PathBuf {
        match self.asset_cache_dir {
            Some(ref dir) => dir.clone(),
            None => {
                let mut name = self
                    .checkout_dir
                    .file_name()
                    .map(|n| n.to_os_string())
                    .unwrap_or_else(|| "docs".into());
                name.push("-assets");
                self.checkout_dir.with_file_name(name)
            }
        }
    }

    /// Output path for the PDF, deriving one from the detected version when
    /// none was configured.
    pub fn resolve_output_path(&self, version: Option<&str>) -> PathBuf {
        if let Some(ref p) = self.output_path {
            return p.clone();
        }
        let name = self.project_name.replace(' ', "_");
        match version {
            Some(v) => PathBuf::from(format!("{name}_v{v}_Documentation.pdf")),
            None => PathBuf::from(format!("{name}_Documentation.pdf")),
        }
    }

    /// Title printed on the cover page.
    pub fn document_title(&self, version: Option<&str>) -> String {
        match version {
            Some(v) => format!("{} v{} Documentation", self.project_name, v),
            None => format!("{} Documentation", self.project_name),
        }
    }
}

/// Builder for [`ExportConfig`].
#[derive(Debug)]
pub struct ExportConfigBuilder {
    config: ExportConfig,
}

impl ExportConfigBuilder {
    pub fn repo_url(mut self, url: impl Into<String>) -> Self {
        self.config.repo_url = url.into();
        self
    }

    pub fn source_ref(mut self, reference: impl Into<String>) -> Self {
        self.config.source_ref = reference.into();
        self
    }

    pub fn docs_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.docs_dir = dir.into();
        self
    }

    pub fn checkout_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.checkout_dir = dir.into();
        self
    }

    pub fn offline(mut self, v: bool) -> Self {
        self.config.offline = v;
        self
    }

    pub fn git_timeout_secs(mut self, secs: u64) -> Self {
        self.config.git_timeout_secs = secs.max(1);
        self
    }

    pub fn nav_manifest(mut self, name: impl Into<String>) -> Self {
        self.config.nav_manifest = name.into();
        self
    }

    pub fn project_name(mut self, name: impl Into<String>) -> Self {
        self.config.project_name = name.into();
        self
    }

    pub fn site_url(mut self, url: Option<String>) -> Self {
        self.config.site_url = url;
        self
    }

    pub fn asset_base_url(mut self, url: Option<String>) -> Self {
        self.config.asset_base_url = url;
        self
    }

    pub fn asset_url_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.asset_url_suffix = suffix.into();
        self
    }

    pub fn asset_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.asset_cache_dir = Some(dir.into());
        self
    }

    pub fn missing_assets(mut self, policy: MissingAssetPolicy) -> Self {
        self.config.missing_assets = policy;
        self
    }

    /// Shorthand for [`MissingAssetPolicy::Abort`] / [`MissingAssetPolicy::Placeholder`].
    pub fn strict_assets(self, strict: bool) -> Self {
        self.missing_assets(if strict {
            MissingAssetPolicy::Abort
        } else {
            MissingAssetPolicy::Placeholder
        })
    }

    pub fn asset_embedding(mut self, embedding: AssetEmbedding) -> Self {
        self.config.asset_embedding = embedding;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn stylesheet(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.stylesheet = Some(path.into());
        self
    }

    pub fn cover_date(mut self, date: impl Into<String>) -> Self {
        self.config.cover_date = Some(date.into());
        self
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_path = Some(path.into());
        self
    }

    pub fn export_html(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.export_html = Some(path.into());
        self
    }

    pub fn pdf_engine(mut self, engine: impl Into<String>) -> Self {
        self.config.pdf_engine = engine.into();
        self
    }

    pub fn pdf_engine_args(mut self, args: Vec<String>) -> Self {
        self.config.pdf_engine_args = args;
        self
    }

    pub fn pdf_timeout_secs(mut self, secs: u64) -> Self {
        self.config.pdf_timeout_secs = secs.max(1);
        self
    }

    pub fn page_size(mut self, size: impl Into<String>) -> Self {
        self.config.page_size = size.into();
        self
    }

    pub fn image_dpi(mut self, dpi: u32) -> Self {
        self.config.image_dpi = dpi;
        self
    }

    pub fn image_quality(mut self, q: u32) -> Self {
        self.config.image_quality = q;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Apply every option set in a [`FileConfig`].
    pub fn apply_file(mut self, file: FileConfig) -> Self {
        let c = &mut self.config;
        if let Some(v) = file.repo_url {
            c.repo_url = v;
        }
        if let Some(v) = file.source_ref {
            c.source_ref = v;
        }
        if let Some(v) = file.docs_dir {
            c.docs_dir = v;
        }
        if let Some(v) = file.checkout_dir {
            c.checkout_dir = v;
        }
        if let Some(v) = file.offline {
            c.offline = v;
        }
        if let Some(v) = file.git_timeout_secs {
            c.git_timeout_secs = v.max(1);
        }
        if let Some(v) = file.nav_manifest {
            c.nav_manifest = v;
        }
        if let Some(v) = file.project_name {
            c.project_name = v;
        }
        if let Some(v) = file.site_url {
            c.site_url = non_empty(v);
        }
        if let Some(v) = file.asset_base_url {
            c.asset_base_url = non_empty(v);
        }
        if let Some(v) = file.asset_url_suffix {
            c.asset_url_suffix = v;
        }
        if let Some(v) = file.asset_cache_dir {
            c.asset_cache_dir = Some(v);
        }
        if let Some(strict) = file.strict_assets {
            c.missing_assets = if strict {
                MissingAssetPolicy::Abort
            } else {
                MissingAssetPolicy::Placeholder
            };
        }
        if let Some(embed) = file.embed_assets {
            c.asset_embedding = if embed {
                AssetEmbedding::Inline
            } else {
                AssetEmbedding::Link
            };
        }
        if let Some(v) = file.download_timeout_secs {
            c.download_timeout_secs = v.max(1);
        }
        if let Some(v) = file.max_retries {
            c.max_retries = v;
        }
        if let Some(v) = file.retry_backoff_ms {
            c.retry_backoff_ms = v;
        }
        if let Some(v) = file.stylesheet {
            c.stylesheet = Some(v);
        }
        if let Some(v) = file.cover_date {
            c.cover_date = Some(v);
        }
        if let Some(v) = file.output_path {
            c.output_path = Some(v);
        }
        if let Some(v) = file.export_html {
            c.export_html = Some(v);
        }
        if let Some(v) = file.pdf_engine {
            c.pdf_engine = v;
        }
        if let Some(v) = file.pdf_engine_args {
            c.pdf_engine_args = v;
        }
        if let Some(v) = file.pdf_timeout_secs {
            c.pdf_timeout_secs = v.max(1);
        }
        if let Some(v) = file.page_size {
            c.page_size = v;
        }
        if let Some(v) = file.image_dpi {
            c.image_dpi = v;
        }
        if let Some(v) = file.image_quality {
            c.image_quality = v;
        }
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExportConfig, ExportError> {
        let c = &self.config;
        if c.repo_url.trim().is_empty() {
            return Err(ExportError::InvalidConfig("repo_url must not be empty".into()));
        }
        if c.source_ref.trim().is_empty() {
            return Err(ExportError::InvalidConfig(
                "source_ref must not be empty".into(),
            ));
        }
        if !is_plain_relative(Path::new(&c.docs_dir)) {
            return Err(ExportError::InvalidConfig(format!(
                "docs_dir must be a relative path inside the repository, got '{}'",
                c.docs_dir
            )));
        }
        if c.image_quality > 100 {
            return Err(ExportError::InvalidConfig(format!(
                "image_quality must be 0–100, got {}",
                c.image_quality
            )));
        }
        if c.max_retries > MAX_RETRIES_LIMIT {
            return Err(ExportError::InvalidConfig(format!(
                "max_retries must be at most {MAX_RETRIES_LIMIT}, got {}",
                c.max_retries
            )));
        }
        if c.image_dpi == 0 {
            return Err(ExportError::InvalidConfig("image_dpi must be ≥ 1".into()));
        }
        if c.pdf_engine.trim().is_empty() {
            return Err(ExportError::InvalidConfig(
                "pdf_engine must not be empty".into(),
            ));
        }
        if c.page_size.trim().is_empty() {
            return Err(ExportError::InvalidConfig("page_size must not be empty".into()));
        }
        Ok(self.config)
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

fn is_plain_relative(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

// ── Enums ────────────────────────────────────────────────────────────────

/// What happens when an image reference cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingAssetPolicy {
    /// Render a visible placeholder and record a warning. (default)
    #[default]
    Placeholder,
    /// Abort the run with an `AssetError`.
    Abort,
}

/// How a resolved image is referenced from the assembled HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetEmbedding {
    /// `data:` URI; the HTML is self-contained. (default)
    #[default]
    Inline,
    /// `file://` URL into the asset cache.
    Link,
}

// ── Config file ──────────────────────────────────────────────────────────

/// On-disk configuration. Every field is optional; unset fields keep their
/// defaults.
///
/// ```toml
/// source_ref = "v15.1.0"
/// output_path = "nextjs.pdf"
/// strict_assets = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub repo_url: Option<String>,
    pub source_ref: Option<String>,
    pub docs_dir: Option<String>,
    pub checkout_dir: Option<PathBuf>,
    pub offline: Option<bool>,
    pub git_timeout_secs: Option<u64>,
    pub nav_manifest: Option<String>,
    pub project_name: Option<String>,
    pub site_url: Option<String>,
    pub asset_base_url: Option<String>,
    pub asset_url_suffix: Option<String>,
    pub asset_cache_dir: Option<PathBuf>,
    pub strict_assets: Option<bool>,
    pub embed_assets: Option<bool>,
    pub download_timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_backoff_ms: Option<u64>,
    pub stylesheet: Option<PathBuf>,
    pub cover_date: Option<String>,
    pub output_path: Option<PathBuf>,
    pub export_html: Option<PathBuf>,
    pub pdf_engine: Option<String>,
    pub pdf_engine_args: Option<Vec<String>>,
    pub pdf_timeout_secs: Option<u64>,
    pub page_size: Option<String>,
    pub image_dpi: Option<u32>,
    pub image_quality: Option<u32>,
}

impl FileConfig {
    /// Read a `.toml` or `.json` configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ExportError::InvalidConfig(format!("cannot read '{}': {e}", path.display()))
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&text).map_err(|e| {
                ExportError::InvalidConfig(format!("'{}': {e}", path.display()))
            })
        } else {
            toml::from_str(&text)
                .map_err(|e| ExportError::InvalidConfig(format!("'{}': {e}", path.display())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_nextjs_docs() {
        let c = ExportConfig::default();
        assert_eq!(c.source_ref, "canary");
        assert_eq!(c.docs_root(), PathBuf::from("nextjs-docs/docs"));
        assert_eq!(c.missing_assets, MissingAssetPolicy::Placeholder);
        assert_eq!(c.asset_cache_path(), PathBuf::from("nextjs-docs-assets"));
    }

    #[test]
    fn strict_assets_maps_to_abort() {
        let c = ExportConfig::builder().strict_assets(true).build().unwrap();
        assert_eq!(c.missing_assets, MissingAssetPolicy::Abort);
    }

    #[test]
    fn rejects_escaping_docs_dir() {
        let err = ExportConfig::builder().docs_dir("../etc").build().unwrap_err();
        assert!(matches!(err, ExportError::InvalidConfig(_)));
        let err = ExportConfig::builder().docs_dir("/abs").build().unwrap_err();
        assert!(matches!(err, ExportError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_unbounded_retries() {
        let err = ExportConfig::builder().max_retries(64).build().unwrap_err();
        assert!(err.to_string().contains("max_retries"));
        assert!(ExportConfig::builder()
            .max_retries(MAX_RETRIES_LIMIT)
            .build()
            .is_ok());
    }

    #[test]
    fn rejects_out_of_range_quality() {
        let err = ExportConfig::builder().image_quality(101).build().unwrap_err();
        assert!(err.to_string().contains("image_quality"));
    }

    #[test]
    fn output_path_derived_from_version() {
        let c = ExportConfig::default();
        assert_eq!(
            c.resolve_output_path(Some("15.1.0")),
            PathBuf::from("Next.js_v15.1.0_Documentation.pdf")
        );
        assert_eq!(
            c.resolve_output_path(None),
            PathBuf::from("Next.js_Documentation.pdf")
        );
        assert_eq!(c.document_title(None), "Next.js Documentation");

        let c = ExportConfig::builder().output_path("out/docs.pdf").build().unwrap();
        assert_eq!(c.resolve_output_path(Some("1.0.0")), PathBuf::from("out/docs.pdf"));
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs2pdf.toml");
        std::fs::write(
            &path,
            "source_ref = \"v15.0.0\"\nstrict_assets = true\nembed_assets = false\nasset_base_url = \"\"\n",
        )
        .unwrap();
        let c = ExportConfig::from_file(&path).unwrap();
        assert_eq!(c.source_ref, "v15.0.0");
        assert_eq!(c.missing_assets, MissingAssetPolicy::Abort);
        assert_eq!(c.asset_embedding, AssetEmbedding::Link);
        assert_eq!(c.asset_base_url, None);
    }

    #[test]
    fn json_file_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs2pdf.json");
        std::fs::write(&path, r#"{ "output_path": "x.pdf", "image_dpi": 300 }"#).unwrap();
        let c = ExportConfig::from_file(&path).unwrap();
        assert_eq!(c.output_path, Some(PathBuf::from("x.pdf")));
        assert_eq!(c.image_dpi, 300);
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs2pdf.toml");
        std::fs::write(&path, "colour = \"blue\"\n").unwrap();
        assert!(matches!(
            ExportConfig::from_file(&path),
            Err(ExportError::InvalidConfig(_))
        ));
    }
}
