//! Asset resolution: turn every image reference into a cached local file.
//!
//! ## Resolution order
//!
//! 1. The run's reference map: a reference already resolved on any page is
//!    returned without touching the disk again.
//! 2. The fetched tree: relative to the referencing page, then the docs root,
//!    then the checkout root. Found files are copied into the cache.
//! 3. A download from `asset_base_url + reference + asset_url_suffix`
//!    (absolute `http(s)` references are downloaded as-is), with the same
//!    exponential backoff the rest of the crate uses for network calls.
//!
//! Cache file names are the SHA-256 of the reference key plus the original
//! extension, so the same reference always lands in the same file. The cache
//! only ever holds the current run: files left by an earlier run are removed
//! when the resolver is created and are never read back as a source.

use crate::config::{AssetEmbedding, ExportConfig};
use crate::error::{AssetError, ExportError, Stage};
use crate::page::Page;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Where a resolved asset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetSource {
    /// Found in the fetched tree.
    Local,
    /// Downloaded during this run.
    Remote,
}

/// One image reference mapped to its cached file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAsset {
    /// The reference as written in the page.
    pub reference: String,
    pub path: PathBuf,
    pub source: AssetSource,
    pub mime: String,
}

/// Distinct-reference counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetCounts {
    pub resolved: usize,
    pub local: usize,
    pub remote: usize,
    pub missing: usize,
}

/// Resolves image references for one run. Owned by the run and passed to
/// the renderer as `&mut`.
pub struct AssetResolver {
    client: reqwest::Client,
    cache_dir: PathBuf,
    docs_root: PathBuf,
    checkout_root: PathBuf,
    base_url: Option<String>,
    url_suffix: String,
    download_timeout_secs: u64,
    max_retries: u32,
    retry_backoff_ms: u64,
    embedding: AssetEmbedding,
    resolved: HashMap<String, ResolvedAsset>,
    failed: HashMap<String, AssetError>,
}

impl AssetResolver {
    pub fn new(config: &ExportConfig, docs_root: &Path) -> Result<Self, ExportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.download_timeout_secs))
            .user_agent(concat!("docs2pdf/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ExportError::Internal {
                stage: Stage::Render,
                detail: format!("HTTP client: {e}"),
            })?;

        let cache_dir = config.asset_cache_path();
        let removed = clear_cache_dir(&cache_dir).map_err(|e| AssetError::Cache {
            reference: cache_dir.display().to_string(),
            detail: format!("cannot clear cache from an earlier run: {e}"),
        })?;
        if removed > 0 {
            debug!("Removed {} stale file(s) from {}", removed, cache_dir.display());
        }

        Ok(Self {
            client,
            cache_dir,
            docs_root: docs_root.to_path_buf(),
            checkout_root: config.checkout_dir.clone(),
            base_url: config.asset_base_url.clone(),
            url_suffix: config.asset_url_suffix.clone(),
            download_timeout_secs: config.download_timeout_secs,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            embedding: config.asset_embedding,
            resolved: HashMap::new(),
            failed: HashMap::new(),
        })
    }

    pub fn counts(&self) -> AssetCounts {
        let mut counts = AssetCounts {
            resolved: self.resolved.len(),
            missing: self.failed.len(),
            ..AssetCounts::default()
        };
        for asset in self.resolved.values() {
            match asset.source {
                AssetSource::Local => counts.local += 1,
                AssetSource::Remote => counts.remote += 1,
            }
        }
        counts
    }

    /// Resolve `reference` as seen on `page` to a cached file.
    pub async fn resolve(&mut self, reference: &str, page: &Page) -> Result<ResolvedAsset, AssetError> {
        let key = reference_key(reference, &page.rel_path);
        if let Some(asset) = self.resolved.get(&key) {
            debug!("Asset {} already resolved", reference);
            return Ok(asset.clone());
        }
        if let Some(err) = self.failed.get(&key) {
            return Err(err.clone());
        }

        match self.resolve_uncached(reference, &key, page).await {
            Ok(asset) => {
                self.resolved.insert(key, asset.clone());
                Ok(asset)
            }
            Err(err) => {
                self.failed.insert(key, err.clone());
                Err(err)
            }
        }
    }

    /// Resolve and return the `src` value to emit in the HTML.
    pub async fn image_src(&mut self, reference: &str, page: &Page) -> Result<String, AssetError> {
        let asset = self.resolve(reference, page).await?;
        match self.embedding {
            AssetEmbedding::Inline => {
                let bytes = tokio::fs::read(&asset.path)
                    .await
                    .map_err(|e| AssetError::Cache {
                        reference: reference.to_string(),
                        detail: format!("{}: {e}", asset.path.display()),
                    })?;
                let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
                Ok(format!("data:{};base64,{}", asset.mime, encoded))
            }
            AssetEmbedding::Link => {
                let absolute = std::path::absolute(&asset.path).map_err(|e| AssetError::Cache {
                    reference: reference.to_string(),
                    detail: e.to_string(),
                })?;
                reqwest::Url::from_file_path(&absolute)
                    .map(|u| u.to_string())
                    .map_err(|_| AssetError::Cache {
                        reference: reference.to_string(),
                        detail: format!("cannot form a file URL for {}", absolute.display()),
                    })
            }
        }
    }

    async fn resolve_uncached(
        &self,
        reference: &str,
        key: &str,
        page: &Page,
    ) -> Result<ResolvedAsset, AssetError> {
        let path_part = reference
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        let is_http = reference.starts_with("http://") || reference.starts_with("https://");
        let cache_path = self.cache_path_for(key, path_part);

        if !is_http {
            if let Some(local) = self.find_local(path_part, page) {
                let bytes = tokio::fs::read(&local).await.map_err(|e| AssetError::Cache {
                    reference: reference.to_string(),
                    detail: format!("{}: {e}", local.display()),
                })?;
                let mime = sniff_mime(&bytes, path_part).unwrap_or_else(|| "application/octet-stream".into());
                self.store(reference, &cache_path, &bytes).await?;
                debug!("Asset {} found locally at {}", reference, local.display());
                return Ok(ResolvedAsset {
                    reference: reference.to_string(),
                    path: cache_path,
                    source: AssetSource::Local,
                    mime,
                });
            }
        }

        let url = if is_http {
            reference.to_string()
        } else {
            match self.base_url {
                Some(ref base) => format!("{base}{reference}{}", self.url_suffix),
                None => {
                    return Err(AssetError::Unresolved {
                        reference: reference.to_string(),
                        page: page.ordinal,
                        detail: "not found in the checkout and remote fetching is disabled".into(),
                    })
                }
            }
        };

        let bytes = self
            .download(&url)
            .await
            .map_err(|detail| AssetError::Unresolved {
                reference: reference.to_string(),
                page: page.ordinal,
                detail: format!("{url}: {detail}"),
            })?;
        let mime = sniff_mime(&bytes, "").ok_or_else(|| AssetError::NotAnImage {
            reference: reference.to_string(),
            url: url.clone(),
        })?;
        self.store(reference, &cache_path, &bytes).await?;
        info!("Downloaded {} ({} bytes)", reference, bytes.len());
        Ok(ResolvedAsset {
            reference: reference.to_string(),
            path: cache_path,
            source: AssetSource::Remote,
            mime,
        })
    }

    /// Look for the file beside the page, under the docs root, then under
    /// the checkout root. Candidates escaping the checkout are ignored.
    fn find_local(&self, path_part: &str, page: &Page) -> Option<PathBuf> {
        if path_part.is_empty() {
            return None;
        }
        let trimmed = path_part.trim_start_matches('/');
        let mut candidates = Vec::with_capacity(3);
        if !path_part.starts_with('/') {
            if let Some(dir) = page.source_path.parent() {
                candidates.push(dir.join(trimmed));
            }
        }
        candidates.push(self.docs_root.join(trimmed));
        candidates.push(self.checkout_root.join(trimmed));

        let root = self.checkout_root.canonicalize().ok();
        candidates.into_iter().find(|candidate| {
            if !candidate.is_file() {
                return false;
            }
            match (root.as_ref(), candidate.canonicalize()) {
                (Some(root), Ok(resolved)) => resolved.starts_with(root),
                _ => false,
            }
        })
    }

    fn cache_path_for(&self, key: &str, path_part: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        let name = match image_extension(path_part) {
            Some(ext) => format!("{hex}.{ext}"),
            None => hex,
        };
        self.cache_dir.join(name)
    }

    /// Write through a `.part` file and rename into place.
    async fn store(&self, reference: &str, path: &Path, bytes: &[u8]) -> Result<(), AssetError> {
        let cache_err = |e: std::io::Error| AssetError::Cache {
            reference: reference.to_string(),
            detail: format!("{}: {e}", path.display()),
        };
        tokio::fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(cache_err)?;
        let mut part = path.as_os_str().to_os_string();
        part.push(".part");
        let part = PathBuf::from(part);
        tokio::fs::write(&part, bytes).await.map_err(cache_err)?;
        tokio::fs::rename(&part, path).await.map_err(cache_err)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, String> {
        let mut last_err = String::new();

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = backoff_ms(self.retry_backoff_ms, attempt);
                warn!(
                    "Asset {}: retry {}/{} after {}ms",
                    url, attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match self.client.get(url).send().await {
                Ok(response) if response.status().is_success() => match response.bytes().await {
                    Ok(bytes) => return Ok(bytes.to_vec()),
                    Err(e) => last_err = e.to_string(),
                },
                Ok(response) if response.status().is_client_error() => {
                    return Err(format!("HTTP {}", response.status()));
                }
                Ok(response) => last_err = format!("HTTP {}", response.status()),
                Err(e) if e.is_timeout() => {
                    last_err = format!("timed out after {}s", self.download_timeout_secs)
                }
                Err(e) => last_err = e.to_string(),
            }
            debug!("Asset {}: attempt {} failed: {}", url, attempt + 1, last_err);
        }

        Err(last_err)
    }
}

/// Delay before retry `attempt` (1-based): `base * 2^(attempt-1)`, saturating.
fn backoff_ms(base: u64, attempt: u32) -> u64 {
    base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

/// Remove files this resolver writes (`<sha256>[.ext][.part]`) from `dir`.
/// Anything else in the directory is left alone.
fn clear_cache_dir(dir: &Path) -> std::io::Result<usize> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };
    let mut removed = 0;
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if is_cache_file_name(&name.to_string_lossy()) {
            std::fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

fn is_cache_file_name(name: &str) -> bool {
    let name = name.strip_suffix(".part").unwrap_or(name);
    let stem = name.split_once('.').map(|(s, _)| s).unwrap_or(name);
    stem.len() == 64 && stem.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Map key: absolute references as written, relative ones joined to the
/// page's directory so `img.png` on two pages stays distinct.
fn reference_key(reference: &str, page_rel: &str) -> String {
    if reference.starts_with('/') || reference.contains("://") {
        return reference.to_string();
    }
    let dir = page_rel.rsplit_once('/').map(|(d, _)| d).unwrap_or_default();
    let mut parts: Vec<&str> = dir.split('/').filter(|p| !p.is_empty()).collect();
    for part in reference.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("./{}", parts.join("/"))
}

fn image_extension(path_part: &str) -> Option<String> {
    let name = path_part.rsplit('/').next()?;
    let (_, ext) = name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    (!ext.is_empty() && ext.len() <= 5 && ext.bytes().all(|b| b.is_ascii_alphanumeric()))
        .then_some(ext)
}

/// MIME type of an image, from its bytes (SVG by content or extension).
fn sniff_mime(bytes: &[u8], path_part: &str) -> Option<String> {
    if let Ok(format) = image::guess_format(bytes) {
        return Some(format.to_mime_type().to_string());
    }
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]);
    let head = head.trim_start();
    if head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg")) {
        return Some("image/svg+xml".to_string());
    }
    if image_extension(path_part).as_deref() == Some("svg") {
        return Some("image/svg+xml".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbImage::new(2, 2);
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn page_at(docs: &Path, rel: &str) -> Page {
        Page::new(
            1,
            docs.join(rel),
            rel.into(),
            0,
            "Setup".into(),
            None,
            String::new(),
        )
    }

    fn resolver(checkout: &Path, base_url: Option<String>) -> AssetResolver {
        let config = ExportConfig::builder()
            .checkout_dir(checkout)
            .asset_cache_dir(checkout.join("cache"))
            .asset_base_url(base_url)
            .max_retries(0)
            .build()
            .unwrap();
        AssetResolver::new(&config, &checkout.join("docs")).unwrap()
    }

    #[test]
    fn reference_keys() {
        assert_eq!(reference_key("/docs/a.png", "01-app/x.mdx"), "/docs/a.png");
        assert_eq!(reference_key("./img/a.png", "01-app/x.mdx"), "./01-app/img/a.png");
        assert_eq!(reference_key("../a.png", "01-app/x.mdx"), "./a.png");
        assert_eq!(reference_key("https://x.dev/a.png", "x.mdx"), "https://x.dev/a.png");
    }

    #[test]
    fn extensions_and_mime() {
        assert_eq!(image_extension("/docs/light/a.PNG").as_deref(), Some("png"));
        assert_eq!(image_extension("/docs/noext"), None);
        assert_eq!(sniff_mime(&png_bytes(), "").as_deref(), Some("image/png"));
        assert_eq!(sniff_mime(b"<svg xmlns='x'/>", "").as_deref(), Some("image/svg+xml"));
        assert_eq!(sniff_mime(b"<html>404</html>", "a.png"), None);
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        assert_eq!(backoff_ms(500, 1), 500);
        assert_eq!(backoff_ms(500, 3), 2000);
        assert_eq!(backoff_ms(500, 64), u64::MAX);
        assert_eq!(backoff_ms(u64::MAX, 2), u64::MAX);
    }

    #[test]
    fn only_cache_files_are_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let hex = "ab".repeat(32);
        std::fs::write(dir.path().join(format!("{hex}.png")), b"old").unwrap();
        std::fs::write(dir.path().join(format!("{hex}.part")), b"old").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"keep").unwrap();

        assert_eq!(clear_cache_dir(dir.path()).unwrap(), 2);
        assert!(dir.path().join("notes.txt").exists());
        assert_eq!(clear_cache_dir(&dir.path().join("absent")).unwrap(), 0);
    }

    #[tokio::test]
    async fn file_left_by_earlier_run_is_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        let checkout = dir.path();
        std::fs::create_dir_all(checkout.join("docs")).unwrap();
        let page = page_at(&checkout.join("docs"), "index.md");

        let stale = resolver(checkout, None).cache_path_for("/docs/gone.png", "/docs/gone.png");
        std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
        std::fs::write(&stale, png_bytes()).unwrap();

        let mut r = resolver(checkout, None);
        assert!(!stale.exists());
        let err = r.resolve("/docs/gone.png", &page).await.unwrap_err();
        assert!(matches!(err, AssetError::Unresolved { .. }));
        assert_eq!(r.counts().missing, 1);
    }

    #[tokio::test]
    async fn local_file_beside_page_is_cached_once() {
        let dir = tempfile::tempdir().unwrap();
        let checkout = dir.path();
        std::fs::create_dir_all(checkout.join("docs/guide")).unwrap();
        std::fs::write(checkout.join("docs/guide/shot.png"), png_bytes()).unwrap();

        let mut r = resolver(checkout, None);
        let page = page_at(&checkout.join("docs"), "guide/setup.md");
        let first = r.resolve("./shot.png", &page).await.unwrap();
        assert_eq!(first.source, AssetSource::Local);
        assert!(first.path.starts_with(checkout.join("cache")));
        assert!(first.path.to_string_lossy().ends_with(".png"));

        let second = r.resolve("./shot.png", &page).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(
            r.counts(),
            AssetCounts {
                resolved: 1,
                local: 1,
                remote: 0,
                missing: 0
            }
        );
    }

    #[tokio::test]
    async fn root_relative_reference_found_under_checkout() {
        let dir = tempfile::tempdir().unwrap();
        let checkout = dir.path();
        std::fs::create_dir_all(checkout.join("docs")).unwrap();
        std::fs::create_dir_all(checkout.join("public")).unwrap();
        std::fs::write(checkout.join("public/logo.png"), png_bytes()).unwrap();

        let mut r = resolver(checkout, None);
        let page = page_at(&checkout.join("docs"), "index.md");
        let src = r.image_src("/public/logo.png", &page).await.unwrap();
        assert!(src.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn missing_without_remote_is_unresolved_and_remembered() {
        let dir = tempfile::tempdir().unwrap();
        let checkout = dir.path();
        std::fs::create_dir_all(checkout.join("docs")).unwrap();

        let mut r = resolver(checkout, None);
        let page = page_at(&checkout.join("docs"), "index.md");
        let err = r.resolve("/docs/light/missing.png", &page).await.unwrap_err();
        assert!(matches!(err, AssetError::Unresolved { page: 1, .. }));
        assert!(r.resolve("/docs/light/missing.png", &page).await.is_err());
        assert_eq!(r.counts().missing, 1);
    }

    #[tokio::test]
    async fn link_embedding_yields_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let checkout = dir.path();
        std::fs::create_dir_all(checkout.join("docs")).unwrap();
        std::fs::write(checkout.join("docs/a.png"), png_bytes()).unwrap();

        let config = ExportConfig::builder()
            .checkout_dir(checkout)
            .asset_cache_dir(checkout.join("cache"))
            .asset_embedding(AssetEmbedding::Link)
            .build()
            .unwrap();
        let mut r = AssetResolver::new(&config, &checkout.join("docs")).unwrap();
        let page = page_at(&checkout.join("docs"), "index.md");
        let src = r.image_src("a.png", &page).await.unwrap();
        assert!(src.starts_with("file://"), "got {src}");
    }
}
