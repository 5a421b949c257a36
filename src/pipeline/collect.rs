//! Page collection: walk the docs tree and fix the reading order.
//!
//! Two ordering sources exist. A navigation manifest at the docs root (a YAML
//! list of relative page paths) wins when present. Otherwise the order comes
//! from file naming: the docs use numeric prefixes (`01-app/02-guides/…`), so
//! sorting paths component by component, with each directory's `index` page
//! first, reproduces the live site's navigation.

use crate::error::{PageCollectionError, RenderWarning};
use crate::page::{FrontMatter, Page};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Pages in reading order, plus any non-fatal problems found on the way.
#[derive(Debug)]
pub struct CollectedPages {
    pub pages: Vec<Page>,
    pub warnings: Vec<RenderWarning>,
}

/// Collect every exportable page under `docs_root`.
pub fn collect_pages(
    docs_root: &Path,
    manifest_name: &str,
) -> Result<CollectedPages, PageCollectionError> {
    if !docs_root.is_dir() {
        return Err(PageCollectionError::RootMissing {
            path: docs_root.to_path_buf(),
        });
    }

    let manifest = docs_root.join(manifest_name);
    let ordered: Vec<(PathBuf, String)> = if !manifest_name.is_empty() && manifest.is_file() {
        info!("Using navigation manifest {}", manifest.display());
        read_manifest(docs_root, &manifest)?
    } else {
        walk_tree(docs_root, manifest_name)?
    };

    if ordered.is_empty() {
        return Err(PageCollectionError::NoPages {
            path: docs_root.to_path_buf(),
        });
    }

    let mut pages = Vec::with_capacity(ordered.len());
    let mut warnings = Vec::new();
    let mut counters: Vec<usize> = Vec::new();

    for (i, (path, rel)) in ordered.into_iter().enumerate() {
        let ordinal = i + 1;
        let raw = std::fs::read_to_string(&path).map_err(|e| PageCollectionError::Io {
            path: path.clone(),
            source: e,
        })?;

        let split = split_front_matter(&raw);
        if let Some(detail) = split.error {
            warn!("{}: malformed front-matter: {}", rel, detail);
            warnings.push(RenderWarning::MalformedFrontMatter {
                page: ordinal,
                detail,
            });
        }

        let (title, markdown) = resolve_title(split.front_matter.as_ref(), split.body, &path);
        let depth = page_depth(&rel);
        let mut page = Page::new(
            ordinal,
            path,
            rel,
            depth,
            title,
            split.front_matter,
            markdown,
        );
        page.number = next_section_number(&mut counters, depth);
        debug!("Page {} [{}] {}", ordinal, page.number, page.rel_path);
        pages.push(page);
    }

    info!("Collected {} pages from {}", pages.len(), docs_root.display());
    Ok(CollectedPages { pages, warnings })
}

// ── Ordering ─────────────────────────────────────────────────────────────

fn read_manifest(
    docs_root: &Path,
    manifest: &Path,
) -> Result<Vec<(PathBuf, String)>, PageCollectionError> {
    let text = std::fs::read_to_string(manifest).map_err(|e| PageCollectionError::Io {
        path: manifest.to_path_buf(),
        source: e,
    })?;
    let entries: Vec<String> =
        serde_yaml::from_str(&text).map_err(|e| PageCollectionError::ManifestInvalid {
            path: manifest.to_path_buf(),
            detail: e.to_string(),
        })?;

    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        let rel = entry
            .trim()
            .trim_start_matches("./")
            .trim_start_matches('/')
            .to_string();
        if rel.is_empty() || rel.split('/').any(|c| c == "..") {
            return Err(PageCollectionError::ManifestInvalid {
                path: manifest.to_path_buf(),
                detail: format!("invalid entry '{entry}'"),
            });
        }
        let path = docs_root.join(&rel);
        if !path.is_file() {
            return Err(PageCollectionError::ManifestEntryMissing { entry });
        }
        if seen.insert(rel.clone()) {
            out.push((path, rel));
        }
    }
    Ok(out)
}

fn walk_tree(
    docs_root: &Path,
    manifest_name: &str,
) -> Result<Vec<(PathBuf, String)>, PageCollectionError> {
    let mut files = Vec::new();
    let walker = WalkDir::new(docs_root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_excluded(e));

    for entry in walker {
        let entry = entry.map_err(|e| PageCollectionError::Io {
            path: e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| docs_root.to_path_buf()),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() || !is_markdown(entry.path()) {
            continue;
        }
        let rel = relative_slash_path(docs_root, entry.path());
        if rel == manifest_name {
            continue;
        }
        files.push((entry.into_path(), rel));
    }

    files.sort_by(|a, b| compare_nav_paths(&a.1, &b.1));
    Ok(files)
}

fn is_excluded(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name.starts_with('_')
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("md") || e.eq_ignore_ascii_case("mdx"))
}

fn relative_slash_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_index_file(name: &str) -> bool {
    name == "index.md" || name == "index.mdx"
}

/// Navigation order: component-wise, `index` pages first in their directory.
pub(crate) fn compare_nav_paths(a: &str, b: &str) -> Ordering {
    let mut ai = a.split('/').peekable();
    let mut bi = b.split('/').peekable();
    loop {
        match (ai.next(), bi.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let x_index = ai.peek().is_none() && is_index_file(x);
                let y_index = bi.peek().is_none() && is_index_file(y);
                let ord = y_index.cmp(&x_index).then_with(|| x.cmp(y));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

// ── Structure ────────────────────────────────────────────────────────────

/// TOC depth: directory nesting, with index pages standing for their directory.
fn page_depth(rel: &str) -> usize {
    let mut parts = rel.split('/');
    let name = parts.next_back().unwrap_or_default();
    let depth = parts.count();
    if is_index_file(name) && depth > 0 {
        depth - 1
    } else {
        depth
    }
}

/// Advance the counter at `depth`, reset deeper levels, and format `1.2.3`.
fn next_section_number(counters: &mut Vec<usize>, depth: usize) -> String {
    if counters.len() <= depth {
        counters.resize(depth + 1, 0);
    }
    counters[depth] += 1;
    counters.truncate(depth + 1);
    counters
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

// ── Front-matter and title ───────────────────────────────────────────────

struct SplitPage {
    front_matter: Option<FrontMatter>,
    body: String,
    error: Option<String>,
}

fn split_front_matter(raw: &str) -> SplitPage {
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let mut lines = text.split_inclusive('\n');
    let first = lines.next().unwrap_or_default();
    if first.trim_end() != "---" {
        return SplitPage {
            front_matter: None,
            body: text.to_string(),
            error: None,
        };
    }

    let mut yaml = String::new();
    let mut consumed = first.len();
    let mut closed = false;
    for line in lines {
        consumed += line.len();
        if line.trim_end() == "---" {
            closed = true;
            break;
        }
        yaml.push_str(line);
    }
    if !closed {
        return SplitPage {
            front_matter: None,
            body: text.to_string(),
            error: None,
        };
    }

    let body = text[consumed..].to_string();
    if yaml.trim().is_empty() {
        return SplitPage {
            front_matter: Some(FrontMatter::default()),
            body,
            error: None,
        };
    }
    match serde_yaml::from_str::<FrontMatter>(&yaml) {
        Ok(fm) => SplitPage {
            front_matter: Some(fm),
            body,
            error: None,
        },
        Err(e) => SplitPage {
            front_matter: None,
            body,
            error: Some(e.to_string()),
        },
    }
}

/// Title from front-matter, else a leading `# ` heading (which is then
/// dropped from the body), else the file name.
fn resolve_title(front_matter: Option<&FrontMatter>, body: String, path: &Path) -> (String, String) {
    if let Some(title) = front_matter
        .and_then(|f| f.title.as_deref())
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return (title.to_string(), body);
    }

    let leading = body
        .lines()
        .find(|l| !l.trim().is_empty())
        .and_then(|l| l.trim_start().strip_prefix("# "))
        .map(|t| t.trim().to_string());
    if let Some(title) = leading.filter(|t| !t.is_empty()) {
        let mut rest = String::with_capacity(body.len());
        let mut dropped = false;
        for line in body.split_inclusive('\n') {
            if !dropped && line.trim_start().starts_with("# ") {
                dropped = true;
                continue;
            }
            rest.push_str(line);
        }
        return (title, rest);
    }

    (title_from_file_name(path), body)
}

fn title_from_file_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = if stem == "index" {
        path.parent()
            .and_then(|p| p.file_name())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or(stem)
    } else {
        stem
    };
    let without_prefix = match stem.split_once('-') {
        Some((prefix, rest)) if prefix.chars().all(|c| c.is_ascii_digit()) && !rest.is_empty() => {
            rest
        }
        _ => stem.as_str(),
    };
    without_prefix
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
