//! Internal link rewriting.
//!
//! Pages link to each other the way the live site routes them
//! (`/docs/app/building-your-application/routing`), while the source tree
//! carries ordering prefixes (`01-app/01-building-your-application/…`).
//! [`LinkTable`] maps both spellings onto the `#page-N` anchors of the
//! assembled document. Heading fragments are namespaced per page as
//! `#page-N-<slug>`, the same ids the renderer gives headings.

use crate::page::{anchor_for, Page};
use std::collections::HashMap;

/// Route → page ordinal, built once after collection.
#[derive(Debug, Clone, Default)]
pub struct LinkTable {
    routes: HashMap<String, usize>,
    site_url: Option<String>,
}

impl LinkTable {
    pub fn new(pages: &[Page], site_url: Option<String>) -> Self {
        let mut routes = HashMap::new();
        for page in pages {
            routes
                .entry(normalize_route(&page.rel_path))
                .or_insert(page.ordinal);
            routes
                .entry(strip_page_suffix(&page.rel_path))
                .or_insert(page.ordinal);
        }
        Self {
            routes,
            site_url: site_url.map(|u| u.trim_end_matches('/').to_string()),
        }
    }

    /// Ordinal of the page a docs-root-relative route points at.
    pub fn lookup(&self, route: &str) -> Option<usize> {
        let path = route.trim_start_matches('/');
        let path = path.strip_prefix("docs/").unwrap_or(path);
        let path = if path == "docs" { "" } else { path };
        self.routes
            .get(&normalize_route(path))
            .or_else(|| self.routes.get(&strip_page_suffix(path)))
            .copied()
    }

    /// Rewrite an `href` found on page `from`.
    ///
    /// Known pages become `#page-N` (or `#page-N-<slug>` with a fragment);
    /// in-page `#fragment`s get the current page's prefix. Unknown
    /// site-absolute links are sent to the live site and external links are
    /// returned as-is.
    pub fn rewrite(&self, href: &str, from: &Page) -> String {
        if href.is_empty() || is_external(href) {
            return href.to_string();
        }
        if let Some(fragment) = href.strip_prefix('#') {
            if fragment.is_empty() {
                return href.to_string();
            }
            return format!("#{}", fragment_anchor(from.ordinal, fragment));
        }
        let (target, fragment) = href.split_once('#').unwrap_or((href, ""));
        let path = target.split('?').next().unwrap_or_default();

        let ordinal = if path.starts_with('/') {
            self.lookup(path)
        } else {
            let joined = join_relative(&from.rel_path, path);
            self.routes.get(&normalize_route(&joined)).copied()
        };
        match ordinal {
            Some(ordinal) => format!("#{}", fragment_anchor(ordinal, fragment)),
            None if path.starts_with('/') => match self.site_url {
                Some(ref site) => format!("{site}{href}"),
                None => href.to_string(),
            },
            None => href.to_string(),
        }
    }

    /// Rewrite a front-matter `related.links` entry (docs-root-relative).
    pub fn rewrite_related(&self, link: &str) -> String {
        if is_external(link) {
            return link.to_string();
        }
        if let Some(ordinal) = self.lookup(link) {
            return format!("#{}", anchor_for(ordinal));
        }
        let route = link.trim_start_matches('/');
        let route = route.strip_prefix("docs/").unwrap_or(route);
        match self.site_url {
            Some(ref site) => format!("{site}/docs/{route}"),
            None => link.to_string(),
        }
    }
}

/// `page-N-<slug>` for a heading fragment on page `ordinal`; just `page-N`
/// when the fragment slugs to nothing.
pub(crate) fn fragment_anchor(ordinal: usize, fragment: &str) -> String {
    let slug = slugify(fragment);
    if slug.is_empty() {
        anchor_for(ordinal)
    } else {
        format!("{}-{}", anchor_for(ordinal), slug)
    }
}

/// Heading text to a fragment: lowercase word characters, with runs of
/// whitespace and hyphens collapsed to one `-`. Other punctuation is dropped.
pub(crate) fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.trim().chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }
    slug
}

fn is_external(href: &str) -> bool {
    if href.starts_with("//") {
        return true;
    }
    match href.split_once(':') {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
                && !scheme.contains('/')
        }
        None => false,
    }
}

/// Resolve `target` against the directory of the page at `from_rel`.
fn join_relative(from_rel: &str, target: &str) -> String {
    let mut parts: Vec<&str> = from_rel.split('/').collect();
    parts.pop();
    for part in target.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

fn strip_page_suffix(path: &str) -> String {
    let path = path.trim_matches('/');
    let path = path
        .strip_suffix(".mdx")
        .or_else(|| path.strip_suffix(".md"))
        .unwrap_or(path);
    let path = path.strip_suffix("/index").unwrap_or(path);
    if path == "index" {
        String::new()
    } else {
        path.to_string()
    }
}

/// Route as the live site spells it: no extension, no `index`, no numeric
/// ordering prefixes.
pub(crate) fn normalize_route(path: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    for part in strip_page_suffix(path).split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(strip_order_prefix(other).to_string()),
        }
    }
    parts.join("/")
}

fn strip_order_prefix(component: &str) -> &str {
    match component.split_once('-') {
        Some((prefix, rest))
            if !prefix.is_empty() && !rest.is_empty() && prefix.bytes().all(|b| b.is_ascii_digit()) =>
        {
            rest
        }
        _ => component,
    }
}
