//! The page model shared by every pipeline stage.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// One documentation source file.
///
/// Created by the collector; [`Page::set_fragment`] is called exactly once by
/// the renderer, after which the page is read-only.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based position in the table of contents.
    pub ordinal: usize,
    /// Absolute (or checkout-relative) path of the source file.
    pub source_path: PathBuf,
    /// Path relative to the docs root, with `/` separators.
    pub rel_path: String,
    /// Nesting level in the table of contents (0 = top).
    pub depth: usize,
    /// Hierarchical section number, e.g. `2.1.3`.
    pub number: String,
    pub title: String,
    pub front_matter: Option<FrontMatter>,
    /// Markdown body with front-matter (and a title heading, if used) removed.
    pub markdown: String,
    fragment: Option<String>,
}

impl Page {
    pub fn new(
        ordinal: usize,
        source_path: PathBuf,
        rel_path: String,
        depth: usize,
        title: String,
        front_matter: Option<FrontMatter>,
        markdown: String,
    ) -> Self {
        Self {
            ordinal,
            source_path,
            rel_path,
            depth,
            number: String::new(),
            title,
            front_matter,
            markdown,
            fragment: None,
        }
    }

    /// Anchor id of the page section; the TOC links to it.
    pub fn anchor(&self) -> String {
        anchor_for(self.ordinal)
    }

    /// Label used for both the TOC entry and the section heading.
    pub fn label(&self) -> String {
        if self.number.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.number, self.title)
        }
    }

    /// Path shown under the section heading, e.g. `/01-app/index`.
    pub fn doc_path(&self) -> String {
        let trimmed = self
            .rel_path
            .strip_suffix(".mdx")
            .or_else(|| self.rel_path.strip_suffix(".md"))
            .unwrap_or(&self.rel_path);
        format!("/{trimmed}")
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// Store the rendered fragment. A second call is ignored.
    pub fn set_fragment(&mut self, html: String) {
        if self.fragment.is_some() {
            warn!("Page {} already rendered; ignoring second fragment", self.ordinal);
            return;
        }
        self.fragment = Some(html);
    }

    pub fn description(&self) -> Option<&str> {
        self.front_matter.as_ref().and_then(|f| f.description.as_deref())
    }
}

/// Anchor id for the page at `ordinal`.
pub fn anchor_for(ordinal: usize) -> String {
    format!("page-{ordinal}")
}

/// YAML front-matter recognised on documentation pages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrontMatter {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub related: Option<Related>,
}

/// The `related:` block listing pages to read next.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Related {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub links: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Page {
        Page::new(
            3,
            PathBuf::from("/docs/01-app/setup.mdx"),
            "01-app/setup.mdx".into(),
            1,
            "Setup".into(),
            None,
            "body".into(),
        )
    }

    #[test]
    fn anchor_and_label() {
        let mut p = page();
        assert_eq!(p.anchor(), "page-3");
        assert_eq!(p.label(), "Setup");
        p.number = "1.2".into();
        assert_eq!(p.label(), "1.2 - Setup");
        assert_eq!(p.doc_path(), "/01-app/setup");
    }

    #[test]
    fn fragment_is_set_once() {
        let mut p = page();
        p.set_fragment("<p>first</p>".into());
        p.set_fragment("<p>second</p>".into());
        assert_eq!(p.fragment(), Some("<p>first</p>"));
    }
}
