//! Document assembly: cover, table of contents and page sections in one
//! HTML document.

use crate::config::ExportConfig;
use crate::error::AssemblyError;
use crate::output::{AssembledDocument, TocEntry};
use crate::page::Page;
use crate::pipeline::links::LinkTable;
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fmt::Write as _;
use tracing::{debug, info};

/// Stylesheet used when no custom one is configured.
pub const DEFAULT_STYLESHEET: &str = include_str!("../../assets/default.css");

static RE_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"v(\d+\.\d+\.\d+)").unwrap());

/// Table-of-contents entries for `pages`, in ordinal order.
pub fn toc_entries(pages: &[Page]) -> Vec<TocEntry> {
    pages
        .iter()
        .map(|p| TocEntry {
            ordinal: p.ordinal,
            depth: p.depth,
            label: p.label(),
            anchor: p.anchor(),
            source: p.rel_path.clone(),
        })
        .collect()
}

/// Highest `vX.Y.Z` mentioned in any fragment, by semver ordering.
pub fn detect_version(pages: &[Page]) -> Option<String> {
    pages
        .iter()
        .filter_map(Page::fragment)
        .flat_map(|html| RE_VERSION.captures_iter(html))
        .filter_map(|caps| semver::Version::parse(&caps[1]).ok())
        .max()
        .map(|v| v.to_string())
}

/// Build the final HTML document from rendered pages.
pub fn assemble(
    pages: &[Page],
    config: &ExportConfig,
    links: &LinkTable,
) -> Result<AssembledDocument, AssemblyError> {
    validate_pages(pages)?;

    let stylesheet = match config.stylesheet {
        Some(ref path) => {
            std::fs::read_to_string(path).map_err(|e| AssemblyError::Stylesheet {
                path: path.clone(),
                source: e,
            })?
        }
        None => DEFAULT_STYLESHEET.to_string(),
    };
    let version = detect_version(pages);
    let title = config.document_title(version.as_deref());
    let date = config
        .cover_date
        .clone()
        .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
    let toc = toc_entries(pages);

    let mut html = String::with_capacity(
        stylesheet.len() + pages.iter().filter_map(Page::fragment).map(str::len).sum::<usize>(),
    );

    // `write!` into a String cannot fail.
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>\n{}\n</style>\n</head>\n<body>\n",
        text(&title),
        stylesheet
    );

    let _ = write!(
        html,
        "<section class=\"cover\">\n<div class=\"container\">\n<div class=\"title\">{}</div>\n<div class=\"date\">Date: {}</div>\n</div>\n</section>\n",
        text(&title),
        text(&date)
    );

    html.push_str("<nav class=\"toc\">\n<h1>Table of Contents</h1>\n");
    for entry in &toc {
        let _ = writeln!(
            html,
            "<div class=\"toc-entry depth-{}\" style=\"margin-left: {}em\"><a href=\"#{}\">{}</a></div>",
            entry.depth,
            entry.depth * 2,
            attr(&entry.anchor),
            text(&entry.label)
        );
    }
    html.push_str("</nav>\n");

    let mut section_anchors = HashSet::with_capacity(pages.len());
    for page in pages {
        let anchor = page.anchor();
        let fragment = page.fragment().ok_or_else(|| AssemblyError::MissingFragment {
            ordinal: page.ordinal,
            title: page.title.clone(),
        })?;

        let _ = write!(
            html,
            "<section class=\"page\">\n<h1 id=\"{}\">{}</h1>\n<div class=\"doc-path\"><p>Documentation path: {}</p></div>\n",
            attr(&anchor),
            text(&page.label()),
            text(&page.doc_path())
        );
        if let Some(description) = page.description() {
            let _ = writeln!(
                html,
                "<p class=\"description\"><strong>Description:</strong> {}</p>",
                text(description)
            );
        }
        write_related(&mut html, page, links);
        html.push_str(fragment);
        html.push_str("\n</section>\n");

        debug!("Assembled section {} ({})", anchor, page.rel_path);
        section_anchors.insert(anchor);
    }
    html.push_str("</body>\n</html>\n");

    for entry in &toc {
        if !section_anchors.contains(&entry.anchor) {
            return Err(AssemblyError::DanglingTocEntry {
                anchor: entry.anchor.clone(),
            });
        }
    }

    info!(
        "Assembled '{}' with {} sections ({} bytes)",
        title,
        toc.len(),
        html.len()
    );
    Ok(AssembledDocument {
        title,
        version,
        toc,
        html,
    })
}

fn validate_pages(pages: &[Page]) -> Result<(), AssemblyError> {
    let mut anchors = HashSet::with_capacity(pages.len());
    for (i, page) in pages.iter().enumerate() {
        if page.ordinal != i + 1 {
            return Err(AssemblyError::OrdinalGap {
                expected: i + 1,
                found: page.ordinal,
            });
        }
        if page.fragment().is_none() {
            return Err(AssemblyError::MissingFragment {
                ordinal: page.ordinal,
                title: page.title.clone(),
            });
        }
        let anchor = page.anchor();
        if !anchors.insert(anchor.clone()) {
            return Err(AssemblyError::DuplicateAnchor { anchor });
        }
    }
    Ok(())
}

fn write_related(html: &mut String, page: &Page, links: &LinkTable) {
    let Some(related) = page.front_matter.as_ref().and_then(|f| f.related.as_ref()) else {
        return;
    };
    let _ = write!(
        html,
        "<div class=\"related\">\n<p><strong>{}</strong></p>\n",
        text(related.title.as_deref().unwrap_or("Related"))
    );
    if let Some(ref description) = related.description {
        let _ = writeln!(html, "<p>{}</p>", text(description));
    }
    if !related.links.is_empty() {
        html.push_str("<ul>\n");
        for link in &related.links {
            let _ = writeln!(
                html,
                "<li><a href=\"{}\">{}</a></li>",
                attr(&links.rewrite_related(link)),
                text(link)
            );
        }
        html.push_str("</ul>\n");
    }
    html.push_str("</div>\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{FrontMatter, Related};
    use std::path::PathBuf;

    fn rendered(ordinal: usize, rel: &str, title: &str, number: &str, html: &str) -> Page {
        let mut p = Page::new(
            ordinal,
            PathBuf::from(rel),
            rel.into(),
            number.matches('.').count(),
            title.into(),
            None,
            String::new(),
        );
        p.number = number.into();
        p.set_fragment(html.into());
        p
    }

    fn config() -> ExportConfig {
        ExportConfig::builder().cover_date("2024-01-01").build().unwrap()
    }

    fn pages() -> Vec<Page> {
        vec![
            rendered(1, "index.md", "Intro", "1", "<p>Welcome to v14.2.0</p>"),
            rendered(2, "guide/setup.md", "Setup", "1.1", "<p>Install v15.0.3 or v9.10.1</p>"),
            rendered(3, "usage.md", "Usage", "2", "<p>Use it.</p>"),
        ]
    }

    #[test]
    fn toc_links_every_section_in_order() {
        let pages = pages();
        let links = LinkTable::new(&pages, None);
        let doc = assemble(&pages, &config(), &links).unwrap();

        let labels: Vec<_> = doc.toc.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["1 - Intro", "1.1 - Setup", "2 - Usage"]);

        let mut last = 0;
        for entry in &doc.toc {
            let href = format!("href=\"#{}\"", entry.anchor);
            let id = format!("id=\"{}\"", entry.anchor);
            assert!(doc.html.contains(&href));
            let pos = doc.html.find(&id).expect("section for toc entry");
            assert!(pos > last, "sections out of order");
            last = pos;
        }
    }

    #[test]
    fn version_drives_title() {
        let pages = pages();
        assert_eq!(detect_version(&pages).as_deref(), Some("15.0.3"));
        let doc = assemble(&pages, &config(), &LinkTable::new(&pages, None)).unwrap();
        assert_eq!(doc.title, "Next.js v15.0.3 Documentation");
        assert!(doc.html.contains("<div class=\"title\">Next.js v15.0.3 Documentation</div>"));
        assert!(doc.html.contains("Date: 2024-01-01"));
    }

    #[test]
    fn output_is_deterministic() {
        let pages = pages();
        let links = LinkTable::new(&pages, None);
        let a = assemble(&pages, &config(), &links).unwrap();
        let b = assemble(&pages, &config(), &links).unwrap();
        assert_eq!(a.html, b.html);
    }

    #[test]
    fn missing_fragment_is_rejected() {
        let mut pages = pages();
        pages.push(Page::new(
            4,
            PathBuf::from("x.md"),
            "x.md".into(),
            0,
            "X".into(),
            None,
            String::new(),
        ));
        let err = assemble(&pages, &config(), &LinkTable::default()).unwrap_err();
        assert!(matches!(err, AssemblyError::MissingFragment { ordinal: 4, .. }));
    }

    #[test]
    fn ordinal_gap_is_rejected() {
        let pages = vec![
            rendered(1, "a.md", "A", "1", ""),
            rendered(3, "b.md", "B", "2", ""),
        ];
        let err = assemble(&pages, &config(), &LinkTable::default()).unwrap_err();
        assert!(matches!(err, AssemblyError::OrdinalGap { expected: 2, found: 3 }));
    }

    #[test]
    fn front_matter_metadata_is_rendered() {
        let mut page = Page::new(
            1,
            PathBuf::from("01-app/index.mdx"),
            "01-app/index.mdx".into(),
            0,
            "App <Router>".into(),
            Some(FrontMatter {
                title: Some("App <Router>".into()),
                description: Some("All about the app router".into()),
                related: Some(Related {
                    title: Some("Next steps".into()),
                    description: None,
                    links: vec!["app/index".into(), "pages/other".into()],
                }),
            }),
            String::new(),
        );
        page.number = "1".into();
        page.set_fragment("<p>body</p>".into());
        let pages = vec![page];
        let links = LinkTable::new(&pages, Some("https://nextjs.org".into()));
        let doc = assemble(&pages, &config(), &links).unwrap();

        assert!(doc.html.contains("1 - App &lt;Router&gt;"));
        assert!(doc.html.contains("Documentation path: /01-app/index"));
        assert!(doc.html.contains("All about the app router"));
        assert!(doc.html.contains("<a href=\"#page-1\">app/index</a>"));
        assert!(doc.html.contains("https://nextjs.org/docs/pages/other"));
    }

    #[test]
    fn custom_stylesheet_missing_is_an_error() {
        let pages = pages();
        let config = ExportConfig::builder()
            .cover_date("2024-01-01")
            .stylesheet("/definitely/not/here.css")
            .build()
            .unwrap();
        let err = assemble(&pages, &config, &LinkTable::default()).unwrap_err();
        assert!(matches!(err, AssemblyError::Stylesheet { .. }));
    }
}
