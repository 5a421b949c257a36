//! Markdown rendering: one page's markdown to one HTML fragment.
//!
//! Rendering runs in two passes so that recursion over callout and component
//! bodies stays synchronous:
//!
//! 1. Walk the page's blocks and collect every image reference, then resolve
//!    them all through the [`AssetResolver`] (the only async, fallible step).
//! 2. Render the blocks with pulldown-cmark, rewriting link targets through
//!    the [`LinkTable`] and image sources through the map built in pass 1.
//!    Headings get page-scoped ids (`page-N-<slug>`) so in-page links land.

use crate::config::MissingAssetPolicy;
use crate::error::{AssetError, RenderWarning};
use crate::page::Page;
use crate::pipeline::assets::AssetResolver;
use crate::pipeline::links::{self, LinkTable};
use crate::pipeline::syntax::{self, Block, CalloutKind};
use once_cell::sync::Lazy;
use pulldown_cmark::{html, CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

/// A page rendered to HTML, plus what degraded on the way.
#[derive(Debug, Clone, Default)]
pub struct RenderedPage {
    pub html: String,
    pub warnings: Vec<RenderWarning>,
}

/// Render `page` to an HTML fragment.
///
/// Unresolvable images become a visible placeholder and a
/// [`RenderWarning::MissingAsset`], unless `policy` is
/// [`MissingAssetPolicy::Abort`], in which case the first one is returned as
/// an error.
pub async fn render_page(
    page: &Page,
    links: &LinkTable,
    assets: &mut AssetResolver,
    policy: MissingAssetPolicy,
) -> Result<RenderedPage, AssetError> {
    let blocks = syntax::parse_blocks(&page.markdown);

    let mut references = Vec::new();
    let mut sourceless = 0;
    collect_image_refs(&blocks, &mut references, &mut sourceless);
    if sourceless > 0 && policy == MissingAssetPolicy::Abort {
        return Err(AssetError::Unresolved {
            reference: String::new(),
            page: page.ordinal,
            detail: NO_SOURCE.into(),
        });
    }

    let mut images: HashMap<String, Option<String>> = HashMap::new();
    let mut warnings = Vec::new();
    for reference in references {
        if images.contains_key(&reference) {
            continue;
        }
        match assets.image_src(&reference, page).await {
            Ok(src) => {
                images.insert(reference, Some(src));
            }
            Err(err) if policy == MissingAssetPolicy::Abort => return Err(err),
            Err(err) => {
                warn!("Page {}: {}", page.ordinal, err);
                warnings.push(RenderWarning::MissingAsset {
                    page: page.ordinal,
                    reference: reference.clone(),
                    detail: err.to_string(),
                });
                images.insert(reference, None);
            }
        }
    }

    let mut renderer = Renderer {
        page,
        links,
        images: &images,
        warnings,
        heading_ids: HashSet::new(),
    };
    let mut html = String::new();
    renderer.render_blocks(&blocks, &mut html);
    debug!("Page {} rendered ({} bytes)", page.ordinal, html.len());

    Ok(RenderedPage {
        html,
        warnings: renderer.warnings,
    })
}

fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
        | Options::ENABLE_SMART_PUNCTUATION
        | Options::ENABLE_DEFINITION_LIST
}

// ── Pass 1: image references ─────────────────────────────────────────────

const NO_SOURCE: &str = "<Image> has no src, srcLight or srcDark";

/// Image references in document order; `<Image>` components without any
/// source are counted in `sourceless`.
fn collect_image_refs(blocks: &[Block], out: &mut Vec<String>, sourceless: &mut usize) {
    for block in blocks {
        match block {
            Block::Standard(md) => {
                for event in Parser::new_ext(md, markdown_options()) {
                    if let Event::Start(Tag::Image { dest_url, .. }) = event {
                        if !dest_url.is_empty() {
                            out.push(dest_url.to_string());
                        }
                    }
                }
            }
            Block::Callout { body, .. } => {
                collect_image_refs(&syntax::parse_blocks(body), out, sourceless)
            }
            Block::Component { name, attrs, body } => {
                if name == "Image" {
                    match image_component_src(attrs) {
                        Some(src) => out.push(src.to_string()),
                        None => *sourceless += 1,
                    }
                }
                collect_image_refs(&syntax::parse_blocks(body), out, sourceless);
            }
        }
    }
}

/// `src`, else the light-theme variant, else the dark one.
fn image_component_src(attrs: &BTreeMap<String, String>) -> Option<&str> {
    ["src", "srcLight", "srcDark"]
        .iter()
        .filter_map(|k| attrs.get(*k))
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
}

// ── Pass 2: HTML ─────────────────────────────────────────────────────────

struct Renderer<'a> {
    page: &'a Page,
    links: &'a LinkTable,
    images: &'a HashMap<String, Option<String>>,
    warnings: Vec<RenderWarning>,
    /// Heading ids handed out on this page.
    heading_ids: HashSet<String>,
}

impl Renderer<'_> {
    fn render_blocks(&mut self, blocks: &[Block], out: &mut String) {
        for block in blocks {
            match block {
                Block::Standard(md) => self.render_markdown(md, out),
                Block::Callout { kind, title, body } => {
                    self.render_callout(kind, title.as_deref(), body, out)
                }
                Block::Component { name, attrs, body } => {
                    self.render_component(name, attrs, body, out)
                }
            }
        }
    }

    fn render_markdown(&mut self, md: &str, out: &mut String) {
        let md = syntax::replace_inline_marks(md);
        let mut events: Vec<Event> = Vec::new();
        let mut skipping_image = false;

        for event in Parser::new_ext(&md, markdown_options()) {
            if skipping_image {
                if matches!(event, Event::End(TagEnd::Image)) {
                    skipping_image = false;
                }
                continue;
            }
            match event {
                Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => {
                    let href = self.links.rewrite(&dest_url, self.page);
                    events.push(Event::Start(Tag::Link {
                        link_type,
                        dest_url: href.into(),
                        title,
                        id,
                    }));
                }
                Event::Start(Tag::Image {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => match self.images.get(&*dest_url) {
                    Some(Some(src)) => events.push(Event::Start(Tag::Image {
                        link_type,
                        dest_url: src.clone().into(),
                        title,
                        id,
                    })),
                    _ => {
                        events.push(Event::InlineHtml(missing_image_html(&dest_url).into()));
                        skipping_image = true;
                    }
                },
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                    let info = CodeInfo::parse(&info);
                    if let Some(header) = info.header_html() {
                        events.push(Event::Html(header.into()));
                    }
                    events.push(Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(
                        info.language.into(),
                    ))));
                }
                other => events.push(other),
            }
        }

        self.assign_heading_ids(&mut events);
        html::push_html(out, events.into_iter());
    }

    /// Give every heading a unique `page-N-<slug>` id. Explicit `{#id}`
    /// attributes are kept but namespaced the same way.
    fn assign_heading_ids(&mut self, events: &mut [Event]) {
        for i in 0..events.len() {
            let Event::Start(Tag::Heading { ref id, .. }) = events[i] else {
                continue;
            };
            let source = match id {
                Some(explicit) => explicit.to_string(),
                None => heading_text(&events[i + 1..]),
            };
            let mut base = links::fragment_anchor(self.page.ordinal, &source);
            if base == self.page.anchor() {
                base.push_str("-section");
            }
            let mut anchor = base.clone();
            let mut repeat = 0;
            while !self.heading_ids.insert(anchor.clone()) {
                repeat += 1;
                anchor = format!("{base}-{repeat}");
            }
            if let Event::Start(Tag::Heading { ref mut id, .. }) = events[i] {
                *id = Some(anchor.into());
            }
        }
    }

    fn render_callout(&mut self, kind: &CalloutKind, title: Option<&str>, body: &str, out: &mut String) {
        if !kind.is_known() {
            warn!(
                "Page {}: unsupported callout '{}'",
                self.page.ordinal,
                kind.label()
            );
            self.warnings.push(RenderWarning::UnsupportedCallout {
                page: self.page.ordinal,
                kind: kind.label().to_string(),
            });
        }
        let heading = title.unwrap_or_else(|| kind.label());
        out.push_str(&format!(
            "<div class=\"callout callout-{}\">\n<p class=\"callout-title\">{}</p>\n",
            kind.css_class(),
            html_escape::encode_text(heading)
        ));
        self.render_blocks(&syntax::parse_blocks(body), out);
        out.push_str("</div>\n");
    }

    fn render_component(
        &mut self,
        name: &str,
        attrs: &BTreeMap<String, String>,
        body: &str,
        out: &mut String,
    ) {
        match name {
            "AppOnly" | "PagesOnly" => {
                let label = if name == "AppOnly" {
                    "App Router"
                } else {
                    "Pages Router"
                };
                out.push_str(&format!(
                    "<div class=\"component router-only\">\n<p class=\"router-label\">{label}</p>\n"
                ));
                self.render_blocks(&syntax::parse_blocks(body), out);
                out.push_str("</div>\n");
            }
            "Image" => {
                let alt = attrs.get("alt").map(String::as_str).unwrap_or_default();
                match image_component_src(attrs) {
                    Some(reference) => match self.images.get(reference) {
                        Some(Some(src)) => out.push_str(&format!(
                            "<figure class=\"image\"><img src=\"{}\" alt=\"{}\" /></figure>\n",
                            html_escape::encode_double_quoted_attribute(src),
                            html_escape::encode_double_quoted_attribute(alt)
                        )),
                        _ => {
                            out.push_str(&missing_image_html(reference));
                            out.push('\n');
                        }
                    },
                    None => {
                        self.warnings.push(RenderWarning::MissingAsset {
                            page: self.page.ordinal,
                            reference: String::new(),
                            detail: NO_SOURCE.into(),
                        });
                        out.push_str(&missing_image_html(alt));
                        out.push('\n');
                    }
                }
            }
            "Check" | "Cross" => {
                out.push_str(syntax::mark_html(name));
                out.push('\n');
            }
            _ => {
                warn!("Page {}: unsupported component <{}>", self.page.ordinal, name);
                self.warnings.push(RenderWarning::UnsupportedComponent {
                    page: self.page.ordinal,
                    name: name.to_string(),
                });
                out.push_str(&format!(
                    "<div class=\"component\" data-component=\"{}\">\n",
                    html_escape::encode_double_quoted_attribute(name)
                ));
                if body.trim().is_empty() {
                    out.push_str(&format!("<p>{}</p>\n", html_escape::encode_text(name)));
                } else {
                    self.render_blocks(&syntax::parse_blocks(body), out);
                }
                out.push_str("</div>\n");
            }
        }
    }
}

/// Plain text of the heading whose content starts at `events[0]`.
fn heading_text(events: &[Event]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::End(TagEnd::Heading(_)) => break,
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    text
}

fn missing_image_html(reference: &str) -> String {
    format!(
        "<span class=\"missing-asset\">[missing image: {}]</span>",
        html_escape::encode_text(reference)
    )
}

static RE_FILENAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"filename\s*=\s*"([^"]*)""#).unwrap());

/// A fenced code block's info string, e.g. `tsx filename="app/page.tsx" switcher`.
#[derive(Debug, PartialEq, Eq)]
struct CodeInfo {
    language: String,
    filename: Option<String>,
}

impl CodeInfo {
    fn parse(info: &str) -> Self {
        let language = info
            .split_whitespace()
            .next()
            .filter(|t| !t.contains('='))
            .map(|t| t.split('{').next().unwrap_or_default().to_string())
            .unwrap_or_default();
        let filename = RE_FILENAME
            .captures(info)
            .map(|c| c[1].to_string())
            .filter(|f| !f.is_empty());
        Self { language, filename }
    }

    fn header_html(&self) -> Option<String> {
        let filename = html_escape::encode_text(self.filename.as_deref()?);
        Some(if self.language.is_empty() {
            format!("<div class=\"code-header\"><i>{filename}</i></div>\n")
        } else {
            format!(
                "<div class=\"code-header\"><i>{filename} ({})</i></div>\n",
                html_escape::encode_text(&self.language)
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExportConfig;
    use std::path::{Path, PathBuf};

    fn page(markdown: &str) -> Page {
        Page::new(
            2,
            PathBuf::from("/nowhere/docs/01-app/setup.mdx"),
            "01-app/setup.mdx".into(),
            1,
            "Setup".into(),
            None,
            markdown.into(),
        )
    }

    fn resolver(dir: &Path) -> AssetResolver {
        let config = ExportConfig::builder()
            .checkout_dir(dir)
            .asset_cache_dir(dir.join("cache"))
            .asset_base_url(None)
            .build()
            .unwrap();
        AssetResolver::new(&config, &dir.join("docs")).unwrap()
    }

    async fn render(markdown: &str, policy: MissingAssetPolicy) -> Result<RenderedPage, AssetError> {
        let dir = tempfile::tempdir().unwrap();
        let p = page(markdown);
        let links = LinkTable::new(std::slice::from_ref(&p), Some("https://nextjs.org".into()));
        let mut assets = resolver(dir.path());
        render_page(&p, &links, &mut assets, policy).await
    }

    #[tokio::test]
    async fn code_is_escaped_literally() {
        let md = "```tsx\nconst a = b < c && `x`;\n```\n";
        let out = render(md, MissingAssetPolicy::Placeholder).await.unwrap();
        assert!(out.html.contains("class=\"language-tsx\""));
        assert!(out.html.contains("const a = b &lt; c &amp;&amp; `x`;"));
    }

    #[tokio::test]
    async fn code_header_shows_filename() {
        let md = "```tsx filename=\"app/page.tsx\" switcher\nexport default 1\n```\n";
        let out = render(md, MissingAssetPolicy::Placeholder).await.unwrap();
        assert!(out.html.contains("<div class=\"code-header\"><i>app/page.tsx (tsx)</i></div>"));
        assert!(out.html.contains("class=\"language-tsx\""));
    }

    #[tokio::test]
    async fn callouts_and_unknown_kinds() {
        let md = "!!! tip\n    Use **this**.\n\n:::aside Side note\nText\n:::\n";
        let out = render(md, MissingAssetPolicy::Placeholder).await.unwrap();
        assert!(out.html.contains("callout-tip"));
        assert!(out.html.contains("<strong>this</strong>"));
        assert!(out.html.contains("callout-generic"));
        assert!(out.html.contains("Side note"));
        assert_eq!(
            out.warnings,
            vec![RenderWarning::UnsupportedCallout {
                page: 2,
                kind: "aside".into()
            }]
        );
    }

    #[tokio::test]
    async fn components_render_or_degrade() {
        let md = "<PagesOnly>\n\nPages text.\n\n</PagesOnly>\n\n<Sandpack>\ncode\n</Sandpack>\n\n<Check />\n";
        let out = render(md, MissingAssetPolicy::Placeholder).await.unwrap();
        assert!(out.html.contains("Pages Router"));
        assert!(out.html.contains("Pages text."));
        assert!(out.html.contains("data-component=\"Sandpack\""));
        assert!(out.html.contains("mark check"));
        assert_eq!(out.warnings.len(), 1);
        assert!(matches!(&out.warnings[0], RenderWarning::UnsupportedComponent { name, .. } if name == "Sandpack"));
    }

    #[tokio::test]
    async fn links_are_rewritten() {
        let md = "[self](/docs/app/setup) [ext](https://vercel.com) [other](/docs/pages/x)";
        let out = render(md, MissingAssetPolicy::Placeholder).await.unwrap();
        assert!(out.html.contains("href=\"#page-2\""));
        assert!(out.html.contains("href=\"https://vercel.com\""));
        assert!(out.html.contains("href=\"https://nextjs.org/docs/pages/x\""));
    }

    #[tokio::test]
    async fn missing_image_placeholder_or_abort() {
        let md = "Before ![diagram](/docs/light/none.png) after\n";
        let out = render(md, MissingAssetPolicy::Placeholder).await.unwrap();
        assert!(out.html.contains("class=\"missing-asset\""));
        assert!(out.html.contains("after"));
        assert!(!out.html.contains("<img"));
        assert!(matches!(&out.warnings[0], RenderWarning::MissingAsset { reference, .. } if reference == "/docs/light/none.png"));

        let err = render(md, MissingAssetPolicy::Abort).await.unwrap_err();
        assert_eq!(err.reference(), "/docs/light/none.png");
    }

    #[tokio::test]
    async fn headings_get_page_scoped_ids_that_fragments_reach() {
        let md = "See [options](#options) and [more](#Options).\n\n## Options\n\n### Options\n\n## Custom {#Tuning}\n";
        let out = render(md, MissingAssetPolicy::Placeholder).await.unwrap();
        assert!(out.html.contains("<a href=\"#page-2-options\">options</a>"));
        assert!(out.html.contains("<h2 id=\"page-2-options\">Options</h2>"));
        assert!(out.html.contains("<h3 id=\"page-2-options-1\">Options</h3>"));
        assert!(out.html.contains("<h2 id=\"page-2-tuning\">Custom</h2>"));
    }

    #[tokio::test]
    async fn heading_ids_are_unique_across_blocks() {
        let md = "## Usage\n\n!!! note\n    ## Usage\n";
        let out = render(md, MissingAssetPolicy::Placeholder).await.unwrap();
        assert!(out.html.contains("id=\"page-2-usage\""));
        assert!(out.html.contains("id=\"page-2-usage-1\""));
    }

    #[tokio::test]
    async fn definition_lists_and_typographic_quotes() {
        let md = "Route\n:   A \"path\" that's served -- eventually...\n";
        let out = render(md, MissingAssetPolicy::Placeholder).await.unwrap();
        assert!(out.html.contains("<dl>"), "got {}", out.html);
        assert!(out.html.contains("<dt>Route</dt>"));
        assert!(out.html.contains("\u{201c}path\u{201d}"));
        assert!(out.html.contains("that\u{2019}s"));
        assert!(out.html.contains("\u{2013}"));
        assert!(out.html.contains("\u{2026}"));
    }

    #[tokio::test]
    async fn image_component_without_source() {
        let md = "<Image alt=\"Diagram\" width=\"600\" />\n";
        let out = render(md, MissingAssetPolicy::Placeholder).await.unwrap();
        assert!(out.html.contains("class=\"missing-asset\""));
        assert!(matches!(&out.warnings[0], RenderWarning::MissingAsset { reference, .. } if reference.is_empty()));

        let err = render(md, MissingAssetPolicy::Abort).await.unwrap_err();
        assert!(matches!(err, AssetError::Unresolved { page: 2, .. }));
        assert_eq!(err.reference(), "");
    }

    #[test]
    fn code_info_parsing() {
        assert_eq!(
            CodeInfo::parse("js{1,3} filename=\"next.config.js\""),
            CodeInfo {
                language: "js".into(),
                filename: Some("next.config.js".into())
            }
        );
        assert_eq!(CodeInfo::parse("").language, "");
        assert!(CodeInfo::parse("bash").header_html().is_none());
    }
}
