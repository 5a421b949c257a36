//! Custom-syntax extraction: split page markdown into typed blocks.
//!
//! The documentation mixes plain CommonMark with three extensions that
//! pulldown-cmark does not know about:
//!
//! - admonitions: `!!! note "Title"` followed by an indented body, and
//!   `:::tip Title` … `:::` containers;
//! - `> **Good to know**:` blockquotes, which the site styles as callouts;
//! - MDX component blocks such as `<AppOnly>` … `</AppOnly>` or a multi-line
//!   `<Image srcLight="…" srcDark="…" />`.
//!
//! [`parse_blocks`] recognises these outside fenced code and returns a flat
//! list of [`Block`]s. Everything it does not recognise stays in
//! [`Block::Standard`] and goes to the markdown parser untouched. Callout and
//! component bodies are plain markdown again; the renderer parses them
//! recursively.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// One top-level piece of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Ordinary markdown.
    Standard(String),
    Callout {
        kind: CalloutKind,
        title: Option<String>,
        body: String,
    },
    Component {
        name: String,
        attrs: BTreeMap<String, String>,
        body: String,
    },
}

/// Admonition flavours the stylesheet knows how to draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalloutKind {
    Note,
    Tip,
    Info,
    Warning,
    Danger,
    Important,
    GoodToKnow,
    /// Anything else; rendered as a generic callout.
    Other(String),
}

impl CalloutKind {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "note" => Self::Note,
            "tip" => Self::Tip,
            "info" => Self::Info,
            "warning" => Self::Warning,
            "danger" => Self::Danger,
            "important" => Self::Important,
            "good-to-know" | "good_to_know" | "goodtoknow" => Self::GoodToKnow,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    pub fn css_class(&self) -> &str {
        match self {
            Self::Note => "note",
            Self::Tip => "tip",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Danger => "danger",
            Self::Important => "important",
            Self::GoodToKnow => "good-to-know",
            Self::Other(_) => "generic",
        }
    }

    /// Heading used when the source gives no title.
    pub fn label(&self) -> &str {
        match self {
            Self::Note => "Note",
            Self::Tip => "Tip",
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Danger => "Danger",
            Self::Important => "Important",
            Self::GoodToKnow => "Good to know",
            Self::Other(name) => name,
        }
    }
}

static RE_ADMONITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^!!!\s+([A-Za-z][\w-]*)(?:\s+"([^"]*)")?\s*$"#).unwrap());

static RE_CONTAINER_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:::\s*([A-Za-z][\w-]*)(?:\s+(.*?))?\s*$").unwrap());

static RE_GOOD_TO_KNOW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^>\s*\*\*good to know:?\*\*\s*:?\s*(.*)$").unwrap()
});

static RE_COMPONENT_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<([A-Z][A-Za-z0-9]*)(?:\s|/|>|$)").unwrap());

static RE_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_:][\w:.-]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|\{([^}]*)\}))?"#).unwrap()
});

static RE_INLINE_MARK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(Check|Cross)\b[^>]*/>").unwrap());

/// Split `markdown` into blocks. Fenced code is never inspected.
pub fn parse_blocks(markdown: &str) -> Vec<Block> {
    let lines: Vec<&str> = markdown.lines().collect();
    let mut blocks = Vec::new();
    let mut standard = String::new();
    let mut fence: Option<Fence> = None;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if let Some(ref open) = fence {
            if open.closes(line) {
                fence = None;
            }
            push_line(&mut standard, line);
            i += 1;
            continue;
        }
        if let Some(open) = Fence::open(line) {
            fence = Some(open);
            push_line(&mut standard, line);
            i += 1;
            continue;
        }
        if let Some(next) = mdx_comment(&lines, i) {
            i = next;
            continue;
        }

        let found = admonition(&lines, i)
            .or_else(|| container(&lines, i))
            .or_else(|| good_to_know(&lines, i))
            .or_else(|| component(&lines, i));
        if let Some((block, next)) = found {
            flush(&mut standard, &mut blocks);
            blocks.push(block);
            i = next;
            continue;
        }

        push_line(&mut standard, line);
        i += 1;
    }

    flush(&mut standard, &mut blocks);
    blocks
}

/// `{/* … */}` starting at line `i`, possibly spanning several lines.
/// Returns the index after the closing line; an unclosed comment is text.
fn mdx_comment(lines: &[&str], i: usize) -> Option<usize> {
    let first = lines[i].trim();
    let rest = first.strip_prefix("{/*")?;
    if rest.trim_end().ends_with("*/}") {
        return Some(i + 1);
    }
    lines[i + 1..]
        .iter()
        .position(|l| l.trim_end().ends_with("*/}"))
        .map(|offset| i + offset + 2)
}

/// Replace inline `<Check />` / `<Cross />` marks outside fenced code.
pub fn replace_inline_marks(markdown: &str) -> String {
    if !RE_INLINE_MARK.is_match(markdown) {
        return markdown.to_string();
    }
    let mut out = String::with_capacity(markdown.len());
    let mut fence: Option<Fence> = None;
    for line in markdown.lines() {
        match fence {
            Some(ref open) => {
                if open.closes(line) {
                    fence = None;
                }
                push_line(&mut out, line);
            }
            None => {
                fence = Fence::open(line);
                if fence.is_some() {
                    push_line(&mut out, line);
                } else {
                    let replaced = RE_INLINE_MARK.replace_all(line, |caps: &regex::Captures| {
                        mark_html(&caps[1]).to_string()
                    });
                    push_line(&mut out, &replaced);
                }
            }
        }
    }
    out
}

/// HTML for a `Check`/`Cross` mark.
pub fn mark_html(name: &str) -> &'static str {
    if name == "Cross" {
        r#"<span class="mark cross">✗</span>"#
    } else {
        r#"<span class="mark check">✓</span>"#
    }
}

fn push_line(buf: &mut String, line: &str) {
    buf.push_str(line);
    buf.push('\n');
}

fn flush(standard: &mut String, blocks: &mut Vec<Block>) {
    if !standard.trim().is_empty() {
        blocks.push(Block::Standard(std::mem::take(standard)));
    }
    standard.clear();
}

// ── Fences ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Fence {
    marker: char,
    len: usize,
}

impl Fence {
    fn open(line: &str) -> Option<Self> {
        let trimmed = line.trim_start();
        let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let len = trimmed.chars().take_while(|c| *c == marker).count();
        (len >= 3).then_some(Self { marker, len })
    }

    fn closes(&self, line: &str) -> bool {
        let trimmed = line.trim();
        let run = trimmed.chars().take_while(|c| *c == self.marker).count();
        run >= self.len && trimmed.chars().skip(run).all(char::is_whitespace)
    }
}

// ── Callouts ─────────────────────────────────────────────────────────────

/// `!!! kind "Title"` followed by a 4-space (or tab) indented body.
fn admonition(lines: &[&str], start: usize) -> Option<(Block, usize)> {
    let caps = RE_ADMONITION.captures(lines[start])?;
    let kind = CalloutKind::parse(&caps[1]);
    let title = caps.get(2).map(|m| m.as_str().trim().to_string());

    let mut end = start + 1;
    let mut j = start + 1;
    while j < lines.len() {
        let line = lines[j];
        if line.trim().is_empty() {
            j += 1;
            continue;
        }
        if line.starts_with("    ") || line.starts_with('\t') {
            j += 1;
            end = j;
        } else {
            break;
        }
    }

    let mut body = String::new();
    for line in &lines[start + 1..end] {
        let stripped = line
            .strip_prefix("    ")
            .or_else(|| line.strip_prefix('\t'))
            .unwrap_or(line.trim_start());
        push_line(&mut body, stripped);
    }

    Some((
        Block::Callout {
            kind,
            title: title.filter(|t| !t.is_empty()),
            body,
        },
        end,
    ))
}

/// `:::kind Optional title` … `:::`, nesting allowed.
fn container(lines: &[&str], start: usize) -> Option<(Block, usize)> {
    let caps = RE_CONTAINER_OPEN.captures(lines[start].trim_end())?;
    let kind = CalloutKind::parse(&caps[1]);
    let title = caps
        .get(2)
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty());

    let mut depth = 1;
    let mut fence: Option<Fence> = None;
    for (j, line) in lines.iter().enumerate().skip(start + 1) {
        if let Some(ref open) = fence {
            if open.closes(line) {
                fence = None;
            }
            continue;
        }
        if let Some(open) = Fence::open(line) {
            fence = Some(open);
            continue;
        }
        let trimmed = line.trim();
        if trimmed == ":::" {
            depth -= 1;
            if depth == 0 {
                let body = join_lines(&lines[start + 1..j]);
                return Some((Block::Callout { kind, title, body }, j + 1));
            }
        } else if RE_CONTAINER_OPEN.is_match(trimmed) {
            depth += 1;
        }
    }
    None
}

/// `> **Good to know**: …` and the rest of that blockquote.
fn good_to_know(lines: &[&str], start: usize) -> Option<(Block, usize)> {
    let caps = RE_GOOD_TO_KNOW.captures(lines[start].trim_end())?;
    let mut body = String::new();
    let first = caps[1].trim();
    if !first.is_empty() {
        push_line(&mut body, first);
    }

    let mut j = start + 1;
    while j < lines.len() {
        let Some(rest) = lines[j].trim_start().strip_prefix('>') else {
            break;
        };
        push_line(&mut body, rest.strip_prefix(' ').unwrap_or(rest));
        j += 1;
    }

    Some((
        Block::Callout {
            kind: CalloutKind::GoodToKnow,
            title: None,
            body,
        },
        j,
    ))
}

// ── Components ───────────────────────────────────────────────────────────

/// A capitalised MDX element starting a line: `<Name …/>` or
/// `<Name …>` … `</Name>`. The opening tag may span several lines.
fn component(lines: &[&str], start: usize) -> Option<(Block, usize)> {
    let first = lines[start].trim_start();
    let caps = RE_COMPONENT_OPEN.captures(first)?;
    let name = caps[1].to_string();

    // Find the end of the opening tag, honouring quotes and `{…}`.
    let mut tag = String::new();
    let mut quote: Option<char> = None;
    let mut braces = 0usize;
    let mut tag_end: Option<(usize, String)> = None;
    'lines: for (k, line) in lines.iter().enumerate().skip(start) {
        let segment: &str = if k == start {
            &first[1 + name.len()..]
        } else {
            *line
        };
        for (pos, ch) in segment.char_indices() {
            match (quote, ch) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '"') | (None, '\'') => quote = Some(ch),
                (None, '{') => braces += 1,
                (None, '}') => braces = braces.saturating_sub(1),
                (None, '>') if braces == 0 => {
                    tag.push_str(&segment[..pos]);
                    let rest = segment[pos + 1..].to_string();
                    tag_end = Some((k, rest));
                    break 'lines;
                }
                _ => {}
            }
        }
        tag.push_str(segment);
        tag.push('\n');
    }
    let (tag_line, rest) = tag_end?;

    let self_closing = tag.trim_end().ends_with('/');
    let attrs = parse_attrs(tag.trim_end().trim_end_matches('/'));
    let rest = rest.trim();

    if self_closing {
        if !rest.is_empty() {
            return None;
        }
        return Some((
            Block::Component {
                name,
                attrs,
                body: String::new(),
            },
            tag_line + 1,
        ));
    }

    let close = format!("</{name}>");
    if let Some(inner) = rest.strip_suffix(close.as_str()) {
        return Some((
            Block::Component {
                name,
                attrs,
                body: inner.trim().to_string(),
            },
            tag_line + 1,
        ));
    }
    if !rest.is_empty() {
        return None;
    }

    let open_prefix = format!("<{name}");
    let mut depth = 1;
    let mut fence: Option<Fence> = None;
    for (j, line) in lines.iter().enumerate().skip(tag_line + 1) {
        if let Some(ref open) = fence {
            if open.closes(line) {
                fence = None;
            }
            continue;
        }
        if let Some(open) = Fence::open(line) {
            fence = Some(open);
            continue;
        }
        let trimmed = line.trim();
        if trimmed == close {
            depth -= 1;
            if depth == 0 {
                let body = dedent(&lines[tag_line + 1..j]);
                return Some((Block::Component { name, attrs, body }, j + 1));
            }
        } else if trimmed.starts_with(&open_prefix)
            && RE_COMPONENT_OPEN
                .captures(trimmed)
                .is_some_and(|c| c[1] == name)
            && !trimmed.ends_with("/>")
        {
            depth += 1;
        }
    }
    None
}

fn parse_attrs(tag: &str) -> BTreeMap<String, String> {
    RE_ATTR
        .captures_iter(tag)
        .map(|caps| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().to_string())
                .or_else(|| {
                    caps.get(4).map(|m| {
                        m.as_str()
                            .trim()
                            .trim_matches(|c| c == '"' || c == '\'' || c == '`')
                            .to_string()
                    })
                })
                .unwrap_or_else(|| "true".to_string());
            (caps[1].to_string(), value)
        })
        .collect()
}

fn join_lines(lines: &[&str]) -> String {
    let mut out = String::new();
    for line in lines {
        push_line(&mut out, line);
    }
    out
}

/// Strip the common leading whitespace of non-blank lines.
fn dedent(lines: &[&str]) -> String {
    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);
    let mut out = String::new();
    for line in lines {
        let cut = indent.min(line.len() - line.trim_start_matches([' ', '\t']).len());
        push_line(&mut out, &line[cut..]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_markdown_is_one_standard_block() {
        let blocks = parse_blocks("# Hi\n\nSome *text*.\n");
        assert_eq!(blocks, vec![Block::Standard("# Hi\n\nSome *text*.\n".into())]);
    }

    #[test]
    fn bang_admonition_with_indented_body() {
        let md = "Before\n\n!!! warning \"Careful\"\n    Line one\n\n    Line two\n\nAfter\n";
        let blocks = parse_blocks(md);
        assert_eq!(blocks.len(), 3);
        match &blocks[1] {
            Block::Callout { kind, title, body } => {
                assert_eq!(*kind, CalloutKind::Warning);
                assert_eq!(title.as_deref(), Some("Careful"));
                assert_eq!(body, "Line one\n\nLine two\n");
            }
            other => panic!("expected callout, got {other:?}"),
        }
        assert!(matches!(&blocks[2], Block::Standard(s) if s.contains("After")));
    }

    #[test]
    fn colon_container_and_unknown_kind() {
        let md = ":::sidebar Extra reading\nBody **bold**\n:::\n";
        let blocks = parse_blocks(md);
        assert_eq!(
            blocks,
            vec![Block::Callout {
                kind: CalloutKind::Other("sidebar".into()),
                title: Some("Extra reading".into()),
                body: "Body **bold**\n".into(),
            }]
        );
    }

    #[test]
    fn unclosed_container_stays_markdown() {
        let blocks = parse_blocks(":::tip\nnever closed\n");
        assert!(matches!(&blocks[0], Block::Standard(_)));
    }

    #[test]
    fn good_to_know_blockquote() {
        let md = "> **Good to know**: first\n> - a\n> - b\n\nNext\n";
        let blocks = parse_blocks(md);
        match &blocks[0] {
            Block::Callout { kind, body, .. } => {
                assert_eq!(*kind, CalloutKind::GoodToKnow);
                assert_eq!(body, "first\n- a\n- b\n");
            }
            other => panic!("expected callout, got {other:?}"),
        }
    }

    #[test]
    fn multiline_self_closing_image() {
        let md = "<Image\n  alt=\"Routing\"\n  srcLight=\"/docs/light/routing.png\"\n  srcDark=\"/docs/dark/routing.png\"\n  width={1600}\n/>\n";
        let blocks = parse_blocks(md);
        match &blocks[0] {
            Block::Component { name, attrs, body } => {
                assert_eq!(name, "Image");
                assert_eq!(attrs["alt"], "Routing");
                assert_eq!(attrs["srcLight"], "/docs/light/routing.png");
                assert_eq!(attrs["width"], "1600");
                assert!(body.is_empty());
            }
            other => panic!("expected component, got {other:?}"),
        }
    }

    #[test]
    fn component_with_body_and_nesting() {
        let md = "<AppOnly>\n\n  Text for app.\n\n  <AppOnly>\n  inner\n  </AppOnly>\n\n</AppOnly>\nafter\n";
        let blocks = parse_blocks(md);
        match &blocks[0] {
            Block::Component { name, body, .. } => {
                assert_eq!(name, "AppOnly");
                assert!(body.starts_with("\nText for app."));
                assert!(body.contains("</AppOnly>"));
            }
            other => panic!("expected component, got {other:?}"),
        }
        assert!(matches!(&blocks[1], Block::Standard(s) if s == "after\n"));
    }

    #[test]
    fn syntax_inside_code_fence_is_ignored() {
        let md = "```md\n!!! note\n    not a callout\n<AppOnly>\n```\n";
        let blocks = parse_blocks(md);
        assert_eq!(blocks, vec![Block::Standard(md.into())]);
    }

    #[test]
    fn mdx_comments_are_dropped() {
        let blocks = parse_blocks("a\n{/* hidden note */}\nb\n");
        assert_eq!(blocks, vec![Block::Standard("a\nb\n".into())]);
    }

    #[test]
    fn multi_line_mdx_comments_are_dropped() {
        let md = "a\n{/*\n  draft paragraph\n  <Image src=\"/x.png\" />\n*/}\nb\n";
        let blocks = parse_blocks(md);
        assert_eq!(blocks, vec![Block::Standard("a\nb\n".into())]);
    }

    #[test]
    fn unclosed_mdx_comment_stays_text() {
        let blocks = parse_blocks("{/* open\nstill text\n");
        assert_eq!(blocks, vec![Block::Standard("{/* open\nstill text\n".into())]);
    }

    #[test]
    fn inline_marks_outside_code() {
        let md = "| a | <Check size={18} /> |\n```\n<Cross />\n```\n";
        let out = replace_inline_marks(md);
        assert!(out.contains("mark check"));
        assert!(out.contains("```\n<Cross />\n```"));
    }

    #[test]
    fn callout_kind_parsing() {
        assert_eq!(CalloutKind::parse("Note"), CalloutKind::Note);
        assert_eq!(CalloutKind::parse("good-to-know").label(), "Good to know");
        assert!(!CalloutKind::parse("aside").is_known());
        assert_eq!(CalloutKind::parse("aside").css_class(), "generic");
    }
}
