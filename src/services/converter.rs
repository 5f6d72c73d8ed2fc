// src/services/converter.rs

//! HTML to Markdown content pipeline.
//!
//! Conversion runs in four pure steps:
//! 1. structural removal of comments, scripts, styles, tracking elements and
//!    class-based navigation chrome,
//! 2. htmd conversion with overrides (`nav`/`header`/`footer` render to
//!    nothing, `<pre>` becomes a fenced block, tables are rebuilt row by row),
//! 3. vertical whitespace normalization,
//! 4. a provenance frontmatter header.

use std::rc::Rc;
use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat, Utc};
use html5ever::Attribute;
use htmd::{
    Element, HtmlToMarkdown,
    element_handler::{HandlerResult, Handlers},
};
use markup5ever_rcdom::{Node as DomNode, NodeData};
use regex::Regex;
use scraper::{Html, Node, Selector};

use crate::error::{AppError, Result};

/// Elements removed together with their content before conversion.
const REMOVED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Navigation chrome recognised by class rather than by tag.
static CHROME_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".navigation, .nav, .navbar, .sidebar, .breadcrumb")
        .expect("chrome selector is valid")
});

static LANGUAGE_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"language-(\w+)|lang-(\w+)").expect("language regex is valid"));
static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("newline regex is valid"));

/// Converts page content into a Markdown document.
#[derive(Debug, Clone, Default)]
pub struct MarkdownConverter {
    strip_selectors: Vec<Selector>,
}

impl MarkdownConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Converter that additionally removes elements matching `selectors`.
    pub fn with_strip_selectors(selectors: &[String]) -> Result<Self> {
        let strip_selectors = selectors
            .iter()
            .map(|s| Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}"))))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { strip_selectors })
    }

    /// Convert an HTML fragment into a Markdown document stamped with the
    /// current time.
    pub fn convert(&self, html: &str, source_url: &str) -> Result<String> {
        self.convert_at(html, source_url, Utc::now())
    }

    /// Convert an HTML fragment into a Markdown document with frontmatter.
    pub fn convert_at(
        &self,
        html: &str,
        source_url: &str,
        crawled_at: DateTime<Utc>,
    ) -> Result<String> {
        let body = self.to_markdown(html)?;
        Ok(with_frontmatter(&body, source_url, crawled_at))
    }

    /// Markdown body without frontmatter, already trimmed.
    pub fn to_markdown(&self, html: &str) -> Result<String> {
        let mut document = Html::parse_fragment(html);
        self.strip_boilerplate(&mut document);
        let cleaned = document.root_element().inner_html();

        let markdown = create_converter()
            .convert(&cleaned)
            .map_err(AppError::conversion)?;

        Ok(collapse_newlines(&markdown).trim().to_string())
    }

    fn strip_boilerplate(&self, document: &mut Html) {
        let mut doomed = Vec::new();

        for node in document.tree.root().descendants() {
            match node.value() {
                Node::Comment(_) => doomed.push(node.id()),
                Node::Element(el)
                    if REMOVED_TAGS.contains(&el.name())
                        || el.attrs().any(|(name, _)| is_tracking_attr(name)) =>
                {
                    doomed.push(node.id());
                }
                _ => {}
            }
        }
        doomed.extend(document.select(&CHROME_SELECTOR).map(|el| el.id()));
        for selector in &self.strip_selectors {
            doomed.extend(document.select(selector).map(|el| el.id()));
        }

        for id in doomed {
            if let Some(mut node) = document.tree.get_mut(id) {
                node.detach();
            }
        }
    }
}

/// htmd converter with the documentation overrides installed.
fn create_converter() -> HtmlToMarkdown {
    HtmlToMarkdown::builder()
        .add_handler(vec!["nav", "header", "footer"], chrome_handler)
        .add_handler(vec!["pre"], pre_handler)
        .add_handler(vec!["table"], table_handler)
        .build()
}

fn chrome_handler(_handlers: &dyn Handlers, _element: Element) -> Option<HandlerResult> {
    Some("".into())
}

/// `<pre>` as a fenced block tagged with the class-declared language.
fn pre_handler(_handlers: &dyn Handlers, element: Element) -> Option<HandlerResult> {
    let code_class = element
        .node
        .children
        .borrow()
        .iter()
        .find(|child| tag_name(child) == Some("code"))
        .and_then(|code| class_of(code));
    let pre_class = get_attr(element.attrs, "class");

    let language =
        detect_language([code_class.as_deref(), pre_class.as_deref()].into_iter().flatten());
    let code = raw_text(element.node);
    let code = code.trim_end_matches('\n');
    let fence = fence_for(code);

    Some(HandlerResult::from(format!(
        "\n\n{fence}{language}\n{code}\n{fence}\n\n"
    )))
}

/// `<table>` rebuilt from its rows; the first row becomes the header.
fn table_handler(_handlers: &dyn Handlers, element: Element) -> Option<HandlerResult> {
    let mut rows = Vec::new();
    collect_rows(element.node, &mut rows);

    let mut lines = Vec::new();
    for row in &rows {
        let cells: Vec<String> = row
            .children
            .borrow()
            .iter()
            .filter(|child| matches!(tag_name(child), Some("td" | "th")))
            .map(|cell| cell_text(cell))
            .collect();
        if cells.is_empty() {
            continue;
        }
        lines.push(format!("| {} |", cells.join(" | ")));
        if lines.len() == 1 {
            lines.push(format!("| {} |", vec!["---"; cells.len()].join(" | ")));
        }
    }

    if lines.is_empty() {
        return Some("".into());
    }
    Some(HandlerResult::from(format!("\n\n{}\n\n", lines.join("\n"))))
}

fn collect_rows(node: &Rc<DomNode>, rows: &mut Vec<Rc<DomNode>>) {
    for child in node.children.borrow().iter() {
        match tag_name(child) {
            Some("tr") => rows.push(Rc::clone(child)),
            // nested tables end up as cell text
            Some("table") => {}
            _ => collect_rows(child, rows),
        }
    }
}

fn cell_text(cell: &Rc<DomNode>) -> String {
    raw_text(cell)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|")
}

fn tag_name(node: &DomNode) -> Option<&str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(&*name.local),
        _ => None,
    }
}

fn class_of(node: &DomNode) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => get_attr(&attrs.borrow(), "class"),
        _ => None,
    }
}

fn get_attr(attrs: &[Attribute], name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|a| &*a.name.local == name)
        .map(|a| a.value.to_string())
        .filter(|v| !v.trim().is_empty())
}

/// Text content exactly as parsed, whitespace included.
fn raw_text(node: &Rc<DomNode>) -> String {
    let mut text = String::new();
    push_raw_text(node, &mut text);
    text
}

fn push_raw_text(node: &Rc<DomNode>, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        NodeData::Comment { .. } | NodeData::ProcessingInstruction { .. } => {}
        _ => {
            for child in node.children.borrow().iter() {
                push_raw_text(child, out);
            }
        }
    }
}

/// An attribute name that marks an analytics or tracking element.
fn is_tracking_attr(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.contains("analytics")
        || name.contains("tracking")
        || name.starts_with("gtm-")
        || name.starts_with("data-gtm")
        || name == "data-ga"
        || name.starts_with("data-ga-")
}

/// A backtick fence longer than any backtick run inside `code`.
fn fence_for(code: &str) -> String {
    let longest = code
        .split(|c: char| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    "`".repeat((longest + 1).max(3))
}

/// Language from the first `language-xxx`/`lang-xxx` class among `classes`.
/// Empty when none carries one.
pub fn detect_language<'a>(classes: impl IntoIterator<Item = &'a str>) -> String {
    classes
        .into_iter()
        .find_map(|class| {
            let caps = LANGUAGE_CLASS.captures(class)?;
            caps.get(1).or_else(|| caps.get(2))
        })
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Replace runs of three or more newlines with exactly two.
pub fn collapse_newlines(markdown: &str) -> String {
    EXCESS_NEWLINES.replace_all(markdown, "\n\n").into_owned()
}

/// Prepend the provenance header to a Markdown body.
pub fn with_frontmatter(body: &str, source_url: &str, crawled_at: DateTime<Utc>) -> String {
    format!(
        "---\nsource: {}\ncrawled_at: {}\n---\n\n{}",
        source_url,
        crawled_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        body.trim()
    )
}
