//! Article extraction from downloaded HTML.
//!
//! Two strategies run over the same document. The structured strategy reads
//! article metadata and paragraph text; the fallback strategy takes the text
//! of the first matching content region. Both must produce at least
//! [`MIN_CONTENT_LENGTH`] characters to count.

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;

pub const MIN_CONTENT_LENGTH: usize = 50;

const BOILERPLATE_TAGS: [&str; 9] = ["script", "style", "nav", "header", "footer", "aside", "noscript", "form", "iframe"];
const BLOCK_TAGS: [&str; 16] = [
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "section", "article", "blockquote", "tr",
];
const FALLBACK_SELECTORS: [&str; 9] = [
    "article",
    "[role=\"main\"]",
    "main",
    ".content",
    ".article-content",
    ".post-content",
    ".entry-content",
    "#content",
    ".story-body",
];

static BLANK_LINES: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n+").ok());
static HORIZONTAL_SPACE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[ \t]+").ok());

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Extracted article content.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedArticle {
    pub title: String,
    pub text: String,
    pub authors: Vec<String>,
    pub publish_date: Option<String>,
}

/// Collapse 3+ newlines to two, runs of spaces and tabs to one space, and trim.
pub fn clean_text(text: &str) -> String {
    let mut out = text.replace("\r\n", "\n");
    if let Some(re) = BLANK_LINES.as_ref() {
        out = re.replace_all(&out, "\n\n").into_owned();
    }
    if let Some(re) = HORIZONTAL_SPACE.as_ref() {
        out = re.replace_all(&out, " ").into_owned();
    }
    out.trim().to_string()
}

fn is_boilerplate(element: &ElementRef) -> bool {
    BOILERPLATE_TAGS.contains(&element.value().name())
}

fn inside_boilerplate(element: &ElementRef) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| is_boilerplate(&ancestor))
}

/// Text of an element with boilerplate subtrees skipped and block elements on their own lines.
fn visible_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                if let Some(child_ref) = ElementRef::wrap(child) {
                    if is_boilerplate(&child_ref) {
                        continue;
                    }
                    let block = BLOCK_TAGS.contains(&el.name());
                    if block {
                        out.push('\n');
                    }
                    visible_text(child_ref, out);
                    if block {
                        out.push('\n');
                    }
                }
            }
            _ => {}
        }
    }
}

fn element_text(element: ElementRef) -> String {
    let mut raw = String::new();
    visible_text(element, &mut raw);
    clean_text(&raw)
}

fn meta_content(document: &Html, css: &str) -> Vec<String> {
    let Some(sel) = selector(css) else {
        return Vec::new();
    };
    document
        .select(&sel)
        .filter_map(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

fn first_text(document: &Html, css: &str) -> Option<String> {
    let sel = selector(css)?;
    document
        .select(&sel)
        .map(|el| clean_text(&el.text().collect::<String>()))
        .find(|t| !t.is_empty())
}

fn page_title(document: &Html) -> String {
    meta_content(document, "meta[property=\"og:title\"]")
        .into_iter()
        .next()
        .or_else(|| first_text(document, "title"))
        .or_else(|| first_text(document, "h1"))
        .unwrap_or_default()
}

/// Structured strategy: metadata plus paragraph text of the main article region.
pub fn extract_structured(document: &Html) -> Option<ParsedArticle> {
    let paragraph = selector("p")?;
    let region = ["article", "main", "[role=\"main\"]"]
        .iter()
        .filter_map(|css| selector(css))
        .find_map(|sel| document.select(&sel).next());

    let paragraphs: Vec<ElementRef> = match region {
        Some(region) => region.select(&paragraph).collect(),
        None => document.select(&paragraph).collect(),
    };
    let text = paragraphs
        .into_iter()
        .filter(|p| !inside_boilerplate(p))
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    let text = clean_text(&text);
    if text.chars().count() < MIN_CONTENT_LENGTH {
        return None;
    }

    let mut authors = meta_content(document, "meta[name=\"author\"]");
    for author in meta_content(document, "meta[property=\"article:author\"]") {
        if !authors.contains(&author) {
            authors.push(author);
        }
    }
    let publish_date = meta_content(document, "meta[property=\"article:published_time\"]")
        .into_iter()
        .next();

    Some(ParsedArticle {
        title: page_title(document),
        text,
        authors,
        publish_date,
    })
}

/// Fallback strategy: text of the first content region that is long enough, else the whole body.
pub fn extract_fallback(document: &Html) -> Option<ParsedArticle> {
    let candidates = FALLBACK_SELECTORS.iter().chain(std::iter::once(&"body"));
    for css in candidates {
        let Some(sel) = selector(css) else {
            continue;
        };
        if let Some(region) = document.select(&sel).next() {
            let text = element_text(region);
            if text.chars().count() >= MIN_CONTENT_LENGTH {
                return Some(ParsedArticle {
                    title: page_title(document),
                    text,
                    authors: Vec::new(),
                    publish_date: None,
                });
            }
        }
    }
    None
}

/// Run the structured strategy, then the fallback.
pub fn extract_article(html: &str) -> Option<ParsedArticle> {
    let document = Html::parse_document(html);
    extract_structured(&document).or_else(|| extract_fallback(&document))
}
