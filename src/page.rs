//! Fact extraction from rendered HTML.
//!
//! Pure functions over the page source: document title, script/style-stripped
//! body text and a best-effort footer block. The checks never touch raw HTML
//! themselves; they consume a [`PageFacts`] extracted once per record.

use scraper::{ElementRef, Html, Selector};

/// Fallback tail length when no footer element can be located, in characters
/// (the pages are Chinese, byte offsets would split code points).
const FOOTER_TAIL_CHARS: usize = 1000;

/// Normalized text facts for one fetched page.
#[derive(Debug, Clone, Default)]
pub struct PageFacts {
    pub title: String,
    pub body_text: String,
    pub footer_text: String,
}

/// Extract all facts in one pass over the document.
pub fn extract(html: &str) -> PageFacts {
    PageFacts {
        title: title(html),
        body_text: body_text(html),
        footer_text: footer_text(html),
    }
}

/// The document title, trimmed. Empty when the page has none.
pub fn title(html: &str) -> String {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("title") else {
        return String::new();
    };
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Visible text with script and style elements removed, tokens joined with
/// single spaces.
pub fn body_text(html: &str) -> String {
    let document = Html::parse_document(html);
    element_text(document.root_element())
}

/// Best-effort footer block: an explicit `<footer>` element, then any element
/// whose class or id mentions "footer", then "bottom", then the final
/// characters of the body text. The chain stops at the first non-empty hit.
pub fn footer_text(html: &str) -> String {
    let document = Html::parse_document(html);

    if let Ok(selector) = Selector::parse("footer") {
        for element in document.select(&selector) {
            let text = element_text(element);
            if !text.is_empty() {
                return text;
            }
        }
    }

    for marker in ["footer", "bottom"] {
        if let Some(text) = text_by_class_or_id(&document, marker) {
            return text;
        }
    }

    let body = body_text(html);
    let chars: Vec<char> = body.chars().collect();
    if chars.len() > FOOTER_TAIL_CHARS {
        chars[chars.len() - FOOTER_TAIL_CHARS..].iter().collect()
    } else {
        body
    }
}

/// First element whose class or id contains `marker` (case-insensitive) and
/// yields non-empty text.
fn text_by_class_or_id(document: &Html, marker: &str) -> Option<String> {
    for element in document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
    {
        let value = element.value();
        let hit = value
            .attr("class")
            .map_or(false, |c| c.to_lowercase().contains(marker))
            || value
                .attr("id")
                .map_or(false, |i| i.to_lowercase().contains(marker));
        if hit {
            let text = element_text(element);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

fn element_text(element: ElementRef) -> String {
    let mut tokens: Vec<String> = Vec::new();
    collect_visible_text(element, &mut tokens);
    tokens.join(" ")
}

fn collect_visible_text(element: ElementRef, out: &mut Vec<String>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.extend(text.split_whitespace().map(str::to_string));
        } else if let Some(child_element) = ElementRef::wrap(child) {
            if !matches!(child_element.value().name(), "script" | "style") {
                collect_visible_text(child_element, out);
            }
        }
    }
}
