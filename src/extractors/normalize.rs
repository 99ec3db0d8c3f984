// src/extractors/normalize.rs
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{node::Node, ElementRef, Html};

// Subtrees whose text never belongs in the narrative (inline XBRL headers included).
const SKIPPED_TAGS: &[&str] = &["script", "style", "head", "title", "noscript", "template", "ix:header"];

// Elements that end a logical line. Table cells stay on their row's line.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "tr", "li", "table", "ul", "ol", "section", "article", "center",
    "blockquote", "pre", "hr", "dt", "dd", "h1", "h2", "h3", "h4", "h5", "h6",
];

// Any whitespace run that is not a line break.
static HORIZONTAL_WS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\S\n]+").expect("Failed to compile HORIZONTAL_WS_RE"));

/// Converts raw filing markup (HTML, or plain text) into clean text with one
/// logical line per block, no script/style content, non-breaking spaces
/// replaced, horizontal whitespace collapsed and blank lines removed.
pub fn normalize(raw: &str) -> String {
    let document = Html::parse_document(raw);
    let mut flat = String::with_capacity(raw.len() / 2);
    collect_text(document.root_element(), &mut flat);
    tidy_lines(&flat)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text_node) => {
                out.push_str(&text_node.text);
                out.push(' ');
            }
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_TAGS.contains(&name) {
                    continue;
                }
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
                if BLOCK_TAGS.contains(&name) {
                    out.push('\n');
                }
            }
            _ => {} // comments, doctype
        }
    }
}

fn tidy_lines(flat: &str) -> String {
    let spaced = flat.replace('\u{a0}', " ");
    let collapsed = HORIZONTAL_WS_RE.replace_all(&spaced, " ");
    collapsed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_scripts_styles_and_breaks_lines() {
        let html = r#"<html><head><style>.x { color: red; }</style><title>10-K</title></head>
            <body><script>var a = 1;</script>
            <p>Item 1.&nbsp;Business</p>
            <p>We   make<br>widgets.</p>
            </body></html>"#;
        assert_eq!(normalize(html), "Item 1. Business\nWe make\nwidgets.");
    }

    #[test]
    fn test_table_rows_become_lines() {
        let html = "<table><tr><td>Item 1.</td><td>Business</td><td>4</td></tr>\
                    <tr><td>Item 1A.</td><td>Risk Factors</td><td>12</td></tr></table>";
        assert_eq!(normalize(html), "Item 1. Business 4\nItem 1A. Risk Factors 12");
    }

    #[test]
    fn test_plain_text_passes_through() {
        let text = "Line one\n\n   Line \t  two  \r\n\nLine three";
        assert_eq!(normalize(text), "Line one\nLine two\nLine three");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let html = "<div><p>PART I</p><p>Item 1. Business.</p><div>We make <b>widgets</b>.</div></div>";
        let once = normalize(html);
        assert_eq!(normalize(&once), once);
        assert!(once.contains("PART I\nItem 1. Business."));
    }

    #[test]
    fn test_hidden_xbrl_header_is_dropped() {
        let html = r#"<body><div style="display:none"><ix:header><ix:hidden>dei:Secret</ix:hidden></ix:header></div><p>Visible</p></body>"#;
        assert_eq!(normalize(html), "Visible");
    }
}
