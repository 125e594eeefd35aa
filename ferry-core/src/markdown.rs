//! HTML to Markdown conversion for work-item descriptions
//!
//! Source work items store rich text as HTML fragments. This is a compact,
//! lossy conversion covering the markup those fragments actually use;
//! unknown tags are stripped.

use once_cell::sync::Lazy;
use regex::Regex;

static BR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("br regex"));
static BLOCK_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</(p|div|h[1-6]|ul|ol)\s*>").expect("block close regex"));
static HEADING_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<h[1-6][^>]*>").expect("heading regex"));
static LIST_ITEM_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<li[^>]*>").expect("li regex"));
static LIST_ITEM_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</li\s*>").expect("li close"));
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</?(b|strong)\s*>").expect("bold regex"));
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</?(i|em)\s*>").expect("italic regex"));
static ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\s+[^>]*href\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a\s*>"#)
        .expect("anchor regex")
});
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]+>").expect("tag regex"));
static EXCESS_BLANK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("blank regex"));

/// Convert an HTML fragment to Markdown text.
///
/// Plain text passes through unchanged apart from entity decoding.
pub fn html_to_markdown(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let mut text = html.to_string();
    text = ANCHOR.replace_all(&text, "[$2]($1)").into_owned();
    text = BR.replace_all(&text, "\n").into_owned();
    text = HEADING_OPEN.replace_all(&text, "## ").into_owned();
    text = LIST_ITEM_OPEN.replace_all(&text, "- ").into_owned();
    text = LIST_ITEM_CLOSE.replace_all(&text, "\n").into_owned();
    text = BLOCK_CLOSE.replace_all(&text, "\n\n").into_owned();
    text = BOLD.replace_all(&text, "**").into_owned();
    text = ITALIC.replace_all(&text, "*").into_owned();
    text = ANY_TAG.replace_all(&text, "").into_owned();

    text = decode_entities(&text);
    text = EXCESS_BLANK.replace_all(&text, "\n\n").into_owned();
    text.trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(html_to_markdown("just text"), "just text");
        assert_eq!(html_to_markdown(""), "");
    }

    #[test]
    fn test_paragraphs_and_breaks() {
        let html = "<p>first line<br>second line</p><p>next paragraph</p>";
        let md = html_to_markdown(html);
        assert_eq!(md, "first line\nsecond line\n\nnext paragraph");
    }

    #[test]
    fn test_emphasis() {
        assert_eq!(
            html_to_markdown("<b>bold</b> and <em>italic</em>"),
            "**bold** and *italic*"
        );
    }

    #[test]
    fn test_links() {
        assert_eq!(
            html_to_markdown(r#"see <a href="https://example.com/x">the docs</a>"#),
            "see [the docs](https://example.com/x)"
        );
    }

    #[test]
    fn test_list_items() {
        let html = "<ul><li>one</li><li>two</li></ul>";
        let md = html_to_markdown(html);
        assert!(md.contains("- one"));
        assert!(md.contains("- two"));
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(html_to_markdown("a &amp; b &lt;c&gt;"), "a & b <c>");
    }

    #[test]
    fn test_unknown_tags_stripped() {
        assert_eq!(html_to_markdown("<span class=\"x\">kept</span>"), "kept");
    }
}
