//! Markup stripping shared by the API strategies.
//!
//! Board APIs return descriptions as HTML fragments. We keep readable
//! plain text: tags removed, entities decoded, whitespace collapsed.
//! Source-specific vocabulary mappings stay in each strategy.

use std::sync::OnceLock;

use regex::Regex;

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid regex"))
}

fn ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

/// Strip HTML tags, decode common entities, collapse whitespace.
pub fn strip_html(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let text = tag_re().replace_all(html, " ");
    let text = decode_entities(&text);
    ws_re().replace_all(text.trim(), " ").into_owned()
}

/// Decode the entities that actually show up in job descriptions.
fn decode_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_html_basic() {
        assert_eq!(strip_html("<p>Hello <b>world</b></p>"), "Hello world");
        assert_eq!(strip_html(""), "");
    }

    #[test]
    fn test_strip_html_entities_and_whitespace() {
        assert_eq!(
            strip_html("<div>Design &amp; build\n\n  APIs</div>"),
            "Design & build APIs"
        );
        assert_eq!(strip_html("5+ years&nbsp;experience"), "5+ years experience");
    }
}
