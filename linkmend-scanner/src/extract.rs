use crate::error::{Result, ScanError};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Maximum document size accepted for parsing (16 MiB).
pub const MAX_DOCUMENT_SIZE: usize = 16 * 1024 * 1024;

/// Default bound on the visible text kept per anchor.
pub const DEFAULT_TEXT_LIMIT: usize = 50;

/// One `<a href>` found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub href: String,
    pub text: String,
    /// Zero-based index among the document's anchors, in document order.
    pub position: usize,
}

/// Decode raw document bytes, rejecting input that cannot be rebuilt into a
/// reliable tree.
pub fn decode_document(bytes: &[u8], path: &Path) -> Result<String> {
    if bytes.len() > MAX_DOCUMENT_SIZE {
        return Err(ScanError::parse_failure(
            path,
            format!("document too large ({} bytes, max {})", bytes.len(), MAX_DOCUMENT_SIZE),
        ));
    }

    let text = std::str::from_utf8(bytes).map_err(|e| {
        ScanError::parse_failure(path, format!("invalid UTF-8 at byte {}", e.valid_up_to()))
    })?;

    if text.contains('\0') {
        return Err(ScanError::parse_failure(path, "document contains NUL bytes"));
    }

    Ok(text.to_string())
}

/// Extract every anchor with a non-empty `href`, in document order.
///
/// The HTML parser recovers from malformed markup; the errors it recovered
/// from are logged and otherwise ignored.
pub fn extract_anchors(html: &str, text_limit: usize) -> Vec<Anchor> {
    let document = Html::parse_document(html);

    if !document.errors.is_empty() {
        debug!("Recovered from {} markup errors", document.errors.len());
    }

    let Ok(selector) = Selector::parse("a") else {
        return Vec::new();
    };

    let mut anchors = Vec::new();
    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if href.trim().is_empty() {
            debug!("Dropping anchor with empty href");
            continue;
        }

        let text = collapse_and_truncate(element.text(), text_limit);
        anchors.push(Anchor {
            href: href.to_string(),
            text,
            position: anchors.len(),
        });
    }

    anchors
}

/// Decode and extract in one step.
pub fn extract_document(bytes: &[u8], path: &Path, text_limit: usize) -> Result<Vec<Anchor>> {
    let html = decode_document(bytes, path)?;
    Ok(extract_anchors(&html, text_limit))
}

fn collapse_and_truncate<'a>(fragments: impl Iterator<Item = &'a str>, limit: usize) -> String {
    let joined: String = fragments.collect();
    let collapsed = joined.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_anchors_in_document_order() {
        let html = r#"<html><body>
            <a href="b.html">B</a>
            <p><a href="https://x.org">  External
               link </a></p>
            <a href="/c">C</a>
        </body></html>"#;

        let anchors = extract_anchors(html, DEFAULT_TEXT_LIMIT);
        assert_eq!(anchors.len(), 3);
        assert_eq!(anchors[0].href, "b.html");
        assert_eq!(anchors[1].text, "External link");
        assert_eq!(anchors[2].position, 2);
    }

    #[test]
    fn test_anchors_without_href_are_dropped() {
        let html = r#"<a name="top">Top</a><a href="">Empty</a><a href="x.html">X</a>"#;
        let anchors = extract_anchors(html, DEFAULT_TEXT_LIMIT);
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].href, "x.html");
        assert_eq!(anchors[0].position, 0);
    }

    #[test]
    fn test_text_is_truncated() {
        let html = format!(r#"<a href="x.html">{}</a>"#, "y".repeat(80));
        let anchors = extract_anchors(&html, 10);
        assert_eq!(anchors[0].text, "yyyyyyyyyy");
    }

    #[test]
    fn test_malformed_markup_is_recovered() {
        let html = r#"<div><a href="one.html">One<div></span><a href="two.html">Two"#;
        let anchors = extract_anchors(html, DEFAULT_TEXT_LIMIT);
        let hrefs: Vec<_> = anchors.iter().map(|a| a.href.as_str()).collect();
        assert_eq!(hrefs, vec!["one.html", "two.html"]);
    }

    #[test]
    fn test_invalid_utf8_is_parse_failure() {
        let bytes = [0x3c, 0x61, 0xff, 0xfe];
        let err = decode_document(&bytes, Path::new("bad.html")).unwrap_err();
        assert!(matches!(err, ScanError::ParseFailure { .. }));
    }

    #[test]
    fn test_no_links_is_not_an_error() {
        let anchors = extract_document(b"<p>nothing here</p>", Path::new("a.html"), 50).unwrap();
        assert!(anchors.is_empty());
    }
}
