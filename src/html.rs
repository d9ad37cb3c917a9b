//! Best-effort conversion of HTML email bodies to plain text.
//!
//! Verification emails frequently arrive as HTML. The extractor runs its patterns
//! against both the raw body and this normalized form, so the conversion only has
//! to be good enough for phrase matching — it strips tags, decodes the handful of
//! entities that commonly wrap codes, and collapses blank lines. It never fails:
//! anything that is not recognizably HTML passes through untouched.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// Converts an HTML body to plain text.
///
/// If the body contains no markup indicators (no `<html`, `<div`, or `<p` tag
/// openings), it is returned unchanged. The conversion is fail-open: it is pure
/// string processing and cannot error.
///
/// # Example
///
/// ```
/// use temp_inbox::html::to_plain_text;
///
/// let text = to_plain_text("<p>Your code is <b>123456</b></p>");
/// assert_eq!(text, "Your code is 123456");
///
/// // Plain text passes through unchanged (borrowed, no allocation)
/// assert_eq!(to_plain_text("已 plain text"), "已 plain text");
/// ```
#[must_use]
pub fn to_plain_text(body: &str) -> Cow<'_, str> {
    if !looks_like_html(body) {
        return Cow::Borrowed(body);
    }

    let stripped = TAG.replace_all(body, "");
    let decoded = decode_entities(&stripped);

    let lines: Vec<&str> = decoded
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    Cow::Owned(lines.join("\n"))
}

/// Heuristic markup check: tag openings for `html`, `div`, or `p`.
fn looks_like_html(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("<html") || lower.contains("<div") || lower.contains("<p")
}

/// Decodes the five entities that commonly appear around verification codes.
fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_unchanged() {
        let body = "Your verification code is: 403912";
        assert!(matches!(to_plain_text(body), Cow::Borrowed(_)));
        assert_eq!(to_plain_text(body), body);
    }

    #[test]
    fn test_strips_tags() {
        let body = "<p>Your verification code is: <b>066533</b></p>";
        assert_eq!(to_plain_text(body), "Your verification code is: 066533");
    }

    #[test]
    fn test_decodes_entities() {
        let body = "<div>Code:&nbsp;AB12CD &amp; more &lt;here&gt; &quot;quoted&quot;</div>";
        assert_eq!(to_plain_text(body), "Code: AB12CD & more <here> \"quoted\"");
    }

    #[test]
    fn test_collapses_blank_lines() {
        let body = "<html><body>\n\n  line one  \n\n\n<p>line two</p>\n\n</body></html>";
        assert_eq!(to_plain_text(body), "line one\nline two");
    }

    #[test]
    fn test_angle_brackets_without_markup_indicator() {
        // "a < b" is not HTML; no html/div/p opening present
        let body = "compare: 3 < 5 and 7 > 2";
        assert_eq!(to_plain_text(body), body);
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(to_plain_text(""), "");
    }
}
