//! Markup cleanup for final safety-check reports.
//!
//! Generation may prepend explanatory prose before the report markup. The
//! pipeline recovers the markup payload without assuming well-formed input
//! and refuses to return a result that has lost all structure:
//!
//! 1. Text without any markup delimiters passes through unchanged.
//! 2. Everything before the first `<html>` tag — or, failing that, the first
//!    generic start tag — is discarded.
//! 3. Blank lines are stripped.
//! 4. Residual `safety_report` wrapper tags are removed anywhere.
//! 5. The result must still contain a start/end tag pair, otherwise the
//!    original input is returned unchanged.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// Reserved wrapper tag the agent emits around report markup.
pub const REPORT_WRAPPER_TAG: &str = "safety_report";

static START_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<[a-z][^>]*>").expect("start-tag pattern"));

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*\r?\n").expect("blank-line pattern"));

static WRAPPER_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?safety_report>").expect("wrapper-tag pattern"));

static TAG_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<[a-z][^>]*>.*</[a-z][^>]*>").expect("tag-pair pattern"));

/// Clean a raw final response, recovering the markup payload.
///
/// Never fails: when cleanup would destroy all structure, the original text
/// is returned as-is.
#[must_use]
pub fn sanitize(raw: &str) -> String {
    if !raw.contains('<') || !raw.contains('>') {
        return raw.to_owned();
    }

    let cut = match raw.find("<html>") {
        Some(idx) => &raw[idx..],
        None => match START_TAG.find(raw) {
            Some(m) => &raw[m.start()..],
            None => raw,
        },
    };

    let stripped = BLANK_LINES.replace_all(cut, "");
    let stripped = WRAPPER_TAGS.replace_all(&stripped, "");

    if TAG_PAIR.is_match(&stripped) {
        stripped.into_owned()
    } else {
        debug!("no markup structure left after cleanup, returning original text");
        raw.to_owned()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_unchanged() {
        assert_eq!(sanitize("plain text"), "plain text");
    }

    #[test]
    fn leading_prose_before_html_discarded() {
        assert_eq!(sanitize("noise<html>body</html>"), "<html>body</html>");
    }

    #[test]
    fn wrapper_tags_stripped() {
        assert_eq!(
            sanitize("<safety_report><p>x</p></safety_report>"),
            "<p>x</p>"
        );
    }

    #[test]
    fn tag_free_garbage_unchanged() {
        assert_eq!(sanitize("garbage only"), "garbage only");
    }

    #[test]
    fn falls_back_to_first_generic_tag() {
        assert_eq!(
            sanitize("Here is the report:\n<div>safe</div>"),
            "<div>safe</div>"
        );
    }

    #[test]
    fn blank_lines_stripped() {
        let raw = "<html>\n\n<p>a</p>\n\n<p>b</p>\n</html>";
        assert_eq!(sanitize(raw), "<html>\n<p>a</p>\n<p>b</p>\n</html>");
    }

    #[test]
    fn unclosed_markup_returns_original() {
        // Stripping would leave no start/end pair, so the input survives.
        assert_eq!(sanitize("prose <p>unclosed"), "prose <p>unclosed");
    }

    #[test]
    fn angle_brackets_without_tags_return_original() {
        assert_eq!(sanitize("1 < 2 > 0"), "1 < 2 > 0");
    }

    #[test]
    fn clean_input_is_stable() {
        let clean = "<html><p>already clean</p></html>";
        assert_eq!(sanitize(clean), clean);
        assert_eq!(sanitize(&sanitize(clean)), clean);
    }

    #[test]
    fn prose_before_wrapped_report() {
        let raw = "Let me prepare the briefing.\n\n<safety_report><ul><li>gloves</li></ul></safety_report>";
        assert_eq!(sanitize(raw), "<ul><li>gloves</li></ul>");
    }

    #[test]
    fn uppercase_tags_accepted() {
        assert_eq!(sanitize("noise<DIV>x</DIV>"), "<DIV>x</DIV>");
    }

    #[test]
    fn empty_input_unchanged() {
        assert_eq!(sanitize(""), "");
    }
}
