//! Passes over already-converted HTML: preview truncation and `<code>` tag
//! highlighting for template and pass-through content.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::application::render::types::MORE_MARKER;

use super::{
    escape::unescape_html,
    highlight::{CodeHighlighter, LanguageResolution, highlight_fragment},
};

static TAGGED_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<code lang="([^\n]+?)">((?s:.+?))</code>"#).expect("tagged code pattern is valid")
});

static BARE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<code>((?s:.+?))</code>").expect("bare code pattern is valid"));

/// Content before the first preview marker, if the marker is present.
pub(crate) fn truncate_at_marker(content: &str) -> Option<&str> {
    content.find(MORE_MARKER).map(|offset| &content[..offset])
}

/// Replace `<code lang="X">` elements with highlighting for `X`, then bare
/// `<code>` elements with a detected grammar.
///
/// Element bodies are HTML, so entities are decoded before highlighting.
pub(crate) fn highlight_code_tags(html: &str, highlighter: &dyn CodeHighlighter) -> String {
    let tagged = TAGGED_CODE.replace_all(html, |captures: &Captures<'_>| {
        highlight_fragment(
            highlighter,
            Some(&captures[1]),
            &unescape_html(&captures[2]),
            LanguageResolution::Strict,
        )
    });

    BARE_CODE
        .replace_all(&tagged, |captures: &Captures<'_>| {
            highlight_fragment(
                highlighter,
                None,
                &unescape_html(&captures[1]),
                LanguageResolution::Detect,
            )
        })
        .into_owned()
}
