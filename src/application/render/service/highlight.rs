use metrics::counter;
use syntect::{
    dumps::from_uncompressed_data,
    html::{ClassStyle, ClassedHTMLGenerator},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};
use tracing::warn;

use crate::application::render::types::RenderError;

use super::escape::{escape_attribute, escape_html};

/// Class carried by the span wrapping each rendered code line.
pub const LINE_CLASS: &str = "__line";

const LINE_OPEN: &str = "<span class=\"__line\">";

/// How a missing or unrecognised language hint is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageResolution {
    /// Only a recognised hint selects a grammar; otherwise the code stays plain.
    Strict,
    /// Fall back to first-line detection (shebangs, modelines, XML prologs).
    ///
    /// Detection never inspects the rest of the fragment, so code without
    /// such a first line stays plain.
    Detect,
}

/// Grammar-driven highlighting of a single code fragment.
///
/// Implementations return `Ok(None)` when no grammar applies. Errors are
/// recovered by the caller, which falls back to the escaped source text.
pub trait CodeHighlighter: Send + Sync {
    fn highlight(
        &self,
        language: Option<&str>,
        code: &str,
        resolution: LanguageResolution,
    ) -> Result<Option<String>, RenderError>;
}

/// Syntect highlighter emitting `syntax-` prefixed CSS classes.
pub struct SyntectHighlighter {
    syntax_set: SyntaxSet,
    class_style: ClassStyle,
}

impl SyntectHighlighter {
    /// Load the syntax pack embedded at build time.
    pub fn new() -> Self {
        let syntax_bytes = include_bytes!(env!("SYNTAX_PACK_FILE"));
        let syntax_set: SyntaxSet =
            from_uncompressed_data(syntax_bytes).expect("syntax pack must be valid");
        Self::with_syntax_set(syntax_set)
    }

    pub fn with_syntax_set(syntax_set: SyntaxSet) -> Self {
        Self {
            syntax_set,
            class_style: ClassStyle::SpacedPrefixed { prefix: "syntax-" },
        }
    }

    fn resolve(
        &self,
        language: Option<&str>,
        code: &str,
        resolution: LanguageResolution,
    ) -> Option<&SyntaxReference> {
        let hinted = language
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .and_then(|token| find_syntax(&self.syntax_set, token));

        match resolution {
            LanguageResolution::Strict => hinted,
            LanguageResolution::Detect => {
                hinted.or_else(|| self.syntax_set.find_syntax_by_first_line(code))
            }
        }
    }
}

impl Default for SyntectHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeHighlighter for SyntectHighlighter {
    fn highlight(
        &self,
        language: Option<&str>,
        code: &str,
        resolution: LanguageResolution,
    ) -> Result<Option<String>, RenderError> {
        let Some(syntax) = self.resolve(language, code, resolution) else {
            return Ok(None);
        };

        let mut code_with_newline = code.to_string();
        if !code_with_newline.ends_with('\n') {
            code_with_newline.push('\n');
        }

        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntax_set, self.class_style);

        for line in LinesWithEndings::from(code_with_newline.as_str()) {
            generator
                .parse_html_for_line_which_includes_newline(line)
                .map_err(|err| RenderError::highlighting(syntax.name.as_str(), err.to_string()))?;
        }

        Ok(Some(fold_trailing_closers(&generator.finalize())))
    }
}

/// CSS for the `syntax-` classes, generated from the build-time theme.
pub fn theme_css() -> &'static str {
    include_str!(env!("SYNTAX_THEME_CSS_FILE"))
}

/// Highlight a fragment and wrap every output line in its own span.
///
/// Trailing whitespace is trimmed first. Highlighting failures never
/// propagate: the escaped source is used instead.
pub(crate) fn highlight_fragment(
    highlighter: &dyn CodeHighlighter,
    language: Option<&str>,
    code: &str,
    resolution: LanguageResolution,
) -> String {
    let trimmed = code.trim_end();
    let highlighted = match highlighter.highlight(language, trimmed, resolution) {
        Ok(Some(html)) => html,
        Ok(None) => escape_html(trimmed),
        Err(err) => {
            warn!(
                target = "application::render::highlight",
                language = language.unwrap_or_default(),
                error = %err,
                "Highlighting failed; falling back to plain text"
            );
            counter!("verso_highlight_fallback_total").increment(1);
            escape_html(trimmed)
        }
    };

    wrap_lines(language, &highlighted)
}

fn wrap_lines(language: Option<&str>, html: &str) -> String {
    let mut wrapped = String::with_capacity(html.len() + 64);
    wrapped.push_str("<pre class=\"syntax-highlight\"");
    if let Some(language) = language.map(str::trim).filter(|lang| !lang.is_empty()) {
        wrapped.push_str(" data-language=\"");
        wrapped.push_str(&escape_attribute(language));
        wrapped.push('"');
    }
    wrapped.push('>');
    wrapped.push_str(LINE_OPEN);

    // Scope spans opened on one line are closed at its end and reopened on
    // the next, so each line span is balanced on its own.
    let mut open_scopes: Vec<&str> = Vec::new();
    let mut rest = html;
    while let Some(index) = rest.find(['<', '\n']) {
        let (text, tail) = rest.split_at(index);
        wrapped.push_str(text);

        if let Some(next) = tail.strip_prefix('\n') {
            for _ in &open_scopes {
                wrapped.push_str("</span>");
            }
            wrapped.push_str("</span>\n");
            wrapped.push_str(LINE_OPEN);
            for scope in &open_scopes {
                wrapped.push_str(scope);
            }
            rest = next;
            continue;
        }

        let end = tail.find('>').map_or(tail.len(), |offset| offset + 1);
        let tag = &tail[..end];
        if tag.starts_with("</span") {
            open_scopes.pop();
        } else if tag.starts_with("<span") {
            open_scopes.push(tag);
        }
        wrapped.push_str(tag);
        rest = &tail[end..];
    }

    wrapped.push_str(rest);
    wrapped.push_str("</span></pre>");
    wrapped
}

/// Syntect closes the outermost scopes after the final newline; pull those
/// closing tags back onto the last code line so no empty line is produced.
fn fold_trailing_closers(html: &str) -> String {
    let Some((head, tail)) = html.rsplit_once('\n') else {
        return html.to_string();
    };

    if tail.split("</span>").all(|piece| piece.trim().is_empty()) {
        format!("{head}{tail}")
    } else {
        html.to_string()
    }
}

fn find_syntax<'a>(syntax_set: &'a SyntaxSet, token: &str) -> Option<&'a SyntaxReference> {
    let lowercase = token.to_ascii_lowercase();
    syntax_set
        .find_syntax_by_token(&lowercase)
        .or_else(|| syntax_set.find_syntax_by_name(token))
        .or_else(|| syntax_set.find_syntax_by_extension(&lowercase))
}

#[cfg(test)]
pub(crate) mod tests {
    use once_cell::sync::Lazy;

    use super::*;

    pub(crate) static HIGHLIGHTER: Lazy<SyntectHighlighter> = Lazy::new(SyntectHighlighter::new);

    /// Highlighter that fails on every fragment.
    pub(crate) struct FailingHighlighter;

    impl CodeHighlighter for FailingHighlighter {
        fn highlight(
            &self,
            language: Option<&str>,
            _code: &str,
            _resolution: LanguageResolution,
        ) -> Result<Option<String>, RenderError> {
            Err(RenderError::highlighting(
                language.unwrap_or("auto"),
                "engine unavailable",
            ))
        }
    }

    #[test]
    fn known_language_is_highlighted_line_by_line() {
        let html = highlight_fragment(
            &*HIGHLIGHTER,
            Some("rust"),
            "fn main() {\n    println!(\"hi\");\n}\n\n",
            LanguageResolution::Strict,
        );

        assert!(html.starts_with("<pre class=\"syntax-highlight\" data-language=\"rust\">"));
        assert!(html.ends_with("</pre>"));
        assert!(html.contains("syntax-"));
        assert_eq!(html.matches("<span class=\"__line\">").count(), 3);
    }

    #[test]
    fn unknown_language_in_strict_mode_stays_plain() {
        let html = highlight_fragment(
            &*HIGHLIGHTER,
            Some("no-such-language"),
            "a < b\nc",
            LanguageResolution::Strict,
        );

        assert_eq!(
            html,
            "<pre class=\"syntax-highlight\" data-language=\"no-such-language\">\
             <span class=\"__line\">a &lt; b</span>\n<span class=\"__line\">c</span></pre>"
        );
    }

    #[test]
    fn detection_uses_the_first_line() {
        let detected = HIGHLIGHTER
            .highlight(None, "#!/bin/bash\necho hi", LanguageResolution::Detect)
            .expect("highlight");
        assert!(detected.is_some_and(|html| html.contains("syntax-")));

        let strict = HIGHLIGHTER
            .highlight(None, "#!/bin/bash\necho hi", LanguageResolution::Strict)
            .expect("highlight");
        assert!(strict.is_none());
    }

    #[test]
    fn engine_failure_falls_back_to_escaped_source() {
        let html = highlight_fragment(
            &FailingHighlighter,
            Some("rust"),
            "let x = 1 < 2;   \n",
            LanguageResolution::Strict,
        );

        assert_eq!(
            html,
            "<pre class=\"syntax-highlight\" data-language=\"rust\">\
             <span class=\"__line\">let x = 1 &lt; 2;</span></pre>"
        );
    }

    fn assert_balanced_lines(html: &str) {
        let body = html
            .split_once('>')
            .map(|(_, body)| body)
            .and_then(|body| body.strip_suffix("</pre>"))
            .expect("pre wrapper");

        for line in body.split('\n') {
            assert!(line.starts_with("<span class=\"__line\">"), "line `{line}`");
            assert!(line.ends_with("</span>"), "line `{line}`");

            let mut depth = 0usize;
            let mut rest = line;
            while let Some(index) = rest.find('<') {
                let tail = &rest[index..];
                if tail.starts_with("</span>") {
                    depth = depth.checked_sub(1).expect("closer without opener");
                    // Only the final closer may end the line span.
                    assert!(depth > 0 || tail == "</span>", "line `{line}` closes early");
                } else if tail.starts_with("<span") {
                    depth += 1;
                }
                rest = &tail[1..];
            }
            assert_eq!(depth, 0, "line `{line}` is unbalanced");
        }
    }

    #[test]
    fn every_highlighted_line_is_self_contained() {
        let html = highlight_fragment(
            &*HIGHLIGHTER,
            Some("rust"),
            "fn main() {\n    let a = 1;\n}",
            LanguageResolution::Strict,
        );

        assert_balanced_lines(&html);
        assert_eq!(html.matches(LINE_OPEN).count(), 3);
        let last = html.rsplit('\n').next().expect("last line");
        assert!(last.contains('}'));
    }

    #[test]
    fn block_comments_spanning_lines_stay_inside_line_spans() {
        let html = highlight_fragment(
            &*HIGHLIGHTER,
            Some("rust"),
            "/* first\n   second\n*/\nlet x = 1;",
            LanguageResolution::Strict,
        );

        assert_balanced_lines(&html);
        let lines: Vec<_> = html.split('\n').collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("syntax-comment"), "comment scope reopened: {}", lines[1]);
    }

    #[test]
    fn open_scopes_are_closed_and_reopened_at_newlines() {
        assert_eq!(
            wrap_lines(None, "<span class=\"a\">x\n<span class=\"b\">y</span></span>"),
            "<pre class=\"syntax-highlight\">\
             <span class=\"__line\"><span class=\"a\">x</span></span>\n\
             <span class=\"__line\"><span class=\"a\"><span class=\"b\">y</span></span></span></pre>"
        );
    }

    #[test]
    fn detection_without_marker_line_stays_plain() {
        let html = highlight_fragment(
            &*HIGHLIGHTER,
            None,
            "fn main() {}\nlet a = 1;",
            LanguageResolution::Detect,
        );

        assert_eq!(
            html,
            "<pre class=\"syntax-highlight\">\
             <span class=\"__line\">fn main() {}</span>\n<span class=\"__line\">let a = 1;</span></pre>"
        );
    }

    #[test]
    fn trailing_closers_are_folded_onto_last_line() {
        assert_eq!(
            fold_trailing_closers("<span a>x\n</span></span>"),
            "<span a>x</span></span>"
        );
        assert_eq!(fold_trailing_closers("x\ny"), "x\ny");
        assert_eq!(fold_trailing_closers("x\n"), "x");
    }

    #[test]
    fn theme_css_targets_prefixed_classes() {
        assert!(theme_css().contains(".syntax-"));
    }
}
