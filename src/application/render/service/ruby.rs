//! `{base}(annotation)` shorthand to `<ruby>` markup.
//!
//! Runs over converted HTML. A candidate is skipped when it starts or ends
//! inside a tag (attribute values) or overlaps a `<pre>` / `<code>` element.
//! Both halves are inserted as-is: they are already HTML at this point.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

static RUBY_SHORTHAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([^\n]+?)\}\(([^\n]+?)\)").expect("ruby shorthand pattern is valid")
});

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

static OPAQUE_ELEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<pre\b.*?</pre>|<code\b.*?</code>").expect("element pattern is valid")
});

pub(crate) fn annotate_ruby(html: &str) -> String {
    if !html.contains('{') {
        return html.to_string();
    }

    let tags: Vec<Range<usize>> = TAG.find_iter(html).map(|m| m.range()).collect();
    let opaque: Vec<Range<usize>> = OPAQUE_ELEMENT.find_iter(html).map(|m| m.range()).collect();

    let mut output = String::with_capacity(html.len() + 64);
    let mut copied = 0;
    let mut cursor = 0;

    while let Some(captures) = RUBY_SHORTHAND.captures_at(html, cursor) {
        let Some(whole) = captures.get(0) else {
            break;
        };
        let span = whole.range();

        let inside_tag = tags
            .iter()
            .any(|tag| contains_strictly(tag, span.start) || contains_strictly(tag, span.end - 1));
        let touches_code = opaque
            .iter()
            .any(|element| element.start < span.end && span.start < element.end);

        if inside_tag || touches_code {
            // `{` is one byte, so the next offset is a char boundary.
            cursor = span.start + 1;
            continue;
        }

        output.push_str(&html[copied..span.start]);
        output.push_str("<ruby>");
        output.push_str(&captures[1]);
        output.push_str("<rp>(</rp><rt>");
        output.push_str(&captures[2]);
        output.push_str("</rt><rp>)</rp></ruby>");
        copied = span.end;
        cursor = span.end;
    }

    output.push_str(&html[copied..]);
    output
}

fn contains_strictly(range: &Range<usize>, position: usize) -> bool {
    range.start < position && position < range.end
}
