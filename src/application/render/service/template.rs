//! Indentation-based template language used by the `jade` / `pug` format.
//!
//! Supported: doctype, nested tags, `#id` / `.class` shorthands, parenthesised
//! attributes with literal values, inline and piped text, dot text blocks,
//! block expansion (`li: a`), `#[tag text]` interpolation, literal HTML lines,
//! and `//` / `//-` comments. Anything that would need script evaluation
//! (code lines, `#{}` interpolation, mixins, conditionals) is rejected with a
//! line-numbered [`RenderError::Template`].

use crate::application::render::types::RenderError;

use super::escape::escape_attribute;

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const KEYWORDS: [&str; 16] = [
    "append", "block", "case", "default", "each", "else", "extends", "for", "if", "include",
    "mixin", "prepend", "unless", "when", "while", "yield",
];

/// Render template source to HTML.
pub(crate) fn render_template(source: &str) -> Result<String, RenderError> {
    let mut parser = Parser::new(source);
    let nodes = parser.parse_nodes(None)?;

    let mut html = String::with_capacity(source.len() * 2);
    render_nodes(&nodes, parser.terse, &mut html);
    Ok(html)
}

#[derive(Debug)]
enum Node {
    Doctype(String),
    Element(Element),
    /// Already-rendered HTML text.
    Text(String),
    Comment(String),
}

#[derive(Debug)]
struct Element {
    name: String,
    attributes: Vec<Attribute>,
    self_closing: bool,
    children: Vec<Node>,
}

impl Element {
    fn closes_itself(&self) -> bool {
        self.self_closing || VOID_ELEMENTS.contains(&self.name.as_str())
    }
}

#[derive(Debug)]
struct Attribute {
    name: String,
    value: AttributeValue,
}

#[derive(Debug)]
enum AttributeValue {
    Boolean,
    Escaped(String),
    Raw(String),
}

enum Literal {
    Text(String),
    True,
    False,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Body {
    Nested,
    TextBlock,
}

/// A tag line: the outermost element first, then each `:` expansion.
struct TagLine {
    chain: Vec<Element>,
    body: Body,
}

impl TagLine {
    fn into_nodes(mut self, children: Vec<Node>, line: usize) -> Result<Vec<Node>, RenderError> {
        let mut nested = children;
        while let Some(mut element) = self.chain.pop() {
            element.children.extend(nested);
            if element.closes_itself() && !element.children.is_empty() {
                return Err(RenderError::template(
                    line,
                    format!("`{}` is self-closing and cannot have content", element.name),
                ));
            }
            nested = vec![Node::Element(element)];
        }
        Ok(nested)
    }
}

#[derive(Clone, Copy)]
struct SourceLine<'s> {
    number: usize,
    indent: usize,
    raw: &'s str,
    text: &'s str,
}

impl SourceLine<'_> {
    fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

struct Parser<'s> {
    lines: Vec<SourceLine<'s>>,
    pos: usize,
    terse: bool,
}

impl<'s> Parser<'s> {
    fn new(source: &'s str) -> Self {
        let lines: Vec<SourceLine<'s>> = source
            .lines()
            .enumerate()
            .map(|(index, raw)| {
                let trimmed = raw.trim_start_matches([' ', '\t']);
                SourceLine {
                    number: index + 1,
                    indent: raw.len() - trimmed.len(),
                    raw,
                    text: trimmed.trim_end(),
                }
            })
            .collect();

        let terse = lines
            .iter()
            .find(|line| !line.is_blank())
            .and_then(|line| doctype_value(line.text))
            .is_some_and(|value| value.eq_ignore_ascii_case("html"));

        Self {
            lines,
            pos: 0,
            terse,
        }
    }

    fn next_content_line(&mut self) -> Option<SourceLine<'s>> {
        while let Some(line) = self.lines.get(self.pos) {
            if !line.is_blank() {
                return Some(*line);
            }
            self.pos += 1;
        }
        None
    }

    fn parse_nodes(&mut self, parent_indent: Option<usize>) -> Result<Vec<Node>, RenderError> {
        let mut nodes = Vec::new();
        let mut level = None;

        while let Some(line) = self.next_content_line() {
            if parent_indent.is_some_and(|parent| line.indent <= parent) {
                break;
            }
            match level {
                None => level = Some(line.indent),
                Some(level) if line.indent > level => {
                    return Err(RenderError::template(line.number, "unexpected indentation"));
                }
                Some(level) if line.indent < level => {
                    return Err(RenderError::template(line.number, "inconsistent indentation"));
                }
                Some(_) => {}
            }

            self.pos += 1;
            nodes.extend(self.parse_line(line)?);
        }

        Ok(nodes)
    }

    fn parse_line(&mut self, line: SourceLine<'s>) -> Result<Vec<Node>, RenderError> {
        let text = line.text;

        if text.starts_with("//-") {
            self.skip_block(line.indent);
            return Ok(Vec::new());
        }
        if let Some(comment) = text.strip_prefix("//") {
            let block = self.take_text_block(line.indent);
            let body = match (comment.is_empty(), block.is_empty()) {
                (_, true) => comment.to_string(),
                (true, false) => block,
                (false, false) => format!("{comment}\n{block}"),
            };
            return Ok(vec![Node::Comment(body)]);
        }
        if let Some(value) = doctype_value(text) {
            return Ok(vec![Node::Doctype(value.to_string())]);
        }
        if let Some(piped) = text.strip_prefix('|') {
            let piped = piped.strip_prefix(' ').unwrap_or(piped);
            return Ok(vec![Node::Text(self.render_inline(piped, line.number)?)]);
        }
        if text.starts_with('<') {
            return Ok(vec![Node::Text(text.to_string())]);
        }
        if text.starts_with('-') || text.starts_with('=') || text.starts_with("!=") {
            return Err(RenderError::template(
                line.number,
                "embedded code is not supported",
            ));
        }
        if text.starts_with(':') {
            return Err(RenderError::template(line.number, "filters are not supported"));
        }
        if let Some(keyword) = leading_keyword(text) {
            return Err(RenderError::template(
                line.number,
                format!("`{keyword}` is not supported"),
            ));
        }

        let tag = self.parse_tag_line(text, line.number)?;
        let children = match tag.body {
            Body::TextBlock => {
                let block = self.take_text_block(line.indent);
                if block.is_empty() {
                    Vec::new()
                } else {
                    vec![Node::Text(self.render_inline(&block, line.number)?)]
                }
            }
            Body::Nested => self.parse_nodes(Some(line.indent))?,
        };

        tag.into_nodes(children, line.number)
    }

    /// Consume the lines indented under `indent` and return them with the
    /// common indentation removed.
    fn take_text_block(&mut self, indent: usize) -> String {
        let start = self.pos;
        let mut end = start;
        let mut scan = start;
        while let Some(line) = self.lines.get(scan) {
            if line.is_blank() {
                scan += 1;
                continue;
            }
            if line.indent <= indent {
                break;
            }
            scan += 1;
            end = scan;
        }
        self.pos = end;

        let block = &self.lines[start..end];
        let base = block
            .iter()
            .filter(|line| !line.is_blank())
            .map(|line| line.indent)
            .min()
            .unwrap_or_default();

        block
            .iter()
            .map(|line| {
                if line.is_blank() {
                    ""
                } else {
                    line.raw[base..].trim_end()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn skip_block(&mut self, indent: usize) {
        self.take_text_block(indent);
    }

    fn parse_tag_line(&self, text: &str, line: usize) -> Result<TagLine, RenderError> {
        let mut chain = Vec::new();
        let mut rest = text;

        loop {
            let (mut element, after) = parse_tag_head(rest, line)?;

            if let Some(expanded) = after.strip_prefix(':') {
                let expanded = expanded.trim_start();
                if expanded.is_empty() {
                    return Err(RenderError::template(line, "expected a tag after `:`"));
                }
                chain.push(element);
                rest = expanded;
                continue;
            }

            let body = if after.is_empty() {
                Body::Nested
            } else if after == "." {
                Body::TextBlock
            } else if let Some(inline) = after.strip_prefix([' ', '\t']) {
                if !inline.is_empty() {
                    element
                        .children
                        .push(Node::Text(self.render_inline(inline, line)?));
                }
                Body::Nested
            } else if after.starts_with('=') || after.starts_with("!=") {
                return Err(RenderError::template(
                    line,
                    "buffered code is not supported",
                ));
            } else {
                return Err(RenderError::template(
                    line,
                    format!("unexpected text `{after}`"),
                ));
            };

            chain.push(element);
            return Ok(TagLine { chain, body });
        }
    }

    /// Resolve `#[tag text]` interpolation inside a run of text.
    fn render_inline(&self, text: &str, line: usize) -> Result<String, RenderError> {
        let mut html = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(offset) = rest.find('#') {
            let (before, after) = rest.split_at(offset);
            let escaped = before.ends_with('\\');

            match after.as_bytes().get(1) {
                Some(b'[' | b'{') if escaped => {
                    html.push_str(&before[..before.len() - 1]);
                    html.push_str(&after[..2]);
                    rest = &after[2..];
                }
                Some(b'{') => {
                    return Err(RenderError::template(
                        line,
                        "`#{}` interpolation is not supported",
                    ));
                }
                Some(b'[') => {
                    html.push_str(before);
                    let close = matching_bracket(after, 1).ok_or_else(|| {
                        RenderError::template(line, "unterminated tag interpolation")
                    })?;
                    let tag = self.parse_tag_line(&after[2..close], line)?;
                    if tag.body == Body::TextBlock {
                        return Err(RenderError::template(
                            line,
                            "text blocks cannot be interpolated",
                        ));
                    }
                    render_nodes(&tag.into_nodes(Vec::new(), line)?, self.terse, &mut html);
                    rest = &after[close + 1..];
                }
                _ => {
                    html.push_str(before);
                    html.push('#');
                    rest = &after[1..];
                }
            }
        }

        html.push_str(rest);
        Ok(html)
    }
}

fn doctype_value(text: &str) -> Option<&str> {
    if text == "doctype" {
        return Some("html");
    }
    text.strip_prefix("doctype ").map(str::trim)
}

fn leading_keyword(text: &str) -> Option<&'static str> {
    let word = text.split([' ', '\t', '(']).next().unwrap_or_default();
    KEYWORDS.iter().copied().find(|keyword| *keyword == word)
}

fn parse_tag_head(text: &str, line: usize) -> Result<(Element, &str), RenderError> {
    let bytes = text.as_bytes();
    let mut pos = 0;

    let name = match bytes.first() {
        Some(byte) if byte.is_ascii_alphabetic() => {
            pos = scan_name(text);
            text[..pos].to_string()
        }
        Some(b'#' | b'.') => "div".to_string(),
        _ => {
            return Err(RenderError::template(
                line,
                format!("unexpected text `{text}`"),
            ));
        }
    };

    let mut attributes = Vec::new();
    let mut self_closing = false;

    loop {
        match bytes.get(pos) {
            Some(b'#') => {
                let end = scan_ident(text, pos + 1);
                if end == pos + 1 {
                    return Err(RenderError::template(line, "expected an id after `#`"));
                }
                push_attribute(
                    &mut attributes,
                    "id",
                    AttributeValue::Escaped(text[pos + 1..end].to_string()),
                );
                pos = end;
            }
            Some(b'.') => {
                let end = scan_ident(text, pos + 1);
                if end == pos + 1 {
                    break;
                }
                push_attribute(
                    &mut attributes,
                    "class",
                    AttributeValue::Escaped(text[pos + 1..end].to_string()),
                );
                pos = end;
            }
            Some(b'(') => {
                pos = parse_attributes(text, pos + 1, line, &mut attributes)?;
            }
            Some(b'/') => {
                self_closing = true;
                pos += 1;
                break;
            }
            _ => break,
        }
    }

    let element = Element {
        name,
        attributes,
        self_closing,
        children: Vec::new(),
    };
    Ok((element, &text[pos..]))
}

fn scan_ident(text: &str, start: usize) -> usize {
    let bytes = text.as_bytes();
    let mut pos = start;
    while bytes
        .get(pos)
        .is_some_and(|byte| byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_'))
    {
        pos += 1;
    }
    pos
}

/// Tag names may contain `:` only when a name character follows, so that
/// `li: a` is still read as block expansion.
fn scan_name(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut pos = scan_ident(text, 0);
    while bytes.get(pos) == Some(&b':')
        && bytes
            .get(pos + 1)
            .is_some_and(|byte| byte.is_ascii_alphanumeric())
    {
        pos = scan_ident(text, pos + 1);
    }
    pos
}

fn parse_attributes(
    text: &str,
    start: usize,
    line: usize,
    attributes: &mut Vec<Attribute>,
) -> Result<usize, RenderError> {
    let bytes = text.as_bytes();
    let mut pos = start;

    loop {
        while matches!(bytes.get(pos), Some(b' ' | b'\t' | b',')) {
            pos += 1;
        }
        match bytes.get(pos) {
            None => return Err(RenderError::template(line, "unterminated attribute list")),
            Some(b')') => return Ok(pos + 1),
            Some(_) => {}
        }

        let name_start = pos;
        while bytes
            .get(pos)
            .is_some_and(|byte| !matches!(byte, b'=' | b'!' | b' ' | b'\t' | b',' | b')'))
        {
            pos += 1;
        }
        let name = &text[name_start..pos];
        if name.is_empty() {
            return Err(RenderError::template(line, "expected an attribute name"));
        }

        while matches!(bytes.get(pos), Some(b' ' | b'\t')) {
            pos += 1;
        }

        let raw = if text[pos..].starts_with("!=") {
            pos += 2;
            Some(true)
        } else if bytes.get(pos) == Some(&b'=') {
            pos += 1;
            Some(false)
        } else {
            None
        };

        let Some(raw) = raw else {
            push_attribute(attributes, name, AttributeValue::Boolean);
            continue;
        };

        while matches!(bytes.get(pos), Some(b' ' | b'\t')) {
            pos += 1;
        }
        let (literal, next) = parse_attribute_value(text, pos, line)?;
        pos = next;

        match literal {
            Literal::Text(value) if raw => push_attribute(attributes, name, AttributeValue::Raw(value)),
            Literal::Text(value) => push_attribute(attributes, name, AttributeValue::Escaped(value)),
            Literal::True => push_attribute(attributes, name, AttributeValue::Boolean),
            Literal::False => {}
        }
    }
}

fn parse_attribute_value(
    text: &str,
    start: usize,
    line: usize,
) -> Result<(Literal, usize), RenderError> {
    let bytes = text.as_bytes();

    if let Some(&quote @ (b'"' | b'\'' | b'`')) = bytes.get(start) {
        let quote = char::from(quote);
        let mut value = String::new();
        let mut chars = text[start + 1..].char_indices();

        while let Some((offset, ch)) = chars.next() {
            match ch {
                '\\' => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, escaped)) => value.push(escaped),
                    None => break,
                },
                ch if ch == quote => {
                    return Ok((Literal::Text(value), start + 1 + offset + ch.len_utf8()));
                }
                ch => value.push(ch),
            }
        }

        return Err(RenderError::template(line, "unterminated attribute value"));
    }

    let end = text[start..]
        .find(|ch: char| ch.is_whitespace() || ch == ',' || ch == ')')
        .map_or(text.len(), |offset| start + offset);
    let token = &text[start..end];

    let literal = match token {
        "" => return Err(RenderError::template(line, "expected an attribute value")),
        "true" => Literal::True,
        "false" | "null" | "undefined" => Literal::False,
        number if number.parse::<f64>().is_ok() => Literal::Text(number.to_string()),
        expression => {
            return Err(RenderError::template(
                line,
                format!("attribute expression `{expression}` is not supported"),
            ));
        }
    };
    Ok((literal, end))
}

/// `class` values accumulate; other repeated names keep the last value.
fn push_attribute(attributes: &mut Vec<Attribute>, name: &str, value: AttributeValue) {
    if let Some(attribute) = attributes.iter_mut().find(|attribute| attribute.name == name) {
        match (&mut attribute.value, value) {
            (
                AttributeValue::Escaped(classes) | AttributeValue::Raw(classes),
                AttributeValue::Escaped(extra),
            ) if name == "class" => {
                classes.push(' ');
                classes.push_str(&extra);
            }
            (current, value) => *current = value,
        }
        return;
    }

    attributes.push(Attribute {
        name: name.to_string(),
        value,
    });
}

/// Index of the `]` closing the `[` at `open`, skipping quoted runs.
fn matching_bracket(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote = None;

    for (index, byte) in text.bytes().enumerate().skip(open) {
        match (quote, byte) {
            (Some(active), byte) if byte == active => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(byte),
            (None, b'[') => depth += 1,
            (None, b']') => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            (None, _) => {}
        }
    }
    None
}

fn render_nodes(nodes: &[Node], terse: bool, html: &mut String) {
    let mut previous_text = false;

    for node in nodes {
        match node {
            Node::Doctype(value) => html.push_str(&doctype_html(value)),
            Node::Element(element) => render_element(element, terse, html),
            Node::Text(text) => {
                // Consecutive text lines keep their line break.
                if previous_text {
                    html.push('\n');
                }
                html.push_str(text);
            }
            Node::Comment(comment) => {
                html.push_str("<!--");
                html.push_str(comment);
                html.push_str("-->");
            }
        }
        previous_text = matches!(node, Node::Text(_));
    }
}

fn render_element(element: &Element, terse: bool, html: &mut String) {
    html.push('<');
    html.push_str(&element.name);

    for attribute in &element.attributes {
        html.push(' ');
        html.push_str(&attribute.name);
        match &attribute.value {
            AttributeValue::Boolean if terse => {}
            AttributeValue::Boolean => {
                html.push_str("=\"");
                html.push_str(&attribute.name);
                html.push('"');
            }
            AttributeValue::Escaped(value) => {
                html.push_str("=\"");
                html.push_str(&escape_attribute(value));
                html.push('"');
            }
            AttributeValue::Raw(value) => {
                html.push_str("=\"");
                html.push_str(value);
                html.push('"');
            }
        }
    }

    if element.closes_itself() {
        html.push_str(if terse { ">" } else { "/>" });
        return;
    }

    html.push('>');
    render_nodes(&element.children, terse, html);
    html.push_str("</");
    html.push_str(&element.name);
    html.push('>');
}

fn doctype_html(value: &str) -> String {
    match value.to_ascii_lowercase().as_str() {
        "html" => "<!DOCTYPE html>".to_string(),
        "xml" => r#"<?xml version="1.0" encoding="utf-8" ?>"#.to_string(),
        _ => format!("<!DOCTYPE {value}>"),
    }
}
