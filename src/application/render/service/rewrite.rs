use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue};

use super::{
    escape::escape_html,
    highlight::{CodeHighlighter, LanguageResolution, highlight_fragment},
};

/// Treatment of raw HTML the author typed into Markdown source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RawHtml {
    Keep,
    /// Render as visible text.
    Escape,
}

#[derive(Debug, Default)]
pub(crate) struct RewriteOutcome {
    pub(crate) code_blocks: usize,
    pub(crate) escaped_html: usize,
}

/// Replace fenced code with highlighted HTML and apply the raw-HTML policy.
pub(crate) fn rewrite_ast<'a>(
    root: &'a AstNode<'a>,
    highlighter: &dyn CodeHighlighter,
    raw_html: RawHtml,
) -> RewriteOutcome {
    let mut walker = RewriteWalker {
        highlighter,
        raw_html,
        outcome: RewriteOutcome::default(),
    };
    walker.visit_nodes(root);
    walker.outcome
}

struct RewriteWalker<'h> {
    highlighter: &'h dyn CodeHighlighter,
    raw_html: RawHtml,
    outcome: RewriteOutcome,
}

impl RewriteWalker<'_> {
    fn visit_nodes(&mut self, node: &AstNode<'_>) {
        if let Some((info, literal)) = extract_fenced_code(node) {
            let language = info.split_whitespace().next();
            let mut html = highlight_fragment(
                self.highlighter,
                language,
                &literal,
                LanguageResolution::Strict,
            );
            html.push('\n');
            self.outcome.code_blocks += 1;

            let mut data = node.data.borrow_mut();
            data.value = NodeValue::HtmlBlock(NodeHtmlBlock {
                block_type: 0,
                literal: html,
            });
        } else if self.raw_html == RawHtml::Escape {
            self.escape_raw_html(node);
        }

        let mut child = node.first_child();
        while let Some(next) = child {
            self.visit_nodes(next);
            child = next.next_sibling();
        }
    }

    fn escape_raw_html(&mut self, node: &AstNode<'_>) {
        let mut data = node.data.borrow_mut();
        let replacement = match &data.value {
            NodeValue::HtmlBlock(block) => NodeValue::HtmlBlock(NodeHtmlBlock {
                block_type: 0,
                literal: format!("<p>{}</p>\n", escape_html(block.literal.trim_end())),
            }),
            NodeValue::HtmlInline(raw) => NodeValue::HtmlInline(escape_html(raw)),
            _ => return,
        };
        data.value = replacement;
        self.outcome.escaped_html += 1;
    }
}

/// Info string and literal of a fenced code block. Indented blocks are left
/// to the default renderer.
fn extract_fenced_code(node: &AstNode<'_>) -> Option<(String, String)> {
    let data = node.data.borrow();
    if let NodeValue::CodeBlock(block) = &data.value {
        block
            .fenced
            .then(|| (block.info.trim().to_string(), block.literal.clone()))
    } else {
        None
    }
}
