mod config;
mod escape;
mod highlight;
mod markup;
mod rewrite;
mod ruby;
mod template;

use std::sync::Arc;

use comrak::{Arena, format_html, nodes::AstNode, parse_document};
use tracing::debug;

use crate::{
    application::render::types::RenderError,
    domain::{posts::BlogPostBody, types::ContentFormat},
};

use config::default_options;
use rewrite::{RawHtml, rewrite_ast};

pub use highlight::{
    CodeHighlighter, LINE_CLASS, LanguageResolution, SyntectHighlighter, theme_css,
};

/// HTML produced for one body variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RenderedContent {
    pub(crate) html: String,
    /// Content was cut at the preview marker.
    pub(crate) truncated: bool,
}

/// Converts post bodies and reply text to HTML.
///
/// Markdown goes through comrak with fenced code highlighted during an AST
/// rewrite. Template and pass-through HTML have `<code>` tags highlighted
/// after conversion.
pub struct ContentRenderer {
    options: comrak::Options<'static>,
    highlighter: Arc<dyn CodeHighlighter>,
}

impl ContentRenderer {
    pub fn new(highlighter: Arc<dyn CodeHighlighter>) -> Self {
        Self {
            options: default_options(),
            highlighter,
        }
    }

    pub(crate) fn render_body(
        &self,
        body: &BlogPostBody,
        preview: bool,
    ) -> Result<RenderedContent, RenderError> {
        match body.format {
            ContentFormat::Markdown => self.render_markdown_body(&body.content, preview),
            ContentFormat::Template => {
                let html = template::render_template(&body.content)?;
                Ok(self.finish_markup(html, preview))
            }
            ContentFormat::Html => Ok(self.finish_markup(body.content.clone(), preview)),
        }
    }

    /// Reply text: Markdown with author HTML shown as text, no preview cut
    /// and no ruby pass.
    pub(crate) fn render_reply(&self, source: &str) -> Result<String, RenderError> {
        self.markdown_stage(source, RawHtml::Escape)
    }

    /// Markdown authors place the marker in source, so the cut happens
    /// before conversion.
    fn render_markdown_body(
        &self,
        source: &str,
        preview: bool,
    ) -> Result<RenderedContent, RenderError> {
        let head = preview.then(|| markup::truncate_at_marker(source)).flatten();
        let truncated = head.is_some();

        let html = self.markdown_stage(head.unwrap_or(source), RawHtml::Keep)?;

        Ok(RenderedContent {
            html: ruby::annotate_ruby(&html),
            truncated,
        })
    }

    /// Template output is only visible as HTML, so the cut happens after
    /// conversion.
    fn finish_markup(&self, mut html: String, preview: bool) -> RenderedContent {
        let cut = preview
            .then(|| markup::truncate_at_marker(&html).map(str::len))
            .flatten();
        if let Some(length) = cut {
            html.truncate(length);
        }

        RenderedContent {
            html: markup::highlight_code_tags(&html, self.highlighter.as_ref()),
            truncated: cut.is_some(),
        }
    }

    fn markdown_stage(&self, source: &str, raw_html: RawHtml) -> Result<String, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, source, &self.options);

        rewrite_stage(root, self.highlighter.as_ref(), raw_html);

        render_html_stage(root, &self.options)
    }
}

fn rewrite_stage<'a>(root: &'a AstNode<'a>, highlighter: &dyn CodeHighlighter, raw_html: RawHtml) {
    let outcome = rewrite_ast(root, highlighter, raw_html);
    debug!(
        target = "application::render::service",
        code_blocks = outcome.code_blocks,
        escaped_html = outcome.escaped_html,
        "Markdown tree rewritten"
    );
}

fn render_html_stage<'a>(
    root: &'a AstNode<'a>,
    options: &comrak::Options<'static>,
) -> Result<String, RenderError> {
    let mut html = String::new();
    format_html(root, options, &mut html).map_err(|err| RenderError::Markdown {
        message: err.to_string(),
    })?;
    Ok(html)
}
