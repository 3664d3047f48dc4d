use std::sync::Arc;

use metrics::counter;
use once_cell::sync::Lazy;
use tracing::{debug, error};

use crate::domain::posts::{BlogPost, RenderedPost, Reply, without_rendered_keys};

use super::{
    gate::{is_locked, locked_body},
    language::select_language,
    service::{CodeHighlighter, ContentRenderer, SyntectHighlighter},
    types::{RenderError, RenderOptions},
};

/// Turns stored posts into rendered posts: language selection, password
/// gate, content conversion, then reply conversion.
pub struct PostRenderer {
    content: ContentRenderer,
}

impl PostRenderer {
    pub fn new(highlighter: Arc<dyn CodeHighlighter>) -> Self {
        Self {
            content: ContentRenderer::new(highlighter),
        }
    }

    /// Render a batch, or return an empty list if any post fails.
    ///
    /// Callers never see a partially rendered batch.
    pub fn render(&self, posts: &[BlogPost], options: &RenderOptions) -> Vec<RenderedPost> {
        match self.try_render(posts, options) {
            Ok(rendered) => rendered,
            Err(err) => {
                error!(
                    target = "application::render::pipeline",
                    posts = posts.len(),
                    error = %err,
                    "Rendering batch failed; returning no posts"
                );
                counter!("verso_render_batch_failure_total").increment(1);
                Vec::new()
            }
        }
    }

    /// Render a batch in input order, stopping at the first failing post.
    pub fn try_render(
        &self,
        posts: &[BlogPost],
        options: &RenderOptions,
    ) -> Result<Vec<RenderedPost>, RenderError> {
        posts
            .iter()
            .map(|post| self.render_post(post, options))
            .collect()
    }

    pub fn render_post(
        &self,
        post: &BlogPost,
        options: &RenderOptions,
    ) -> Result<RenderedPost, RenderError> {
        let selection = select_language(&post.body, options.accept_language())?;
        let mut matched = selection.matched.clone();
        let mut replies = post.replies.clone();
        let mut more = false;
        let mut protected = false;

        if is_locked(post.password.as_deref(), options.password.as_deref()) {
            matched = locked_body(&matched);
            replies = Some(Vec::new());
            more = true;
            protected = true;
            counter!("verso_protected_posts_total").increment(1);
        }

        let mut content = None;
        if options.renders_content() {
            let rendered = self.content.render_body(&matched, options.preview)?;
            more |= rendered.truncated;
            content = Some(rendered.html);

            if options.reply_markdown
                && let Some(replies) = replies.as_mut()
            {
                self.render_replies(replies)?;
            }
        }

        debug!(
            target = "application::render::pipeline",
            language = %matched.language,
            format = %matched.format,
            more,
            protected,
            "Post rendered"
        );
        counter!("verso_posts_rendered_total").increment(1);

        Ok(RenderedPost {
            date: post.date,
            title: matched.title,
            language: matched.language,
            languages: selection.languages,
            content,
            more,
            protected,
            replies,
            extra: without_rendered_keys(post.extra.clone()),
        })
    }

    fn render_replies(&self, replies: &mut [Reply]) -> Result<(), RenderError> {
        for reply in replies.iter_mut().filter(|reply| reply.has_content()) {
            let source = reply.content.take().unwrap_or_default();
            reply.content = Some(self.content.render_reply(&source)?);
            reply.markdown = true;
        }
        Ok(())
    }
}

static POST_RENDERER: Lazy<Arc<PostRenderer>> =
    Lazy::new(|| Arc::new(PostRenderer::new(Arc::new(SyntectHighlighter::new()))));

/// Access the shared renderer, initialised on first use.
pub fn post_renderer() -> Arc<PostRenderer> {
    Arc::clone(&POST_RENDERER)
}

/// Render a batch with the shared renderer. Returns an empty list on failure.
pub fn render(posts: &[BlogPost], options: &RenderOptions) -> Vec<RenderedPost> {
    post_renderer().render(posts, options)
}
