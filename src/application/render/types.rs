use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::error::DomainError;

/// Literal authors place in source content to mark where previews stop.
pub const MORE_MARKER: &str = "<!-- more -->";

/// Content shown in place of a protected post's body when the password is missing or wrong.
pub const PROTECTED_NOTICE: &str =
    "This is a password-protected post, content preview is not available.";

/// Per-call switches for the post pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderOptions {
    /// Skip content conversion entirely.
    pub title_only: bool,
    /// Raw `Accept-Language` value used to rank body variants.
    pub accept_language: Option<String>,
    /// Truncate content at [`MORE_MARKER`].
    pub preview: bool,
    /// Password guess for protected posts.
    pub password: Option<String>,
    /// Select language and apply the password gate, but leave content unconverted.
    pub fake_rendering: bool,
    /// Convert reply content from Markdown.
    pub reply_markdown: bool,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accept_language(mut self, accept_language: impl Into<String>) -> Self {
        self.accept_language = Some(accept_language.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    pub fn with_title_only(mut self, title_only: bool) -> Self {
        self.title_only = title_only;
        self
    }

    pub fn with_fake_rendering(mut self, fake_rendering: bool) -> Self {
        self.fake_rendering = fake_rendering;
        self
    }

    pub fn with_reply_markdown(mut self, reply_markdown: bool) -> Self {
        self.reply_markdown = reply_markdown;
        self
    }

    pub(crate) fn renders_content(&self) -> bool {
        !self.title_only && !self.fake_rendering
    }

    pub(crate) fn accept_language(&self) -> &str {
        self.accept_language.as_deref().unwrap_or_default()
    }
}

/// Structured errors surfaced by the rendering pipeline.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("markdown rendering failed: {message}")]
    Markdown { message: String },
    #[error("template rendering failed at line {line}: {message}")]
    Template { line: usize, message: String },
    #[error("syntax highlighting failed: {language}: {message}")]
    Highlighting { language: String, message: String },
}

impl RenderError {
    pub fn template(line: usize, message: impl Into<String>) -> Self {
        Self::Template {
            line,
            message: message.into(),
        }
    }

    pub fn highlighting(language: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Highlighting {
            language: language.into(),
            message: message.into(),
        }
    }
}
