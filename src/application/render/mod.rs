//! Post rendering pipeline.
//!
//! The pipeline is pure: it receives stored posts and per-call options,
//! produces rendered records, and surfaces structured errors. Fetching posts
//! and reading configuration happen in the caller.

mod gate;
mod language;
mod pipeline;
mod service;
mod types;

pub use pipeline::{PostRenderer, post_renderer, render};
pub use service::{
    CodeHighlighter, ContentRenderer, LINE_CLASS, LanguageResolution, SyntectHighlighter,
    theme_css,
};
pub use types::{MORE_MARKER, PROTECTED_NOTICE, RenderError, RenderOptions};
