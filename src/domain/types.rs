//! Shared domain enumerations aligned with stored post records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Source markup of a stored body variant.
///
/// Stored records carry the format as a free-form string; parsing is
/// case-insensitive and anything unrecognised is treated as ready-made HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContentFormat {
    Markdown,
    /// Indentation-based template markup, stored as `jade` or `pug`.
    Template,
    #[default]
    Html,
}

impl ContentFormat {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("markdown") {
            ContentFormat::Markdown
        } else if trimmed.eq_ignore_ascii_case("pug") || trimmed.eq_ignore_ascii_case("jade") {
            ContentFormat::Template
        } else {
            ContentFormat::Html
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentFormat::Markdown => "markdown",
            ContentFormat::Template => "pug",
            ContentFormat::Html => "html",
        }
    }
}

impl From<String> for ContentFormat {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for ContentFormat {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<ContentFormat> for String {
    fn from(value: ContentFormat) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
