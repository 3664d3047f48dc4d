//! Blog post records as stored, and the rendered shape handed to page templates.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::domain::{error::DomainError, types::ContentFormat};

/// Keys produced by rendering. Stored fields with these names are dropped so the
/// rendered record never carries two values for one key.
pub const RENDERED_KEYS: [&str; 8] = [
    "date",
    "title",
    "language",
    "languages",
    "content",
    "more",
    "protected",
    "replies",
];

/// A stored post with one body variant per language.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BlogPost {
    #[serde(deserialize_with = "stored_date::deserialize")]
    pub date: OffsetDateTime,
    #[serde(default)]
    pub body: Vec<BlogPostBody>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub replies: Option<Vec<Reply>>,
    /// Fields the pipeline does not interpret (ids, slugs, tags, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BlogPost {
    pub fn new(date: OffsetDateTime, body: Vec<BlogPostBody>) -> Self {
        Self {
            date,
            body,
            password: None,
            replies: None,
            extra: Map::new(),
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_replies(mut self, replies: Vec<Reply>) -> Self {
        self.replies = Some(replies);
        self
    }
}

/// One language rendition of a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogPostBody {
    pub language: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub format: ContentFormat,
    #[serde(default)]
    pub default: bool,
}

impl BlogPostBody {
    pub fn new(
        language: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        format: ContentFormat,
    ) -> Self {
        Self {
            language: language.into(),
            title: title.into(),
            content: content.into(),
            format,
            default: false,
        }
    }

    pub fn markdown(
        language: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(language, title, content, ContentFormat::Markdown)
    }

    pub fn as_default(mut self) -> Self {
        self.default = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Set once the content has been converted from Markdown. Only emitted when set.
    #[serde(default, skip_serializing_if = "is_false")]
    pub markdown: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Reply {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            markdown: false,
            extra: Map::new(),
        }
    }

    pub fn has_content(&self) -> bool {
        self.content.as_deref().is_some_and(|content| !content.is_empty())
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Display entry for an available language, ordered by selection priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageOption {
    pub name: String,
    pub code: String,
}

/// A post after rendering. It has no body variants and no password by construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedPost {
    #[serde(serialize_with = "stored_date::serialize")]
    pub date: OffsetDateTime,
    pub title: String,
    pub language: String,
    pub languages: Vec<LanguageOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub more: bool,
    pub protected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<Reply>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Drop stored fields that would collide with rendered ones.
pub fn without_rendered_keys(mut extra: Map<String, Value>) -> Map<String, Value> {
    for key in RENDERED_KEYS {
        extra.remove(key);
    }
    extra
}

/// Parse a stored date, accepting RFC 3339 text or Unix epoch milliseconds.
pub fn parse_stored_date(value: &Value) -> Result<OffsetDateTime, DomainError> {
    match value {
        Value::String(text) => stored_date::parse_text(text),
        Value::Number(number) => match number.as_i64() {
            Some(millis) => stored_date::from_millis(millis),
            None => number
                .as_f64()
                .filter(|millis| millis.is_finite())
                .ok_or_else(|| DomainError::invalid_date(number.to_string(), "not a timestamp"))
                .and_then(|millis| stored_date::from_millis(millis.trunc() as i64)),
        },
        other => Err(DomainError::invalid_date(
            other.to_string(),
            "expected RFC 3339 text or epoch milliseconds",
        )),
    }
}

mod stored_date {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _, ser::Error as _};
    use serde_json::Value;
    use time::{OffsetDateTime, format_description::well_known::Rfc3339};

    use crate::domain::error::DomainError;

    pub(super) fn parse_text(text: &str) -> Result<OffsetDateTime, DomainError> {
        OffsetDateTime::parse(text.trim(), &Rfc3339)
            .map_err(|err| DomainError::invalid_date(text, err.to_string()))
    }

    pub(super) fn from_millis(millis: i64) -> Result<OffsetDateTime, DomainError> {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
            .map_err(|err| DomainError::invalid_date(millis.to_string(), err.to_string()))
    }

    pub(super) fn serialize<S: Serializer>(
        value: &OffsetDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let text = value.format(&Rfc3339).map_err(S::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<OffsetDateTime, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        super::parse_stored_date(&raw).map_err(D::Error::custom)
    }
}
