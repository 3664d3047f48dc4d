use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("post has no body variants")]
    NoContent,
    #[error("invalid stored date `{value}`: {message}")]
    InvalidDate { value: String, message: String },
}

impl DomainError {
    pub fn invalid_date(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDate {
            value: value.into(),
            message: message.into(),
        }
    }
}
