use subtle::ConstantTimeEq;

use crate::domain::{posts::BlogPostBody, types::ContentFormat};

use super::types::PROTECTED_NOTICE;

/// Whether the stored password keeps this post's content hidden from the caller.
///
/// Posts without a password, or with an empty one, are never locked.
pub(crate) fn is_locked(stored: Option<&str>, supplied: Option<&str>) -> bool {
    let Some(stored) = stored.filter(|password| !password.is_empty()) else {
        return false;
    };

    match supplied {
        Some(guess) => stored.as_bytes().ct_eq(guess.as_bytes()).unwrap_u8() == 0,
        None => true,
    }
}

/// Synthetic body shown instead of a locked post's content.
pub(crate) fn locked_body(matched: &BlogPostBody) -> BlogPostBody {
    BlogPostBody {
        language: matched.language.clone(),
        title: matched.title.clone(),
        content: PROTECTED_NOTICE.to_string(),
        format: ContentFormat::Markdown,
        default: true,
    }
}
