//! Body-variant ranking against a raw `Accept-Language` value.
//!
//! Ranking is positional: a code found earlier in the preference string wins.
//! Quality values are not parsed.

use crate::domain::{
    error::DomainError,
    languages::display_name_or_code,
    posts::{BlogPostBody, LanguageOption},
};

pub(crate) struct LanguageSelection<'a> {
    /// Available languages, highest priority first.
    pub(crate) languages: Vec<LanguageOption>,
    pub(crate) matched: &'a BlogPostBody,
}

struct RankedLanguage<'a> {
    code: &'a str,
    /// `None` when the code does not occur in the preference string.
    priority: Option<usize>,
}

pub(crate) fn select_language<'a>(
    bodies: &'a [BlogPostBody],
    accept_language: &str,
) -> Result<LanguageSelection<'a>, DomainError> {
    let Some(first) = bodies.first() else {
        return Err(DomainError::NoContent);
    };

    let mut ranked: Vec<RankedLanguage<'_>> = bodies
        .iter()
        .map(|body| RankedLanguage {
            code: body.language.as_str(),
            priority: priority(accept_language, &body.language),
        })
        .collect();
    // Stable: ties and unmatched codes keep storage order.
    ranked.sort_by(|a, b| b.priority.cmp(&a.priority));

    let matched = match ranked.first().and_then(|top| top.priority.map(|_| top.code)) {
        Some(code) => bodies
            .iter()
            .find(|body| body.language == code)
            .unwrap_or(first),
        None => bodies.iter().find(|body| body.default).unwrap_or(first),
    };

    let languages = ranked
        .iter()
        .map(|entry| LanguageOption {
            name: display_name_or_code(entry.code),
            code: entry.code.to_string(),
        })
        .collect();

    Ok(LanguageSelection { languages, matched })
}

fn priority(accept_language: &str, code: &str) -> Option<usize> {
    accept_language
        .find(code)
        .map(|offset| accept_language.len() - offset)
}
