use std::sync::Arc;

use serde_json::{Value, json};
use verso::application::render::{
    CodeHighlighter, LanguageResolution, PROTECTED_NOTICE, PostRenderer, RenderError,
    RenderOptions, SyntectHighlighter,
};
use verso::domain::{error::DomainError, posts::BlogPost};

/// Highlighter whose engine fails on every fragment.
struct BrokenHighlighter;

impl CodeHighlighter for BrokenHighlighter {
    fn highlight(
        &self,
        language: Option<&str>,
        _code: &str,
        _resolution: LanguageResolution,
    ) -> Result<Option<String>, RenderError> {
        Err(RenderError::highlighting(
            language.unwrap_or("auto"),
            "grammar crashed",
        ))
    }
}

fn renderer() -> PostRenderer {
    PostRenderer::new(Arc::new(SyntectHighlighter::new()))
}

fn posts(value: Value) -> Vec<BlogPost> {
    serde_json::from_value(value).expect("stored posts")
}

fn bilingual_post() -> Value {
    json!({
        "_id": "p1",
        "slug": "greetings",
        "date": "2017-03-04T05:06:07Z",
        "body": [
            { "language": "en", "title": "Hello", "content": "Hello **world**", "format": "markdown", "default": true },
            { "language": "ja", "title": "こんにちは", "content": "{世界}(せかい)", "format": "Markdown" }
        ],
        "replies": [
            { "author": "ann", "content": "Nice `code` <b>bold</b>" },
            { "author": "bob", "content": "" }
        ]
    })
}

fn protected_post() -> Value {
    json!({
        "date": 1_488_603_967_000_i64,
        "password": "x",
        "body": [
            { "language": "en", "title": "Secret", "content": "classified", "format": "markdown" }
        ],
        "replies": [ { "content": "spoiler" } ]
    })
}

#[test]
fn earlier_preference_selects_variant_and_orders_languages() {
    let input = posts(json!([bilingual_post()]));
    let options = RenderOptions::new().with_accept_language("ja,en-US;q=0.9,en;q=0.8");

    let rendered = renderer().render(&input, &options);

    assert_eq!(rendered.len(), 1);
    let post = &rendered[0];
    assert_eq!(post.language, "ja");
    assert_eq!(post.title, "こんにちは");
    let codes: Vec<_> = post.languages.iter().map(|option| option.code.as_str()).collect();
    assert_eq!(codes, ["ja", "en"]);
    assert_eq!(post.languages[1].name, "English");
}

#[test]
fn unmatched_preference_selects_default_variant() {
    let input = posts(json!([bilingual_post()]));
    let options = RenderOptions::new().with_accept_language("fr-FR,de;q=0.5");

    let rendered = renderer().render(&input, &options);

    assert_eq!(rendered[0].language, "en");
    assert_eq!(
        rendered[0].content.as_deref(),
        Some("<p>Hello <strong>world</strong></p>\n")
    );
}

#[test]
fn missing_or_wrong_password_shows_notice_only() {
    let input = posts(json!([protected_post()]));

    for options in [
        RenderOptions::new(),
        RenderOptions::new().with_password("y"),
    ] {
        let rendered = renderer().render(&input, &options);
        let post = &rendered[0];

        assert!(post.protected);
        assert!(post.more);
        assert_eq!(post.replies.as_deref(), Some(&[][..]));
        assert_eq!(post.title, "Secret");
        let content = post.content.as_deref().expect("content");
        assert!(content.contains(PROTECTED_NOTICE));
        assert!(!content.contains("classified"));

        let json = serde_json::to_value(post).expect("json");
        assert!(json.get("password").is_none());
        assert!(json.get("body").is_none());
    }
}

#[test]
fn correct_password_shows_content_without_password_field() {
    let input = posts(json!([protected_post()]));

    let rendered = renderer().render(&input, &RenderOptions::new().with_password("x"));
    let post = &rendered[0];

    assert!(!post.protected);
    assert!(!post.more);
    assert_eq!(post.content.as_deref(), Some("<p>classified</p>\n"));

    let json = serde_json::to_value(post).expect("json");
    assert!(json.get("password").is_none());
    assert_eq!(json["replies"][0]["content"], json!("spoiler"));
}

#[test]
fn markdown_preview_keeps_only_text_before_marker() {
    let input = posts(json!([{
        "date": "2020-01-01T00:00:00Z",
        "body": [ { "language": "en", "title": "T", "content": "A\n<!-- more -->\nB", "format": "markdown" } ]
    }]));

    let preview = renderer().render(&input, &RenderOptions::new().with_preview(true));
    assert!(preview[0].more);
    assert_eq!(preview[0].content.as_deref(), Some("<p>A</p>\n"));

    let full = renderer().render(&input, &RenderOptions::new());
    assert!(!full[0].more);
    assert!(full[0].content.as_deref().is_some_and(|html| html.contains("<p>B</p>")));
}

#[test]
fn template_preview_cuts_converted_html() {
    let input = posts(json!([{
        "date": "2020-01-01T00:00:00Z",
        "body": [ { "language": "en", "title": "T", "content": "p A\n<!-- more -->\np B", "format": "JADE" } ]
    }]));

    let rendered = renderer().render(&input, &RenderOptions::new().with_preview(true));

    assert!(rendered[0].more);
    assert_eq!(rendered[0].content.as_deref(), Some("<p>A</p>"));
}

#[test]
fn ruby_shorthand_becomes_ruby_element() {
    let input = posts(json!([{
        "date": "2020-01-01T00:00:00Z",
        "body": [ { "language": "ja", "title": "T", "content": "{東京}(とうきょう)へ", "format": "markdown" } ]
    }]));

    let rendered = renderer().render(&input, &RenderOptions::new());
    let html = rendered[0].content.as_deref().expect("content");

    assert!(html.contains("<ruby>東京<rp>(</rp><rt>とうきょう</rt><rp>)</rp></ruby>"));
}

#[test]
fn title_only_output_is_repeatable_and_has_no_source_fields() {
    let input = posts(json!([bilingual_post(), protected_post()]));
    let options = RenderOptions::new().with_title_only(true);
    let renderer = renderer();

    let first = renderer.render(&input, &options);
    let second = renderer.render(&input, &options);

    assert_eq!(first, second);
    for post in &first {
        assert!(post.content.is_none());
        let json = serde_json::to_value(post).expect("json");
        assert!(json.get("body").is_none());
        assert!(json.get("password").is_none());
        assert!(json.get("content").is_none());
    }
    assert!(first[1].protected);
}

#[test]
fn input_posts_are_left_untouched() {
    let input = posts(json!([bilingual_post(), protected_post()]));
    let snapshot = input.clone();

    let _ = renderer().render(&input, &RenderOptions::new().with_reply_markdown(true));

    assert_eq!(input, snapshot);
}

#[test]
fn fake_rendering_gates_without_converting() {
    let input = posts(json!([protected_post()]));

    let rendered = renderer().render(&input, &RenderOptions::new().with_fake_rendering(true));
    let post = &rendered[0];

    assert!(post.protected);
    assert!(post.content.is_none());
    assert_eq!(post.title, "Secret");
}

#[test]
fn highlighter_failures_keep_every_post() {
    let input = posts(json!([
        {
            "date": "2020-01-01T00:00:00Z",
            "body": [ { "language": "en", "title": "md", "content": "```rust\nlet a = 1 < 2;\n```", "format": "markdown" } ]
        },
        {
            "date": "2020-01-02T00:00:00Z",
            "body": [ { "language": "en", "title": "pug", "content": "code(lang=\"js\") var x = 1;", "format": "pug" } ]
        },
        {
            "date": "2020-01-03T00:00:00Z",
            "body": [ { "language": "en", "title": "html", "content": "<code>plain &amp; simple</code>", "format": "html" } ]
        }
    ]));
    let renderer = PostRenderer::new(Arc::new(BrokenHighlighter));

    let rendered = renderer.render(&input, &RenderOptions::new());

    assert_eq!(rendered.len(), 3);
    let contents: Vec<_> = rendered
        .iter()
        .map(|post| post.content.as_deref().expect("content"))
        .collect();
    assert!(contents[0].contains("<span class=\"__line\">let a = 1 &lt; 2;</span>"));
    assert!(contents[1].contains("<span class=\"__line\">var x = 1;</span>"));
    assert!(contents[2].contains("<span class=\"__line\">plain &amp; simple</span>"));
}

#[test]
fn post_without_variants_empties_the_batch() {
    let input = posts(json!([
        bilingual_post(),
        { "date": "2020-01-01T00:00:00Z", "body": [] }
    ]));
    let renderer = renderer();

    assert!(renderer.render(&input, &RenderOptions::new()).is_empty());
    assert!(matches!(
        renderer.try_render(&input, &RenderOptions::new()),
        Err(RenderError::Domain(DomainError::NoContent))
    ));
}

#[test]
fn template_errors_empty_the_batch() {
    let input = posts(json!([{
        "date": "2020-01-01T00:00:00Z",
        "body": [ { "language": "en", "title": "T", "content": "p= user.name", "format": "pug" } ]
    }]));

    let renderer = renderer();
    assert!(renderer.render(&input, &RenderOptions::new()).is_empty());
    assert!(matches!(
        renderer.try_render(&input, &RenderOptions::new()),
        Err(RenderError::Template { line: 1, .. })
    ));
}

#[test]
fn reply_markdown_converts_non_empty_replies() {
    let input = posts(json!([bilingual_post()]));

    let rendered = renderer().render(&input, &RenderOptions::new().with_reply_markdown(true));
    let replies = rendered[0].replies.as_deref().expect("replies");

    assert!(replies[0].markdown);
    assert_eq!(
        replies[0].content.as_deref(),
        Some("<p>Nice <code>code</code> &lt;b&gt;bold&lt;/b&gt;</p>\n")
    );
    assert_eq!(replies[0].extra.get("author"), Some(&json!("ann")));
    assert!(!replies[1].markdown);
    assert_eq!(replies[1].content.as_deref(), Some(""));
}

#[test]
fn replies_stay_raw_when_markdown_is_disabled() {
    let input = posts(json!([bilingual_post()]));

    let rendered = renderer().render(&input, &RenderOptions::new());
    let replies = rendered[0].replies.as_deref().expect("replies");

    assert!(!replies[0].markdown);
    assert_eq!(
        replies[0].content.as_deref(),
        Some("Nice `code` <b>bold</b>")
    );

    let json = serde_json::to_value(&rendered[0]).expect("json");
    assert_eq!(
        json["replies"][0],
        json!({ "author": "ann", "content": "Nice `code` <b>bold</b>" })
    );
}

#[test]
fn rendered_json_keeps_extra_fields_and_normalises_dates() {
    let input = posts(json!([protected_post(), bilingual_post()]));

    let rendered = renderer().render(&input, &RenderOptions::new().with_accept_language("en"));
    let json = serde_json::to_value(&rendered).expect("json");

    assert_eq!(json[0]["date"], json!("2017-03-04T05:06:07Z"));
    assert_eq!(json[1]["date"], json!("2017-03-04T05:06:07Z"));
    assert_eq!(json[1]["slug"], json!("greetings"));
    assert_eq!(json[1]["_id"], json!("p1"));
    assert_eq!(json[1]["title"], json!("Hello"));
    assert_eq!(json[1]["more"], json!(false));
    assert_eq!(json[1]["languages"][0], json!({ "name": "English", "code": "en" }));
}

#[test]
fn shared_renderer_matches_a_fresh_one() {
    let input = posts(json!([bilingual_post()]));
    let options = RenderOptions::new().with_accept_language("ja");

    assert_eq!(
        verso::application::render::render(&input, &options),
        renderer().render(&input, &options)
    );
}
