use std::io::Write;

use serial_test::serial;
use tempfile::NamedTempFile;

use super::*;

const REPLY_MARKDOWN_ENV: &str = "VERSO__RENDER__REPLY_MARKDOWN";

fn render_cli(extra: &[&str]) -> CliArgs {
    let mut argv = vec!["verso", "render"];
    argv.extend_from_slice(extra);
    CliArgs::parse_from(argv)
}

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn defaults_are_quiet_compact_and_plain_replies() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert!(!settings.render.reply_markdown);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("info".to_string());
    raw.render.reply_markdown = Some(false);

    let overrides = RenderOverrides {
        reply_markdown: Some(true),
        log_level: Some("debug".to_string()),
        log_json: Some(true),
    };

    raw.apply_render_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(settings.render.reply_markdown);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn invalid_log_level_names_the_key() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());

    match Settings::from_raw(raw) {
        Err(LoadError::Invalid { key, .. }) => assert_eq!(key, "logging.level"),
        other => panic!("expected invalid level, got {other:?}"),
    }
}

#[test]
#[serial]
fn config_file_then_environment_then_cli() {
    let file = config_file("[logging]\nlevel = \"warn\"\n\n[render]\nreply_markdown = false\n");
    let path = file.path().to_string_lossy().into_owned();

    let settings = load(&render_cli(&["--config-file", &path])).expect("settings");
    assert_eq!(settings.logging.level, LevelFilter::WARN);
    assert!(!settings.render.reply_markdown);

    // SAFETY: serialised with every other test that touches the environment.
    unsafe {
        std::env::set_var(REPLY_MARKDOWN_ENV, "true");
    }
    let from_env = load(&render_cli(&["--config-file", &path]));
    let from_cli = load(&render_cli(&[
        "--config-file",
        &path,
        "--reply-markdown",
        "false",
    ]));
    unsafe {
        std::env::remove_var(REPLY_MARKDOWN_ENV);
    }

    assert!(from_env.expect("settings").render.reply_markdown);
    assert!(!from_cli.expect("settings").render.reply_markdown);
}

#[test]
#[serial]
fn missing_explicit_config_file_is_an_error() {
    let cli = CliArgs::parse_from(["verso", "--config-file", "/nonexistent/verso.toml", "render"]);
    assert!(matches!(load(&cli), Err(LoadError::Build(_))));
}

#[test]
fn parse_render_arguments() {
    let args = render_cli(&[
        "--input",
        "posts.json",
        "--accept-language",
        "ja,en;q=0.8",
        "--preview",
        "--password",
        "hunter2",
        "--pretty",
        "--reply-markdown",
        "yes",
    ]);

    match args.command.expect("render command") {
        Command::Render(render) => {
            assert_eq!(
                render.input.as_deref(),
                Some(std::path::Path::new("posts.json"))
            );
            assert_eq!(render.accept_language.as_deref(), Some("ja,en;q=0.8"));
            assert!(render.preview);
            assert_eq!(render.password.as_deref(), Some("hunter2"));
            assert!(render.pretty);
            assert!(!render.title_only);
            assert!(!render.strict);
            assert_eq!(render.overrides.reply_markdown, Some(true));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parse_theme_css_command() {
    let args = CliArgs::parse_from(["verso", "theme-css"]);
    assert!(matches!(args.command, Some(Command::ThemeCss)));
}

#[test]
fn command_is_optional() {
    let args = CliArgs::parse_from(["verso"]);
    assert!(args.command.is_none());
}
