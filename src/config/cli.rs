use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the verso binary.
#[derive(Debug, Parser)]
#[command(name = "verso", version, about = "Render stored blog posts to HTML")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "VERSO_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render a JSON array of stored posts into a JSON array of rendered posts.
    Render(Box<RenderArgs>),
    /// Print the stylesheet for highlighted code blocks.
    #[command(name = "theme-css")]
    ThemeCss,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub overrides: RenderOverrides,

    /// Read posts from a file instead of standard input.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub input: Option<PathBuf>,

    /// Raw Accept-Language value used to pick a body variant.
    #[arg(long = "accept-language", value_name = "LANGUAGES")]
    pub accept_language: Option<String>,

    /// Cut content at the preview marker.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub preview: bool,

    /// Password guess for protected posts.
    #[arg(long, value_name = "PASSWORD")]
    pub password: Option<String>,

    /// Skip content conversion.
    #[arg(long = "title-only", action = clap::ArgAction::SetTrue)]
    pub title_only: bool,

    /// Select language and apply the password gate without converting content.
    #[arg(long = "fake-rendering", action = clap::ArgAction::SetTrue)]
    pub fake_rendering: bool,

    /// Pretty-print the JSON output.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub pretty: bool,

    /// Exit with an error instead of printing an empty list when a post fails.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub strict: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderOverrides {
    /// Toggle Markdown conversion of reply content.
    #[arg(
        long = "reply-markdown",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub reply_markdown: Option<bool>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}
