use std::{
    fs,
    io::{self, Read, Write},
    path::Path,
    process,
};

use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;
use verso::{
    application::{
        error::AppError,
        render::{RenderOptions, post_renderer, theme_css},
    },
    config,
    domain::posts::BlogPost,
    infra::{error::InfraError, telemetry},
};

fn main() {
    if let Err(error) = run() {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    let report = error.report();

    if dispatcher::has_been_set() {
        error!(error = %error, chain = ?report.messages, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, chain = ?report.messages, "application error");
    });
}

fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Render(Box::<config::RenderArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Render(args) => run_render(&settings, *args),
        config::Command::ThemeCss => write_stdout(theme_css()),
    }
}

fn run_render(settings: &config::Settings, args: config::RenderArgs) -> Result<(), AppError> {
    let input = read_input(args.input.as_deref())?;
    let posts: Vec<BlogPost> = serde_json::from_str(&input).map_err(InfraError::from)?;
    let options = render_options(settings, &args);

    let renderer = post_renderer();
    let rendered = if args.strict {
        renderer.try_render(&posts, &options)?
    } else {
        renderer.render(&posts, &options)
    };

    info!(
        target = "verso::render",
        posts = posts.len(),
        rendered = rendered.len(),
        preview = options.preview,
        reply_markdown = options.reply_markdown,
        "Render finished"
    );

    let mut output = if args.pretty {
        serde_json::to_string_pretty(&rendered)
    } else {
        serde_json::to_string(&rendered)
    }
    .map_err(InfraError::from)?;
    output.push('\n');

    write_stdout(&output)
}

fn render_options(settings: &config::Settings, args: &config::RenderArgs) -> RenderOptions {
    let mut options = RenderOptions::new()
        .with_preview(args.preview)
        .with_title_only(args.title_only)
        .with_fake_rendering(args.fake_rendering)
        .with_reply_markdown(settings.render.reply_markdown);

    if let Some(accept_language) = args.accept_language.as_ref() {
        options = options.with_accept_language(accept_language.clone());
    }
    if let Some(password) = args.password.as_ref() {
        options = options.with_password(password.clone());
    }

    options
}

fn read_input(path: Option<&Path>) -> Result<String, AppError> {
    let input = match path {
        Some(path) => fs::read_to_string(path).map_err(InfraError::from)?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(InfraError::from)?;
            buffer
        }
    };

    if input.trim().is_empty() {
        return Err(AppError::validation("no post data on input"));
    }

    Ok(input)
}

fn write_stdout(text: &str) -> Result<(), AppError> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .map_err(InfraError::from)?;
    stdout.flush().map_err(InfraError::from)?;
    Ok(())
}
