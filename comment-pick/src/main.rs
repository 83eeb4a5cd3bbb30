//! comment-pick - Print a random SoundCloud comment that passes the filters

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use libcommentcast::logging::{LogFormat, LoggingConfig};
use libcommentcast::selection::SelectionLimits;
use libcommentcast::{CommentcastError, CommentcastService, Config, SelectedComment};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "comment-pick")]
#[command(version, about = "Print a random SoundCloud comment that passes the filters")]
#[command(long_about = r#"Draw random SoundCloud tracks until one has a short, clean, English
comment and print it to stdout. Nothing is posted.

EXAMPLES:
    # Print one comment
    comment-pick

    # Bound the search
    comment-pick --max-attempts 50 --deadline 2m

    # Post it with another tool
    comment-pick | toot post

    # Keep the source link
    comment-pick --format json | jq -r '.source_url'

REQUIRED ENVIRONMENT:
    SOUNDCLOUD_CLIENT_ID, SOUNDCLOUD_SECRET, GOOGLE_TRANSLATE_API_KEY

EXIT CODES:
    0 - A comment was printed
    1 - No comment found within the limits, or an upstream failed
    2 - SoundCloud rejected the client credentials
    3 - Invalid arguments or configuration
"#)]
struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Give up after this many track fetches
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Give up after this much time, e.g. "10m"
    #[arg(long, value_parser = humantime::parse_duration)]
    deadline: Option<Duration>,

    /// Configuration file (defaults to COMMENTCAST_CONFIG or the XDG config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log format for stderr (text, json or pretty)
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Log settings may come from .env, so load it before the subscriber
    dotenvy::dotenv().ok();

    let mut logging = LoggingConfig::from_env(cli.verbose);
    if let Some(format) = cli.log_format {
        logging.format = format;
    }
    logging.init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<CommentcastError>()
            .map(CommentcastError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    let mut limits = SelectionLimits::from_config(&config.selection)?;
    if let Some(max_attempts) = cli.max_attempts {
        if max_attempts == 0 {
            return Err(CommentcastError::InvalidInput(
                "--max-attempts must be at least 1".to_string(),
            )
            .into());
        }
        limits.max_attempts = Some(max_attempts);
    }
    if let Some(deadline) = cli.deadline {
        limits.deadline = Some(deadline);
    }

    let service = CommentcastService::from_env(config, Some(&[] as &[String]))?;
    let selected = service.pick(limits).await?;
    tracing::debug!(
        attempts = selected.attempts,
        source = %selected.source_url,
        "Picked comment"
    );

    println!("{}", render(&selected, cli.format)?);
    Ok(())
}

fn render(selected: &SelectedComment, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => Ok(selected.text.clone()),
        OutputFormat::Json => {
            serde_json::to_string(selected).context("Failed to serialize selected comment")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selected() -> SelectedComment {
        SelectedComment {
            text: "this drop is unreal".to_string(),
            source_url: "https://soundcloud.com/a/b".to_string(),
            attempts: 12,
        }
    }

    #[test]
    fn test_render_text_is_bare_comment() {
        assert_eq!(
            render(&selected(), OutputFormat::Text).unwrap(),
            "this drop is unreal"
        );
    }

    #[test]
    fn test_render_json_single_line() {
        let json = render(&selected(), OutputFormat::Json).unwrap();
        assert!(!json.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["attempts"], 12);
        assert_eq!(value["source_url"], "https://soundcloud.com/a/b");
    }
}
