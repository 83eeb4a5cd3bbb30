//! comment-post - Republish a random SoundCloud comment

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use libcommentcast::logging::{LogFormat, LoggingConfig};
use libcommentcast::selection::SelectionLimits;
use libcommentcast::{CommentcastError, CommentcastService, Config, RunReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "comment-post", version)]
#[command(about = "Find a random SoundCloud comment and post it to Mastodon and Bluesky", long_about = None)]
struct Cli {
    /// Target specific platform(s) (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    platform: Option<Vec<String>>,

    /// Select a comment and report it without posting
    #[arg(long)]
    dry_run: bool,

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

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let code = e
                .downcast_ref::<CommentcastError>()
                .map(CommentcastError::exit_code)
                .unwrap_or(1);
            std::process::exit(code);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
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

    let service = CommentcastService::from_env(config, cli.platform.as_deref())?;
    let report = service.run(limits, cli.dry_run).await?;

    let rendered = render(&report, cli.format, cli.dry_run)?;
    println!("{}", rendered);

    for failure in report.failures() {
        tracing::warn!(
            platform = %failure.platform,
            "Post failed: {}",
            failure.error.as_deref().unwrap_or("unknown error")
        );
    }

    if report.any_published() {
        Ok(0)
    } else {
        eprintln!("Error: the comment was not published to any platform");
        Ok(1)
    }
}

fn render(report: &RunReport, format: OutputFormat, dry_run: bool) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(report).context("Failed to serialize run report")
        }
        OutputFormat::Text => {
            let mut lines = vec![
                report.comment.clone(),
                format!(
                    "source: {} ({} attempts)",
                    report.source_url, report.attempts
                ),
            ];
            if dry_run {
                lines.push("dry run: nothing posted".to_string());
            }
            for result in &report.results {
                let line = match (&result.reference, &result.error) {
                    (Some(reference), _) => format!(
                        "{}: {}",
                        result.platform,
                        reference.url.as_deref().unwrap_or(&reference.id)
                    ),
                    (None, error) => format!(
                        "{}: failed: {}",
                        result.platform,
                        error.as_deref().unwrap_or("unknown error")
                    ),
                };
                lines.push(line);
            }
            Ok(lines.join("\n"))
        }
    }
}
