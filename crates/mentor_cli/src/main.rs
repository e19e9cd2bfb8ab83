//! Mentor CLI - command-line tools for Exercism mentors.

mod commands;
mod config;
mod shutdown;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use console::Term;
use mentor::MentorClient;
use tracing_subscriber::EnvFilter;

use crate::commands::discussions::{OrderArg, StatusArg};
use crate::commands::output::OutputFormat;

#[derive(Parser)]
#[command(name = "mentor")]
#[command(version)]
#[command(about = "Command-line tools for Exercism mentors")]
#[command(
    long_about = "Mentor talks to the Exercism API to watch notifications, report on and \
sync your solutions, list mentoring requests, and tidy up stale mentoring discussions. \
Requests are paced, rate limits are waited out, and transient failures are retried."
)]
#[command(after_long_help = r#"EXAMPLES
    Show unread notifications:
        $ mentor notifications

    Watch for new notifications and push them to Pushover:
        $ mentor watch

    Preview which stale discussions would be finished or nudged:
        $ mentor discussions nudge --dry-run

    Sync every out-of-date solution:
        $ mentor solutions sync

    Refresh a mentoring dashboard every three minutes:
        $ mentor dashboard --output ~/public_html/mentor.html --repeat

CONFIGURATION
    Mentor reads configuration from:
      1. The Exercism CLI's user.json (API token)
      2. ~/.config/mentor/config.toml (or $XDG_CONFIG_HOME/mentor/config.toml)
      3. ./mentor.toml
      4. Environment variables (MENTOR_ prefix, `__` between section and key)
      5. .env file in current directory

ENVIRONMENT VARIABLES
    MENTOR_API__TOKEN          Exercism API token
    MENTOR_API__BASE_URL       API root (default: https://exercism.org/api/v2)
    MENTOR_WATCH__INTERVAL_SECS  Seconds between notification polls
    MENTOR_PUSHOVER__TOKEN     Pushover application token
    MENTOR_PUSHOVER__USER      Pushover user key
    MENTOR_DASHBOARD__TRACKS   Comma-separated tracks for the dashboard
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show unread notifications
    Notifications {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Watch for new notifications until Ctrl+C
    ///
    /// Notifications that exist at startup are never reported. New ones are
    /// printed, appended to the configured pipe and pushed via Pushover.
    Watch {
        /// Seconds between polls (default from config or 900)
        #[arg(short, long)]
        interval: Option<u64>,

        /// File or FIFO to append notification text to
        #[arg(short, long)]
        pipe: Option<PathBuf>,

        /// Don't push notifications to Pushover
        #[arg(long)]
        no_pushover: bool,
    },
    /// Reports on and maintenance of your own solutions
    Solutions {
        #[command(subcommand)]
        action: SolutionsAction,
    },
    /// Stale mentoring discussions
    Discussions {
        #[command(subcommand)]
        action: DiscussionsAction,
    },
    /// List streaming events (upcoming by default)
    Events {
        /// Only live events
        #[arg(short, long)]
        live: bool,

        /// Include past events
        #[arg(short, long, conflicts_with = "live")]
        all: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// List open mentoring requests for a track
    Requests {
        /// Track slug, e.g. "python"
        track: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// List all track slugs
    Tracks {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Write an HTML page of open mentoring requests
    Dashboard {
        /// Output file (default from config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Tracks to include (default from config)
        #[arg(short, long, value_delimiter = ',')]
        tracks: Vec<String>,

        /// Keep refreshing the page until Ctrl+C
        #[arg(short, long)]
        repeat: bool,

        /// Seconds between refreshes (default from config or 180)
        #[arg(long, requires = "repeat")]
        every: Option<u64>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum SolutionsAction {
    /// List solutions whose published iteration fails its tests
    Failing {
        /// Only solutions on this track
        #[arg(short, long)]
        track: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// List every solution that is not passing, including never-tested ones
    Nonpassing {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Sync out-of-date solutions to the latest exercise version
    Sync {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
}

#[derive(Subcommand)]
enum DiscussionsAction {
    /// List discussions without activity for a number of days
    Stale {
        /// Discussion status to inspect
        #[arg(short, long, value_enum, default_value_t = StatusArg::AwaitingStudent)]
        status: StatusArg,

        /// Days without activity (default from config or 30)
        #[arg(short, long)]
        age_days: Option<u32>,

        /// Listing order
        #[arg(long, value_enum, default_value_t = OrderArg::Oldest)]
        order: OrderArg,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Finish abandoned discussions and nudge the other stale ones
    Nudge {
        /// Days without activity (default from config or 30)
        #[arg(short, long)]
        age_days: Option<u32>,

        /// Reminder text (default from config, or the stock message)
        #[arg(short, long)]
        message: Option<String>,

        /// Dry run - show what would be done without making changes
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Structured logging only when not attached to a terminal
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("mentor=info,mentor_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();

    // Handle commands that don't need the API first
    match &cli.command {
        Commands::Completions { shell } => return commands::meta::handle_completions(*shell),
        Commands::Man { output } => return commands::meta::handle_man(output.as_deref()),
        _ => {}
    }

    let config = config::Config::load();
    let client = MentorClient::new(config.client_config()?)?;
    let cancel = shutdown::setup_shutdown_handler();

    match cli.command {
        Commands::Notifications { output } => {
            commands::notifications::handle_notifications(&client, output).await?;
        }
        Commands::Watch {
            interval,
            pipe,
            no_pushover,
        } => {
            commands::watch::handle_watch(client, &config, interval, pipe, no_pushover, &cancel)
                .await?;
        }
        Commands::Solutions { action } => match action {
            SolutionsAction::Failing { track, output } => {
                commands::solutions::handle_failing(&client, track.as_deref(), output).await?;
            }
            SolutionsAction::Nonpassing { output } => {
                commands::solutions::handle_nonpassing(&client, output).await?;
            }
            SolutionsAction::Sync { output } => {
                commands::solutions::handle_sync(&client, output).await?;
            }
        },
        Commands::Discussions { action } => match action {
            DiscussionsAction::Stale {
                status,
                age_days,
                order,
                output,
            } => {
                commands::discussions::handle_stale(
                    &client, &config, status, age_days, order, output,
                )
                .await?;
            }
            DiscussionsAction::Nudge {
                age_days,
                message,
                dry_run,
                output,
            } => {
                commands::discussions::handle_nudge(
                    &client, &config, age_days, message, dry_run, output,
                )
                .await?;
            }
        },
        Commands::Events { live, all, output } => {
            commands::events::handle_events(&client, live, all, output).await?;
        }
        Commands::Requests { track, output } => {
            commands::requests::handle_requests(&client, &track, output).await?;
        }
        Commands::Tracks { output } => {
            commands::requests::handle_tracks(&client, output).await?;
        }
        Commands::Dashboard {
            output,
            tracks,
            repeat,
            every,
        } => {
            let path = output
                .or_else(|| config.dashboard.output.clone())
                .ok_or("No output file: pass --output or set dashboard.output")?;
            let tracks = if tracks.is_empty() {
                config.dashboard.tracks.clone()
            } else {
                tracks
            };
            let refresh = repeat
                .then(|| Duration::from_secs(every.unwrap_or(config.dashboard.refresh_secs)));
            commands::dashboard::handle_dashboard(&client, &tracks, path, refresh, &cancel)
                .await?;
        }
        Commands::Completions { .. } | Commands::Man { .. } => {}
    }

    Ok(())
}
