pub mod process;
pub mod render;

use std::{fmt::Display, path::PathBuf};

use anyhow::Result;
use chrono::{DateTime, Duration, Local, Utc};
use chrono_english::parse_date_string;
use clap::{Parser, Subcommand, ValueEnum};

use crate::{
    daemon::start_daemon,
    rpc::client::RpcClient,
    utils::{dir::AppPaths, logging::enable_console_logging},
};

#[derive(Parser, Debug)]
#[command(name = "Sidekick", version)]
#[command(about = "Personal activity daemon that turns your workday into character stats")]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Start the background daemon")]
    Init {},
    #[command(
        about = "Run the daemon directly in the current console. Used for creating a daemon internally and for debugging"
    )]
    Serve {},
    #[command(about = "Stop a currently running daemon")]
    Stop {},
    #[command(about = "Check whether the daemon is reachable")]
    Ping {},
    #[command(about = "Show daemon uptime and version")]
    Status {},
    #[command(about = "Show recorded activity samples")]
    Activity {
        #[arg(
            long,
            short = 'f',
            help = "Start of the range. Examples are \"yesterday\", \"1 hour ago\", \"15/03/2025\""
        )]
        from: Option<String>,
        #[arg(
            long,
            short = 't',
            help = "End of the range. Examples are \"yesterday\", \"1 hour ago\", \"15/03/2025\""
        )]
        to: Option<String>,
        #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
        date_style: DateStyle,
        #[arg(long, help = "Print raw JSON instead of a table")]
        json: bool,
    },
    #[command(about = "Show a 7-day activity summary")]
    Weekly {
        #[arg(
            long,
            help = "Average activity by hour of day instead of per-day totals"
        )]
        hourly: bool,
    },
    #[command(about = "Show your gamification status")]
    Game {
        #[arg(long, short, help = "Include modifiers and today's app usage")]
        detail: bool,
        #[arg(long, help = "Print raw JSON instead of bars")]
        json: bool,
    },
    #[command(about = "Show the daemon's persisted configuration")]
    Config {},
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();
    enable_console_logging(args.log);

    let paths = AppPaths::resolve(args.dir.clone())?;
    let client = RpcClient::new(paths.socket());

    match args.commands {
        Commands::Init {} => {
            process::restart_daemon(args.dir.as_deref())?;
            Ok(())
        }
        Commands::Serve {} => start_daemon(paths).await,
        Commands::Stop {} => {
            process::stop_daemon()?;
            Ok(())
        }
        Commands::Ping {} => {
            client.ping().await?;
            println!("Daemon is running");
            Ok(())
        }
        Commands::Status {} => {
            let status = client.daemon_status().await?;
            render::print_daemon_status(&status);
            Ok(())
        }
        Commands::Activity {
            from,
            to,
            date_style,
            json,
        } => {
            let from = parse_cli_date(from.as_deref(), date_style)?;
            let to = parse_cli_date(to.as_deref(), date_style)?;
            let samples = client.activity_logs(from, to).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&samples)?);
            } else {
                render::print_activity(&samples);
            }
            Ok(())
        }
        Commands::Weekly { hourly } => {
            let now = Utc::now();
            let samples = client
                .activity_logs(Some(now - Duration::days(7)), Some(now))
                .await?;
            if hourly {
                render::print_weekly_hourly(&samples);
            } else {
                render::print_weekly_daily(&samples);
            }
            Ok(())
        }
        Commands::Game { detail, json } => {
            if detail {
                let details = client.gamification_details(None).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&details)?);
                } else {
                    render::print_game_details(&details);
                }
            } else {
                let status = client.gamification_status(None).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&status)?);
                } else {
                    render::print_game_status(&status);
                }
            }
            Ok(())
        }
        Commands::Config {} => {
            let settings = client.config().await?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}

fn parse_cli_date(raw: Option<&str>, style: DateStyle) -> Result<Option<DateTime<Utc>>> {
    let Some(raw) = raw else { return Ok(None) };
    let parsed = parse_date_string(raw, Local::now(), style.into())
        .map_err(|e| anyhow::anyhow!("couldn't parse date {raw:?}: {e}"))?;
    Ok(Some(parsed.with_timezone(&Utc)))
}
