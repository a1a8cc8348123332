mod commands;
mod output;

use clap::{Parser, Subcommand};
use jester_core::config::{self, JesterConfig};
use jester_core::{Doubloons, PlayerId, Rank};
use miette::Result;
use std::path::PathBuf;
use tracing::info;

use crate::output::Output;

#[derive(Parser)]
#[command(name = "jester")]
#[command(about = "JesterBot Court economy: ranks, doubloons, masks and favor")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Ledger file path (overrides config)
    #[arg(long)]
    ledger: Option<PathBuf>,

    /// Print outcomes as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Join the Court
    Join { player: PlayerId },
    /// Give a card to another player
    Card { actor: PlayerId, target: PlayerId },
    /// Collect daily doubloons
    Daily { player: PlayerId },
    /// Buy a mask
    Buy {
        player: PlayerId,
        /// Item name, e.g. "Comedy Mask"
        item: String,
    },
    /// Gift doubloons to another player
    Gift {
        sender: PlayerId,
        recipient: PlayerId,
        amount: Doubloons,
    },
    /// Show a player's profile
    Profile { player: PlayerId },
    /// Show the top players by experience
    Leaderboard {
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Show recent Court activity
    Activity {
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// List masks for sale
    Shop {
        /// Show prices for this player
        #[arg(long)]
        player: Option<PlayerId>,
    },
    /// Privileged commands
    Admin {
        #[command(subcommand)]
        cmd: AdminCommands,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Adjust a player's favor (negative amounts take favor away)
    Favor {
        granter: PlayerId,
        target: PlayerId,
        #[arg(allow_hyphen_values = true)]
        amount: i64,
        /// Favor lapses after this many minutes
        #[arg(long)]
        minutes: Option<i64>,
    },
    /// Set a player's stored rank
    Rank {
        granter: PlayerId,
        target: PlayerId,
        rank: Rank,
    },
    /// Set a player's experience without changing their rank
    Exp {
        granter: PlayerId,
        target: PlayerId,
        experience: u64,
    },
    /// List players whose rank disagrees with their experience
    Divergence,
    /// Clear expired favor now
    Sweep,
    /// Keep clearing expired favor until interrupted
    Watch,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Save current configuration to file
    Save {
        /// Path to save configuration
        #[arg(default_value = "jester.toml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .rgb_colors(miette::RgbColors::Preferred)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))?;
    miette::set_panic_hook();
    let cli = Cli::parse();

    use tracing_subscriber::{EnvFilter, fmt};

    let filter = if cli.debug {
        EnvFilter::new("jester_core=debug,jester_cli=debug")
    } else {
        EnvFilter::new("jester_core=info,jester_cli=info,warn")
    };

    fmt()
        .with_env_filter(filter)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_timer(tracing_subscriber::fmt::time::LocalTime::rfc_3339())
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let (mut config, config_source) = if let Some(config_path) = &cli.config {
        info!("Loading config from: {:?}", config_path);
        (
            config::load_config(config_path).await?,
            config_path.display().to_string(),
        )
    } else {
        info!("Loading config from standard locations");
        (JesterConfig::load().await?, "standard locations".to_string())
    };
    config.apply_env();

    if let Some(ledger) = &cli.ledger {
        info!("Overriding ledger path with: {:?}", ledger);
        config.storage.path = ledger.clone();
    }

    let output = Output::new(cli.json);

    if let Commands::Config { cmd } = &cli.command {
        return match cmd {
            ConfigCommands::Show => commands::config::show(&config, &output).await,
            ConfigCommands::Save { path } => commands::config::save(&config, path, &output).await,
        };
    }

    let court = commands::open_court(&config, &config_source)?;

    match &cli.command {
        Commands::Join { player } => commands::player::join(&court, player, &output).await?,
        Commands::Card { actor, target } => {
            commands::player::card(&court, actor, target, &output).await?
        }
        Commands::Daily { player } => commands::player::daily(&court, player, &output).await?,
        Commands::Buy { player, item } => {
            commands::player::buy(&court, player, item, &output).await?
        }
        Commands::Gift {
            sender,
            recipient,
            amount,
        } => commands::player::gift(&court, sender, recipient, amount, &output).await?,
        Commands::Profile { player } => commands::player::profile(&court, player, &output).await?,
        Commands::Leaderboard { limit } => {
            commands::court::leaderboard(&court, *limit, &output).await?
        }
        Commands::Activity { limit } => commands::court::activity(&court, *limit, &output).await?,
        Commands::Shop { player } => {
            commands::court::shop(&court, player.as_ref(), &output).await?
        }
        Commands::Admin { cmd } => match cmd {
            AdminCommands::Favor {
                granter,
                target,
                amount,
                minutes,
            } => {
                commands::admin::favor(&court, granter, target, *amount, *minutes, &output).await?
            }
            AdminCommands::Rank {
                granter,
                target,
                rank,
            } => commands::admin::set_rank(&court, granter, target, *rank, &output).await?,
            AdminCommands::Exp {
                granter,
                target,
                experience,
            } => {
                commands::admin::set_experience(&court, granter, target, *experience, &output)
                    .await?
            }
            AdminCommands::Divergence => commands::admin::divergence(&court, &output).await?,
            AdminCommands::Sweep => commands::admin::sweep(&court, &output).await?,
            AdminCommands::Watch => {
                commands::admin::watch(&court, config.sweep_interval(), &output).await?
            }
        },
        Commands::Config { .. } => {}
    }

    Ok(())
}
