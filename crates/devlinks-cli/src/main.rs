//! devlinks CLI
//!
//! Command-line interface and dashboard for managing a link-in-bio profile
//! stored in Supabase.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use devlinks_core::{BackendError, Config, Platform, SupabaseClient};

mod commands;
mod output;
mod prompt;
mod tui;

use commands::profile::ProfileChanges;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "devlinks")]
#[command(about = "devlinks - Share all your developer links from one profile")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive dashboard
    Dashboard,
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account
    Register {
        #[arg(long)]
        email: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Send a password-recovery email
    Recover {
        /// Account email address
        email: String,
    },
    /// Set a new password using the token from a recovery email
    Reset {
        #[arg(long)]
        token: Option<String>,
    },
    /// Show the signed-in user
    Whoami,
    /// Manage your links
    Links {
        #[command(subcommand)]
        command: Option<LinkCommands>,
    },
    /// Show or edit your profile
    Profile {
        #[command(subcommand)]
        command: Option<ProfileCommands>,
    },
    /// Show a public profile as visitors see it
    Preview {
        /// Profile owner (defaults to the signed-in user)
        user_id: Option<Uuid>,
        /// Open the Nth link in the browser
        #[arg(long, value_name = "N")]
        open: Option<usize>,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show configuration and session status
    Status,
}

#[derive(Subcommand)]
enum LinkCommands {
    /// List your links
    #[command(alias = "ls")]
    List,
    /// Add a link
    Add {
        /// Platform (GitHub, Facebook, Instagram, YouTube, LinkedIn)
        #[arg(value_name = "TYPE")]
        link_type: Platform,
        /// Profile URL on that platform
        url: String,
    },
    /// Change a link's platform or URL
    Edit {
        /// Position shown by `links list`
        position: usize,
        #[arg(long = "type", value_name = "TYPE")]
        link_type: Option<Platform>,
        #[arg(long)]
        url: Option<String>,
    },
    /// Delete a link
    #[command(alias = "remove")]
    Rm {
        /// Position shown by `links list`
        position: usize,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Show your profile
    Show,
    /// Edit your profile (prompts when no field is given)
    Edit {
        #[arg(long = "first")]
        first_name: Option<String>,
        #[arg(long = "last")]
        last_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// PNG or JPG image, at most 1024x1024
        #[arg(long, value_name = "PATH")]
        avatar: Option<PathBuf>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, supabase_url, supabase_anon_key,
        /// avatar_bucket, recovery_redirect, log_file)
        key: String,
        /// Configuration value ("none" clears optional keys)
        value: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    match run(cli, &output).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let hint = e
                .chain()
                .find_map(|cause| cause.downcast_ref::<BackendError>())
                .and_then(BackendError::recovery_suggestion);
            if let Some(hint) = hint {
                eprintln!("  {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, output: &Output) -> Result<()> {
    let config_path = cli.config.as_ref();

    // Config commands work without a backend
    if let Some(Commands::Config { command }) = &cli.command {
        return match command.clone() {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key, value, config_path, output)
            }
        };
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    let command = cli.command.unwrap_or(Commands::Dashboard);
    if matches!(command, Commands::Dashboard) {
        let client = Arc::new(SupabaseClient::from_config(&config)?);
        return tui::run(&config, client).await;
    }

    init_cli_logging();

    if matches!(command, Commands::Status) {
        return commands::status::show(&config, config_path, output);
    }

    let client = Arc::new(SupabaseClient::from_config(&config)?);

    match command {
        Commands::Dashboard | Commands::Config { .. } | Commands::Status => Ok(()),
        Commands::Login { email } => commands::account::login(&client, email, output).await,
        Commands::Register { email } => commands::account::register(&client, email, output).await,
        Commands::Logout => commands::account::logout(&client, output).await,
        Commands::Recover { email } => {
            commands::account::recover(&client, &config, email, output).await
        }
        Commands::Reset { token } => commands::account::reset(&client, token, output).await,
        Commands::Whoami => commands::account::whoami(&client, output).await,
        Commands::Links { command } => handle_link_command(command, &client, output).await,
        Commands::Profile { command } => match command {
            Some(ProfileCommands::Show) | None => commands::profile::show(&client, output).await,
            Some(ProfileCommands::Edit {
                first_name,
                last_name,
                email,
                avatar,
            }) => {
                let changes = ProfileChanges {
                    first_name,
                    last_name,
                    email,
                    avatar,
                };
                commands::profile::edit(&client, changes, output).await
            }
        },
        Commands::Preview { user_id, open } => {
            commands::preview::show(&client, user_id, open, output).await
        }
    }
}

async fn handle_link_command(
    command: Option<LinkCommands>,
    client: &Arc<SupabaseClient>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(LinkCommands::List) | None => commands::links::list(client, output).await,
        Some(LinkCommands::Add { link_type, url }) => {
            commands::links::add(client, link_type, url, output).await
        }
        Some(LinkCommands::Edit {
            position,
            link_type,
            url,
        }) => commands::links::edit(client, position, link_type, url, output).await,
        Some(LinkCommands::Rm { position }) => commands::links::remove(client, position, output).await,
    }
}

/// Initialize stderr logging for one-shot commands
///
/// Only initializes if DEVLINKS_LOG is set.
fn init_cli_logging() {
    let Ok(log_level) = std::env::var("DEVLINKS_LOG") else {
        return;
    };

    let env_filter = EnvFilter::new(format!(
        "devlinks_core={},devlinks_cli={}",
        log_level, log_level
    ));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
