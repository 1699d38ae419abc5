use anidb_udp_cli::config::{AppConfig, ConfigManager};
use anidb_udp_cli::session;
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::{Input, Password};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "anidb-udp")]
#[command(author, version, about = "AniDB UDP API session client", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Config file to use instead of the default location
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check AniDB credentials without keeping the session
    TestLogin {
        /// Account name (defaults to the configured one)
        #[arg(short, long)]
        username: Option<String>,

        /// Password (prompted for when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Log in and send a keepalive PING
    Ping,

    /// Log in and send a raw API command
    Send {
        /// Command text, e.g. "ANIME aid=1"
        command: String,

        /// Send as single-byte text instead of UTF-16
        #[arg(long)]
        narrow: bool,
    },

    /// Show the connection state after opening the socket
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default())
            .filter_level(log::LevelFilter::Debug)
            .filter_module("anidb_udp_core", log::LevelFilter::Trace)
            .filter_module("anidb_udp_cli", log::LevelFilter::Debug)
            .format_timestamp_millis()
            .init();
        eprintln!("Debug logging enabled");
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new(),
    };
    let config = manager.load()?;
    log::debug!("Loaded configuration from {}", manager.config_path().display());

    match cli.command {
        Commands::TestLogin { username, password } => {
            test_login_command(&config, username, password).await?;
        }
        Commands::Ping => {
            let reply = session::ping(&config).await?;
            println!("{} {reply}", "✓".green());
        }
        Commands::Send { command, narrow } => {
            let reply = session::send(&config, &command, !narrow).await?;
            println!("{reply}");
        }
        Commands::Status { json } => {
            let status = session::status(&config).await?;
            if json {
                let value = serde_json::json!({
                    "phase": status.phase.to_string(),
                    "logged_on": status.logged_on,
                    "invalid_session": status.invalid_session,
                    "banned": status.banned,
                    "ban_expires": status.ban_expires.map(|expires| expires.to_rfc3339()),
                    "network_available": status.network_available,
                    "alive": status.alive,
                    "image_server_url": status.image_server_url,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{}", session::render_status(&status));
                if !config.account.has_credentials() {
                    println!(
                        "\n{} no credentials configured in {}",
                        "note:".yellow(),
                        manager.config_path().display()
                    );
                }
            }
        }
        Commands::Config => {
            show_config(&manager, config)?;
        }
    }

    Ok(())
}

async fn test_login_command(
    config: &AppConfig,
    username: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let username = match username {
        Some(username) => username,
        None if !config.account.username.is_empty() => config.account.username.clone(),
        None => Input::new()
            .with_prompt("Username")
            .interact_text()
            .context("Failed to read username")?,
    };

    let password = match password {
        Some(password) => password,
        None => Password::new()
            .with_prompt("Password")
            .interact()
            .context("Failed to read password")?,
    };

    if session::test_login(config, &username, &password).await? {
        println!("{} credentials accepted for {}", "✓".green(), username.bold());
        Ok(())
    } else {
        bail!("AniDB rejected the login for {username}")
    }
}

fn show_config(manager: &ConfigManager, mut config: AppConfig) -> Result<()> {
    if !config.account.password.is_empty() {
        config.account.password = "***".to_string();
    }

    println!("{} {}", "Config file:".bold(), manager.config_path().display());
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
