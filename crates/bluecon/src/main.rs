// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! BlueCon - command-line client for Fermax Blue video intercoms.

mod commands;
mod prompt;
mod shutdown;
mod wiring;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// BlueCon - talk to your Fermax Blue intercom from the terminal.
#[derive(Parser, Debug)]
#[command(name = "bluecon", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Log in with your account password and store the token.
    Login {
        /// Account e-mail; defaults to `account.username` from the config.
        #[arg(long)]
        username: Option<String>,
    },
    /// List paired devices and their doors.
    Pairings,
    /// Show the account profile.
    User,
    /// Show connection telemetry for a device.
    DeviceInfo { device_id: String },
    /// Open a door. DOOR is the door key (e.g. ZERO) or its title.
    OpenDoor { device_id: String, door: String },
    /// Register for push and mark the app token active (or inactive).
    AppToken {
        #[arg(long)]
        inactive: bool,
    },
    /// Save the photo of the latest call on a device.
    LastPicture { device_id: String, output: PathBuf },
    /// Print call notifications until interrupted.
    Listen,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => bluecon_config::load_and_validate_path(path),
        None => bluecon_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            bluecon_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging.level);

    let result = match cli.command {
        Commands::Login { username } => commands::login(&config, username).await,
        Commands::Pairings => commands::pairings(&config).await,
        Commands::User => commands::user(&config).await,
        Commands::DeviceInfo { device_id } => commands::device_info(&config, &device_id).await,
        Commands::OpenDoor { device_id, door } => {
            commands::open_door(&config, &device_id, &door).await
        }
        Commands::AppToken { inactive } => commands::app_token(&config, !inactive).await,
        Commands::LastPicture { device_id, output } => {
            commands::last_picture(&config, &device_id, &output).await
        }
        Commands::Listen => commands::listen(&config).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Initialize the tracing subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "bluecon={log_level},bluecon_client={log_level},bluecon_fcm={log_level},\
             bluecon_storage={log_level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .init();
}
