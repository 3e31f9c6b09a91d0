//! VitaGuide CLI - migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Run profile database migrations
//! vitaguide migrate
//!
//! # Classify a message offline and print the intent
//! vitaguide classify -m "Give me a product list for energy" --profile me.yaml
//!
//! # Store or inspect a profile
//! vitaguide profile upsert -f me.yaml
//! vitaguide profile show -u user-123
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `classify` - Run the intent classifier without calling any service
//! - `profile` - Manage stored user profiles

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "vitaguide")]
#[command(author, version, about = "VitaGuide CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Classify a message and print the intent as JSON
    Classify {
        /// User message
        #[arg(short, long)]
        message: String,

        /// Assistant reply to classify alongside the message
        #[arg(short, long, default_value = "")]
        reply: String,

        /// YAML profile file
        #[arg(short, long)]
        profile: Option<PathBuf>,
    },
    /// Manage stored profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Insert or replace a profile from a YAML file
    Upsert {
        /// YAML profile file
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Print a stored profile as JSON
    Show {
        /// User ID
        #[arg(short, long)]
        user_id: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Classify {
            message,
            reply,
            profile,
        } => commands::classify::run(&message, &reply, profile.as_deref())?,
        Commands::Profile { action } => match action {
            ProfileAction::Upsert { file } => commands::profile::upsert(&file).await?,
            ProfileAction::Show { user_id } => commands::profile::show(&user_id).await?,
        },
    }
    Ok(())
}
