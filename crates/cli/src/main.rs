//! Tradewind CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! tw-cli migrate
//!
//! # Seed a demo catalogue
//! tw-cli seed
//!
//! # Create a privileged account
//! tw-cli account create -e owner@shop.example -p 'S3cure pass' -r owner
//!
//! # Delete orderless guest accounts older than 30 days
//! tw-cli account purge-guests --days 30
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "tw-cli")]
#[command(author, version, about = "Tradewind CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the catalogue with demo products, tags, and images
    Seed,
    /// Manage accounts
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
}

#[derive(Subcommand)]
enum AccountAction {
    /// Create a new account with an elevated role
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (at least 8 characters with an uppercase letter)
        #[arg(short, long)]
        password: String,

        /// Role (`customer`, `employee`, `admin`, `owner`)
        #[arg(short, long, default_value = "employee")]
        role: String,
    },

    /// Delete orderless guest accounts older than the given age
    PurgeGuests {
        /// Minimum age in days
        #[arg(long, default_value_t = 30)]
        days: i32,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
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
        Commands::Seed => commands::seed::run().await?,
        Commands::Account { action } => match action {
            AccountAction::Create {
                email,
                password,
                role,
            } => {
                commands::account::create(&email, &password, &role).await?;
            }
            AccountAction::PurgeGuests { days } => {
                commands::account::purge_guests(days).await?;
            }
        },
    }
    Ok(())
}
