//! Clayhouse CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply storefront database migrations
//! clayhouse-cli migrate
//!
//! # Seed categories and an example product
//! clayhouse-cli seed
//!
//! # Grant or revoke the admin role
//! clayhouse-cli admin promote -e owner@clayhouse.kr
//! clayhouse-cli admin demote -e owner@clayhouse.kr
//! ```
//!
//! # Environment Variables
//!
//! - `CLAYHOUSE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "clayhouse-cli")]
#[command(author, version, about = "Clayhouse CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Insert starter categories and an example product
    Seed {
        /// Also create a reviewer account with this password and one review
        #[arg(long)]
        reviewer_password: Option<String>,
    },
    /// Manage account roles
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Give an email account the admin role
    Promote {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Return an admin to the member role
    Demote {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { reviewer_password } => {
            commands::seed::run(reviewer_password.as_deref()).await?;
        }
        Commands::Admin { action } => match action {
            AdminAction::Promote { email } => {
                commands::admin::promote(&email).await?;
            }
            AdminAction::Demote { email } => {
                commands::admin::demote(&email).await?;
            }
        },
    }
    Ok(())
}
