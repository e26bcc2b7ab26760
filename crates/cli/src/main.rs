//! Cartline CLI - database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! cartline-cli migrate
//!
//! # Load products from a YAML file (validate only with --dry-run)
//! cartline-cli seed products crates/cli/seeds/products.yaml
//!
//! # Give a registered user the admin role
//! cartline-cli admin promote -e admin@example.com
//!
//! # Delete expired carts once
//! cartline-cli carts reap
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use cartline_core::UserRole;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "cartline-cli")]
#[command(author, version, about = "Cartline CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage user roles
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Cart maintenance
    Carts {
        #[command(subcommand)]
        action: CartsAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert products from a YAML file
    Products {
        /// Path to the YAML file
        file: PathBuf,

        /// Validate the file without writing anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Set the role of an existing user
    Promote {
        /// User email address
        #[arg(short, long)]
        email: String,

        /// Role to assign (`admin`, `customer`)
        #[arg(short, long, default_value = "admin")]
        role: UserRole,
    },
}

#[derive(Subcommand)]
enum CartsAction {
    /// Delete expired carts
    Reap,
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Products { file, dry_run } => {
                let inserted = commands::seed::products(&file, dry_run).await?;
                tracing::info!(inserted, "Seeding complete");
            }
        },
        Commands::Admin { action } => match action {
            AdminAction::Promote { email, role } => {
                commands::admin::promote(&email, role).await?;
            }
        },
        Commands::Carts { action } => match action {
            CartsAction::Reap => {
                commands::carts::reap().await?;
            }
        },
    }
    Ok(())
}
