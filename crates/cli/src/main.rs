//! Lodge CLI - database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Create or update the schema (including the session table)
//! lodge migrate
//!
//! # Insert the standard rooms
//! lodge seed
//!
//! # Create a staff account
//! lodge user create -e owner@example.com -f Ada -l Owner -a admin
//! ```
//!
//! # Environment Variables
//!
//! - `LODGE_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `LODGE_USER_PASSWORD` - password for `user create` when `--password` is omitted

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "lodge")]
#[command(author, version, about = "Lodge CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Insert the standard rooms (safe to run repeatedly)
    Seed,
    /// Manage staff accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new staff account
    Create {
        /// Email address used to log in
        #[arg(short, long)]
        email: String,

        /// First name
        #[arg(short, long)]
        first_name: String,

        /// Last name
        #[arg(short, long)]
        last_name: String,

        /// Access level (`staff` or `admin`)
        #[arg(short, long, default_value = "staff")]
        access_level: String,

        /// Password (at least 8 characters)
        #[arg(long, env = "LODGE_USER_PASSWORD", hide_env_values = true)]
        password: String,
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
        Commands::Seed => commands::seed::rooms().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                first_name,
                last_name,
                access_level,
                password,
            } => {
                commands::users::create(&email, &first_name, &last_name, &access_level, &password)
                    .await?;
            }
        },
    }
    Ok(())
}
