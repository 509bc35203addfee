//! CRM CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! crm-cli migrate
//!
//! # Create a user
//! crm-cli user create -n "Ada Lovelace" -e ada@example.com -p 'correct horse' -r admin
//!
//! # Load demo companies, contacts and deals for a user
//! crm-cli seed -f crates/cli/seeds/demo.yaml -o ada@example.com
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user create` - Create user accounts
//! - `seed` - Seed the database with demo data

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "crm-cli")]
#[command(author, version, about = "CRM CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Seed the database with demo data
    Seed {
        /// Path to the YAML seed file
        #[arg(short, long, default_value = "crates/cli/seeds/demo.yaml")]
        file: String,

        /// Email of the user who will own the seeded records
        #[arg(short, long)]
        owner: String,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (at least 6 characters)
        #[arg(short, long)]
        password: String,

        /// Role (`admin`, `user`)
        #[arg(short, long, default_value = "user")]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crm_cli=info,crm_api=info".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                name,
                email,
                password,
                role,
            } => {
                commands::user::create(&name, &email, &password, &role).await?;
            }
        },
        Commands::Seed { file, owner } => {
            commands::seed::run(&file, &owner).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_user_create_defaults_role() {
        let cli = Cli::try_parse_from([
            "crm-cli", "user", "create", "-n", "Ada", "-e", "ada@example.com", "-p", "secret1",
        ])
        .ok();

        let Some(Cli {
            command:
                Commands::User {
                    action: UserAction::Create { role, .. },
                },
        }) = cli
        else {
            panic!("expected user create");
        };
        assert_eq!(role, "user");
    }
}
