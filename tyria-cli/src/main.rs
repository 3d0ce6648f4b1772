// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Tyria CLI - Guild Wars 2 account data from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Remember an API key
//! tyria key set ABCD-1234-...
//!
//! # Bank contents with item names
//! tyria bank
//!
//! # One character's bags
//! tyria inventory "Zojja"
//!
//! # Catalog lookup, JSON output
//! tyria --format json --pretty items 19697 19699 24
//!
//! # Go through a local relay
//! TYRIA_RELAY_URL=http://localhost:5173/api/gw2 tyria characters
//! ```

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use tyria_fetch::FetchError;
use tyria_store::LogLevel;

use commands::{account, characters, config, items, key};

// ============================================================================
// CLI Definition
// ============================================================================

/// Tyria CLI - Guild Wars 2 account data.
#[derive(Parser)]
#[command(name = "tyria")]
#[command(about = "Guild Wars 2 account data from the command line")]
#[command(long_about = r#"
Tyria reads your Guild Wars 2 account through the official API.

Most commands need an API key created at
https://account.arena.net/applications with the scopes they read
(account, characters, inventories).

Examples:
  tyria key set <KEY>            # Remember an API key
  tyria bank                     # Bank contents
  tyria characters               # Character names
  tyria inventory <NAME>         # A character's bags
  tyria items 19697 24           # Catalog lookup
"#)]
#[command(version)]
#[command(author = "Tyria Contributors")]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Manage the API key.
    #[command(visible_alias = "k")]
    Key(key::KeyArgs),

    /// Show the account bank.
    #[command(visible_alias = "b")]
    Bank,

    /// List the account's characters.
    #[command(visible_alias = "c")]
    Characters,

    /// Show one character.
    Character(characters::CharacterArgs),

    /// Show a character's bags.
    #[command(visible_alias = "i")]
    Inventory(characters::InventoryArgs),

    /// Look up catalog items by id.
    Items(items::ItemsArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// The API key is missing, invalid or lacks a scope.
    CredentialRequired = 2,
    /// Invalid arguments.
    InvalidInput = 3,
    /// The upstream could not be reached.
    NetworkUnavailable = 4,
}

impl ExitCode {
    /// Picks the exit code for a failed command.
    pub fn for_error(error: &anyhow::Error) -> Self {
        match error.downcast_ref::<FetchError>() {
            Some(e) if e.is_credential_error() => ExitCode::CredentialRequired,
            Some(FetchError::InvalidInput(_)) => ExitCode::InvalidInput,
            Some(FetchError::NetworkUnavailable(_)) => ExitCode::NetworkUnavailable,
            _ => ExitCode::Error,
        }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool, level: LogLevel) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("tyria=debug,info")
    } else {
        EnvFilter::new(format!("tyria={level}"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = commands::load_settings()
        .await
        .map(|settings| settings.log_level)
        .unwrap_or_default();
    setup_logging(cli.verbose, cli.quiet, level);

    let result = match &cli.command {
        Commands::Key(args) => key::run(args, &cli).await,
        Commands::Bank => account::run_bank(&cli).await,
        Commands::Characters => characters::run_list(&cli).await,
        Commands::Character(args) => characters::run_character(args, &cli).await,
        Commands::Inventory(args) => characters::run_inventory(args, &cli).await,
        Commands::Items(args) => items::run(args, &cli).await,
        Commands::Config(args) => config::run(args, &cli).await,
    };

    if let Err(e) = result {
        let code = ExitCode::for_error(&e);
        if !cli.quiet {
            eprintln!("Error: {e}");
            if matches!(code, ExitCode::CredentialRequired) {
                eprintln!("Enter a valid API key with `tyria key set <KEY>`.");
            }
        }
        std::process::exit(code as i32);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["tyria", "--format", "json", "items", "1", "2"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Items(_)));

        assert!(Cli::try_parse_from(["tyria", "items", "abc"]).is_err());
        assert!(Cli::try_parse_from(["tyria"]).is_err());
    }

    #[test]
    fn test_exit_code_for_error() {
        let err = anyhow::Error::new(FetchError::AuthenticationFailed("nope".into()));
        assert!(matches!(ExitCode::for_error(&err), ExitCode::CredentialRequired));

        let err = anyhow::Error::new(FetchError::AuthorizationDenied("scope".into()));
        assert!(matches!(ExitCode::for_error(&err), ExitCode::CredentialRequired));

        let err = anyhow::Error::new(FetchError::InvalidInput("empty".into()));
        assert!(matches!(ExitCode::for_error(&err), ExitCode::InvalidInput));

        let err = anyhow::anyhow!("something else");
        assert!(matches!(ExitCode::for_error(&err), ExitCode::Error));
    }
}
