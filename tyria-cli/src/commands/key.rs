//! Key command - manage the API key.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use std::io::BufRead;
use tracing::info;

use super::{load_settings, open_session};
use crate::output::KeyStatusOutput;
use crate::{Cli, OutputFormat};

/// Characters of the key shown by `key status`.
const PREVIEW_LEN: usize = 4;

/// Arguments for the key command.
#[derive(Args)]
pub struct KeyArgs {
    #[command(subcommand)]
    pub action: KeyAction,
}

/// Key subcommands.
#[derive(Subcommand)]
pub enum KeyAction {
    /// Store an API key.
    Set {
        /// The key. Read from stdin when omitted.
        key: Option<String>,
    },

    /// Forget the stored API key.
    Clear,

    /// Show whether a key is available.
    Status,
}

/// Runs the key command.
pub async fn run(args: &KeyArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        KeyAction::Set { key } => set_key(key.as_deref(), cli).await,
        KeyAction::Clear => clear_key(cli).await,
        KeyAction::Status => show_status(cli).await,
    }
}

async fn set_key(key: Option<&str>, cli: &Cli) -> Result<()> {
    let key = match key {
        Some(key) => key.to_string(),
        None => read_key_from_stdin()?,
    };

    let settings = load_settings().await?;
    let session = open_session(&settings).await?;
    session.credentials.set(&key).await?;

    info!(backend = %settings.credential_backend, "API key stored");
    if !cli.quiet {
        println!("API key stored ({})", settings.credential_backend);
    }
    Ok(())
}

fn read_key_from_stdin() -> Result<String> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    if line.trim().is_empty() {
        bail!("No API key given on the command line or stdin");
    }
    Ok(line)
}

async fn clear_key(cli: &Cli) -> Result<()> {
    let settings = load_settings().await?;
    let session = open_session(&settings).await?;
    session.credentials.clear().await;

    if !cli.quiet {
        println!("API key cleared");
    }
    Ok(())
}

async fn show_status(cli: &Cli) -> Result<()> {
    let settings = load_settings().await?;
    let session = open_session(&settings).await?;
    let current = session.credentials.current().await;

    let status = KeyStatusOutput {
        set: current.is_some(),
        preview: current.map(|credential| mask_key(credential.expose())),
        backend: settings.credential_backend.to_string(),
        encoding: settings.credential_encoding.to_string(),
        auth_strategy: settings.auth_strategy.to_string(),
    };

    match cli.format {
        OutputFormat::Text => println!("{}", cli.text_formatter().format_key_status(&status)),
        OutputFormat::Json => println!("{}", cli.json_formatter().format(&status)?),
    }
    Ok(())
}

/// Shows the first characters of a key, hiding the rest.
fn mask_key(key: &str) -> String {
    let preview: String = key.chars().take(PREVIEW_LEN).collect();
    format!("{preview}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("ABCD-1234-EFGH"), "ABCD…");
        assert_eq!(mask_key("AB"), "AB…");
    }
}
