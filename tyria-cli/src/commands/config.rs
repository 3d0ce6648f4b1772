//! Config command - manage configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::info;
use tyria_store::{
    Settings, SettingsStore, default_config_dir, default_credential_path, default_settings_path,
};

use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration paths.
    Path,

    /// Change one setting.
    Set {
        /// Setting name, e.g. chunk_size or relay_url.
        key: String,
        /// New value. `none` unsets optional values.
        value: String,
    },

    /// Reset to defaults.
    Reset,
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        ConfigAction::Show => show_config(cli).await,
        ConfigAction::Path => show_paths(cli),
        ConfigAction::Set { key, value } => set_value(key, value, cli).await,
        ConfigAction::Reset => reset_config(cli).await,
    }
}

async fn show_config(cli: &Cli) -> Result<()> {
    let store = SettingsStore::load_default().await?;
    let settings = store.get().await;

    match cli.format {
        OutputFormat::Text => {
            println!("Tyria Configuration");
            println!("{}", "─".repeat(40));
            println!();
            for line in settings_lines(&settings) {
                println!("{line}");
            }
        }
        OutputFormat::Json => println!("{}", cli.json_formatter().format(&settings)?),
    }

    Ok(())
}

fn settings_lines(settings: &Settings) -> Vec<String> {
    let threshold = settings
        .auth_failure_threshold
        .map_or_else(|| "off".to_string(), |n| n.to_string());

    vec![
        format!("endpoint:               {}", settings.endpoint),
        format!(
            "relay_url:              {}",
            settings.relay_url.as_deref().unwrap_or("-")
        ),
        format!("auth_strategy:          {}", settings.auth_strategy),
        format!("credential_backend:     {}", settings.credential_backend),
        format!("credential_encoding:    {}", settings.credential_encoding),
        format!("chunk_size:             {}", settings.chunk_size),
        format!("max_concurrent_chunks:  {}", settings.max_concurrent_chunks),
        format!("timeout_secs:           {}", settings.timeout_secs),
        format!("auth_failure_threshold: {threshold}"),
        format!("log_level:              {}", settings.log_level),
    ]
}

fn show_paths(cli: &Cli) -> Result<()> {
    let config_dir = default_config_dir();
    let settings_path = default_settings_path();
    let credential_path = default_credential_path();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:      {}", config_dir.display());
            println!("Settings file:   {}", settings_path.display());
            println!("Credential file: {}", credential_path.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": config_dir.display().to_string(),
                "settings_file": settings_path.display().to_string(),
                "credential_file": credential_path.display().to_string(),
            });
            println!("{}", cli.json_formatter().format(&paths)?);
        }
    }

    Ok(())
}

async fn set_value(key: &str, value: &str, cli: &Cli) -> Result<()> {
    let store = SettingsStore::load_default().await?;
    store.set(key, value).await?;
    store.save().await?;

    info!(key, value, "Setting changed");
    if !cli.quiet {
        println!("Set {key} = {value}");
    }
    Ok(())
}

async fn reset_config(cli: &Cli) -> Result<()> {
    let store = SettingsStore::load_default().await?;
    store.update(|s| *s = Settings::default()).await;
    store.save().await?;

    info!("Configuration reset to defaults");
    if !cli.quiet {
        println!("Configuration reset to defaults");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_lines() {
        let lines = settings_lines(&Settings::default());
        assert!(lines.contains(&"endpoint:               direct".to_string()));
        assert!(lines.contains(&"relay_url:              -".to_string()));
        assert!(lines.contains(&"auth_failure_threshold: 3".to_string()));

        let mut settings = Settings::default();
        settings.set("auth_failure_threshold", "none").unwrap();
        let lines = settings_lines(&settings);
        assert!(lines.contains(&"auth_failure_threshold: off".to_string()));
    }
}
