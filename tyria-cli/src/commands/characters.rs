//! Character commands.

use anyhow::Result;
use clap::Args;

use super::authenticated_session;
use crate::output::{BagOutput, ContainerOutput};
use crate::{Cli, OutputFormat};

/// Arguments for the character command.
#[derive(Args)]
pub struct CharacterArgs {
    /// Character name.
    pub name: String,

    /// Only the core fields.
    #[arg(long, conflicts_with = "crafting")]
    pub core: bool,

    /// Only the crafting disciplines.
    #[arg(long)]
    pub crafting: bool,
}

/// Arguments for the inventory command.
#[derive(Args)]
pub struct InventoryArgs {
    /// Character name.
    pub name: String,
}

/// Lists the account's character names.
pub async fn run_list(cli: &Cli) -> Result<()> {
    let session = authenticated_session().await?;
    let names = session.api.get_characters().await?;

    match cli.format {
        OutputFormat::Text => println!("{}", cli.text_formatter().format_characters(&names)),
        OutputFormat::Json => println!("{}", cli.json_formatter().format(&names)?),
    }
    Ok(())
}

/// Shows one character, or one facet of it.
pub async fn run_character(args: &CharacterArgs, cli: &Cli) -> Result<()> {
    let session = authenticated_session().await?;
    let formatter = cli.text_formatter();

    if args.core {
        let core = session.api.get_character_core(&args.name).await?;
        match cli.format {
            OutputFormat::Text => println!("{}", formatter.format_core(&core)),
            OutputFormat::Json => println!("{}", cli.json_formatter().format(&core)?),
        }
    } else if args.crafting {
        let crafting = session.api.get_character_crafting(&args.name).await?;
        match cli.format {
            OutputFormat::Text => println!(
                "{}",
                formatter.format_crafting(args.name.trim(), &crafting)
            ),
            OutputFormat::Json => println!("{}", cli.json_formatter().format(&crafting)?),
        }
    } else {
        let character = session.api.get_character(&args.name).await?;
        match cli.format {
            OutputFormat::Text => println!("{}", formatter.format_character(&character)),
            OutputFormat::Json => println!("{}", cli.json_formatter().format(&character)?),
        }
    }
    Ok(())
}

/// Shows a character's bags with item names resolved.
pub async fn run_inventory(args: &InventoryArgs, cli: &Cli) -> Result<()> {
    let session = authenticated_session().await?;
    let inventory = session.api.get_character_inventory(&args.name).await?;

    // Bags are items too.
    let mut ids = inventory.item_ids();
    ids.extend(inventory.bags.iter().flatten().map(|bag| bag.id));
    let items = session.details.fetch_details(&ids).await;

    let name = args.name.trim().to_string();
    let bags = BagOutput::resolve(&inventory.bags, &items);

    match cli.format {
        OutputFormat::Text => println!("{}", cli.text_formatter().format_inventory(&name, &bags)),
        OutputFormat::Json => {
            let output = ContainerOutput {
                capacity: bags.iter().map(|bag| bag.size as usize).sum(),
                title: name,
                entries: bags,
            };
            println!("{}", cli.json_formatter().format(&output)?);
        }
    }
    Ok(())
}
