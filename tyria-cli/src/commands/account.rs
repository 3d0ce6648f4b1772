//! Account commands.

use anyhow::Result;
use tracing::debug;

use super::authenticated_session;
use crate::output::{ContainerOutput, SlotOutput};
use crate::{Cli, OutputFormat};

/// Shows the bank with item names resolved.
pub async fn run_bank(cli: &Cli) -> Result<()> {
    let session = authenticated_session().await?;

    let bank = session.api.get_bank().await?;
    let items = session.details.fetch_details(&bank.item_ids()).await;
    debug!(
        slots = bank.capacity(),
        resolved = items.len(),
        "Bank loaded"
    );

    let output = ContainerOutput {
        title: "Bank".to_string(),
        capacity: bank.capacity(),
        entries: SlotOutput::resolve(&bank.0, &items),
    };

    match cli.format {
        OutputFormat::Text => println!(
            "{}",
            cli.text_formatter()
                .format_slots(&output.title, &output.entries, output.capacity)
        ),
        OutputFormat::Json => println!("{}", cli.json_formatter().format(&output)?),
    }
    Ok(())
}
