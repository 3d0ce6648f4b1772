//! Items command - catalog lookup.

use anyhow::Result;
use clap::Args;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};
use tyria_core::{Item, ItemId};

use super::{load_settings, open_session};
use crate::output::ItemsOutput;
use crate::{Cli, OutputFormat};

/// Arguments for the items command.
#[derive(Args)]
pub struct ItemsArgs {
    /// Item ids.
    #[arg(required = true)]
    pub ids: Vec<ItemId>,

    /// Fetch directly in chunks of this size, bypassing the cache.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub chunk_size: Option<u32>,
}

/// Runs the items command.
///
/// The catalog is public, so no key is required.
pub async fn run(args: &ItemsArgs, cli: &Cli) -> Result<()> {
    let settings = load_settings().await?;
    let session = open_session(&settings).await?;

    let items: Vec<Arc<Item>> = match args.chunk_size {
        Some(chunk_size) => {
            debug!(chunk_size, "Fetching items directly");
            session
                .api
                .get_items_chunked(&args.ids, chunk_size as usize)
                .await?
                .into_iter()
                .map(Arc::new)
                .collect()
        }
        None => session.details.fetch_details(&args.ids).await,
    };

    let missing = missing_ids(&args.ids, &items);
    if !missing.is_empty() {
        warn!(count = missing.len(), "Some items were not found");
    }

    match cli.format {
        OutputFormat::Text => println!("{}", cli.text_formatter().format_items(&items, &missing)),
        OutputFormat::Json => {
            let output = ItemsOutput {
                items: items.iter().map(|item| &**item).collect(),
                missing,
            };
            println!("{}", cli.json_formatter().format(&output)?);
        }
    }
    Ok(())
}

/// Requested ids with no record, in request order and without repeats.
fn missing_ids(requested: &[ItemId], items: &[Arc<Item>]) -> Vec<ItemId> {
    let found: HashSet<ItemId> = items.iter().map(|item| item.id).collect();
    let mut seen = HashSet::new();
    requested
        .iter()
        .copied()
        .filter(|id| !found.contains(id) && seen.insert(*id))
        .collect()
}
